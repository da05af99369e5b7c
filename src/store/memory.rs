//! In-memory collaborators.
//!
//! Thread-safe implementations of [`SchemaStore`] and [`InstanceStore`]
//! intended for embedded usage, tests, and as a reference for adapters.

use std::collections::{BTreeMap, HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use crate::class::{ClassId, InstanceKey, PropertyInfo, SchemaCategory};
use crate::path::{RelationshipDirection, RelationshipPath};
use crate::store::traits::{InstanceStore, RelatedInstance, SchemaStore, StoreError};
use crate::value::Value;

fn lock_err(context: &'static str) -> StoreError {
    StoreError::Backend(format!("poisoned lock: {context}"))
}

/// Definition of one schema class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDefinition {
    /// Class id.
    pub id: ClassId,
    /// Display label; the short name is used when absent.
    pub label: Option<String>,
    /// Direct bases, in declaration order.
    pub bases: Vec<ClassId>,
    /// Properties declared on this class only.
    pub properties: Vec<PropertyInfo>,
    /// Source and target constraint classes, for relationship classes.
    pub endpoints: Option<(ClassId, ClassId)>,
}

impl ClassDefinition {
    /// Creates an entity class definition.
    #[must_use]
    pub fn new(id: impl Into<ClassId>) -> Self {
        Self {
            id: id.into(),
            label: None,
            bases: Vec::new(),
            properties: Vec::new(),
            endpoints: None,
        }
    }

    /// Creates a relationship class definition.
    #[must_use]
    pub fn relationship(
        id: impl Into<ClassId>,
        source: impl Into<ClassId>,
        target: impl Into<ClassId>,
    ) -> Self {
        let mut def = Self::new(id);
        def.endpoints = Some((source.into(), target.into()));
        def
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Appends a direct base class.
    #[must_use]
    pub fn with_base(mut self, base: impl Into<ClassId>) -> Self {
        self.bases.push(base.into());
        self
    }

    /// Declares a primitive property.
    #[must_use]
    pub fn with_property(self, name: impl Into<String>) -> Self {
        let info = PropertyInfo::new(self.id.clone(), name);
        self.with_property_info(info)
    }

    /// Declares a property with full metadata.
    #[must_use]
    pub fn with_property_info(mut self, mut info: PropertyInfo) -> Self {
        info.declaring_class = self.id.clone();
        self.properties.push(info);
        self
    }
}

#[derive(Debug, Default)]
struct SchemaState {
    classes: HashMap<ClassId, ClassDefinition>,
    categories: HashMap<String, SchemaCategory>,
}

impl SchemaState {
    fn class(&self, id: &ClassId) -> Result<&ClassDefinition, StoreError> {
        self.classes
            .get(id)
            .ok_or_else(|| StoreError::ClassNotFound(id.clone()))
    }

    fn collect_properties(
        &self,
        id: &ClassId,
        visited: &mut HashSet<ClassId>,
        out: &mut Vec<PropertyInfo>,
    ) -> Result<(), StoreError> {
        if !visited.insert(id.clone()) {
            return Ok(());
        }
        let def = self.class(id)?;
        for base in &def.bases {
            self.collect_properties(base, visited, out)?;
        }
        for prop in &def.properties {
            // A redeclared property replaces the inherited one in place.
            match out.iter_mut().find(|p| p.name == prop.name) {
                Some(existing) => *existing = prop.clone(),
                None => out.push(prop.clone()),
            }
        }
        Ok(())
    }
}

/// Thread-safe in-memory schema.
#[derive(Debug, Default)]
pub struct InMemorySchemaStore {
    state: RwLock<SchemaState>,
}

impl InMemorySchemaStore {
    /// Create a new empty schema.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a class. Returns an error if a class with the same id exists.
    pub fn insert_class(&self, def: ClassDefinition) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("schema.insert_class"))?;
        if state.classes.contains_key(&def.id) {
            return Err(StoreError::Backend(format!("duplicate class: {}", def.id)));
        }
        state.classes.insert(def.id.clone(), def);
        Ok(())
    }

    /// Adds or replaces a schema property category.
    pub fn insert_category(&self, category: SchemaCategory) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("schema.insert_category"))?;
        state.categories.insert(category.id.clone(), category);
        Ok(())
    }
}

impl SchemaStore for InMemorySchemaStore {
    fn base_classes(&self, class: &ClassId) -> Result<Vec<ClassId>, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("schema.base_classes"))?;
        Ok(state.class(class)?.bases.clone())
    }

    fn is_subclass_of(&self, derived: &ClassId, base: &ClassId) -> Result<bool, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("schema.is_subclass_of"))?;
        let mut queue = VecDeque::from([derived.clone()]);
        let mut seen = HashSet::new();
        while let Some(current) = queue.pop_front() {
            if &current == base {
                return Ok(true);
            }
            if !seen.insert(current.clone()) {
                continue;
            }
            queue.extend(state.class(&current)?.bases.iter().cloned());
        }
        Ok(false)
    }

    fn display_label(&self, class: &ClassId) -> Result<String, StoreError> {
        let state = self.state.read().map_err(|_| lock_err("schema.display_label"))?;
        let def = state.class(class)?;
        Ok(def
            .label
            .clone()
            .unwrap_or_else(|| class.short_name().to_string()))
    }

    fn declared_properties(&self, class: &ClassId) -> Result<Vec<PropertyInfo>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("schema.declared_properties"))?;
        let mut out = Vec::new();
        state.collect_properties(class, &mut HashSet::new(), &mut out)?;
        Ok(out)
    }

    fn property_category(&self, id: &str) -> Result<Option<SchemaCategory>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("schema.property_category"))?;
        Ok(state.categories.get(id).cloned())
    }

    fn relationship_target(
        &self,
        relationship: &ClassId,
        direction: RelationshipDirection,
    ) -> Result<Option<ClassId>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("schema.relationship_target"))?;
        let def = state.class(relationship)?;
        Ok(def.endpoints.as_ref().map(|(source, target)| match direction {
            RelationshipDirection::Forward => target.clone(),
            RelationshipDirection::Backward => source.clone(),
        }))
    }
}

#[derive(Debug, Clone)]
struct RelationshipRecord {
    key: InstanceKey,
    source: InstanceKey,
    target: InstanceKey,
}

#[derive(Debug, Default)]
struct InstanceState {
    values: HashMap<InstanceKey, BTreeMap<String, Value>>,
    relationships: Vec<RelationshipRecord>,
}

/// Thread-safe in-memory instance store.
///
/// Relationship class matching is polymorphic, so it needs the schema.
pub struct InMemoryInstanceStore {
    schema: Arc<dyn SchemaStore>,
    state: RwLock<InstanceState>,
}

impl InMemoryInstanceStore {
    /// Create a new empty store over `schema`.
    #[must_use]
    pub fn new(schema: Arc<dyn SchemaStore>) -> Self {
        Self {
            schema,
            state: RwLock::new(InstanceState::default()),
        }
    }

    /// Adds an instance with its property values.
    pub fn insert<I, K>(&self, key: InstanceKey, values: I) -> Result<(), StoreError>
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut state = self.state.write().map_err(|_| lock_err("instances.insert"))?;
        if state.values.contains_key(&key) {
            return Err(StoreError::Backend(format!("duplicate instance: {key}")));
        }
        let values = values.into_iter().map(|(k, v)| (k.into(), v)).collect();
        state.values.insert(key, values);
        Ok(())
    }

    /// Sets one property of an existing instance.
    pub fn set_property(
        &self,
        key: &InstanceKey,
        name: impl Into<String>,
        value: Value,
    ) -> Result<(), StoreError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| lock_err("instances.set_property"))?;
        let values = state
            .values
            .get_mut(key)
            .ok_or_else(|| StoreError::InstanceNotFound(key.clone()))?;
        values.insert(name.into(), value);
        Ok(())
    }

    /// Links `source` to `target` through the relationship instance `key`.
    ///
    /// The relationship instance is registered as an instance too, so its
    /// own properties can be set with [`Self::set_property`].
    pub fn relate(
        &self,
        key: InstanceKey,
        source: &InstanceKey,
        target: &InstanceKey,
    ) -> Result<(), StoreError> {
        let mut state = self.state.write().map_err(|_| lock_err("instances.relate"))?;
        for endpoint in [source, target] {
            if !state.values.contains_key(endpoint) {
                return Err(StoreError::InstanceNotFound(endpoint.clone()));
            }
        }
        state.values.entry(key.clone()).or_default();
        state.relationships.push(RelationshipRecord {
            key,
            source: source.clone(),
            target: target.clone(),
        });
        Ok(())
    }
}

impl InstanceStore for InMemoryInstanceStore {
    fn read_property(&self, instance: &InstanceKey, name: &str) -> Result<Value, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("instances.read_property"))?;
        let values = state
            .values
            .get(instance)
            .ok_or_else(|| StoreError::InstanceNotFound(instance.clone()))?;
        Ok(values.get(name).cloned().unwrap_or(Value::Null))
    }

    fn resolve_related(
        &self,
        path: &RelationshipPath,
        from: &InstanceKey,
    ) -> Result<Vec<RelatedInstance>, StoreError> {
        let state = self
            .state
            .read()
            .map_err(|_| lock_err("instances.resolve_related"))?;

        let mut frontier = vec![RelatedInstance {
            target: from.clone(),
            relationship: None,
        }];
        for step in path.steps() {
            let mut next: Vec<RelatedInstance> = Vec::new();
            for current in &frontier {
                for record in &state.relationships {
                    if !self
                        .schema
                        .is_subclass_of(&record.key.class, &step.relationship)?
                    {
                        continue;
                    }
                    let candidate = match step.direction {
                        RelationshipDirection::Forward if record.source == current.target => {
                            &record.target
                        }
                        RelationshipDirection::Backward if record.target == current.target => {
                            &record.source
                        }
                        _ => continue,
                    };
                    if let Some(constraint) = &step.target_class {
                        if !self.schema.is_subclass_of(&candidate.class, constraint)? {
                            continue;
                        }
                    }
                    if next.iter().any(|r| &r.target == candidate) {
                        continue;
                    }
                    next.push(RelatedInstance {
                        target: candidate.clone(),
                        relationship: Some(record.key.clone()),
                    });
                }
            }
            frontier = next;
        }
        Ok(frontier)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::RelationshipStep;

    fn schema() -> Arc<InMemorySchemaStore> {
        let schema = Arc::new(InMemorySchemaStore::new());
        schema
            .insert_class(ClassDefinition::new("S:Base").with_property("CodeValue"))
            .unwrap();
        schema
            .insert_class(ClassDefinition::new("S:Mixin").with_property("UserLabel"))
            .unwrap();
        schema
            .insert_class(
                ClassDefinition::new("S:Derived")
                    .with_label("Derived Element")
                    .with_base("S:Base")
                    .with_base("S:Mixin")
                    .with_property("Own"),
            )
            .unwrap();
        schema
            .insert_class(ClassDefinition::relationship("S:Owns", "S:Base", "S:Base"))
            .unwrap();
        schema
    }

    #[test]
    fn test_subclass_checks_follow_every_base() {
        let schema = schema();
        let derived = ClassId::new("S:Derived");
        assert!(schema.is_subclass_of(&derived, &derived).unwrap());
        assert!(schema.is_subclass_of(&derived, &ClassId::new("S:Mixin")).unwrap());
        assert!(!schema
            .is_subclass_of(&ClassId::new("S:Base"), &derived)
            .unwrap());
    }

    #[test]
    fn test_declared_properties_include_inherited() {
        let schema = schema();
        let props = schema.declared_properties(&ClassId::new("S:Derived")).unwrap();
        let names: Vec<_> = props.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["CodeValue", "UserLabel", "Own"]);
        assert_eq!(props[0].declaring_class, ClassId::new("S:Base"));
    }

    #[test]
    fn test_display_label_defaults_to_short_name() {
        let schema = schema();
        assert_eq!(schema.display_label(&ClassId::new("S:Base")).unwrap(), "Base");
        assert_eq!(
            schema.display_label(&ClassId::new("S:Derived")).unwrap(),
            "Derived Element"
        );
        assert!(matches!(
            schema.display_label(&ClassId::new("S:Nope")),
            Err(StoreError::ClassNotFound(_))
        ));
    }

    #[test]
    fn test_relationship_target_by_direction() {
        let schema = schema();
        let rel = ClassId::new("S:Owns");
        assert_eq!(
            schema
                .relationship_target(&rel, RelationshipDirection::Forward)
                .unwrap(),
            Some(ClassId::new("S:Base"))
        );
        assert_eq!(
            schema
                .relationship_target(&ClassId::new("S:Base"), RelationshipDirection::Forward)
                .unwrap(),
            None
        );
    }

    #[test]
    fn test_resolve_related_both_directions() {
        let schema = schema();
        let store = InMemoryInstanceStore::new(schema);
        let parent = InstanceKey::new("S:Base", 1);
        let child = InstanceKey::new("S:Derived", 2);
        store.insert(parent.clone(), [("CodeValue", Value::from("p"))]).unwrap();
        store.insert(child.clone(), Vec::<(String, Value)>::new()).unwrap();
        let rel = InstanceKey::new("S:Owns", 3);
        store.relate(rel.clone(), &parent, &child).unwrap();
        store.set_property(&rel, "Weight", Value::Int(5)).unwrap();

        let forward = RelationshipPath::new(vec![RelationshipStep::forward("S:Owns")]).unwrap();
        let related = store.resolve_related(&forward, &parent).unwrap();
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].target, child);
        assert_eq!(related[0].relationship, Some(rel.clone()));
        assert_eq!(store.read_property(&rel, "Weight").unwrap(), Value::Int(5));

        let backward = RelationshipPath::new(vec![RelationshipStep::backward("S:Owns")]).unwrap();
        let related = store.resolve_related(&backward, &child).unwrap();
        assert_eq!(related[0].target, parent);

        let constrained = RelationshipPath::new(vec![
            RelationshipStep::forward("S:Owns").with_target_class("S:Mixin"),
        ])
        .unwrap();
        assert_eq!(store.resolve_related(&constrained, &parent).unwrap().len(), 1);
        let excluded = RelationshipPath::new(vec![
            RelationshipStep::backward("S:Owns").with_target_class("S:Mixin"),
        ])
        .unwrap();
        assert!(store.resolve_related(&excluded, &child).unwrap().is_empty());
    }

    #[test]
    fn test_unset_property_reads_null() {
        let store = InMemoryInstanceStore::new(schema());
        let key = InstanceKey::new("S:Base", 1);
        store.insert(key.clone(), Vec::<(String, Value)>::new()).unwrap();
        assert_eq!(store.read_property(&key, "CodeValue").unwrap(), Value::Null);
        assert!(matches!(
            store.read_property(&InstanceKey::new("S:Base", 9), "CodeValue"),
            Err(StoreError::InstanceNotFound(_))
        ));
    }
}
