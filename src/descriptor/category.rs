//! Category tree and category resolution.
//!
//! Categories live in a flat arena owned by the descriptor; parent and
//! child links are [`CategoryRef`] indices. Ids are scoped by
//! [`CategoryKind`]: within a kind an id names exactly one node per
//! descriptor, so merging categories contributed by unrelated rules is a
//! lookup by id, while a rule-declared id never captures a class or schema
//! category that happens to share its text.
//!
//! Resolution works against a [`CategoryContext`], the three categories a
//! traversal position offers:
//! - `fallback`: where a property with no override and no schema category goes
//! - `enclosing`: parent for schema categories and for `DefaultParent` parents
//! - `root`: top of the contextual chain, used by `Root`

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::warn;

use crate::class::ClassId;
use crate::error::{PresentationError, PresentationResult};
use crate::rules::{CategoryIdentifier, ContentOverrides, PropertyCategorySpecification, RelationshipMeaning};
use crate::store::SchemaStore;

/// Index of a category in its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CategoryRef(pub(crate) usize);

impl CategoryRef {
    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Where a category comes from. Each kind has its own id namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryKind {
    /// Declared by a rule, including the default root.
    Custom,
    /// Named after a class or relationship class.
    Class,
    /// Declared by the schema on a property.
    Schema,
}

/// A category node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Category {
    /// Id, unique among categories of the same kind.
    pub id: String,
    /// Origin of the category.
    pub kind: CategoryKind,
    /// Display label.
    pub label: String,
    /// Sort priority.
    pub priority: i32,
    /// Optional description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the category starts expanded.
    pub auto_expand: bool,
    /// Parent; `None` for top-level categories.
    pub parent: Option<CategoryRef>,
    /// Children in insertion order.
    pub children: Vec<CategoryRef>,
}

impl Category {
    fn new(kind: CategoryKind, id: String, label: String, priority: i32, parent: Option<CategoryRef>) -> Self {
        Self {
            id,
            kind,
            label,
            priority,
            description: None,
            auto_expand: false,
            parent,
            children: Vec::new(),
        }
    }

    fn from_spec(spec: &PropertyCategorySpecification, parent: Option<CategoryRef>) -> Self {
        Self {
            description: spec.description.clone(),
            auto_expand: spec.auto_expand,
            ..Self::new(CategoryKind::Custom, spec.id.clone(), spec.label.clone(), spec.priority, parent)
        }
    }
}

/// Arena of categories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CategoryTree {
    nodes: Vec<Category>,
    #[serde(skip)]
    by_id: HashMap<(CategoryKind, String), CategoryRef>,
}

impl CategoryTree {
    /// Returns the category at `r`.
    #[must_use]
    pub fn get(&self, r: CategoryRef) -> Option<&Category> {
        self.nodes.get(r.0)
    }

    /// Finds a rule-declared category by id.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<CategoryRef> {
        self.lookup(CategoryKind::Custom, id)
    }

    /// Finds a category of `kind` by id.
    #[must_use]
    pub fn lookup(&self, kind: CategoryKind, id: &str) -> Option<CategoryRef> {
        self.by_id.get(&(kind, id.to_string())).copied()
    }

    /// Number of categories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if there are no categories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All categories in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (CategoryRef, &Category)> {
        self.nodes.iter().enumerate().map(|(i, c)| (CategoryRef(i), c))
    }

    /// Top-level categories.
    pub fn roots(&self) -> impl Iterator<Item = CategoryRef> + '_ {
        self.iter().filter(|(_, c)| c.parent.is_none()).map(|(r, _)| r)
    }

    /// The category and its ancestors, leaf first.
    #[must_use]
    pub fn chain(&self, r: CategoryRef) -> Vec<&Category> {
        let mut out = Vec::new();
        let mut current = Some(r);
        while let Some(node) = current.and_then(|c| self.get(c)) {
            out.push(node);
            current = node.parent;
        }
        out
    }

    /// Labels of [`Self::chain`], leaf first.
    #[must_use]
    pub fn chain_labels(&self, r: CategoryRef) -> Vec<&str> {
        self.chain(r).into_iter().map(|c| c.label.as_str()).collect()
    }

    /// Top-most ancestor of `r`.
    #[must_use]
    pub fn top(&self, r: CategoryRef) -> CategoryRef {
        let mut current = r;
        while let Some(parent) = self.get(current).and_then(|c| c.parent) {
            current = parent;
        }
        current
    }

    /// Returns the node of `kind` with `id`, inserting `make()` if absent.
    fn get_or_insert(&mut self, kind: CategoryKind, id: &str, make: impl FnOnce() -> Category) -> CategoryRef {
        if let Some(found) = self.lookup(kind, id) {
            return found;
        }
        let node = make();
        let r = CategoryRef(self.nodes.len());
        if let Some(parent) = node.parent.and_then(|p| self.nodes.get_mut(p.0)) {
            parent.children.push(r);
        }
        self.by_id.insert((kind, id.to_string()), r);
        self.nodes.push(node);
        r
    }

    /// Drops every category that is neither in `keep` nor an ancestor of one.
    ///
    /// Returns the mapping from old to new references.
    fn retain(&mut self, keep: &HashSet<CategoryRef>) -> HashMap<CategoryRef, CategoryRef> {
        let mut alive = vec![false; self.nodes.len()];
        for &r in keep {
            let mut current = Some(r);
            while let Some(c) = current {
                if c.0 >= alive.len() || alive[c.0] {
                    break;
                }
                alive[c.0] = true;
                current = self.nodes[c.0].parent;
            }
        }

        let mut remap = HashMap::new();
        let mut nodes = Vec::new();
        for (i, node) in std::mem::take(&mut self.nodes).into_iter().enumerate() {
            if alive[i] {
                remap.insert(CategoryRef(i), CategoryRef(nodes.len()));
                nodes.push(node);
            }
        }
        for node in &mut nodes {
            node.parent = node.parent.and_then(|p| remap.get(&p).copied());
            node.children = node
                .children
                .iter()
                .filter_map(|c| remap.get(c).copied())
                .collect();
        }
        self.by_id = nodes
            .iter()
            .enumerate()
            .map(|(i, n)| ((n.kind, n.id.clone()), CategoryRef(i)))
            .collect();
        self.nodes = nodes;
        remap
    }
}

/// Categories a traversal position offers to resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryContext {
    /// Category of properties with no override and no schema category.
    pub fallback: CategoryRef,
    /// Parent of schema categories and of `DefaultParent` custom categories.
    pub enclosing: CategoryRef,
    /// Top of the contextual chain.
    pub root: CategoryRef,
}

/// Contextual chain of class categories, outermost first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryStack {
    chain: Vec<CategoryRef>,
}

impl CategoryStack {
    /// Innermost category, if any.
    #[must_use]
    pub fn leaf(&self) -> Option<CategoryRef> {
        self.chain.last().copied()
    }

    fn push(&mut self, r: CategoryRef) {
        self.chain.push(r);
    }
}

/// Custom categories visible at a position: the selection spec first,
/// then applicable content modifiers.
#[derive(Debug, Clone, Default)]
pub struct CategoryScope<'a> {
    layers: Vec<&'a ContentOverrides>,
}

impl<'a> CategoryScope<'a> {
    /// Creates a scope from layers in lookup order.
    #[must_use]
    pub fn new(layers: Vec<&'a ContentOverrides>) -> Self {
        Self { layers }
    }

    /// First declaration of `id` in lookup order.
    #[must_use]
    pub fn find(&self, id: &str) -> Option<&'a PropertyCategorySpecification> {
        self.layers.iter().find_map(|layer| layer.category(id))
    }
}

/// Category contexts of one related-properties level.
#[derive(Debug, Clone)]
pub struct RelatedLevelCategories {
    /// Context for relationship-class properties.
    pub relationship: CategoryContext,
    /// Context for related-class properties.
    pub properties: CategoryContext,
    /// Category of the nested content field.
    pub field: CategoryRef,
    /// Stack handed to nested levels.
    pub nested: CategoryStack,
}

/// Builds the category tree of one descriptor.
pub struct CategoryBuilder<'a> {
    schema: &'a dyn SchemaStore,
    tree: CategoryTree,
    default_root: CategoryRef,
    resolving: Vec<String>,
}

impl<'a> CategoryBuilder<'a> {
    /// Creates a builder whose tree holds only the default root category.
    #[must_use]
    pub fn new(schema: &'a dyn SchemaStore, default_root: &PropertyCategorySpecification) -> Self {
        let mut tree = CategoryTree::default();
        let root = tree.get_or_insert(CategoryKind::Custom, &default_root.id, || {
            Category::from_spec(default_root, None)
        });
        Self {
            schema,
            tree,
            default_root: root,
            resolving: Vec::new(),
        }
    }

    /// The default root category.
    #[must_use]
    pub const fn default_root(&self) -> CategoryRef {
        self.default_root
    }

    /// The tree built so far.
    #[must_use]
    pub fn tree(&self) -> &CategoryTree {
        &self.tree
    }

    /// Context of a selected class's own properties.
    #[must_use]
    pub const fn direct_context(&self) -> CategoryContext {
        CategoryContext {
            fallback: self.default_root,
            enclosing: self.default_root,
            root: self.default_root,
        }
    }

    fn context_under(&self, fallback: CategoryRef, enclosing: CategoryRef) -> CategoryContext {
        CategoryContext {
            fallback,
            enclosing,
            root: self.tree.top(enclosing),
        }
    }

    fn qualified_id(&self, parent: Option<CategoryRef>, name: &str) -> String {
        match parent.and_then(|p| self.tree.get(p)) {
            Some(p) => format!("{}/{name}", p.id),
            None => name.to_string(),
        }
    }

    /// Category named after `class`, under `parent`.
    pub fn class_category(
        &mut self,
        parent: Option<CategoryRef>,
        class: &ClassId,
    ) -> PresentationResult<CategoryRef> {
        let id = self.qualified_id(parent, class.as_str());
        if let Some(found) = self.tree.lookup(CategoryKind::Class, &id) {
            return Ok(found);
        }
        let label = self
            .schema
            .display_label(class)
            .map_err(PresentationError::schema)?;
        Ok(self
            .tree
            .get_or_insert(CategoryKind::Class, &id, || {
                Category::new(CategoryKind::Class, id.clone(), label, 0, parent)
            }))
    }

    fn schema_category(&mut self, parent: CategoryRef, category_id: &str) -> PresentationResult<CategoryRef> {
        let id = self.qualified_id(Some(parent), category_id);
        if let Some(found) = self.tree.lookup(CategoryKind::Schema, &id) {
            return Ok(found);
        }
        let declared = self
            .schema
            .property_category(category_id)
            .map_err(PresentationError::schema)?;
        let (label, priority) = match declared {
            Some(c) => (c.label, c.priority),
            None => {
                warn!(category = category_id, "schema category is not declared, using its id as label");
                (category_id.to_string(), 0)
            }
        };
        Ok(self
            .tree
            .get_or_insert(CategoryKind::Schema, &id, || {
                Category::new(CategoryKind::Schema, id.clone(), label, priority, Some(parent))
            }))
    }

    /// Category a property gets without any override.
    pub fn property_default(
        &mut self,
        ctx: CategoryContext,
        schema_category: Option<&str>,
    ) -> PresentationResult<CategoryRef> {
        match schema_category {
            Some(id) => self.schema_category(ctx.enclosing, id),
            None => Ok(ctx.fallback),
        }
    }

    /// Resolves a property's category.
    ///
    /// `None` and `DefaultParent` both yield [`Self::property_default`].
    /// A dangling id falls back to the same default.
    pub fn resolve(
        &mut self,
        ctx: CategoryContext,
        declared: Option<&CategoryIdentifier>,
        scope: &CategoryScope<'_>,
        schema_category: Option<&str>,
    ) -> PresentationResult<CategoryRef> {
        match declared {
            None | Some(CategoryIdentifier::DefaultParent) => self.property_default(ctx, schema_category),
            Some(CategoryIdentifier::Root) => Ok(ctx.root),
            Some(CategoryIdentifier::Id(id)) => match self.custom(ctx, id, scope) {
                Some(found) => Ok(found),
                None => self.property_default(ctx, schema_category),
            },
        }
    }

    /// Resolves a rule-declared category, creating it on first use.
    ///
    /// Only categories already created from a declaration and declarations
    /// in `scope` are candidates; class and schema categories never match.
    pub fn custom(
        &mut self,
        ctx: CategoryContext,
        id: &str,
        scope: &CategoryScope<'_>,
    ) -> Option<CategoryRef> {
        if let Some(found) = self.tree.find(id) {
            return Some(found);
        }
        let Some(spec) = scope.find(id) else {
            warn!(category = id, "category id is not declared in scope, using contextual default");
            return None;
        };
        if self.resolving.iter().any(|r| r == id) {
            warn!(category = id, "category parent chain is cyclic, using contextual default");
            return None;
        }

        self.resolving.push(id.to_string());
        let parent = match &spec.parent {
            None => None,
            Some(CategoryIdentifier::DefaultParent) => Some(ctx.enclosing),
            Some(CategoryIdentifier::Root) => Some(ctx.root),
            Some(CategoryIdentifier::Id(parent_id)) => {
                Some(self.custom(ctx, parent_id, scope).unwrap_or(ctx.enclosing))
            }
        };
        self.resolving.pop();

        Some(
            self.tree
                .get_or_insert(CategoryKind::Custom, id, || Category::from_spec(spec, parent)),
        )
    }

    /// Builds the categories of one related-properties level.
    ///
    /// A relationship category is interposed when `with_relationship` is set.
    /// Under `RelatedInstance` the related-class category is parented under
    /// the stack leaf only, never under the default root.
    pub fn related_level(
        &mut self,
        stack: &CategoryStack,
        meaning: RelationshipMeaning,
        relationship: &ClassId,
        related_class: &ClassId,
        with_relationship: bool,
    ) -> PresentationResult<RelatedLevelCategories> {
        let default_root = self.default_root;
        let parent_of = |stack: &CategoryStack| match meaning {
            RelationshipMeaning::SameInstance => Some(stack.leaf().unwrap_or(default_root)),
            RelationshipMeaning::RelatedInstance => stack.leaf(),
        };

        let mut stack = stack.clone();
        if with_relationship {
            let r = self.class_category(parent_of(&stack), relationship)?;
            stack.push(r);
        }
        let relationship_leaf = stack.leaf().unwrap_or(default_root);
        let relationship_ctx = self.context_under(relationship_leaf, relationship_leaf);

        let class_category = self.class_category(parent_of(&stack), related_class)?;
        Ok(match meaning {
            RelationshipMeaning::RelatedInstance => {
                stack.push(class_category);
                RelatedLevelCategories {
                    relationship: relationship_ctx,
                    properties: self.context_under(class_category, class_category),
                    field: class_category,
                    nested: stack,
                }
            }
            RelationshipMeaning::SameInstance => {
                let enclosing = stack.leaf().unwrap_or(default_root);
                let properties = self.context_under(class_category, enclosing);
                let mut nested = stack;
                nested.push(class_category);
                RelatedLevelCategories {
                    relationship: relationship_ctx,
                    properties,
                    field: enclosing,
                    nested,
                }
            }
        })
    }

    /// Finishes the tree, keeping referenced categories, their ancestors
    /// and the default root.
    #[must_use]
    pub fn finish(mut self, referenced: &HashSet<CategoryRef>) -> (CategoryTree, HashMap<CategoryRef, CategoryRef>) {
        let mut keep = referenced.clone();
        keep.insert(self.default_root);
        let remap = self.tree.retain(&keep);
        (self.tree, remap)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{ClassDefinition, InMemorySchemaStore};

    fn schema() -> InMemorySchemaStore {
        let schema = InMemorySchemaStore::new();
        schema.insert_class(ClassDefinition::new("S:A")).unwrap();
        schema
            .insert_class(ClassDefinition::new("S:B").with_label("Class B"))
            .unwrap();
        schema
            .insert_class(ClassDefinition::relationship("S:AHasB", "S:A", "S:B").with_label("A has B"))
            .unwrap();
        schema
    }

    fn default_spec() -> PropertyCategorySpecification {
        PropertyCategorySpecification::new("/selected-item/", "Selected Item(s)")
    }

    #[test]
    fn test_default_parent_equals_none() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let ctx = builder.direct_context();
        let scope = CategoryScope::default();
        let none = builder.resolve(ctx, None, &scope, Some("misc")).unwrap();
        let default_parent = builder
            .resolve(ctx, Some(&CategoryIdentifier::DefaultParent), &scope, Some("misc"))
            .unwrap();
        assert_eq!(none, default_parent);
        assert_eq!(builder.tree().chain_labels(none), vec!["misc", "Selected Item(s)"]);
    }

    #[test]
    fn test_custom_categories_merge_by_id() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let ctx = builder.direct_context();
        let first = ContentOverrides {
            property_categories: vec![PropertyCategorySpecification::new("custom", "First")],
            ..ContentOverrides::default()
        };
        let second = ContentOverrides {
            property_categories: vec![PropertyCategorySpecification::new("custom", "Second")],
            ..ContentOverrides::default()
        };
        let a = builder
            .resolve(ctx, Some(&CategoryIdentifier::id("custom")), &CategoryScope::new(vec![&first]), None)
            .unwrap();
        let b = builder
            .resolve(ctx, Some(&CategoryIdentifier::id("custom")), &CategoryScope::new(vec![&second]), None)
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(builder.tree().get(a).unwrap().label, "First");
        assert_eq!(builder.tree().get(a).unwrap().parent, None);
    }

    #[test]
    fn test_dangling_id_uses_default() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let ctx = builder.direct_context();
        let r = builder
            .resolve(ctx, Some(&CategoryIdentifier::id("missing")), &CategoryScope::default(), None)
            .unwrap();
        assert_eq!(r, builder.default_root());
    }

    #[test]
    fn test_cyclic_parents_terminate() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let ctx = builder.direct_context();
        let layer = ContentOverrides {
            property_categories: vec![
                PropertyCategorySpecification::new("a", "A").with_parent(CategoryIdentifier::id("b")),
                PropertyCategorySpecification::new("b", "B").with_parent(CategoryIdentifier::id("a")),
            ],
            ..ContentOverrides::default()
        };
        let r = builder
            .resolve(ctx, Some(&CategoryIdentifier::id("a")), &CategoryScope::new(vec![&layer]), None)
            .unwrap();
        assert_eq!(builder.tree().chain_labels(r), vec!["A", "B", "Selected Item(s)"]);
    }

    #[test]
    fn test_custom_ids_do_not_capture_class_categories() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let class_b = builder.class_category(None, &ClassId::new("S:B")).unwrap();

        let ctx = builder.direct_context();
        let undeclared = builder
            .resolve(ctx, Some(&CategoryIdentifier::id("S:B")), &CategoryScope::default(), None)
            .unwrap();
        assert_eq!(undeclared, builder.default_root());

        let layer = ContentOverrides {
            property_categories: vec![PropertyCategorySpecification::new("S:B", "Custom")],
            ..ContentOverrides::default()
        };
        let custom = builder
            .resolve(ctx, Some(&CategoryIdentifier::id("S:B")), &CategoryScope::new(vec![&layer]), None)
            .unwrap();
        assert_ne!(custom, class_b);
        assert_eq!(builder.tree().get(custom).unwrap().kind, CategoryKind::Custom);
        assert_eq!(builder.tree().get(class_b).unwrap().label, "Class B");
        assert_eq!(builder.class_category(None, &ClassId::new("S:B")).unwrap(), class_b);
    }

    #[test]
    fn test_related_levels() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let stack = CategoryStack::default();
        let rel = ClassId::new("S:AHasB");
        let b = ClassId::new("S:B");

        let same = builder
            .related_level(&stack, RelationshipMeaning::SameInstance, &rel, &b, false)
            .unwrap();
        assert_eq!(
            builder.tree().chain_labels(same.properties.fallback),
            vec!["Class B", "Selected Item(s)"]
        );
        assert_eq!(same.field, builder.default_root());

        let related = builder
            .related_level(&stack, RelationshipMeaning::RelatedInstance, &rel, &b, false)
            .unwrap();
        assert_eq!(builder.tree().chain_labels(related.properties.fallback), vec!["Class B"]);
        assert_eq!(related.properties.root, related.field);

        let forced = builder
            .related_level(&stack, RelationshipMeaning::RelatedInstance, &rel, &b, true)
            .unwrap();
        assert_eq!(
            builder.tree().chain_labels(forced.properties.fallback),
            vec!["Class B", "A has B"]
        );
        assert_eq!(builder.tree().chain_labels(forced.relationship.fallback), vec!["A has B"]);
    }

    #[test]
    fn test_finish_prunes_unreferenced() {
        let schema = schema();
        let mut builder = CategoryBuilder::new(&schema, &default_spec());
        let related = builder
            .related_level(
                &CategoryStack::default(),
                RelationshipMeaning::RelatedInstance,
                &ClassId::new("S:AHasB"),
                &ClassId::new("S:B"),
                true,
            )
            .unwrap();
        let unused = builder.class_category(None, &ClassId::new("S:A")).unwrap();
        assert_ne!(unused, related.field);

        let keep = HashSet::from([related.field]);
        let (tree, remap) = builder.finish(&keep);
        assert_eq!(tree.len(), 3);
        let field = remap[&related.field];
        assert_eq!(tree.chain_labels(field), vec!["Class B", "A has B"]);
        assert!(tree.lookup(CategoryKind::Class, "S:A").is_none());
        assert_eq!(tree.lookup(CategoryKind::Class, "S:AHasB/S:B"), Some(field));
        assert_eq!(tree.roots().count(), 2);
    }
}
