//! Field tree.
//!
//! Fields are stored in a flat arena. Top-level fields have no parent;
//! children of a nested content field are the fields of the related level.
//! Siblings with the same merge key and category are one field: inserting a
//! duplicate unions its contributing classes into the existing node.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::Serialize;

use crate::class::{ClassId, PropertyType};
use crate::descriptor::category::CategoryRef;
use crate::expression::Expr;
use crate::path::RelationshipPath;
use crate::rules::RelationshipMeaning;

/// Name of the display-label field.
pub const DISPLAY_LABEL_FIELD_NAME: &str = "/DisplayLabel/";

/// Index of a field in its descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldRef(usize);

impl FieldRef {
    /// Arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Instance a property field reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertySource {
    /// The record, or the related instance inside a nested field.
    Instance,
    /// The relationship instance that links a related instance.
    Relationship,
}

/// What a field shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldKind {
    /// A schema property.
    Property {
        /// Property name.
        property: String,
        /// Declared type.
        property_type: PropertyType,
        /// Instance the value is read from.
        source: PropertySource,
    },
    /// A value computed by an expression.
    Calculated {
        /// Value expression.
        expr: Expr,
        /// Declared priority.
        priority: i32,
    },
    /// Properties of instances reached through a relationship path.
    Nested {
        /// Path from the parent level's instance.
        path: RelationshipPath,
        /// Class of the related instances.
        related_class: ClassId,
        /// How related instances relate to the parent level.
        meaning: RelationshipMeaning,
        /// Whether the block starts expanded.
        auto_expand: bool,
    },
    /// The record's display label.
    DisplayLabel,
}

#[derive(Debug, PartialEq, Eq)]
enum MergeKey<'a> {
    Property(&'a str, PropertySource),
    Calculated(&'a str, &'a Expr),
    Nested(&'a RelationshipPath),
    DisplayLabel,
}

/// One output field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Field {
    /// Unique name within the descriptor.
    pub name: String,
    /// Display label.
    pub label: String,
    /// Category the field is shown under.
    pub category: CategoryRef,
    /// Classes that contributed the field.
    pub classes: BTreeSet<ClassId>,
    /// Enclosing nested field.
    pub parent: Option<FieldRef>,
    /// Fields of the related level, for nested fields.
    pub children: Vec<FieldRef>,
    /// Field payload.
    pub kind: FieldKind,
}

impl Field {
    /// Creates a detached field. `name` is the base name before
    /// uniqueness suffixes are applied.
    #[must_use]
    pub fn new(name: impl Into<String>, label: impl Into<String>, category: CategoryRef, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            label: label.into(),
            category,
            classes: BTreeSet::new(),
            parent: None,
            children: Vec::new(),
            kind,
        }
    }

    /// Adds a contributing class.
    #[must_use]
    pub fn with_class(mut self, class: ClassId) -> Self {
        self.classes.insert(class);
        self
    }

    /// Property name, for property fields.
    #[must_use]
    pub fn property_name(&self) -> Option<&str> {
        match &self.kind {
            FieldKind::Property { property, .. } => Some(property),
            _ => None,
        }
    }

    /// Returns true for nested content fields.
    #[must_use]
    pub const fn is_nested(&self) -> bool {
        matches!(self.kind, FieldKind::Nested { .. })
    }

    fn merge_key(&self) -> MergeKey<'_> {
        match &self.kind {
            FieldKind::Property { property, source, .. } => MergeKey::Property(property, *source),
            FieldKind::Calculated { expr, .. } => MergeKey::Calculated(&self.label, expr),
            FieldKind::Nested { path, .. } => MergeKey::Nested(path),
            FieldKind::DisplayLabel => MergeKey::DisplayLabel,
        }
    }
}

/// Arena of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FieldTree {
    nodes: Vec<Field>,
    roots: Vec<FieldRef>,
}

impl FieldTree {
    /// Returns the field at `r`.
    #[must_use]
    pub fn get(&self, r: FieldRef) -> Option<&Field> {
        self.nodes.get(r.0)
    }

    /// Number of fields, nested ones included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if there are no fields.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Top-level fields in descriptor order.
    #[must_use]
    pub fn roots(&self) -> &[FieldRef] {
        &self.roots
    }

    /// Children of `r`, or the top-level fields when `r` is `None`.
    #[must_use]
    pub fn children(&self, r: Option<FieldRef>) -> &[FieldRef] {
        match r.and_then(|r| self.get(r)) {
            Some(field) => &field.children,
            None if r.is_none() => &self.roots,
            None => &[],
        }
    }

    /// All fields in arena order.
    pub fn iter(&self) -> impl Iterator<Item = (FieldRef, &Field)> {
        self.nodes.iter().enumerate().map(|(i, f)| (FieldRef(i), f))
    }

    /// Finds a field by its unique name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<FieldRef> {
        self.iter().find(|(_, f)| f.name == name).map(|(r, _)| r)
    }

    /// Top-level property fields for `property`, in descriptor order.
    #[must_use]
    pub fn property_fields(&self, property: &str) -> Vec<FieldRef> {
        self.roots
            .iter()
            .copied()
            .filter(|r| self.get(*r).and_then(Field::property_name) == Some(property))
            .collect()
    }

    /// Inserts `field` under `parent`, merging it into a sibling with the
    /// same merge key and category.
    pub fn merge_or_insert(&mut self, parent: Option<FieldRef>, mut field: Field) -> FieldRef {
        let existing = self
            .children(parent)
            .iter()
            .copied()
            .find(|r| {
                self.get(*r)
                    .is_some_and(|f| f.category == field.category && f.merge_key() == field.merge_key())
            });
        if let Some(r) = existing {
            let classes = std::mem::take(&mut field.classes);
            self.nodes[r.0].classes.extend(classes);
            return r;
        }

        let r = FieldRef(self.nodes.len());
        field.parent = parent;
        field.children.clear();
        self.nodes.push(field);
        match parent {
            Some(p) => self.nodes[p.0].children.push(r),
            None => self.roots.push(r),
        }
        r
    }

    /// Categories referenced by any field.
    #[must_use]
    pub fn referenced_categories(&self) -> HashSet<CategoryRef> {
        self.nodes.iter().map(|f| f.category).collect()
    }

    /// Rewrites category references after the category tree was compacted.
    pub fn remap_categories(&mut self, remap: &HashMap<CategoryRef, CategoryRef>) {
        for field in &mut self.nodes {
            if let Some(&to) = remap.get(&field.category) {
                field.category = to;
            }
        }
    }

    /// Makes names unique, depth-first in descriptor order. The first
    /// field keeps its base name; later ones get `_2`, `_3`, ...
    pub fn assign_unique_names(&mut self) {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack: Vec<FieldRef> = self.roots.iter().rev().copied().collect();
        while let Some(r) = stack.pop() {
            order.push(r);
            stack.extend(self.nodes[r.0].children.iter().rev().copied());
        }

        let mut taken = HashSet::new();
        for r in order {
            let base = self.nodes[r.0].name.clone();
            let mut name = base.clone();
            let mut suffix = 1;
            while !taken.insert(name.clone()) {
                suffix += 1;
                name = format!("{base}_{suffix}");
            }
            self.nodes[r.0].name = name;
        }
    }
}
