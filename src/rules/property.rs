//! Property, category and related-property specifications.

use serde::{Deserialize, Serialize};

use crate::expression::Expr;
use crate::path::RelationshipPathSpec;

/// Property name matching every property.
pub const ALL_PROPERTIES: &str = "*";

/// Reference to a category, resolved relative to the contextual default.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "id", rename_all = "snake_case")]
pub enum CategoryIdentifier {
    /// A [`PropertyCategorySpecification`] visible in the current scope.
    Id(String),
    /// The category `None` would produce at the same position.
    DefaultParent,
    /// The top-most category of the contextual chain.
    Root,
}

impl CategoryIdentifier {
    /// Shorthand for [`CategoryIdentifier::Id`].
    #[must_use]
    pub fn id(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }
}

/// Declares a custom property category.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyCategorySpecification {
    /// Category id, unique within one descriptor.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Sort priority.
    #[serde(default)]
    pub priority: i32,
    /// Parent category. `None` makes a top-level category.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<CategoryIdentifier>,
    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether the category starts expanded.
    #[serde(default)]
    pub auto_expand: bool,
}

impl PropertyCategorySpecification {
    /// Creates a top-level category.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            priority: 0,
            parent: None,
            description: None,
            auto_expand: false,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the parent category.
    #[must_use]
    pub fn with_parent(mut self, parent: CategoryIdentifier) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the category as expanded by default.
    #[must_use]
    pub fn auto_expanded(mut self) -> Self {
        self.auto_expand = true;
        self
    }
}

/// Overrides how one property is presented.
///
/// Each attribute left as `None` defers to lower-ranked specifications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertySpecification {
    /// Property name, or `"*"` for every property.
    pub name: String,
    /// Override priority.
    #[serde(default)]
    pub priority: i32,
    /// Replacement field label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_override: Option<String>,
    /// Category placement.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<CategoryIdentifier>,
    /// Visibility; `Some(false)` hides the property.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_displayed: Option<bool>,
}

impl PropertySpecification {
    /// Specification for one property.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            priority: 0,
            label_override: None,
            category: None,
            is_displayed: None,
        }
    }

    /// Specification matching every property.
    #[must_use]
    pub fn all() -> Self {
        Self::new(ALL_PROPERTIES)
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Sets the label override.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label_override = Some(label.into());
        self
    }

    /// Sets the category.
    #[must_use]
    pub fn with_category(mut self, category: CategoryIdentifier) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets visibility.
    #[must_use]
    pub fn displayed(mut self, displayed: bool) -> Self {
        self.is_displayed = Some(displayed);
        self
    }

    /// Returns true if this specification applies to `property`.
    #[must_use]
    pub fn matches(&self, property: &str) -> bool {
        self.name == ALL_PROPERTIES || self.name == property
    }
}

/// A field computed from an expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CalculatedPropertySpecification {
    /// Field label.
    pub label: String,
    /// Value expression.
    pub value: Expr,
    /// Field priority.
    #[serde(default)]
    pub priority: i32,
}

impl CalculatedPropertySpecification {
    /// Creates a calculated property.
    #[must_use]
    pub fn new(label: impl Into<String>, value: impl Into<Expr>) -> Self {
        Self {
            label: label.into(),
            value: value.into(),
            priority: 0,
        }
    }
}

/// How related properties are presented relative to the selected record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipMeaning {
    /// The related instance is shown as part of the selected record.
    SameInstance,
    /// The related instance is a separate thing.
    #[default]
    RelatedInstance,
}

/// Includes properties of instances reached through a relationship path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelatedPropertiesSpecification {
    /// Path from the enclosing level's class.
    pub path: RelationshipPathSpec,
    /// Related-class properties to include. Empty includes none.
    #[serde(default)]
    pub properties: Vec<PropertySpecification>,
    /// Relationship-class properties to include.
    #[serde(default)]
    pub relationship_properties: Vec<PropertySpecification>,
    /// Presentation meaning.
    #[serde(default)]
    pub meaning: RelationshipMeaning,
    /// Whether the nested field starts expanded.
    #[serde(default)]
    pub auto_expand: bool,
    /// Interpose the relationship category even without relationship properties.
    #[serde(default)]
    pub force_relationship_category: bool,
    /// Specifications followed from the related class.
    #[serde(default)]
    pub nested: Vec<RelatedPropertiesSpecification>,
}

impl RelatedPropertiesSpecification {
    /// Includes every property of the related class, as a related instance.
    #[must_use]
    pub fn new(path: impl Into<RelationshipPathSpec>) -> Self {
        Self {
            path: path.into(),
            properties: vec![PropertySpecification::all()],
            relationship_properties: Vec::new(),
            meaning: RelationshipMeaning::RelatedInstance,
            auto_expand: false,
            force_relationship_category: false,
            nested: Vec::new(),
        }
    }

    /// Replaces the related-class property selection.
    #[must_use]
    pub fn with_properties(mut self, properties: Vec<PropertySpecification>) -> Self {
        self.properties = properties;
        self
    }

    /// Sets the relationship-class property selection.
    #[must_use]
    pub fn with_relationship_properties(mut self, properties: Vec<PropertySpecification>) -> Self {
        self.relationship_properties = properties;
        self
    }

    /// Sets the meaning.
    #[must_use]
    pub fn with_meaning(mut self, meaning: RelationshipMeaning) -> Self {
        self.meaning = meaning;
        self
    }

    /// Marks the nested field as expanded by default.
    #[must_use]
    pub fn auto_expanded(mut self) -> Self {
        self.auto_expand = true;
        self
    }

    /// Forces the relationship category.
    #[must_use]
    pub fn with_relationship_category(mut self) -> Self {
        self.force_relationship_category = true;
        self
    }

    /// Appends a nested specification.
    #[must_use]
    pub fn with_nested(mut self, nested: Self) -> Self {
        self.nested.push(nested);
        self
    }
}

/// Returns true if any specification in `specs` selects `property`.
#[must_use]
pub fn selects(specs: &[PropertySpecification], property: &str) -> bool {
    specs.iter().any(|s| s.matches(property))
}
