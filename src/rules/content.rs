//! Selection specifications and content modifiers.
//!
//! Both carry the same set of presentation overrides ([`ContentOverrides`]).
//! A [`SelectionSpec`] applies to the classes it selects; a
//! [`ContentModifier`] applies polymorphically to its class wherever that
//! class shows up.

use serde::{Deserialize, Serialize};

use crate::class::ClassId;
use crate::rules::property::{
    CalculatedPropertySpecification, PropertyCategorySpecification, PropertySpecification,
    RelatedPropertiesSpecification,
};

/// Presentation overrides shared by selection specs and content modifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentOverrides {
    /// Per-property overrides.
    #[serde(default)]
    pub property_overrides: Vec<PropertySpecification>,
    /// Custom categories visible to `property_overrides`.
    #[serde(default)]
    pub property_categories: Vec<PropertyCategorySpecification>,
    /// Related properties to include.
    #[serde(default)]
    pub related_properties: Vec<RelatedPropertiesSpecification>,
    /// Calculated fields to add.
    #[serde(default)]
    pub calculated_properties: Vec<CalculatedPropertySpecification>,
}

impl ContentOverrides {
    /// Finds a category declared in this scope.
    #[must_use]
    pub fn category(&self, id: &str) -> Option<&PropertyCategorySpecification> {
        self.property_categories.iter().find(|c| c.id == id)
    }
}

/// Selects classes for a content request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionSpec {
    /// Selected classes.
    pub classes: Vec<ClassId>,
    /// Properties left out of the descriptor.
    #[serde(default)]
    pub excluded_properties: Vec<String>,
    /// Overrides scoped to this selection.
    #[serde(flatten)]
    pub content: ContentOverrides,
}

impl SelectionSpec {
    /// Selects one class.
    #[must_use]
    pub fn for_class(class: impl Into<ClassId>) -> Self {
        Self {
            classes: vec![class.into()],
            ..Self::default()
        }
    }

    /// Selects several classes.
    #[must_use]
    pub fn for_classes<I, C>(classes: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<ClassId>,
    {
        Self {
            classes: classes.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    /// Leaves `property` out.
    #[must_use]
    pub fn excluding(mut self, property: impl Into<String>) -> Self {
        self.excluded_properties.push(property.into());
        self
    }

    /// Adds a property override.
    #[must_use]
    pub fn with_property_override(mut self, spec: PropertySpecification) -> Self {
        self.content.property_overrides.push(spec);
        self
    }

    /// Declares a custom category.
    #[must_use]
    pub fn with_property_category(mut self, spec: PropertyCategorySpecification) -> Self {
        self.content.property_categories.push(spec);
        self
    }

    /// Adds related properties.
    #[must_use]
    pub fn with_related_properties(mut self, spec: RelatedPropertiesSpecification) -> Self {
        self.content.related_properties.push(spec);
        self
    }

    /// Adds a calculated field.
    #[must_use]
    pub fn with_calculated_property(mut self, spec: CalculatedPropertySpecification) -> Self {
        self.content.calculated_properties.push(spec);
        self
    }

    /// Returns true if `property` is excluded.
    #[must_use]
    pub fn excludes(&self, property: &str) -> bool {
        self.excluded_properties.iter().any(|p| p == property)
    }
}

/// Overrides applied to a class and its subclasses.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentModifier {
    /// Target class.
    pub class: ClassId,
    /// Rule priority.
    #[serde(default)]
    pub priority: i32,
    /// Overrides.
    #[serde(flatten)]
    pub content: ContentOverrides,
}

impl ContentModifier {
    /// Creates an empty modifier for `class`.
    #[must_use]
    pub fn new(class: impl Into<ClassId>) -> Self {
        Self {
            class: class.into(),
            priority: 0,
            content: ContentOverrides::default(),
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Adds a property override.
    #[must_use]
    pub fn with_property_override(mut self, spec: PropertySpecification) -> Self {
        self.content.property_overrides.push(spec);
        self
    }

    /// Declares a custom category.
    #[must_use]
    pub fn with_property_category(mut self, spec: PropertyCategorySpecification) -> Self {
        self.content.property_categories.push(spec);
        self
    }

    /// Adds related properties.
    #[must_use]
    pub fn with_related_properties(mut self, spec: RelatedPropertiesSpecification) -> Self {
        self.content.related_properties.push(spec);
        self
    }

    /// Adds a calculated field.
    #[must_use]
    pub fn with_calculated_property(mut self, spec: CalculatedPropertySpecification) -> Self {
        self.content.calculated_properties.push(spec);
        self
    }
}

/// Replaces the default root category for every request.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DefaultPropertyCategoryOverride {
    /// Rule priority.
    #[serde(default)]
    pub priority: i32,
    /// Replacement category.
    pub category: PropertyCategorySpecification,
}

impl DefaultPropertyCategoryOverride {
    /// Creates the override.
    #[must_use]
    pub fn new(category: PropertyCategorySpecification) -> Self {
        Self {
            priority: 0,
            category,
        }
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}
