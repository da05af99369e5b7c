//! Presentation rules.
//!
//! Rules are plain tagged values. They are not attached to class objects;
//! the [`crate::index::RuleIndex`] keys them by target class instead.

mod content;
mod label;
mod property;

use serde::{Deserialize, Serialize};

use crate::class::ClassId;
use crate::error::ValidationError;

pub use content::{ContentModifier, ContentOverrides, DefaultPropertyCategoryOverride, SelectionSpec};
pub use label::{CompositePart, InstanceLabelOverride, LabelOverride, LabelValueSpec};
pub use property::{
    selects, CalculatedPropertySpecification, CategoryIdentifier, PropertyCategorySpecification,
    PropertySpecification, RelatedPropertiesSpecification, RelationshipMeaning, ALL_PROPERTIES,
};

/// Kind of a rule, used to query the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleKind {
    /// [`LabelOverride`].
    LabelOverride,
    /// [`InstanceLabelOverride`].
    InstanceLabelOverride,
    /// [`DefaultPropertyCategoryOverride`].
    DefaultPropertyCategoryOverride,
    /// [`ContentModifier`].
    ContentModifier,
}

/// A presentation rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Rule {
    /// Expression label for any record whose condition holds.
    LabelOverride(LabelOverride),
    /// Ordered label value specs for records of a class.
    InstanceLabelOverride(InstanceLabelOverride),
    /// Replaces the default root category.
    DefaultPropertyCategoryOverride(DefaultPropertyCategoryOverride),
    /// Content overrides for records of a class.
    ContentModifier(ContentModifier),
}

impl Rule {
    /// Returns the rule kind.
    #[must_use]
    pub const fn kind(&self) -> RuleKind {
        match self {
            Self::LabelOverride(_) => RuleKind::LabelOverride,
            Self::InstanceLabelOverride(_) => RuleKind::InstanceLabelOverride,
            Self::DefaultPropertyCategoryOverride(_) => RuleKind::DefaultPropertyCategoryOverride,
            Self::ContentModifier(_) => RuleKind::ContentModifier,
        }
    }

    /// Returns the rule priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        match self {
            Self::LabelOverride(r) => r.priority,
            Self::InstanceLabelOverride(r) => r.priority,
            Self::DefaultPropertyCategoryOverride(r) => r.priority,
            Self::ContentModifier(r) => r.priority,
        }
    }

    /// Classes the rule is bound to. Empty for class-less rules.
    #[must_use]
    pub fn target_classes(&self) -> &[ClassId] {
        match self {
            Self::InstanceLabelOverride(r) => &r.class_names,
            Self::ContentModifier(r) => std::slice::from_ref(&r.class),
            Self::LabelOverride(_) | Self::DefaultPropertyCategoryOverride(_) => &[],
        }
    }

    /// Returns true if the rule applies to any class.
    #[must_use]
    pub const fn is_class_less(&self) -> bool {
        matches!(
            self,
            Self::LabelOverride(_) | Self::DefaultPropertyCategoryOverride(_)
        )
    }
}

impl From<LabelOverride> for Rule {
    fn from(rule: LabelOverride) -> Self {
        Self::LabelOverride(rule)
    }
}

impl From<InstanceLabelOverride> for Rule {
    fn from(rule: InstanceLabelOverride) -> Self {
        Self::InstanceLabelOverride(rule)
    }
}

impl From<DefaultPropertyCategoryOverride> for Rule {
    fn from(rule: DefaultPropertyCategoryOverride) -> Self {
        Self::DefaultPropertyCategoryOverride(rule)
    }
}

impl From<ContentModifier> for Rule {
    fn from(rule: ContentModifier) -> Self {
        Self::ContentModifier(rule)
    }
}

/// An identified, ordered collection of rules.
///
/// Declaration order is significant: it breaks ties the index cannot
/// break by specificity or priority.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RuleSet {
    id: String,
    #[serde(default)]
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            rules: Vec::new(),
        }
    }

    /// Appends a rule.
    #[must_use]
    pub fn with_rule(mut self, rule: impl Into<Rule>) -> Self {
        self.rules.push(rule.into());
        self
    }

    /// Rule set id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Rules in declaration order.
    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Checks the rule set for values no rule can work with.
    ///
    /// # Errors
    ///
    /// Returns an error for a blank id or a blank target class name.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyRuleSetId);
        }
        if self
            .rules
            .iter()
            .flat_map(Rule::target_classes)
            .any(ClassId::is_empty)
        {
            return Err(ValidationError::EmptyClassName);
        }
        Ok(())
    }
}
