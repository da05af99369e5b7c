//! Label rules.

use serde::{Deserialize, Serialize};

use crate::class::ClassId;
use crate::expression::Expr;
use crate::path::RelationshipPathSpec;

/// One way of producing label text for a record.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LabelValueSpec {
    /// Value of a property of the record, or of the first instance reached by `path`.
    Property {
        /// Property name.
        name: String,
        /// Path to a related instance.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        path: Option<RelationshipPathSpec>,
    },
    /// Fixed text.
    StringLiteral {
        /// The text.
        text: String,
    },
    /// Display label of the record's class.
    ClassLabel,
    /// Briefcase part of the record id, base 36.
    BriefcaseId,
    /// Local part of the record id, base 36.
    LocalId,
    /// Several parts joined by `separator`.
    Composite {
        /// Parts in order.
        parts: Vec<CompositePart>,
        /// Separator placed between non-empty parts.
        #[serde(default = "default_separator")]
        separator: String,
    },
}

fn default_separator() -> String {
    " ".to_string()
}

impl LabelValueSpec {
    /// Property of the record itself.
    #[must_use]
    pub fn property(name: impl Into<String>) -> Self {
        Self::Property {
            name: name.into(),
            path: None,
        }
    }

    /// Property of a related instance.
    #[must_use]
    pub fn related_property(path: impl Into<RelationshipPathSpec>, name: impl Into<String>) -> Self {
        Self::Property {
            name: name.into(),
            path: Some(path.into()),
        }
    }

    /// Fixed text.
    #[must_use]
    pub fn literal(text: impl Into<String>) -> Self {
        Self::StringLiteral { text: text.into() }
    }

    /// Composite of `parts` joined by `separator`.
    #[must_use]
    pub fn composite(parts: Vec<CompositePart>, separator: impl Into<String>) -> Self {
        Self::Composite {
            parts,
            separator: separator.into(),
        }
    }
}

/// One part of a composite label value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompositePart {
    /// The part's value.
    pub spec: LabelValueSpec,
    /// Omit the part when empty instead of emptying the whole composite.
    #[serde(default)]
    pub skip_if_empty: bool,
}

impl CompositePart {
    /// A part whose emptiness empties the composite.
    #[must_use]
    pub fn required(spec: LabelValueSpec) -> Self {
        Self {
            spec,
            skip_if_empty: false,
        }
    }

    /// A part that is dropped when empty.
    #[must_use]
    pub fn optional(spec: LabelValueSpec) -> Self {
        Self {
            spec,
            skip_if_empty: true,
        }
    }
}

/// Label from a conditional expression.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LabelOverride {
    /// Condition; empty matches every record.
    #[serde(default)]
    pub condition: Expr,
    /// Rule priority.
    #[serde(default)]
    pub priority: i32,
    /// Label expression.
    pub value: Expr,
}

impl LabelOverride {
    /// Unconditional override.
    #[must_use]
    pub fn new(value: impl Into<Expr>) -> Self {
        Self {
            condition: Expr::default(),
            priority: 0,
            value: value.into(),
        }
    }

    /// Sets the condition.
    #[must_use]
    pub fn with_condition(mut self, condition: impl Into<Expr>) -> Self {
        self.condition = condition.into();
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Label from an ordered list of value specifications, bound to classes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceLabelOverride {
    /// Rule priority.
    #[serde(default)]
    pub priority: i32,
    /// Restrict path-less property values to properties of `class_names`.
    #[serde(default)]
    pub only_if_owned_by_given_class: bool,
    /// Classes the rule applies to, polymorphically.
    pub class_names: Vec<ClassId>,
    /// Value specifications tried in order.
    pub values: Vec<LabelValueSpec>,
}

impl InstanceLabelOverride {
    /// Creates an override for `class`.
    #[must_use]
    pub fn new(class: impl Into<ClassId>, values: Vec<LabelValueSpec>) -> Self {
        Self {
            priority: 0,
            only_if_owned_by_given_class: false,
            class_names: vec![class.into()],
            values,
        }
    }

    /// Adds another target class.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<ClassId>) -> Self {
        self.class_names.push(class.into());
        self
    }

    /// Sets the priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Restricts property values to the rule's own classes.
    #[must_use]
    pub fn owned_by_given_class(mut self) -> Self {
        self.only_if_owned_by_given_class = true;
        self
    }
}
