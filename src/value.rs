//! Property values and display labels.
//!
//! [`Value`] is what the instance store hands back for a property read.
//! [`LabelValue`] is the resolved display label of one record or a merged
//! group of records.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::class::InstanceKey;

/// Label used when no text could be resolved.
pub const NOT_SPECIFIED_LABEL: &str = "Not specified";

/// Label used when merged records resolve to different labels.
pub const MULTIPLE_INSTANCES_LABEL: &str = "Multiple instances";

/// A 2D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point2d {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

/// A 3D coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point3d {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
    /// Z coordinate.
    pub z: f64,
}

/// A property value read from an instance.
///
/// # Examples
///
/// ```
/// use presentation_rules::{Point3d, Value};
///
/// let point = Value::Point3d(Point3d { x: 1.0, y: 2.0, z: 3.0 });
/// assert_eq!(point.display_string(), "X: 1.00; Y: 2.00; Z: 3.00");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Value {
    /// Boolean.
    Bool(bool),
    /// Integer.
    Int(i64),
    /// Double.
    Float(f64),
    /// Text.
    String(String),
    /// 2D point, rendered with two decimals per coordinate.
    Point2d(Point2d),
    /// 3D point, rendered with two decimals per coordinate.
    Point3d(Point3d),
    /// Reference to another record; labeled with that record's label.
    Navigation(InstanceKey),
    /// Array of values.
    Array(Vec<Value>),
    /// Struct members by name.
    Struct(BTreeMap<String, Value>),
    /// No value.
    Null,
}

impl Value {
    /// Returns true for [`Value::Null`].
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns true for values that can stand as a label on their own.
    #[must_use]
    pub const fn is_primitive(&self) -> bool {
        !matches!(self, Self::Array(_) | Self::Struct(_) | Self::Null)
    }

    /// The boolean, if this is [`Value::Bool`].
    #[must_use]
    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// The text, if this is [`Value::String`].
    #[must_use]
    pub fn as_string(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }

    /// Target of a navigation value.
    #[must_use]
    pub const fn as_navigation(&self) -> Option<&InstanceKey> {
        match self {
            Self::Navigation(key) => Some(key),
            _ => None,
        }
    }

    /// Returns a human-readable type name.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "double",
            Self::String(_) => "string",
            Self::Point2d(_) => "point2d",
            Self::Point3d(_) => "point3d",
            Self::Navigation(_) => "navigation",
            Self::Array(_) => "array",
            Self::Struct(_) => "struct",
            Self::Null => "null",
        }
    }

    /// Renders the value for display.
    ///
    /// Points use two decimals per axis. Null renders as the empty string.
    #[must_use]
    pub fn display_string(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) => v.to_string(),
            Self::String(v) => v.clone(),
            Self::Point2d(p) => format!("X: {:.2}; Y: {:.2}", p.x, p.y),
            Self::Point3d(p) => format!("X: {:.2}; Y: {:.2}; Z: {:.2}", p.x, p.y, p.z),
            Self::Navigation(key) => key.to_string(),
            Self::Array(_) | Self::Struct(_) => serde_json::to_string(self).unwrap_or_default(),
            Self::Null => String::new(),
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Self::Null
    }
}

impl std::fmt::Display for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_string())
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<InstanceKey> for Value {
    fn from(v: InstanceKey) -> Self {
        Self::Navigation(v)
    }
}

/// Resolved display label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelValue {
    /// Text shown to the user.
    pub display_value: String,
    /// Value the text was rendered from.
    pub raw_value: Value,
    /// Type tag of the raw value.
    pub type_name: String,
}

impl LabelValue {
    /// Creates a string label.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            display_value: text.clone(),
            raw_value: Value::String(text),
            type_name: "string".to_string(),
        }
    }

    /// Creates a label from a primitive value.
    ///
    /// Returns `None` when the value is null, non-primitive, or renders empty.
    #[must_use]
    pub fn from_value(value: Value) -> Option<Self> {
        if !value.is_primitive() {
            return None;
        }
        let display_value = value.display_string();
        if display_value.is_empty() {
            return None;
        }
        Some(Self {
            display_value,
            type_name: value.type_name().to_string(),
            raw_value: value,
        })
    }

    /// The "Not specified" label.
    #[must_use]
    pub fn not_specified() -> Self {
        Self::text(NOT_SPECIFIED_LABEL)
    }

    /// The "Multiple instances" label.
    #[must_use]
    pub fn multiple_instances() -> Self {
        Self::text(MULTIPLE_INSTANCES_LABEL)
    }

    /// Returns true if the label text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.display_value.is_empty()
    }
}

impl std::fmt::Display for LabelValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.display_value)
    }
}
