//! Class and instance identity.
//!
//! Classes are owned by the external schema store; the engine only ever
//! holds their names. Instances are addressed by an [`InstanceKey`], the
//! pair of the most-derived class and a 64-bit instance id.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Number of low bits of an [`InstanceId`] holding the local id.
const LOCAL_ID_BITS: u32 = 40;

/// Full name of a schema class, e.g. `"BisCore:Element"`.
///
/// # Examples
///
/// ```
/// use presentation_rules::ClassId;
///
/// let class = ClassId::new("BisCore:Element");
/// assert_eq!(class.short_name(), "Element");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClassId(String);

impl ClassId {
    /// Creates a class id from its full name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Returns the full class name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the class name without its schema prefix.
    #[must_use]
    pub fn short_name(&self) -> &str {
        self.0
            .rsplit(|c: char| c == ':' || c == '.')
            .next()
            .unwrap_or(self.0.as_str())
    }

    /// Returns true if the name is blank.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ClassId {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ClassId {
    fn from(name: String) -> Self {
        Self(name)
    }
}

/// 64-bit instance identifier.
///
/// The high 24 bits carry the briefcase (replica) id, the low 40 bits the
/// id local to that briefcase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    /// Creates an instance id from its raw value.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Composes an id from briefcase and local parts.
    #[must_use]
    pub const fn from_parts(briefcase: u64, local: u64) -> Self {
        Self((briefcase << LOCAL_ID_BITS) | (local & ((1 << LOCAL_ID_BITS) - 1)))
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn raw(self) -> u64 {
        self.0
    }

    /// Returns the briefcase part of the id.
    #[must_use]
    pub const fn briefcase_id(self) -> u64 {
        self.0 >> LOCAL_ID_BITS
    }

    /// Returns the briefcase-local part of the id.
    #[must_use]
    pub const fn local_id(self) -> u64 {
        self.0 & ((1 << LOCAL_ID_BITS) - 1)
    }

    /// Short opaque rendering used by default labels: `<briefcase36>-<local36>`.
    #[must_use]
    pub fn short_form(self) -> String {
        format!("{}-{}", to_base36(self.briefcase_id()), to_base36(self.local_id()))
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:x}", self.0)
    }
}

/// Renders a number in upper-case base 36.
#[must_use]
pub fn to_base36(mut value: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        // value % 36 < 36
        #[allow(clippy::cast_possible_truncation)]
        out.push(DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

/// Key of one instance: its most-derived class and its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct InstanceKey {
    /// Most-derived class of the instance.
    pub class: ClassId,
    /// Instance id.
    pub id: InstanceId,
}

impl InstanceKey {
    /// Creates a key.
    #[must_use]
    pub fn new(class: impl Into<ClassId>, id: u64) -> Self {
        Self {
            class: class.into(),
            id: InstanceId::new(id),
        }
    }
}

impl fmt::Display for InstanceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.class, self.id)
    }
}

/// Coarse type tag of a declared property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyType {
    /// String, number, boolean or date scalar.
    Primitive,
    /// 2D coordinate.
    Point2d,
    /// 3D coordinate.
    Point3d,
    /// Reference to another instance.
    Navigation,
    /// Array of values.
    Array,
    /// Structured value.
    Struct,
}

impl PropertyType {
    /// Returns true for types that can be rendered as a single label string.
    #[must_use]
    pub const fn is_primitive(self) -> bool {
        !matches!(self, Self::Array | Self::Struct)
    }
}

/// A property as declared by the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyInfo {
    /// Property name.
    pub name: String,
    /// Display label; the name is used when absent.
    pub label: Option<String>,
    /// Type tag.
    pub property_type: PropertyType,
    /// Id of the schema-declared property category, if any.
    pub category: Option<String>,
    /// Class that declares the property.
    pub declaring_class: ClassId,
}

impl PropertyInfo {
    /// Creates a primitive property without label or category.
    #[must_use]
    pub fn new(declaring_class: impl Into<ClassId>, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
            property_type: PropertyType::Primitive,
            category: None,
            declaring_class: declaring_class.into(),
        }
    }

    /// Sets the type tag.
    #[must_use]
    pub fn with_type(mut self, property_type: PropertyType) -> Self {
        self.property_type = property_type;
        self
    }

    /// Sets the schema-declared category id.
    #[must_use]
    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Sets the display label.
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label shown for the property when no override applies.
    #[must_use]
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

/// A property category declared in the schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCategory {
    /// Category id.
    pub id: String,
    /// Display label.
    pub label: String,
    /// Sort priority.
    pub priority: i32,
}

impl SchemaCategory {
    /// Creates a schema category.
    #[must_use]
    pub fn new(id: impl Into<String>, label: impl Into<String>, priority: i32) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            priority,
        }
    }
}
