//! Abstract collaborator traits.
//!
//! The engine never owns schema or instance data. These traits define the
//! contract the schema store, the relationship/query executor and the
//! expression evaluator must satisfy:
//! - In-memory implementations for tests and embedded use
//! - Adapters over a real repository for production

use thiserror::Error;

use crate::class::{ClassId, InstanceKey, PropertyInfo, SchemaCategory};
use crate::expression::Expr;
use crate::path::{RelationshipDirection, RelationshipPath};
use crate::value::Value;

/// Errors reported by collaborators.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Class is unknown to the schema.
    #[error("Class not found: {0}")]
    ClassNotFound(ClassId),

    /// Instance is unknown to the store.
    #[error("Instance not found: {0}")]
    InstanceNotFound(InstanceKey),

    /// Expression could not be evaluated.
    #[error("Expression error: {0}")]
    Expression(String),

    /// Backend error.
    #[error("Backend error: {0}")]
    Backend(String),
}

/// Read-only view of the class hierarchy.
pub trait SchemaStore: Send + Sync {
    /// Direct base classes, in declaration order.
    fn base_classes(&self, class: &ClassId) -> Result<Vec<ClassId>, StoreError>;

    /// Returns true if `derived` equals `base` or inherits from it.
    fn is_subclass_of(&self, derived: &ClassId, base: &ClassId) -> Result<bool, StoreError>;

    /// Display label of the class.
    fn display_label(&self, class: &ClassId) -> Result<String, StoreError>;

    /// All properties of the class, inherited ones included, in declaration order.
    fn declared_properties(&self, class: &ClassId) -> Result<Vec<PropertyInfo>, StoreError>;

    /// Looks up a schema-declared property category.
    fn property_category(&self, id: &str) -> Result<Option<SchemaCategory>, StoreError>;

    /// Class reached by following `relationship` in `direction`.
    ///
    /// Forward yields the target constraint, backward the source constraint.
    fn relationship_target(
        &self,
        relationship: &ClassId,
        direction: RelationshipDirection,
    ) -> Result<Option<ClassId>, StoreError>;
}

/// An instance reached through a relationship path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RelatedInstance {
    /// The related instance.
    pub target: InstanceKey,
    /// Relationship instance of the last step, when the relationship carries properties.
    pub relationship: Option<InstanceKey>,
}

/// Read-only access to instance data.
pub trait InstanceStore: Send + Sync {
    /// Reads one property. Unset properties read as [`Value::Null`].
    fn read_property(&self, instance: &InstanceKey, name: &str) -> Result<Value, StoreError>;

    /// Follows `path` from `from` and returns the distinct related instances.
    fn resolve_related(
        &self,
        path: &RelationshipPath,
        from: &InstanceKey,
    ) -> Result<Vec<RelatedInstance>, StoreError>;
}

/// Evaluation context handed to the expression evaluator.
#[derive(Clone, Copy)]
pub struct ExpressionContext<'a> {
    /// Record the expression is evaluated against.
    pub instance: &'a InstanceKey,
    /// Schema access.
    pub schema: &'a dyn SchemaStore,
    /// Instance access.
    pub instances: &'a dyn InstanceStore,
}

/// Evaluates legacy condition and value expressions.
pub trait ExpressionEvaluator: Send + Sync {
    /// Evaluates `expr` against the context's record.
    fn evaluate(&self, expr: &Expr, ctx: &ExpressionContext<'_>) -> Result<Value, StoreError>;
}
