//! Error types for presentation rule evaluation.
//!
//! All errors are strongly typed using thiserror. Configuration
//! inconsistencies inside a rule set (dangling category ids, malformed
//! paths) are not errors: they degrade to documented defaults. What
//! remains here are up-front validation failures and failures reported by
//! the schema, instance and expression collaborators.

use thiserror::Error;

use crate::class::{ClassId, InstanceKey};
use crate::store::StoreError;

/// Validation errors detected before any evaluation takes place.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ValidationError {
    #[error("Rule set id cannot be empty")]
    EmptyRuleSetId,

    #[error("Class name cannot be empty")]
    EmptyClassName,

    #[error("Relationship path must contain at least one step")]
    EmptyRelationshipPath,

    #[error("Invalid engine configuration: {reason}")]
    InvalidConfig {
        reason: String,
    },
}

/// Errors raised while evaluating a request against the collaborators.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum ExecutionError {
    #[error("Class not found: {class}")]
    ClassNotFound {
        class: ClassId,
    },

    #[error("Instance not found: {key}")]
    InstanceNotFound {
        key: InstanceKey,
    },

    #[error("Schema lookup failed: {message}")]
    Schema {
        message: String,
    },

    #[error("Instance query failed: {message}")]
    Query {
        message: String,
    },

    #[error("Expression evaluation failed: {message}")]
    Expression {
        message: String,
    },

    #[error("Label queue full (capacity {capacity})")]
    QueueFull {
        capacity: usize,
    },

    #[error("Failed to spawn label worker: {message}")]
    WorkerSpawn {
        message: String,
    },

    #[error("Label worker pool disconnected")]
    Disconnected,
}

impl ExecutionError {
    /// Maps a schema collaborator failure.
    #[must_use]
    pub fn from_schema(err: StoreError) -> Self {
        match err {
            StoreError::ClassNotFound(class) => Self::ClassNotFound { class },
            other => Self::Schema {
                message: other.to_string(),
            },
        }
    }

    /// Maps an instance collaborator failure.
    #[must_use]
    pub fn from_query(err: StoreError) -> Self {
        match err {
            StoreError::ClassNotFound(class) => Self::ClassNotFound { class },
            StoreError::InstanceNotFound(key) => Self::InstanceNotFound { key },
            other => Self::Query {
                message: other.to_string(),
            },
        }
    }

    /// Maps an expression evaluator failure.
    #[must_use]
    pub fn from_expression(err: StoreError) -> Self {
        match err {
            StoreError::InstanceNotFound(key) => Self::InstanceNotFound { key },
            other => Self::Expression {
                message: other.to_string(),
            },
        }
    }
}

/// Top-level error type for the crate.
#[derive(Debug, Error)]
#[allow(missing_docs)]
pub enum PresentationError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },
}

impl PresentationError {
    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Maps a schema collaborator failure into a request-level error.
    #[must_use]
    pub fn schema(err: StoreError) -> Self {
        Self::Execution(ExecutionError::from_schema(err))
    }

    /// Maps an instance collaborator failure into a request-level error.
    #[must_use]
    pub fn query(err: StoreError) -> Self {
        Self::Execution(ExecutionError::from_query(err))
    }

    /// Maps an expression evaluator failure into a request-level error.
    #[must_use]
    pub fn expression(err: StoreError) -> Self {
        Self::Execution(ExecutionError::from_expression(err))
    }

    /// Returns true if this is a validation error.
    #[must_use]
    pub const fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }

    /// Returns true if this is an execution error.
    #[must_use]
    pub const fn is_execution(&self) -> bool {
        matches!(self, Self::Execution(_))
    }

    /// Returns true if this is an internal error.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Internal { .. })
    }

    /// Returns true if a collaborator (schema, query or expression layer) failed.
    #[must_use]
    pub const fn is_collaborator_failure(&self) -> bool {
        matches!(
            self,
            Self::Execution(
                ExecutionError::ClassNotFound { .. }
                    | ExecutionError::InstanceNotFound { .. }
                    | ExecutionError::Schema { .. }
                    | ExecutionError::Query { .. }
                    | ExecutionError::Expression { .. }
            )
        )
    }
}

/// Result type alias for presentation operations.
pub type PresentationResult<T> = Result<T, PresentationError>;
