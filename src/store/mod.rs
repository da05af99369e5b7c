//! Collaborator interfaces for the engine.
//!
//! The schema store, the relationship/query executor and the expression
//! evaluator are external. This module defines their traits and ships
//! in-memory implementations.

mod memory;
mod traits;

pub use memory::{ClassDefinition, InMemoryInstanceStore, InMemorySchemaStore};
pub use traits::{
    ExpressionContext, ExpressionEvaluator, InstanceStore, RelatedInstance, SchemaStore, StoreError,
};
