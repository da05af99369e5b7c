//! # presentation-rules - Rule-driven presentation of relationship-graph data
//!
//! Given a schema of classes and relationships, a store of records and a set
//! of presentation rules, this crate decides what a user sees: which
//! properties appear as fields, how they are grouped into categories, what
//! each field is labeled and how each record is titled.
//!
//! ## Core Concepts
//!
//! - **Rule set**: Identified collection of presentation rules
//! - **Content descriptor**: Category tree plus field tree for one request shape
//! - **Category**: Nested group of fields with label, priority and parent
//! - **Display label**: Title of a record, composed from label rules or fallbacks
//! - **Override scope**: Layer a property rule came from; nearer scopes win ties
//!
//! ## Usage
//!
//! ```rust,ignore
//! use presentation_rules::{
//!     DescriptorRequest, InstanceLabelOverride, LabelValueSpec, PresentationEngine, RuleSet,
//!     SelectionSpec,
//! };
//!
//! let rules = RuleSet::new("my-rules")
//!     .with_rule(InstanceLabelOverride::new("Schema:Element", vec![LabelValueSpec::property("CodeValue")]));
//! let engine = PresentationEngine::new(schema, instances, evaluator, rules)?;
//!
//! let descriptor = engine.descriptor(&DescriptorRequest::new(vec![SelectionSpec::for_class("Schema:Element")]))?;
//! let label = engine.display_label(&key)?;
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

// Core types
pub mod class;
pub mod config;
pub mod error;
pub mod expression;
pub mod path;
pub mod value;

// Rules and collaborators
pub mod index;
pub mod resolver;
pub mod rules;
pub mod store;

// Builders and engine
pub mod content;
pub mod descriptor;
pub mod engine;
pub mod label;

// Re-export primary types at crate root for convenience
pub use class::{ClassId, InstanceId, InstanceKey, PropertyInfo, PropertyType, SchemaCategory};
pub use config::EngineConfig;
pub use content::{ContentBuilder, ContentFlags, ContentSetItem, FieldValue, NestedItem};
pub use descriptor::{
    Category, CategoryKind, CategoryRef, CategoryTree, ContentDescriptor, Field, FieldBuilder, FieldKind, FieldRef, FieldTree,
};
pub use engine::{Content, ContentRequest, DescriptorRequest, PresentationEngine};
pub use error::{ExecutionError, PresentationError, PresentationResult, ValidationError};
pub use expression::{Expr, SimpleExpressionEvaluator};
pub use index::{MatchedRule, RuleIndex};
pub use label::{LabelComposer, LabelMerger, LabelPool, LabelResolver};
pub use path::{PathWalker, RelationshipDirection, RelationshipPath, RelationshipPathSpec, RelationshipStep};
pub use resolver::{OverrideScope, ResolvedProperty};
pub use rules::{
    CalculatedPropertySpecification, CategoryIdentifier, CompositePart, ContentModifier, ContentOverrides,
    DefaultPropertyCategoryOverride, InstanceLabelOverride, LabelOverride, LabelValueSpec,
    PropertyCategorySpecification, PropertySpecification, RelatedPropertiesSpecification, RelationshipMeaning, Rule,
    RuleKind, RuleSet, SelectionSpec,
};
pub use store::{
    ClassDefinition, ExpressionEvaluator, InMemoryInstanceStore, InMemorySchemaStore, InstanceStore, SchemaStore,
    StoreError,
};
pub use value::{LabelValue, Point2d, Point3d, Value};
