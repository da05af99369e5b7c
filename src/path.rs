//! Relationship paths.
//!
//! Rules may spell a path as a single step or as a list of steps. Both
//! forms normalize into a canonical, non-empty [`RelationshipPath`] that
//! the rest of the engine works with. [`PathWalker`] is the thin layer
//! that follows a path through the instance store.

use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use crate::class::{ClassId, InstanceKey};
use crate::error::{PresentationError, PresentationResult, ValidationError};
use crate::store::{InstanceStore, RelatedInstance, SchemaStore, StoreError};

/// Direction a relationship is followed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipDirection {
    /// From source to target.
    Forward,
    /// From target to source.
    Backward,
}

/// One step of a relationship path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RelationshipStep {
    /// Relationship class followed.
    pub relationship: ClassId,
    /// Direction it is followed in.
    pub direction: RelationshipDirection,
    /// Optional constraint on the class reached.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_class: Option<ClassId>,
}

impl RelationshipStep {
    /// Step following `relationship` from source to target.
    #[must_use]
    pub fn forward(relationship: impl Into<ClassId>) -> Self {
        Self {
            relationship: relationship.into(),
            direction: RelationshipDirection::Forward,
            target_class: None,
        }
    }

    /// Step following `relationship` from target to source.
    #[must_use]
    pub fn backward(relationship: impl Into<ClassId>) -> Self {
        Self {
            relationship: relationship.into(),
            direction: RelationshipDirection::Backward,
            target_class: None,
        }
    }

    /// Restricts the class reached by this step.
    #[must_use]
    pub fn with_target_class(mut self, class: impl Into<ClassId>) -> Self {
        self.target_class = Some(class.into());
        self
    }
}

/// Canonical, non-empty relationship path.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct RelationshipPath {
    steps: Vec<RelationshipStep>,
}

impl RelationshipPath {
    /// Creates a path. Fails if `steps` is empty or names a blank relationship.
    pub fn new(steps: Vec<RelationshipStep>) -> Result<Self, ValidationError> {
        if steps.is_empty() {
            return Err(ValidationError::EmptyRelationshipPath);
        }
        if steps.iter().any(|s| s.relationship.is_empty()) {
            return Err(ValidationError::EmptyClassName);
        }
        Ok(Self { steps })
    }

    /// Steps in traversal order.
    #[must_use]
    pub fn steps(&self) -> &[RelationshipStep] {
        &self.steps
    }

    /// Number of steps.
    #[must_use]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Always false: paths are never empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// The final step.
    #[must_use]
    pub fn last_step(&self) -> &RelationshipStep {
        &self.steps[self.steps.len() - 1]
    }

    /// Path made of `self` followed by `tail`.
    #[must_use]
    pub fn joined(&self, tail: &Self) -> Self {
        let mut steps = self.steps.clone();
        steps.extend(tail.steps.iter().cloned());
        Self { steps }
    }

    /// Class of the instances reached at the end of the path.
    ///
    /// Uses the last step's constraint, else asks the schema for the
    /// relationship endpoint.
    pub fn target_class(&self, schema: &dyn SchemaStore) -> Result<Option<ClassId>, StoreError> {
        let last = self.last_step();
        match &last.target_class {
            Some(class) => Ok(Some(class.clone())),
            None => schema.relationship_target(&last.relationship, last.direction),
        }
    }
}

/// A path as written in a rule: a single step or a list of steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RelationshipPathSpec {
    /// One step.
    Step(RelationshipStep),
    /// Several steps.
    Steps(Vec<RelationshipStep>),
}

impl RelationshipPathSpec {
    /// Normalizes into a canonical path.
    ///
    /// A malformed spec yields `None` and a warning; callers treat it as a
    /// path reaching no instances.
    #[must_use]
    pub fn normalize(&self) -> Option<RelationshipPath> {
        let steps = match self {
            Self::Step(step) => vec![step.clone()],
            Self::Steps(steps) => steps.clone(),
        };
        match RelationshipPath::new(steps) {
            Ok(path) => Some(path),
            Err(err) => {
                warn!(error = %err, "ignoring malformed relationship path");
                None
            }
        }
    }
}

impl From<RelationshipStep> for RelationshipPathSpec {
    fn from(step: RelationshipStep) -> Self {
        Self::Step(step)
    }
}

impl From<Vec<RelationshipStep>> for RelationshipPathSpec {
    fn from(steps: Vec<RelationshipStep>) -> Self {
        Self::Steps(steps)
    }
}

/// Follows relationship paths through the instance store.
#[derive(Clone, Copy)]
pub struct PathWalker<'a> {
    instances: &'a dyn InstanceStore,
}

impl<'a> PathWalker<'a> {
    /// Creates a walker over `instances`.
    #[must_use]
    pub fn new(instances: &'a dyn InstanceStore) -> Self {
        Self { instances }
    }

    /// Instances reached from `from` along `path`.
    pub fn related(
        &self,
        path: &RelationshipPath,
        from: &InstanceKey,
    ) -> PresentationResult<Vec<RelatedInstance>> {
        let related = self
            .instances
            .resolve_related(path, from)
            .map_err(PresentationError::query)?;
        trace!(from = %from, steps = path.len(), found = related.len(), "walked relationship path");
        Ok(related)
    }

    /// First instance reached from `from` along `path`, if any.
    pub fn first_related(
        &self,
        path: &RelationshipPath,
        from: &InstanceKey,
    ) -> PresentationResult<Option<InstanceKey>> {
        Ok(self.related(path, from)?.into_iter().next().map(|r| r.target))
    }
}
