//! Rule index.
//!
//! Answers "which rules of kind K apply to class C" in a deterministic
//! order: most specific target class first, then descending priority,
//! then ancestor visit order, then declaration order.
//!
//! Class ancestry is a DAG (mixins). It is walked breadth-first from the
//! queried class with base classes visited in declaration order; the
//! distance of an ancestor is the length of its shortest base-class chain
//! and its visit order is the position at which the walk first reached it.

use std::cmp::{Ordering, Reverse};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, RwLock};

use tracing::trace;

use crate::class::ClassId;
use crate::error::{PresentationError, PresentationResult};
use crate::rules::{Rule, RuleKind, RuleSet};
use crate::store::SchemaStore;

/// Ancestors of a class in visit order, the class itself first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassAncestry {
    entries: Vec<(ClassId, usize)>,
}

impl ClassAncestry {
    /// Walks the ancestry of `class`.
    pub fn compute(schema: &dyn SchemaStore, class: &ClassId) -> PresentationResult<Self> {
        let mut entries = Vec::new();
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from([(class.clone(), 0usize)]);
        while let Some((current, distance)) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let bases = schema
                .base_classes(&current)
                .map_err(PresentationError::schema)?;
            queue.extend(bases.into_iter().map(|b| (b, distance + 1)));
            entries.push((current, distance));
        }
        Ok(Self { entries })
    }

    /// Distance and visit order of `ancestor`, if it is one.
    #[must_use]
    pub fn position(&self, ancestor: &ClassId) -> Option<(usize, usize)> {
        self.entries
            .iter()
            .enumerate()
            .find(|(_, (class, _))| class == ancestor)
            .map(|(visit, (_, distance))| (*distance, visit))
    }

    /// Returns true if `ancestor` is the class or one of its bases.
    #[must_use]
    pub fn contains(&self, ancestor: &ClassId) -> bool {
        self.position(ancestor).is_some()
    }

    /// Ancestors in visit order.
    pub fn classes(&self) -> impl Iterator<Item = &ClassId> {
        self.entries.iter().map(|(class, _)| class)
    }
}

/// A rule matched for a class.
#[derive(Debug, Clone, Copy)]
pub struct MatchedRule<'a> {
    /// The rule.
    pub rule: &'a Rule,
    /// Inheritance distance to the matched target; `None` for class-less rules.
    pub distance: Option<usize>,
    /// Ancestor visit order of the matched target.
    pub visit: usize,
    /// Declaration index in the rule set.
    pub position: usize,
}

fn compare_matches(a: &MatchedRule<'_>, b: &MatchedRule<'_>) -> Ordering {
    // Class-bound rules before class-less ones.
    a.distance
        .is_none()
        .cmp(&b.distance.is_none())
        .then_with(|| a.distance.cmp(&b.distance))
        .then_with(|| Reverse(a.rule.priority()).cmp(&Reverse(b.rule.priority())))
        .then_with(|| a.visit.cmp(&b.visit))
        .then_with(|| a.position.cmp(&b.position))
}

/// Immutable index over one rule set.
#[derive(Debug)]
pub struct RuleIndex {
    rules: Arc<RuleSet>,
    by_kind: HashMap<RuleKind, Vec<usize>>,
    ancestry: RwLock<HashMap<ClassId, Arc<ClassAncestry>>>,
}

impl RuleIndex {
    /// Indexes `rules`.
    #[must_use]
    pub fn new(rules: Arc<RuleSet>) -> Self {
        let mut by_kind: HashMap<RuleKind, Vec<usize>> = HashMap::new();
        for (position, rule) in rules.rules().iter().enumerate() {
            by_kind.entry(rule.kind()).or_default().push(position);
        }
        Self {
            rules,
            by_kind,
            ancestry: RwLock::new(HashMap::new()),
        }
    }

    /// The indexed rule set.
    #[must_use]
    pub fn rule_set(&self) -> &RuleSet {
        &self.rules
    }

    /// Ancestry of `class`, computed once per class.
    pub fn ancestry(
        &self,
        schema: &dyn SchemaStore,
        class: &ClassId,
    ) -> PresentationResult<Arc<ClassAncestry>> {
        {
            let guard = self
                .ancestry
                .read()
                .map_err(|_| PresentationError::internal("ancestry cache lock poisoned"))?;
            if let Some(found) = guard.get(class) {
                return Ok(Arc::clone(found));
            }
        }

        let computed = Arc::new(ClassAncestry::compute(schema, class)?);
        let mut guard = self
            .ancestry
            .write()
            .map_err(|_| PresentationError::internal("ancestry cache lock poisoned"))?;
        Ok(Arc::clone(
            guard.entry(class.clone()).or_insert(computed),
        ))
    }

    /// Rules of `kind` applying to `class`, in resolution order.
    pub fn rules_for(
        &self,
        schema: &dyn SchemaStore,
        class: &ClassId,
        kind: RuleKind,
    ) -> PresentationResult<Vec<MatchedRule<'_>>> {
        let Some(positions) = self.by_kind.get(&kind) else {
            return Ok(Vec::new());
        };
        let ancestry = self.ancestry(schema, class)?;

        let mut matched = Vec::new();
        for &position in positions {
            let rule = &self.rules.rules()[position];
            if rule.is_class_less() {
                matched.push(MatchedRule {
                    rule,
                    distance: None,
                    visit: usize::MAX,
                    position,
                });
                continue;
            }
            let best = rule
                .target_classes()
                .iter()
                .filter_map(|target| ancestry.position(target))
                .min();
            if let Some((distance, visit)) = best {
                matched.push(MatchedRule {
                    rule,
                    distance: Some(distance),
                    visit,
                    position,
                });
            }
        }
        matched.sort_by(compare_matches);
        trace!(class = %class, ?kind, matched = matched.len(), "rules matched");
        Ok(matched)
    }

    /// Class-less rules of `kind`, by descending priority then declaration.
    #[must_use]
    pub fn global(&self, kind: RuleKind) -> Vec<MatchedRule<'_>> {
        let mut matched: Vec<_> = self
            .by_kind
            .get(&kind)
            .into_iter()
            .flatten()
            .map(|&position| MatchedRule {
                rule: &self.rules.rules()[position],
                distance: None,
                visit: usize::MAX,
                position,
            })
            .filter(|m| m.rule.is_class_less())
            .collect();
        matched.sort_by(compare_matches);
        matched
    }
}
