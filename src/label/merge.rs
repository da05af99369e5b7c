//! Merging labels of several records.

use crate::value::LabelValue;

#[derive(Debug, Clone, Default, PartialEq)]
enum MergeState {
    #[default]
    Empty,
    Single(LabelValue),
    Multiple,
}

/// Incremental reduction of per-record labels into one label.
///
/// No labels merge to "Not specified", identical labels to that label, and
/// any two differing labels to "Multiple instances". The result does not
/// depend on push order.
///
/// ```
/// use presentation_rules::{LabelMerger, LabelValue};
///
/// let mut merger = LabelMerger::new();
/// merger.push(LabelValue::text("a"));
/// merger.push(LabelValue::text("b"));
/// assert_eq!(merger.finish().display_value, "Multiple instances");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelMerger {
    state: MergeState,
}

impl LabelMerger {
    /// Creates an empty merger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one record's label.
    pub fn push(&mut self, label: LabelValue) {
        self.state = match std::mem::take(&mut self.state) {
            MergeState::Empty => MergeState::Single(label),
            MergeState::Single(current) if current.display_value == label.display_value => {
                MergeState::Single(current)
            }
            MergeState::Single(_) | MergeState::Multiple => MergeState::Multiple,
        };
    }

    /// Returns true once further labels cannot change the result.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state == MergeState::Multiple
    }

    /// The merged label.
    #[must_use]
    pub fn finish(self) -> LabelValue {
        match self.state {
            MergeState::Empty => LabelValue::not_specified(),
            MergeState::Single(label) => label,
            MergeState::Multiple => LabelValue::multiple_instances(),
        }
    }

    /// Merges `labels` in one go.
    #[must_use]
    pub fn merge<I>(labels: I) -> LabelValue
    where
        I: IntoIterator<Item = LabelValue>,
    {
        let mut merger = Self::new();
        for label in labels {
            merger.push(label);
            if merger.is_settled() {
                break;
            }
        }
        merger.finish()
    }
}

impl Extend<LabelValue> for LabelMerger {
    fn extend<I: IntoIterator<Item = LabelValue>>(&mut self, labels: I) {
        for label in labels {
            self.push(label);
        }
    }
}
