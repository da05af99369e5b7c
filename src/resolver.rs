//! Override resolution.
//!
//! One tie-break rule shared by category, label and visibility overrides:
//! the highest priority wins; on equal priority the more specific scope
//! wins; on equal scope the earlier candidate wins.

use crate::rules::{CategoryIdentifier, PropertySpecification};

/// Where an override was declared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverrideScope {
    /// Declared by a content modifier.
    ClassModifier,
    /// Declared by the selection spec.
    Selection,
    /// Declared by a related-properties specification.
    RelatedProperty,
}

impl OverrideScope {
    /// Tie-break rank; higher wins.
    #[must_use]
    pub const fn rank(self) -> u8 {
        match self {
            Self::ClassModifier => 0,
            Self::Selection | Self::RelatedProperty => 1,
        }
    }
}

/// One candidate value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverrideCandidate<T> {
    /// Candidate value.
    pub value: T,
    /// Declared priority.
    pub priority: i32,
    /// Declaring scope.
    pub scope: OverrideScope,
}

/// Picks the winning candidate.
#[must_use]
pub fn resolve<T, I>(candidates: I) -> Option<OverrideCandidate<T>>
where
    I: IntoIterator<Item = OverrideCandidate<T>>,
{
    let mut best: Option<OverrideCandidate<T>> = None;
    for candidate in candidates {
        let replace = match &best {
            None => true,
            Some(current) => {
                candidate.priority > current.priority
                    || (candidate.priority == current.priority
                        && candidate.scope.rank() > current.scope.rank())
            }
        };
        if replace {
            best = Some(candidate);
        }
    }
    best
}

/// Property specifications declared in one scope.
#[derive(Debug, Clone, Copy)]
pub struct ScopedSpecs<'a> {
    /// Declaring scope.
    pub scope: OverrideScope,
    /// Specifications in declaration order.
    pub specs: &'a [PropertySpecification],
}

impl<'a> ScopedSpecs<'a> {
    /// Wraps `specs` declared in `scope`.
    #[must_use]
    pub const fn new(scope: OverrideScope, specs: &'a [PropertySpecification]) -> Self {
        Self { scope, specs }
    }
}

/// Effective presentation of one property after resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedProperty {
    /// Label override, if any.
    pub label: Option<String>,
    /// Category override, if any.
    pub category: Option<CategoryIdentifier>,
    /// Whether the property is shown.
    pub displayed: bool,
}

fn resolve_attribute<'a, T>(
    scopes: &[ScopedSpecs<'a>],
    property: &str,
    pick: impl Fn(&'a PropertySpecification) -> Option<T>,
) -> Option<T> {
    let mut candidates = Vec::new();
    for scoped in scopes {
        for spec in scoped.specs.iter().filter(|s| s.matches(property)) {
            if let Some(value) = pick(spec) {
                candidates.push(OverrideCandidate {
                    value,
                    priority: spec.priority,
                    scope: scoped.scope,
                });
            }
        }
    }
    resolve(candidates).map(|c| c.value)
}

/// Resolves label, category and visibility of `property`.
///
/// Each attribute is resolved over the specifications that set it.
#[must_use]
pub fn resolve_property(scopes: &[ScopedSpecs<'_>], property: &str) -> ResolvedProperty {
    ResolvedProperty {
        label: resolve_attribute(scopes, property, |s| s.label_override.clone()),
        category: resolve_attribute(scopes, property, |s| s.category.clone()),
        displayed: resolve_attribute(scopes, property, |s| s.is_displayed).unwrap_or(true),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(value: &'static str, priority: i32, scope: OverrideScope) -> OverrideCandidate<&'static str> {
        OverrideCandidate {
            value,
            priority,
            scope,
        }
    }

    #[test]
    fn test_highest_priority_wins() {
        let winner = resolve(vec![
            candidate("spec", 1, OverrideScope::Selection),
            candidate("modifier", 2, OverrideScope::ClassModifier),
        ]);
        assert_eq!(winner.unwrap().value, "modifier");
    }

    #[test]
    fn test_scope_breaks_priority_ties() {
        let winner = resolve(vec![
            candidate("modifier", 1, OverrideScope::ClassModifier),
            candidate("spec", 1, OverrideScope::Selection),
            candidate("related", 1, OverrideScope::RelatedProperty),
        ]);
        assert_eq!(winner.unwrap().value, "spec");
    }

    #[test]
    fn test_first_declared_wins_full_ties() {
        let winner = resolve(vec![
            candidate("first", 0, OverrideScope::ClassModifier),
            candidate("second", 0, OverrideScope::ClassModifier),
        ]);
        assert_eq!(winner.unwrap().value, "first");
        assert!(resolve(Vec::<OverrideCandidate<()>>::new()).is_none());
    }

    #[test]
    fn test_attributes_resolve_independently() {
        let spec = vec![PropertySpecification::new("P")
            .with_priority(1)
            .with_category(CategoryIdentifier::id("spec"))];
        let modifier = vec![
            PropertySpecification::new("P").with_priority(5).with_label("Modifier label"),
            PropertySpecification::all().with_priority(9).displayed(true),
        ];
        let scopes = [
            ScopedSpecs::new(OverrideScope::Selection, &spec),
            ScopedSpecs::new(OverrideScope::ClassModifier, &modifier),
        ];
        let resolved = resolve_property(&scopes, "P");
        assert_eq!(resolved.label.as_deref(), Some("Modifier label"));
        assert_eq!(resolved.category, Some(CategoryIdentifier::id("spec")));
        assert!(resolved.displayed);

        let other = resolve_property(&scopes, "Q");
        assert_eq!(other.label, None);
        assert_eq!(other.category, None);
    }

    #[test]
    fn test_hidden_property() {
        let spec = vec![PropertySpecification::new("P").displayed(false)];
        let scopes = [ScopedSpecs::new(OverrideScope::Selection, &spec)];
        assert!(!resolve_property(&scopes, "P").displayed);
    }
}
