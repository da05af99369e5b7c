//! Per-record display labels.
//!
//! Resolution order for one record:
//! 1. `InstanceLabelOverride` rules applicable to the record's class, most
//!    specific first; the first value spec yielding a non-empty primitive wins
//! 2. the first `LabelOverride` whose condition holds
//! 3. the configured probe properties, then `"<class label> [<id>]"`
//! 4. "Not specified"

use tracing::{trace, warn};

use crate::class::{to_base36, ClassId, InstanceKey};
use crate::config::EngineConfig;
use crate::error::{PresentationError, PresentationResult};
use crate::index::RuleIndex;
use crate::path::PathWalker;
use crate::rules::{InstanceLabelOverride, LabelOverride, LabelValueSpec, Rule, RuleKind};
use crate::store::{ExpressionContext, ExpressionEvaluator, InstanceStore, SchemaStore};
use crate::value::{LabelValue, Value};

/// Resolves display labels of single records.
#[derive(Clone, Copy)]
pub struct LabelComposer<'a> {
    schema: &'a dyn SchemaStore,
    instances: &'a dyn InstanceStore,
    evaluator: &'a dyn ExpressionEvaluator,
    index: &'a RuleIndex,
    config: &'a EngineConfig,
}

impl<'a> LabelComposer<'a> {
    /// Creates a composer.
    #[must_use]
    pub fn new(
        schema: &'a dyn SchemaStore,
        instances: &'a dyn InstanceStore,
        evaluator: &'a dyn ExpressionEvaluator,
        index: &'a RuleIndex,
        config: &'a EngineConfig,
    ) -> Self {
        Self {
            schema,
            instances,
            evaluator,
            index,
            config,
        }
    }

    /// Display label of `key`; "Not specified" when nothing yields text.
    pub fn label(&self, key: &InstanceKey) -> PresentationResult<LabelValue> {
        Ok(self.compose(key, 0)?.unwrap_or_else(LabelValue::not_specified))
    }

    fn compose(&self, key: &InstanceKey, depth: usize) -> PresentationResult<Option<LabelValue>> {
        if let Some(label) = self.instance_label(key, depth)? {
            trace!(instance = %key, label = %label, "label from instance label override");
            return Ok(Some(label));
        }
        if let Some(label) = self.label_override(key)? {
            trace!(instance = %key, label = %label, "label from label override");
            return Ok(Some(label));
        }
        let fallback = self.fallback(key, depth)?;
        trace!(instance = %key, found = fallback.is_some(), "label from fallback");
        Ok(fallback)
    }

    fn instance_label(&self, key: &InstanceKey, depth: usize) -> PresentationResult<Option<LabelValue>> {
        for matched in self
            .index
            .rules_for(self.schema, &key.class, RuleKind::InstanceLabelOverride)?
        {
            let Rule::InstanceLabelOverride(rule) = matched.rule else {
                continue;
            };
            for spec in &rule.values {
                if let Some(label) = self.evaluate_spec(key, rule, spec, depth)? {
                    return Ok(Some(label));
                }
            }
        }
        Ok(None)
    }

    fn evaluate_spec(
        &self,
        key: &InstanceKey,
        rule: &InstanceLabelOverride,
        spec: &LabelValueSpec,
        depth: usize,
    ) -> PresentationResult<Option<LabelValue>> {
        match spec {
            LabelValueSpec::Property { name, path: None } => {
                if rule.only_if_owned_by_given_class && !self.owned_by(&rule.class_names, &key.class, name)? {
                    return Ok(None);
                }
                self.property_label(key, name, depth)
            }
            LabelValueSpec::Property {
                name,
                path: Some(path),
            } => {
                let Some(path) = path.normalize() else {
                    return Ok(None);
                };
                match PathWalker::new(self.instances).first_related(&path, key)? {
                    Some(target) => self.property_label(&target, name, depth),
                    None => Ok(None),
                }
            }
            LabelValueSpec::StringLiteral { text } => Ok((!text.is_empty()).then(|| LabelValue::text(text))),
            LabelValueSpec::ClassLabel => {
                let label = self
                    .schema
                    .display_label(&key.class)
                    .map_err(PresentationError::schema)?;
                Ok((!label.is_empty()).then(|| LabelValue::text(label)))
            }
            LabelValueSpec::BriefcaseId => Ok(Some(LabelValue::text(to_base36(key.id.briefcase_id())))),
            LabelValueSpec::LocalId => Ok(Some(LabelValue::text(to_base36(key.id.local_id())))),
            LabelValueSpec::Composite { parts, separator } => {
                let mut pieces = Vec::with_capacity(parts.len());
                for part in parts {
                    match self.evaluate_spec(key, rule, &part.spec, depth)? {
                        Some(label) => pieces.push(label.display_value),
                        None if part.skip_if_empty => {}
                        None => return Ok(None),
                    }
                }
                if pieces.is_empty() {
                    return Ok(None);
                }
                Ok(Some(LabelValue::text(pieces.join(separator.as_str()))))
            }
        }
    }

    /// Returns true if `property` of `class` is declared by one of `owners`
    /// or one of their bases.
    fn owned_by(&self, owners: &[ClassId], class: &ClassId, property: &str) -> PresentationResult<bool> {
        let declared = self
            .schema
            .declared_properties(class)
            .map_err(PresentationError::schema)?;
        let Some(info) = declared.into_iter().find(|p| p.name == property) else {
            return Ok(false);
        };
        for owner in owners {
            if self
                .schema
                .is_subclass_of(owner, &info.declaring_class)
                .map_err(PresentationError::schema)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn property_label(&self, key: &InstanceKey, name: &str, depth: usize) -> PresentationResult<Option<LabelValue>> {
        let value = self
            .instances
            .read_property(key, name)
            .map_err(PresentationError::query)?;
        match value {
            Value::Navigation(target) => {
                // The labeled record sits at depth 0; targets must stay below the bound.
                if depth + 1 >= self.config.max_label_depth {
                    warn!(instance = %key, property = name, "navigation label depth exceeded");
                    return Ok(None);
                }
                self.compose(&target, depth + 1)
            }
            other => Ok(LabelValue::from_value(other)),
        }
    }

    fn label_override(&self, key: &InstanceKey) -> PresentationResult<Option<LabelValue>> {
        let ctx = ExpressionContext {
            instance: key,
            schema: self.schema,
            instances: self.instances,
        };
        for matched in self.index.rules_for(self.schema, &key.class, RuleKind::LabelOverride)? {
            let Rule::LabelOverride(rule) = matched.rule else {
                continue;
            };
            if !self.condition_holds(rule, &ctx)? {
                continue;
            }
            let value = self
                .evaluator
                .evaluate(&rule.value, &ctx)
                .map_err(PresentationError::expression)?;
            return Ok(Some(LabelValue::from_value(value).unwrap_or_else(LabelValue::not_specified)));
        }
        Ok(None)
    }

    fn condition_holds(&self, rule: &LabelOverride, ctx: &ExpressionContext<'_>) -> PresentationResult<bool> {
        if rule.condition.is_empty() {
            return Ok(true);
        }
        let value = self
            .evaluator
            .evaluate(&rule.condition, ctx)
            .map_err(PresentationError::expression)?;
        Ok(value.as_bool() == Some(true))
    }

    fn fallback(&self, key: &InstanceKey, depth: usize) -> PresentationResult<Option<LabelValue>> {
        for name in &self.config.label_probe_properties {
            if let Some(label) = self.property_label(key, name, depth)? {
                return Ok(Some(label));
            }
        }
        if !self.config.class_label_fallback {
            return Ok(None);
        }
        let class_label = self
            .schema
            .display_label(&key.class)
            .map_err(PresentationError::schema)?;
        Ok(Some(LabelValue::text(format!(
            "{class_label} [{}]",
            key.id.short_form()
        ))))
    }
}
