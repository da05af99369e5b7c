//! Content set items: per-record values shaped by a descriptor.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::class::{ClassId, InstanceKey};
use crate::descriptor::{ContentDescriptor, Field, FieldKind, FieldRef, PropertySource};
use crate::error::{PresentationError, PresentationResult};
use crate::label::{LabelComposer, LabelMerger};
use crate::path::PathWalker;
use crate::store::{ExpressionContext, ExpressionEvaluator, InstanceStore, RelatedInstance, SchemaStore};
use crate::value::{LabelValue, Value};

/// Request flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentFlags {
    /// Include display labels.
    pub show_labels: bool,
    /// Collapse all records into one item.
    pub merge_results: bool,
    /// Only return keys: no fields, no values.
    pub keys_only: bool,
}

impl ContentFlags {
    /// Flags with labels shown.
    #[must_use]
    pub const fn with_labels(mut self) -> Self {
        self.show_labels = true;
        self
    }

    /// Flags with results merged.
    #[must_use]
    pub const fn merged(mut self) -> Self {
        self.merge_results = true;
        self
    }

    /// Flags for a keys-only request.
    #[must_use]
    pub const fn keys_only(mut self) -> Self {
        self.keys_only = true;
        self
    }
}

/// Value of one field for one record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldValue {
    /// A single value with its display form.
    Display {
        /// Raw value.
        raw: Value,
        /// Rendered value.
        display: String,
    },
    /// Values of related instances.
    Nested {
        /// One entry per related instance.
        items: Vec<NestedItem>,
    },
}

impl FieldValue {
    /// Wraps a raw value.
    #[must_use]
    pub fn from_value(raw: Value) -> Self {
        Self::Display {
            display: raw.display_string(),
            raw,
        }
    }

    /// Display form of a single value.
    #[must_use]
    pub fn display(&self) -> Option<&str> {
        match self {
            Self::Display { display, .. } => Some(display),
            Self::Nested { .. } => None,
        }
    }

    /// Related items of a nested value.
    #[must_use]
    pub fn nested(&self) -> Option<&[NestedItem]> {
        match self {
            Self::Nested { items } => Some(items),
            Self::Display { .. } => None,
        }
    }
}

/// Values of one related instance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NestedItem {
    /// The related instance.
    pub key: InstanceKey,
    /// The relationship instance linking it, if known.
    pub relationship: Option<InstanceKey>,
    /// Values by field name.
    pub values: BTreeMap<String, FieldValue>,
}

/// One record, or all records when merged.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentSetItem {
    /// Classes of the contributing records.
    pub classes: BTreeSet<ClassId>,
    /// Keys of the contributing records.
    pub instance_keys: Vec<InstanceKey>,
    /// Display label, when requested.
    pub display_label: Option<LabelValue>,
    /// Values by field name.
    pub values: BTreeMap<String, FieldValue>,
    /// Fields whose values differ between merged records.
    pub merged_field_names: Vec<String>,
}

impl ContentSetItem {
    /// Value of the field named `name`.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&FieldValue> {
        self.values.get(name)
    }

    /// Display form of the field named `name`.
    #[must_use]
    pub fn display_value(&self, name: &str) -> Option<&str> {
        self.value(name).and_then(FieldValue::display)
    }

    /// Collapses `items` into one. Values equal across every item are kept;
    /// the others are dropped and listed in `merged_field_names`.
    #[must_use]
    pub fn merge(items: Vec<Self>) -> Option<Self> {
        let mut iter = items.into_iter();
        let first = iter.next()?;
        let rest: Vec<Self> = iter.collect();

        let mut names: BTreeSet<String> = first.values.keys().cloned().collect();
        names.extend(rest.iter().flat_map(|i| i.values.keys().cloned()));
        let mut merged_names: BTreeSet<String> = first.merged_field_names.iter().cloned().collect();

        let mut values = BTreeMap::new();
        for name in names {
            let candidate = first.values.get(&name);
            let same = candidate.is_some() && rest.iter().all(|i| i.values.get(&name) == candidate);
            match candidate {
                Some(value) if same => {
                    values.insert(name, value.clone());
                }
                _ => {
                    merged_names.insert(name);
                }
            }
        }

        let show_labels = first.display_label.is_some();
        let mut merger = LabelMerger::new();
        let mut classes = first.classes;
        let mut instance_keys = first.instance_keys;
        merger.extend(first.display_label);
        for item in rest {
            classes.extend(item.classes);
            instance_keys.extend(item.instance_keys);
            merger.extend(item.display_label);
            merged_names.extend(item.merged_field_names);
        }

        Some(Self {
            classes,
            instance_keys,
            display_label: show_labels.then(|| merger.finish()),
            values,
            merged_field_names: merged_names.into_iter().collect(),
        })
    }
}

/// Builds content set items for a descriptor.
pub struct ContentBuilder<'a> {
    descriptor: &'a ContentDescriptor,
    schema: &'a dyn SchemaStore,
    instances: &'a dyn InstanceStore,
    evaluator: &'a dyn ExpressionEvaluator,
    labels: LabelComposer<'a>,
}

impl<'a> ContentBuilder<'a> {
    /// Creates a builder.
    #[must_use]
    pub fn new(
        descriptor: &'a ContentDescriptor,
        schema: &'a dyn SchemaStore,
        instances: &'a dyn InstanceStore,
        evaluator: &'a dyn ExpressionEvaluator,
        labels: LabelComposer<'a>,
    ) -> Self {
        Self {
            descriptor,
            schema,
            instances,
            evaluator,
            labels,
        }
    }

    /// Items for `keys`: one per key, or a single merged item.
    pub fn items(&self, keys: &[InstanceKey]) -> PresentationResult<Vec<ContentSetItem>> {
        let items = keys
            .iter()
            .map(|key| self.item(key))
            .collect::<PresentationResult<Vec<_>>>()?;
        if self.descriptor.flags().merge_results {
            return Ok(ContentSetItem::merge(items).into_iter().collect());
        }
        Ok(items)
    }

    /// Item of one record.
    pub fn item(&self, key: &InstanceKey) -> PresentationResult<ContentSetItem> {
        let flags = self.descriptor.flags();
        let display_label = if flags.show_labels {
            Some(self.labels.label(key)?)
        } else {
            None
        };

        let mut values = BTreeMap::new();
        if !flags.keys_only {
            self.collect_values(self.descriptor.fields().roots(), key, None, &mut values)?;
        }
        trace!(instance = %key, values = values.len(), "content item built");

        Ok(ContentSetItem {
            classes: BTreeSet::from([key.class.clone()]),
            instance_keys: vec![key.clone()],
            display_label,
            values,
            merged_field_names: Vec::new(),
        })
    }

    fn applies(&self, field: &Field, class: &ClassId) -> PresentationResult<bool> {
        for candidate in &field.classes {
            if self
                .schema
                .is_subclass_of(class, candidate)
                .map_err(PresentationError::schema)?
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn collect_values(
        &self,
        fields: &[FieldRef],
        key: &InstanceKey,
        relationship: Option<&InstanceKey>,
        out: &mut BTreeMap<String, FieldValue>,
    ) -> PresentationResult<()> {
        for field in fields.iter().filter_map(|r| self.descriptor.fields().get(*r)) {
            if let Some(value) = self.field_value(field, key, relationship)? {
                out.insert(field.name.clone(), value);
            }
        }
        Ok(())
    }

    fn field_value(
        &self,
        field: &Field,
        key: &InstanceKey,
        relationship: Option<&InstanceKey>,
    ) -> PresentationResult<Option<FieldValue>> {
        match &field.kind {
            FieldKind::DisplayLabel => Ok(None),
            FieldKind::Property {
                property,
                source: PropertySource::Relationship,
                ..
            } => {
                let Some(relationship) = relationship else {
                    return Ok(None);
                };
                let value = self
                    .instances
                    .read_property(relationship, property)
                    .map_err(PresentationError::query)?;
                Ok(Some(FieldValue::from_value(value)))
            }
            FieldKind::Property { property, .. } => {
                if !self.applies(field, &key.class)? {
                    return Ok(None);
                }
                let value = self
                    .instances
                    .read_property(key, property)
                    .map_err(PresentationError::query)?;
                Ok(Some(FieldValue::from_value(value)))
            }
            FieldKind::Calculated { expr, .. } => {
                if !self.applies(field, &key.class)? {
                    return Ok(None);
                }
                let ctx = ExpressionContext {
                    instance: key,
                    schema: self.schema,
                    instances: self.instances,
                };
                let value = self
                    .evaluator
                    .evaluate(expr, &ctx)
                    .map_err(PresentationError::expression)?;
                Ok(Some(FieldValue::from_value(value)))
            }
            FieldKind::Nested { path, .. } => {
                if !self.applies(field, &key.class)? {
                    return Ok(None);
                }
                let related = PathWalker::new(self.instances).related(path, key)?;
                let mut items = Vec::with_capacity(related.len());
                for RelatedInstance { target, relationship } in related {
                    let mut values = BTreeMap::new();
                    self.collect_values(&field.children, &target, relationship.as_ref(), &mut values)?;
                    items.push(NestedItem {
                        key: target,
                        relationship,
                        values,
                    });
                }
                Ok(Some(FieldValue::Nested { items }))
            }
        }
    }
}
