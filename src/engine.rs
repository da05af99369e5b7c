//! Presentation engine.
//!
//! Ties the collaborators, the rule index and the configuration together
//! and serves descriptor, content and label requests. Descriptors are
//! cached per request shape; cached descriptors are shared read-only.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use blake3::Hasher;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::class::InstanceKey;
use crate::config::EngineConfig;
use crate::content::{ContentBuilder, ContentFlags, ContentSetItem};
use crate::descriptor::{ContentDescriptor, FieldBuilder};
use crate::error::{PresentationError, PresentationResult};
use crate::index::RuleIndex;
use crate::label::{LabelComposer, LabelMerger, LabelPool, LabelResolver};
use crate::rules::{RuleSet, SelectionSpec};
use crate::store::{ExpressionEvaluator, InstanceStore, SchemaStore};
use crate::value::LabelValue;

/// Shape of a descriptor request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DescriptorRequest {
    /// Selection specifications.
    pub selection: Vec<SelectionSpec>,
    /// Request flags.
    #[serde(default)]
    pub flags: ContentFlags,
}

impl DescriptorRequest {
    /// Creates a request for `selection` with default flags.
    #[must_use]
    pub fn new(selection: Vec<SelectionSpec>) -> Self {
        Self {
            selection,
            flags: ContentFlags::default(),
        }
    }

    /// Sets the flags.
    #[must_use]
    pub const fn with_flags(mut self, flags: ContentFlags) -> Self {
        self.flags = flags;
        self
    }
}

/// A content request: a descriptor shape plus the records to fill it with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRequest {
    /// Descriptor shape.
    pub descriptor: DescriptorRequest,
    /// Records.
    pub keys: Vec<InstanceKey>,
}

impl ContentRequest {
    /// Creates a request.
    #[must_use]
    pub fn new(descriptor: DescriptorRequest, keys: Vec<InstanceKey>) -> Self {
        Self { descriptor, keys }
    }
}

/// Result of a content request.
#[derive(Debug, Clone, Serialize)]
pub struct Content {
    /// Descriptor the items follow.
    pub descriptor: Arc<ContentDescriptor>,
    /// Items, one per record or one merged item.
    pub items: Vec<ContentSetItem>,
}

struct EngineState {
    schema: Arc<dyn SchemaStore>,
    instances: Arc<dyn InstanceStore>,
    evaluator: Arc<dyn ExpressionEvaluator>,
    index: RuleIndex,
    config: EngineConfig,
}

impl EngineState {
    fn composer(&self) -> LabelComposer<'_> {
        LabelComposer::new(
            self.schema.as_ref(),
            self.instances.as_ref(),
            self.evaluator.as_ref(),
            &self.index,
            &self.config,
        )
    }
}

impl LabelResolver for EngineState {
    fn resolve_label(&self, key: &InstanceKey) -> PresentationResult<LabelValue> {
        self.composer().label(key)
    }
}

type CacheKey = [u8; 32];

struct DescriptorCache {
    capacity: usize,
    entries: RwLock<HashMap<CacheKey, Arc<ContentDescriptor>>>,
}

impl DescriptorCache {
    fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: RwLock::new(HashMap::new()),
        }
    }

    fn key(rule_set: &str, request: &DescriptorRequest) -> PresentationResult<CacheKey> {
        let shape = serde_json::to_vec(request)
            .map_err(|e| PresentationError::internal(format!("serialize descriptor request: {e}")))?;
        let mut h = Hasher::new();
        h.update(rule_set.as_bytes());
        h.update(&[0]);
        h.update(&shape);
        Ok(*h.finalize().as_bytes())
    }

    fn get(&self, key: &CacheKey) -> PresentationResult<Option<Arc<ContentDescriptor>>> {
        let entries = self
            .entries
            .read()
            .map_err(|_| PresentationError::internal("descriptor cache lock poisoned"))?;
        Ok(entries.get(key).cloned())
    }

    fn insert(&self, key: CacheKey, descriptor: Arc<ContentDescriptor>) -> PresentationResult<Arc<ContentDescriptor>> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| PresentationError::internal("descriptor cache lock poisoned"))?;
        if entries.len() >= self.capacity && !entries.contains_key(&key) {
            debug!(capacity = self.capacity, "descriptor cache full, cleared");
            entries.clear();
        }
        Ok(Arc::clone(entries.entry(key).or_insert(descriptor)))
    }

    fn len(&self) -> usize {
        self.entries.read().map_or(0, |e| e.len())
    }

    fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }
}

/// Serves descriptors, content and labels for one rule set.
pub struct PresentationEngine {
    state: Arc<EngineState>,
    cache: DescriptorCache,
}

impl PresentationEngine {
    /// Creates an engine with the default configuration.
    pub fn new(
        schema: Arc<dyn SchemaStore>,
        instances: Arc<dyn InstanceStore>,
        evaluator: Arc<dyn ExpressionEvaluator>,
        rules: RuleSet,
    ) -> PresentationResult<Self> {
        Self::with_config(schema, instances, evaluator, rules, EngineConfig::default())
    }

    /// Creates an engine. Fails if the rule set or the configuration is invalid.
    pub fn with_config(
        schema: Arc<dyn SchemaStore>,
        instances: Arc<dyn InstanceStore>,
        evaluator: Arc<dyn ExpressionEvaluator>,
        rules: RuleSet,
        config: EngineConfig,
    ) -> PresentationResult<Self> {
        rules.validate()?;
        let config = config.validate()?;
        debug!(rule_set = rules.id(), rules = rules.rules().len(), "presentation engine created");
        let cache = DescriptorCache::new(config.descriptor_cache_capacity);
        Ok(Self {
            state: Arc::new(EngineState {
                schema,
                instances,
                evaluator,
                index: RuleIndex::new(Arc::new(rules)),
                config,
            }),
            cache,
        })
    }

    /// Engine configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.state.config
    }

    /// The rule set served by this engine.
    #[must_use]
    pub fn rule_set(&self) -> &RuleSet {
        self.state.index.rule_set()
    }

    /// Descriptor for `request`, built once per request shape.
    pub fn descriptor(&self, request: &DescriptorRequest) -> PresentationResult<Arc<ContentDescriptor>> {
        let key = DescriptorCache::key(self.rule_set().id(), request)?;
        if let Some(found) = self.cache.get(&key)? {
            debug!("descriptor cache hit");
            return Ok(found);
        }
        debug!("descriptor cache miss");

        let state = &self.state;
        let descriptor = FieldBuilder::new(state.schema.as_ref(), &state.index, &state.config)
            .build(&request.selection, request.flags)?;
        self.cache.insert(key, Arc::new(descriptor))
    }

    /// Descriptor and items for `request`.
    pub fn content(&self, request: &ContentRequest) -> PresentationResult<Content> {
        let descriptor = self.descriptor(&request.descriptor)?;
        let state = &self.state;
        let items = ContentBuilder::new(
            &descriptor,
            state.schema.as_ref(),
            state.instances.as_ref(),
            state.evaluator.as_ref(),
            state.composer(),
        )
        .items(&request.keys)?;
        Ok(Content { descriptor, items })
    }

    /// Display label of one record.
    pub fn display_label(&self, key: &InstanceKey) -> PresentationResult<LabelValue> {
        self.state.composer().label(key)
    }

    /// One label for a set of records.
    pub fn merged_display_label(&self, keys: &[InstanceKey]) -> PresentationResult<LabelValue> {
        let composer = self.state.composer();
        let mut merger = LabelMerger::new();
        for key in keys {
            merger.push(composer.label(key)?);
            if merger.is_settled() {
                break;
            }
        }
        Ok(merger.finish())
    }

    /// Starts a label pool over this engine's rules and collaborators.
    pub fn label_pool(&self) -> PresentationResult<LabelPool> {
        let resolver: Arc<dyn LabelResolver> = Arc::clone(&self.state) as Arc<dyn LabelResolver>;
        LabelPool::start(
            resolver,
            self.state.config.label_workers,
            self.state.config.label_queue_capacity,
        )
    }

    /// Labels of `keys` resolved in parallel, in input order.
    pub fn display_labels(&self, keys: &[InstanceKey]) -> PresentationResult<Vec<LabelValue>> {
        let pool = self.label_pool()?;
        let labels = pool.labels(keys);
        pool.shutdown();
        labels
    }

    /// Number of cached descriptors.
    #[must_use]
    pub fn cached_descriptors(&self) -> usize {
        self.cache.len()
    }

    /// Drops every cached descriptor.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::SimpleExpressionEvaluator;
    use crate::rules::{InstanceLabelOverride, LabelValueSpec};
    use crate::store::{ClassDefinition, InMemoryInstanceStore, InMemorySchemaStore};
    use crate::value::Value;

    fn engine(rules: RuleSet, config: EngineConfig) -> PresentationResult<PresentationEngine> {
        let schema = Arc::new(InMemorySchemaStore::new());
        schema
            .insert_class(ClassDefinition::new("S:A").with_property("Name"))
            .unwrap();
        let instances = Arc::new(InMemoryInstanceStore::new(schema.clone()));
        for id in 1..=3 {
            instances
                .insert(InstanceKey::new("S:A", id), [("Name", Value::from(format!("a{}", id % 2)))])
                .unwrap();
        }
        PresentationEngine::with_config(schema, instances, Arc::new(SimpleExpressionEvaluator::new()), rules, config)
    }

    fn labelled() -> RuleSet {
        RuleSet::new("r").with_rule(InstanceLabelOverride::new("S:A", vec![LabelValueSpec::property("Name")]))
    }

    #[test]
    fn test_invalid_rule_set_or_config_is_rejected() {
        assert!(engine(RuleSet::new(""), EngineConfig::default()).is_err_and(|e| e.is_validation()));
        let config = EngineConfig {
            max_nesting_depth: 0,
            ..EngineConfig::default()
        };
        assert!(engine(labelled(), config).is_err_and(|e| e.is_validation()));
    }

    #[test]
    fn test_descriptor_cache_by_request_shape() {
        let engine = engine(labelled(), EngineConfig::default()).unwrap();
        let request = DescriptorRequest::new(vec![SelectionSpec::for_class("S:A")]);
        let first = engine.descriptor(&request).unwrap();
        let second = engine.descriptor(&request).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let labelled_request = request.clone().with_flags(ContentFlags::default().with_labels());
        let third = engine.descriptor(&labelled_request).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert!(third.display_label_field().is_some());
        assert!(first.display_label_field().is_none());
        assert_eq!(engine.cached_descriptors(), 2);

        engine.clear_cache();
        assert_eq!(engine.cached_descriptors(), 0);
    }

    #[test]
    fn test_cache_is_cleared_when_full() {
        let config = EngineConfig {
            descriptor_cache_capacity: 1,
            ..EngineConfig::default()
        };
        let engine = engine(labelled(), config).unwrap();
        let plain = DescriptorRequest::new(vec![SelectionSpec::for_class("S:A")]);
        engine.descriptor(&plain).unwrap();
        engine
            .descriptor(&plain.clone().with_flags(ContentFlags::default().keys_only()))
            .unwrap();
        assert_eq!(engine.cached_descriptors(), 1);
    }

    #[test]
    fn test_labels_sequential_and_parallel_agree() {
        let engine = engine(labelled(), EngineConfig::default()).unwrap();
        let keys: Vec<_> = (1..=3).map(|id| InstanceKey::new("S:A", id)).collect();

        let parallel = engine.display_labels(&keys).unwrap();
        let sequential: Vec<_> = keys.iter().map(|k| engine.display_label(k).unwrap()).collect();
        assert_eq!(parallel, sequential);
        assert_eq!(sequential[0].display_value, "a1");

        assert_eq!(
            engine.merged_display_label(&[keys[0].clone(), keys[2].clone()]).unwrap().display_value,
            "a1"
        );
        assert_eq!(engine.merged_display_label(&keys).unwrap().display_value, "Multiple instances");
        let pool = engine.label_pool().unwrap();
        assert_eq!(pool.merged_label(&keys).unwrap(), engine.merged_display_label(&keys).unwrap());
    }

    #[test]
    fn test_content_items() {
        let engine = engine(labelled(), EngineConfig::default()).unwrap();
        let request = ContentRequest::new(
            DescriptorRequest::new(vec![SelectionSpec::for_class("S:A")])
                .with_flags(ContentFlags::default().with_labels()),
            vec![InstanceKey::new("S:A", 2)],
        );
        let content = engine.content(&request).unwrap();
        assert_eq!(content.items.len(), 1);
        let item = &content.items[0];
        assert_eq!(item.display_value("Name"), Some("a0"));
        assert_eq!(item.display_label.as_ref().unwrap().display_value, "a0");
    }
}
