//! Engine configuration.

use serde::{Deserialize, Serialize};

use crate::error::{PresentationError, ValidationError};
use crate::rules::PropertyCategorySpecification;

/// Tunables of a [`crate::PresentationEngine`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Id of the default root category.
    pub default_category_id: String,
    /// Label of the default root category.
    pub default_category_label: String,
    /// Priority of the default root category.
    pub default_category_priority: i32,
    /// Properties probed, in order, when no label rule yields a label.
    pub label_probe_properties: Vec<String>,
    /// Fall back to `"<class label> [<id>]"` after the probe properties.
    pub class_label_fallback: bool,
    /// How many navigation hops a label may follow.
    pub max_label_depth: usize,
    /// How deep nested related properties may go.
    pub max_nesting_depth: usize,
    /// Maximum number of cached descriptors.
    pub descriptor_cache_capacity: usize,
    /// Worker threads of the label pool.
    pub label_workers: usize,
    /// Maximum queued label jobs.
    pub label_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_category_id: "/selected-item/".to_string(),
            default_category_label: "Selected Item(s)".to_string(),
            default_category_priority: 1000,
            label_probe_properties: ["CodeValue", "UserLabel", "DisplayLabel", "Name"]
                .into_iter()
                .map(String::from)
                .collect(),
            class_label_fallback: true,
            max_label_depth: 4,
            max_nesting_depth: 8,
            descriptor_cache_capacity: 256,
            label_workers: 4,
            label_queue_capacity: 1024,
        }
    }
}

impl EngineConfig {
    /// Parses a configuration from JSON. Missing keys take their defaults.
    ///
    /// Callers should then invoke [`Self::validate`].
    pub fn from_json(s: &str) -> Result<Self, PresentationError> {
        serde_json::from_str(s).map_err(|e| PresentationError::internal(format!("deserialize config: {e}")))
    }

    /// Serializes the configuration to pretty JSON.
    pub fn to_json_pretty(&self) -> Result<String, PresentationError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| PresentationError::internal(format!("serialize config: {e}")))
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(self) -> Result<Self, ValidationError> {
        let invalid = |reason: &str| ValidationError::InvalidConfig {
            reason: reason.to_string(),
        };
        if self.default_category_id.trim().is_empty() {
            return Err(invalid("default_category_id cannot be empty"));
        }
        if self.default_category_label.trim().is_empty() {
            return Err(invalid("default_category_label cannot be empty"));
        }
        if self.max_label_depth == 0 {
            return Err(invalid("max_label_depth must be > 0"));
        }
        if self.max_nesting_depth == 0 {
            return Err(invalid("max_nesting_depth must be > 0"));
        }
        if self.descriptor_cache_capacity == 0 {
            return Err(invalid("descriptor_cache_capacity must be > 0"));
        }
        if self.label_workers == 0 || self.label_queue_capacity == 0 {
            return Err(invalid("label_workers and label_queue_capacity must be > 0"));
        }
        Ok(self)
    }

    /// The built-in default root category.
    #[must_use]
    pub fn default_category(&self) -> PropertyCategorySpecification {
        PropertyCategorySpecification::new(&self.default_category_id, &self.default_category_label)
            .with_priority(self.default_category_priority)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = EngineConfig::default().validate().unwrap();
        assert_eq!(config.default_category().label, "Selected Item(s)");
        assert_eq!(config.label_probe_properties[0], "CodeValue");
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = EngineConfig::from_json(r#"{"max_label_depth": 2, "class_label_fallback": false}"#).unwrap();
        assert_eq!(config.max_label_depth, 2);
        assert!(!config.class_label_fallback);
        assert_eq!(config.descriptor_cache_capacity, 256);

        let json = config.to_json_pretty().unwrap();
        assert_eq!(EngineConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_validate_rejects_unusable_values() {
        let zero_cache = EngineConfig {
            descriptor_cache_capacity: 0,
            ..EngineConfig::default()
        };
        let err = zero_cache.validate().unwrap_err();
        assert!(err.to_string().contains("descriptor_cache_capacity"));

        let blank_label = EngineConfig {
            default_category_label: " ".to_string(),
            ..EngineConfig::default()
        };
        assert!(blank_label.validate().is_err());
    }

    #[test]
    fn test_malformed_json_is_internal() {
        assert!(EngineConfig::from_json("{").unwrap_err().is_internal());
    }
}
