//! Engine configuration.
//!
//! ```yaml
//! parallel_rows: true
//! parallel_min_rows: 16
//! stripe_rows: 64
//! cache_capacity: 256
//! ```
//!
//! Every field is optional; missing fields take their defaults.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Tunables of an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Spread the rows of one rectangle over the rayon pool.
    pub parallel_rows: bool,
    /// Rectangles with fewer rows run on the calling thread.
    pub parallel_min_rows: u32,
    /// Rows per stripe of a pull; 0 pulls the whole rectangle at once.
    pub stripe_rows: u32,
    /// Maximum number of built contexts kept in the cache.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            parallel_rows: true,
            parallel_min_rows: 16,
            stripe_rows: 0,
            cache_capacity: 256,
        }
    }
}

impl EngineConfig {
    /// Configuration that never leaves the calling thread.
    pub fn sequential() -> Self {
        Self {
            parallel_rows: false,
            ..Self::default()
        }
    }

    /// Parses YAML.
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and parses a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }

    /// Serializes to YAML.
    pub fn to_yaml(&self) -> Result<String, ConfigError> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Rejects values the engine cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "cache_capacity",
                reason: "must be at least 1".into(),
            });
        }
        Ok(())
    }

    /// Whether a rectangle of `rows` rows should run on the pool.
    pub(crate) fn use_pool(&self, rows: u32) -> bool {
        self.parallel_rows && rows >= self.parallel_min_rows.max(2)
    }
}
