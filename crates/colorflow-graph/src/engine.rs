//! The engine context.
//!
//! An [`Engine`] owns what conversions share: the filter registry, the
//! context cache and the configuration. Conversions hold it through an
//! `Arc`, so contexts built for one conversion are reused by the next.

use crate::cache::ContextCache;
use crate::config::EngineConfig;
use crate::filter::Filter;
use crate::registry::FilterRegistry;
use colorflow_core::{EngineError, EngineResult};
use std::sync::Arc;

/// Registry, cache and configuration shared by conversions.
///
/// ```rust
/// use colorflow_graph::{Engine, EngineConfig};
///
/// let engine = Engine::with_builtins(EngineConfig::default());
/// assert!(engine.registry().resolve("//colour/root").is_some());
/// assert!(engine.cache().is_empty());
/// ```
#[derive(Debug)]
pub struct Engine {
    registry: FilterRegistry,
    cache: ContextCache,
    config: EngineConfig,
}

impl Engine {
    /// Creates an engine with an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            registry: FilterRegistry::new(),
            cache: ContextCache::new(config.cache_capacity),
            config,
        }
    }

    /// Creates an engine with the built-in filters registered.
    pub fn with_builtins(config: EngineConfig) -> Self {
        Self {
            registry: FilterRegistry::with_builtins(),
            ..Self::new(config)
        }
    }

    /// Registers a filter.
    pub fn register(&mut self, filter: Arc<dyn Filter>) -> EngineResult<()> {
        self.registry.register(filter)
    }

    /// Builder form of [`Engine::register`].
    pub fn with_filter(mut self, filter: Arc<dyn Filter>) -> EngineResult<Self> {
        self.register(filter)?;
        Ok(self)
    }

    /// Wraps the engine for sharing between conversions.
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }

    /// The filter registry.
    pub fn registry(&self) -> &FilterRegistry {
        &self.registry
    }

    /// The context cache.
    pub fn cache(&self) -> &ContextCache {
        &self.cache
    }

    /// The configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Resolves `pattern` to a registered filter.
    pub fn resolve(&self, pattern: &str) -> EngineResult<Arc<dyn Filter>> {
        self.registry
            .resolve(pattern)
            .ok_or_else(|| EngineError::not_found(format!("no filter matches `{pattern}`")))
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::with_builtins(EngineConfig::default())
    }
}
