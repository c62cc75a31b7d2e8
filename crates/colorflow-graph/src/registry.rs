//! Filter registry.
//!
//! Maps registration strings to [`Filter`] implementations. Lookups go
//! through registration matching, so a node can ask for
//! `//colour/icc` and get whichever ICC backend is registered, or exclude
//! one with a `-qualifier`.
//!
//! ```rust
//! use colorflow_graph::FilterRegistry;
//!
//! let registry = FilterRegistry::with_builtins();
//! assert!(registry.resolve("//colour/offset").is_some());
//! assert!(registry.resolve("//colour/offset.-arith").is_none());
//! ```

use crate::filter::Filter;
use crate::filters;
use colorflow_core::{EngineError, EngineResult, registration};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registered filters, keyed by registration string.
#[derive(Debug, Default, Clone)]
pub struct FilterRegistry {
    filters: BTreeMap<String, Arc<dyn Filter>>,
}

impl FilterRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a registry holding the built-in filters.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        for filter in filters::builtins() {
            // built-in registrations are valid and distinct
            let reg = filter.registration().to_string();
            registry.filters.insert(reg, filter);
        }
        registry
    }

    /// Adds a filter. Fails on a malformed or duplicate registration.
    pub fn register(&mut self, filter: Arc<dyn Filter>) -> EngineResult<()> {
        let reg = filter.registration().to_string();
        registration::validate(&reg)?;
        if self.filters.contains_key(&reg) {
            return Err(EngineError::incompatible_option(
                "registration",
                format!("`{reg}` is already registered"),
            ));
        }
        debug!(registration = %reg, "filter registered");
        self.filters.insert(reg, filter);
        Ok(())
    }

    /// Filter registered under exactly `registration`.
    pub fn get(&self, registration: &str) -> Option<Arc<dyn Filter>> {
        self.filters.get(registration).cloned()
    }

    /// First filter, in registration order, matching `pattern`.
    pub fn resolve(&self, pattern: &str) -> Option<Arc<dyn Filter>> {
        self.matching(pattern).next()
    }

    /// Every filter matching `pattern`.
    pub fn matching<'a>(&'a self, pattern: &'a str) -> impl Iterator<Item = Arc<dyn Filter>> + 'a {
        self.filters
            .iter()
            .filter(move |(reg, _)| registration::matches(reg, pattern))
            .map(|(_, filter)| filter.clone())
    }

    /// Registration strings, sorted.
    pub fn registrations(&self) -> impl Iterator<Item = &str> {
        self.filters.keys().map(String::as_str)
    }

    /// Number of registered filters.
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::OffsetFilter;

    #[test]
    fn test_builtins_resolve() {
        let registry = FilterRegistry::with_builtins();
        for reg in [
            filters::ROOT_IMAGE,
            filters::OUTPUT_IMAGE,
            filters::OFFSET,
            filters::DEPTH,
            filters::SCALE,
        ] {
            assert_eq!(registry.get(reg).unwrap().registration(), reg);
        }
        assert_eq!(registry.matching("//colour").count(), registry.len());
    }

    #[test]
    fn test_duplicate_rejected() {
        let mut registry = FilterRegistry::with_builtins();
        assert!(registry.register(Arc::new(OffsetFilter)).is_err());
    }
}
