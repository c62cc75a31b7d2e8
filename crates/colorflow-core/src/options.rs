//! Filter options.
//!
//! Options parametrize a filter and, through [`OptionValue::identity`],
//! take part in the key of the filter's cached transform context. Values
//! are text or shared handles; text is parsed on demand by the typed
//! getters so that a bad value is reported as
//! [`EngineError::IncompatibleOption`] when the filter reads it.
//!
//! ```rust
//! use colorflow_core::Options;
//!
//! let mut opts = Options::new();
//! opts.set_from_text("offset", "5");
//! assert_eq!(opts.find_string("offset"), Some("5"));
//! assert_eq!(opts.get_f64("offset").unwrap(), Some(5.0));
//! ```

use crate::{EngineError, EngineResult, ImageSource, OpaqueHandle, ProfileIdentity};
use std::collections::BTreeMap;
use std::sync::Arc;

/// A single option value.
#[derive(Debug, Clone)]
pub enum OptionValue {
    /// Text, parsed by the consumer.
    Text(String),
    /// A color profile.
    Profile(Arc<dyn ProfileIdentity>),
    /// An image.
    Image(Arc<dyn ImageSource>),
    /// Any other shared resource.
    Handle(Arc<dyn OpaqueHandle>),
}

impl OptionValue {
    /// Bytes identifying the value for context hashing.
    ///
    /// Profiles and handles contribute their stable hash. Images contribute
    /// their geometry, layout and profile, never their pixels.
    pub fn identity(&self) -> Vec<u8> {
        match self {
            OptionValue::Text(text) => [b"t:".as_slice(), text.as_bytes()].concat(),
            OptionValue::Profile(profile) => [b"p:".to_vec(), profile.stable_hash()].concat(),
            OptionValue::Handle(handle) => [b"h:".to_vec(), handle.stable_hash()].concat(),
            OptionValue::Image(image) => {
                let mut out = b"i:".to_vec();
                out.extend_from_slice(&image.width().to_le_bytes());
                out.extend_from_slice(&image.height().to_le_bytes());
                out.extend_from_slice(&image.pixel_layout().encode().to_le_bytes());
                if let Some(profile) = image.profile() {
                    out.extend_from_slice(&profile.stable_hash());
                }
                out
            }
        }
    }
}

impl From<&str> for OptionValue {
    fn from(text: &str) -> Self {
        OptionValue::Text(text.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(text: String) -> Self {
        OptionValue::Text(text)
    }
}

/// Ordered key/value option set.
#[derive(Debug, Clone, Default)]
pub struct Options {
    entries: BTreeMap<String, OptionValue>,
}

impl Options {
    /// Creates an empty option set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets `key` to `value`, replacing any previous value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Sets `key` to a text value.
    pub fn set_from_text(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries
            .insert(key.into(), OptionValue::Text(value.into()));
    }

    /// Builder form of [`Options::set`].
    pub fn with(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.set(key, value);
        self
    }

    /// Removes `key`, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.entries.remove(key)
    }

    /// Raw value of `key`.
    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    /// Text value of `key`.
    pub fn find_string(&self, key: &str) -> Option<&str> {
        match self.entries.get(key) {
            Some(OptionValue::Text(text)) => Some(text),
            _ => None,
        }
    }

    /// Handle value of `key`.
    pub fn get_struct(&self, key: &str) -> Option<&Arc<dyn OpaqueHandle>> {
        match self.entries.get(key) {
            Some(OptionValue::Handle(handle)) => Some(handle),
            _ => None,
        }
    }

    /// Profile value of `key`.
    pub fn get_profile(&self, key: &str) -> Option<&Arc<dyn ProfileIdentity>> {
        match self.entries.get(key) {
            Some(OptionValue::Profile(profile)) => Some(profile),
            _ => None,
        }
    }

    /// Image value of `key`.
    pub fn get_image(&self, key: &str) -> Option<&Arc<dyn ImageSource>> {
        match self.entries.get(key) {
            Some(OptionValue::Image(image)) => Some(image),
            _ => None,
        }
    }

    /// Numeric value of `key`; `Ok(None)` if unset.
    pub fn get_f64(&self, key: &str) -> EngineResult<Option<f64>> {
        match self.entries.get(key) {
            None => Ok(None),
            Some(OptionValue::Text(text)) => text
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .map(Some)
                .ok_or_else(|| {
                    EngineError::incompatible_option(key, format!("`{text}` is not a number"))
                }),
            Some(_) => Err(EngineError::incompatible_option(key, "expected a number")),
        }
    }

    /// Boolean value of `key` (`1/0`, `true/false`, `yes/no`); `Ok(None)` if unset.
    pub fn get_bool(&self, key: &str) -> EngineResult<Option<bool>> {
        match self.find_string(key).map(|s| s.trim().to_ascii_lowercase()) {
            None if self.entries.contains_key(key) => {
                Err(EngineError::incompatible_option(key, "expected a boolean"))
            }
            None => Ok(None),
            Some(s) => match s.as_str() {
                "1" | "true" | "yes" | "on" => Ok(Some(true)),
                "0" | "false" | "no" | "off" => Ok(Some(false)),
                _ => Err(EngineError::incompatible_option(
                    key,
                    format!("`{s}` is not a boolean"),
                )),
            },
        }
    }

    /// Iterates entries in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ErrorKind, NamedProfile, provider::signature};

    #[test]
    fn test_typed_getters() {
        let opts = Options::new()
            .with("offset", "2.5")
            .with("bpc", "yes")
            .with("bad", "many");
        assert_eq!(opts.get_f64("offset").unwrap(), Some(2.5));
        assert_eq!(opts.get_f64("missing").unwrap(), None);
        assert_eq!(opts.get_bool("bpc").unwrap(), Some(true));
        assert_eq!(
            opts.get_f64("bad").unwrap_err().kind(),
            ErrorKind::IncompatibleOption
        );
        assert!(opts.get_bool("bad").is_err());
    }

    #[test]
    fn test_profile_value() {
        let profile: Arc<dyn ProfileIdentity> = Arc::new(NamedProfile::new("p", signature::RGB));
        let opts = Options::new().with("profile_out", OptionValue::Profile(profile));
        assert!(opts.get_profile("profile_out").is_some());
        assert!(opts.find_string("profile_out").is_none());
        assert!(opts.get_f64("profile_out").is_err());
    }

    #[test]
    fn test_identity_distinguishes_kinds() {
        let text = OptionValue::from("p");
        let profile = OptionValue::Profile(Arc::new(NamedProfile::new("p", signature::RGB)));
        assert_ne!(text.identity(), profile.identity());
    }
}
