//! Content-addressed keys for transform contexts.
//!
//! A [`ContextKey`] is a SHA-256 digest of everything a context build reads:
//!
//! 1. the filter registration string
//! 2. for every input stream: its layout encoding and profile hash
//! 3. the output stream's layout encoding and profile hash
//! 4. every option the filter declares as context-relevant, in key order
//!
//! Stream geometry is left out, so one context serves images of any size.
//! Every field is length-prefixed, which keeps adjacent fields from running
//! into each other.

use crate::filter::{Filter, StreamDesc};
use colorflow_core::Options;
use sha2::{Digest, Sha256};
use std::fmt;

/// Stable hash identifying one built context.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextKey([u8; 32]);

impl ContextKey {
    /// Wraps a raw digest.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw digest.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Key of a node with the given filter, streams and options.
    pub fn for_node(
        filter: &dyn Filter,
        inputs: &[StreamDesc],
        output: &StreamDesc,
        options: &Options,
    ) -> Self {
        let mut builder = KeyBuilder::new();
        builder.field(b"reg", filter.registration().as_bytes());
        for input in inputs {
            builder.stream(b"in", input);
        }
        builder.stream(b"out", output);
        for (key, value) in options.iter() {
            if filter.affects_context(key) {
                builder.field(b"opt", key.as_bytes());
                builder.field(b"val", &value.identity());
            }
        }
        builder.finish()
    }
}

impl fmt::Display for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for ContextKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // first 8 bytes are plenty to tell keys apart in logs
        write!(f, "ContextKey(")?;
        for byte in &self.0[..8] {
            write!(f, "{byte:02x}")?;
        }
        write!(f, ")")
    }
}

/// Incremental builder of a [`ContextKey`].
#[derive(Clone, Default)]
pub struct KeyBuilder {
    hasher: Sha256,
}

impl fmt::Debug for KeyBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyBuilder").finish_non_exhaustive()
    }
}

impl KeyBuilder {
    /// Starts an empty key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a labelled field.
    pub fn field(&mut self, label: &[u8], bytes: &[u8]) -> &mut Self {
        self.hasher.update((label.len() as u32).to_le_bytes());
        self.hasher.update(label);
        self.hasher.update((bytes.len() as u64).to_le_bytes());
        self.hasher.update(bytes);
        self
    }

    /// Appends a stream's layout and profile identity.
    pub fn stream(&mut self, label: &[u8], desc: &StreamDesc) -> &mut Self {
        self.field(label, &desc.layout.encode().to_le_bytes());
        match &desc.profile {
            Some(profile) => self.field(b"profile", &profile.stable_hash()),
            None => self.field(b"no-profile", &[]),
        }
    }

    /// Finishes the digest.
    pub fn finish(self) -> ContextKey {
        ContextKey(self.hasher.finalize().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_boundaries_matter() {
        let mut a = KeyBuilder::new();
        a.field(b"x", b"ab").field(b"x", b"c");
        let mut b = KeyBuilder::new();
        b.field(b"x", b"a").field(b"x", b"bc");
        assert_ne!(a.finish(), b.finish());
    }

    #[test]
    fn test_display_is_hex() {
        let key = ContextKey::from_bytes([0xab; 32]);
        assert_eq!(key.to_string().len(), 64);
        assert!(key.to_string().starts_with("abab"));
        assert_eq!(format!("{key:?}"), "ContextKey(abababababababab)");
    }
}
