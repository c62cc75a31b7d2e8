//! Thread-shareable profile identities.

use crate::{IccResult, Profile, StandardProfile};
use colorflow_core::{ProfileIdentity, SignatureKind};
use sha2::{Digest, Sha256};
use std::path::Path;
use std::sync::Arc;

/// Header bytes left out of the identity hash: creation date/time, and
/// the embedded profile id.
const VOLATILE_HEADER: [std::ops::Range<usize>; 2] = [24..36, 84..100];

/// A profile reduced to its serialized ICC data and header signatures.
///
/// Two identities hash the same when their ICC data matches outside the
/// creation timestamp and profile id, so a synthesized profile keeps its
/// identity across runs.
///
/// ```rust
/// use colorflow_core::ProfileIdentity;
/// use colorflow_icc::IccIdentity;
///
/// let a = IccIdentity::srgb().unwrap();
/// let b = IccIdentity::srgb().unwrap();
/// assert_eq!(a.stable_hash(), b.stable_hash());
/// assert_eq!(a.channel_count(), 3);
/// ```
#[derive(Clone)]
pub struct IccIdentity {
    icc: Vec<u8>,
    hash: [u8; 32],
    color_space: u32,
    pcs: u32,
    class: u32,
    channels: u8,
    description: String,
}

impl IccIdentity {
    /// Captures an open profile.
    pub fn new(profile: &Profile) -> IccResult<Self> {
        let icc = profile.to_icc()?;
        Ok(Self {
            hash: hash_icc(&icc),
            icc,
            color_space: profile.color_space_signature(),
            pcs: profile.pcs_signature(),
            class: profile.class_signature(),
            channels: profile.channel_count(),
            description: profile.description(),
        })
    }

    /// Validates and captures raw ICC data.
    pub fn from_icc(data: &[u8]) -> IccResult<Self> {
        let profile = Profile::from_icc(data)?;
        let mut identity = Self::new(&profile)?;
        // keep the caller's bytes, lcms may re-serialize differently
        identity.hash = hash_icc(data);
        identity.icc = data.to_vec();
        Ok(identity)
    }

    /// Loads an ICC file.
    pub fn from_file(path: impl AsRef<Path>) -> IccResult<Self> {
        let data = std::fs::read(path)?;
        Self::from_icc(&data)
    }

    /// The sRGB profile.
    pub fn srgb() -> IccResult<Self> {
        Self::new(&Profile::srgb())
    }

    /// A standard profile.
    pub fn standard(standard: StandardProfile) -> IccResult<Self> {
        Self::new(&standard.to_profile()?)
    }

    /// Opens the profile for building transforms.
    pub fn open(&self) -> IccResult<Profile> {
        Profile::from_icc(&self.icc)
    }

    /// Serialized ICC data.
    pub fn icc(&self) -> &[u8] {
        &self.icc
    }

    /// Wraps the identity for use in options and images.
    pub fn shared(self) -> Arc<dyn ProfileIdentity> {
        Arc::new(self)
    }
}

fn hash_icc(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    let mut last = 0;
    for range in VOLATILE_HEADER {
        if data.len() < range.end {
            break;
        }
        hasher.update(&data[last..range.start]);
        last = range.end;
    }
    hasher.update(&data[last..]);
    hasher.finalize().into()
}

impl ProfileIdentity for IccIdentity {
    fn signature(&self, kind: SignatureKind) -> u32 {
        match kind {
            SignatureKind::ColorSpace => self.color_space,
            SignatureKind::Pcs => self.pcs,
            SignatureKind::Class => self.class,
        }
    }

    fn channel_count(&self) -> u8 {
        self.channels
    }

    fn stable_hash(&self) -> Vec<u8> {
        self.hash.to_vec()
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn icc_data(&self) -> Option<&[u8]> {
        Some(&self.icc)
    }
}

impl std::fmt::Debug for IccIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IccIdentity")
            .field("description", &self.description)
            .field("bytes", &self.icc.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorflow_core::ColorSpaceTag;
    use colorflow_core::provider::signature;

    #[test]
    fn test_signatures() {
        let srgb = IccIdentity::srgb().unwrap();
        assert_eq!(srgb.signature(SignatureKind::ColorSpace), signature::RGB);
        assert_eq!(srgb.signature(SignatureKind::Pcs), signature::XYZ);
        assert_eq!(srgb.colorspace(), ColorSpaceTag::RGB);
        assert!(srgb.icc_data().is_some());
    }

    #[test]
    fn test_hash_ignores_timestamp() {
        let a = IccIdentity::srgb().unwrap();
        let mut bytes = a.icc().to_vec();
        bytes[24..36].fill(0xAB);
        assert_eq!(hash_icc(&bytes), a.hash);

        bytes[40] ^= 0xFF;
        assert_ne!(hash_icc(&bytes), a.hash);
    }

    #[test]
    fn test_distinct_profiles_differ() {
        let srgb = IccIdentity::srgb().unwrap();
        let linear = IccIdentity::standard(StandardProfile::LinearSrgb).unwrap();
        assert_ne!(srgb.stable_hash(), linear.stable_hash());
    }

    #[test]
    fn test_from_icc_reopens() {
        let srgb = IccIdentity::srgb().unwrap();
        let copy = IccIdentity::from_icc(srgb.icc()).unwrap();
        assert_eq!(copy.stable_hash(), srgb.stable_hash());
        assert!(copy.open().unwrap().is_rgb());
    }
}
