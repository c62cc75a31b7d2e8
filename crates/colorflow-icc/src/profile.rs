//! lcms2 profile wrapper.

use crate::{IccError, IccResult, StandardProfile};
use lcms2::{CIExyY, Profile as LcmsProfile, ToneCurve};
use std::path::Path;

/// An open ICC profile.
///
/// Profiles can be loaded from files, created from raw ICC data, or
/// generated from a [`StandardProfile`]. An open profile is not shared
/// between threads; [`IccIdentity`](crate::IccIdentity) is the shareable
/// form the graph works with.
///
/// ```rust
/// use colorflow_icc::Profile;
///
/// let srgb = Profile::srgb();
/// assert!(srgb.is_rgb());
/// assert_eq!(srgb.channel_count(), 3);
/// ```
pub struct Profile {
    pub(crate) inner: LcmsProfile,
}

impl Profile {
    /// Loads a profile from an ICC file.
    pub fn from_file(path: &Path) -> IccResult<Self> {
        let inner = LcmsProfile::new_file(path)
            .map_err(|e| IccError::LoadFailed(format!("{}: {}", path.display(), e)))?;
        Ok(Self { inner })
    }

    /// Opens raw ICC data.
    pub fn from_icc(data: &[u8]) -> IccResult<Self> {
        let inner =
            LcmsProfile::new_icc(data).map_err(|e| IccError::InvalidProfile(e.to_string()))?;
        Ok(Self { inner })
    }

    /// The IEC 61966-2-1 sRGB profile.
    pub fn srgb() -> Self {
        Self {
            inner: LcmsProfile::new_srgb(),
        }
    }

    /// Creates a profile from a standard specification.
    pub fn from_standard(standard: StandardProfile) -> IccResult<Self> {
        standard.to_profile()
    }

    /// Grayscale profile with a D50 white point and the given gamma.
    pub fn gray(gamma: f64) -> IccResult<Self> {
        let curve = ToneCurve::new(gamma);
        let inner = LcmsProfile::new_gray(&CIExyY::d50(), &curve)
            .map_err(|e| IccError::CreateFailed(e.to_string()))?;
        Ok(Self { inner })
    }

    /// Profile description, empty if the profile has none.
    pub fn description(&self) -> String {
        self.inner
            .info(lcms2::InfoType::Description, lcms2::Locale::none())
            .unwrap_or_default()
    }

    /// Data colorspace signature.
    pub fn color_space_signature(&self) -> u32 {
        self.inner.color_space() as u32
    }

    /// Profile connection space signature.
    pub fn pcs_signature(&self) -> u32 {
        self.inner.pcs() as u32
    }

    /// Device class signature.
    pub fn class_signature(&self) -> u32 {
        self.inner.device_class() as u32
    }

    /// Number of color channels of the data colorspace; 0 if unknown.
    pub fn channel_count(&self) -> u8 {
        colorflow_core::provider::colorspace_from_signature(self.color_space_signature())
            .channels()
            .unwrap_or(0)
    }

    /// Returns true for RGB profiles.
    pub fn is_rgb(&self) -> bool {
        self.color_space_signature() == colorflow_core::provider::signature::RGB
    }

    /// Returns true for CMYK profiles.
    pub fn is_cmyk(&self) -> bool {
        self.color_space_signature() == colorflow_core::provider::signature::CMYK
    }

    /// Returns true for grayscale profiles.
    pub fn is_gray(&self) -> bool {
        self.color_space_signature() == colorflow_core::provider::signature::GRAY
    }

    /// Serializes the profile.
    pub fn to_icc(&self) -> IccResult<Vec<u8>> {
        self.inner
            .icc()
            .map_err(|e| IccError::CreateFailed(e.to_string()))
    }
}

impl std::fmt::Debug for Profile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Profile")
            .field("description", &self.description())
            .field("color_space", &format_args!("{:#010x}", self.color_space_signature()))
            .finish()
    }
}
