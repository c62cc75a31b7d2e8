//! # colorflow-icc
//!
//! ICC profile support for colorflow graphs, built on Little CMS 2.
//!
//! - [`Profile`] - an open lcms2 profile (file, ICC bytes, or synthesized)
//! - [`IccIdentity`] - the thread-shareable [`ProfileIdentity`] the graph
//!   keys contexts by
//! - [`IccFilter`] - the `//colour/icc.lcms2` filter converting a stream
//!   from its profile into `profile_out`
//!
//! # Example
//!
//! ```rust
//! use colorflow_core::{MemoryImage, OptionValue, Options, PixelLayout};
//! use colorflow_graph::{Conversion, Engine, EngineConfig};
//! use colorflow_icc::{ICC_LCMS2, IccIdentity, register};
//! use std::sync::Arc;
//!
//! let mut engine = Engine::with_builtins(EngineConfig::default());
//! register(&mut engine).unwrap();
//!
//! let srgb = IccIdentity::srgb().unwrap().shared();
//! let image = MemoryImage::from_vec(1, 1, PixelLayout::rgb8(), vec![200, 100, 50])
//!     .unwrap()
//!     .with_profile(srgb.clone());
//! let options = Options::new().with("profile_out", OptionValue::Profile(srgb));
//!
//! let conv = Conversion::chain(engine.shared(), Arc::new(image), &[(ICC_LCMS2, options)], None).unwrap();
//! let mut ticket = conv.full_ticket().unwrap();
//! conv.run_pixels(&mut ticket).unwrap();
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

mod error;
mod filter;
mod identity;
mod profile;
mod standard;

pub use error::{IccError, IccResult};
pub use filter::{
    BLACK_POINT_COMPENSATION, ICC_LCMS2, IccFilter, IccTransform, PROFILE_OUT, RENDERING_INTENT,
    SAMPLE_TYPE,
};
pub use identity::IccIdentity;
pub use profile::Profile;
pub use standard::StandardProfile;

use colorflow_core::EngineResult;
use colorflow_graph::Engine;
use std::sync::Arc;

/// Registers [`IccFilter`] with an engine.
pub fn register(engine: &mut Engine) -> EngineResult<()> {
    engine.register(Arc::new(IccFilter))
}

/// Rendering intent for color transformations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Intent {
    /// Compresses the source gamut into the destination.
    #[default]
    Perceptual,
    /// Clips out-of-gamut colors, white mapped to white.
    RelativeColorimetric,
    /// Favors saturation over accuracy.
    Saturation,
    /// Clips out-of-gamut colors without white point adaptation.
    AbsoluteColorimetric,
}

impl Intent {
    /// Parses an option value: a name or the ICC intent number.
    ///
    /// ```rust
    /// use colorflow_icc::Intent;
    ///
    /// assert_eq!(Intent::parse("relative"), Some(Intent::RelativeColorimetric));
    /// assert_eq!(Intent::parse("3"), Some(Intent::AbsoluteColorimetric));
    /// assert_eq!(Intent::parse("vivid"), None);
    /// ```
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "perceptual" | "0" => Some(Intent::Perceptual),
            "relative" | "relative_colorimetric" | "1" => Some(Intent::RelativeColorimetric),
            "saturation" | "2" => Some(Intent::Saturation),
            "absolute" | "absolute_colorimetric" | "3" => Some(Intent::AbsoluteColorimetric),
            _ => None,
        }
    }
}

impl From<Intent> for lcms2::Intent {
    fn from(intent: Intent) -> Self {
        match intent {
            Intent::Perceptual => lcms2::Intent::Perceptual,
            Intent::RelativeColorimetric => lcms2::Intent::RelativeColorimetric,
            Intent::Saturation => lcms2::Intent::Saturation,
            Intent::AbsoluteColorimetric => lcms2::Intent::AbsoluteColorimetric,
        }
    }
}
