//! Collaborator interfaces consumed by the engine.
//!
//! The engine does not parse ICC profiles or decode image files. It only
//! needs a few queries from those collaborators:
//!
//! - [`ProfileIdentity`] - a color profile reduced to its identity and
//!   channel layout
//! - [`ImageSource`] - the image at the root (or leaf) of a graph
//! - [`OpaqueHandle`] - any other shared resource a filter option refers to
//!
//! [`MemoryImage`] and [`NamedProfile`] are simple in-memory implementations.

use crate::{ColorSpaceTag, EngineError, EngineResult, PixelLayout};
use std::any::Any;
use std::fmt::Debug;
use std::sync::{Arc, PoisonError, RwLock};

/// Which header signature of a profile to query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureKind {
    /// Data colorspace (`'RGB '`, `'CMYK'`, ...).
    ColorSpace,
    /// Profile connection space (`'XYZ '` or `'Lab '`).
    Pcs,
    /// Device class (`'mntr'`, `'prtr'`, ...).
    Class,
}

/// ICC four-character signatures used by [`colorspace_from_signature`].
pub mod signature {
    /// `'GRAY'`
    pub const GRAY: u32 = 0x4752_4159;
    /// `'RGB '`
    pub const RGB: u32 = 0x5247_4220;
    /// `'CMY '`
    pub const CMY: u32 = 0x434D_5920;
    /// `'CMYK'`
    pub const CMYK: u32 = 0x434D_594B;
    /// `'YCbr'`
    pub const YCBCR: u32 = 0x5943_6272;
    /// `'XYZ '`
    pub const XYZ: u32 = 0x5859_5A20;
    /// `'Lab '`
    pub const LAB: u32 = 0x4C61_6220;
    /// `'mntr'`
    pub const DISPLAY: u32 = 0x6D6E_7472;
}

/// Maps an ICC colorspace signature onto a layout tag.
pub fn colorspace_from_signature(sig: u32) -> ColorSpaceTag {
    match sig {
        signature::GRAY => ColorSpaceTag::GRAY,
        signature::RGB => ColorSpaceTag::RGB,
        signature::CMY => ColorSpaceTag::CMY,
        signature::CMYK => ColorSpaceTag::CMYK,
        signature::YCBCR => ColorSpaceTag::YCBCR,
        signature::XYZ => ColorSpaceTag::XYZ,
        signature::LAB => ColorSpaceTag::LAB,
        _ => ColorSpaceTag::ANY,
    }
}

/// A color profile as seen by the engine.
///
/// Implementations are shared between threads and between nodes; dropping
/// the last `Arc` releases the profile.
pub trait ProfileIdentity: Send + Sync + Debug {
    /// Header signature of the given kind.
    fn signature(&self, kind: SignatureKind) -> u32;

    /// Number of color channels of the data colorspace.
    fn channel_count(&self) -> u8;

    /// Hash that is equal for identical profiles across runs.
    fn stable_hash(&self) -> Vec<u8>;

    /// Human-readable name.
    fn description(&self) -> String {
        String::new()
    }

    /// Serialized ICC data, for backends that need to open the profile.
    fn icc_data(&self) -> Option<&[u8]> {
        None
    }

    /// Layout tag of the data colorspace.
    fn colorspace(&self) -> ColorSpaceTag {
        colorspace_from_signature(self.signature(SignatureKind::ColorSpace))
    }
}

/// A shared resource referenced from filter options.
pub trait OpaqueHandle: Send + Sync + Debug {
    /// Hash that is equal for identical resources across runs.
    fn stable_hash(&self) -> Vec<u8>;

    /// Downcasting access for the filter that understands the handle.
    fn as_any(&self) -> &dyn Any;
}

/// An image at the root or leaf of a graph.
///
/// Rows are addressed whole; `set_line` replaces a complete row.
pub trait ImageSource: Send + Sync + Debug {
    /// Width in pixels.
    fn width(&self) -> u32;

    /// Height in pixels.
    fn height(&self) -> u32;

    /// Layout of the stored pixels.
    fn pixel_layout(&self) -> PixelLayout;

    /// Profile describing the pixel values, if any.
    fn profile(&self) -> Option<Arc<dyn ProfileIdentity>>;

    /// Copy of row `row`.
    fn get_line(&self, row: u32) -> EngineResult<Vec<u8>>;

    /// Replaces row `row`.
    fn set_line(&self, row: u32, data: &[u8]) -> EngineResult<()>;
}

/// Interleaved image kept in memory.
///
/// ```rust
/// use colorflow_core::{ImageSource, MemoryImage, PixelLayout};
///
/// let img = MemoryImage::from_vec(2, 2, PixelLayout::gray8(), vec![10, 20, 30, 40]).unwrap();
/// assert_eq!(img.get_line(1).unwrap(), vec![30, 40]);
/// ```
#[derive(Debug)]
pub struct MemoryImage {
    width: u32,
    height: u32,
    layout: PixelLayout,
    profile: Option<Arc<dyn ProfileIdentity>>,
    data: RwLock<Vec<u8>>,
}

impl MemoryImage {
    /// Creates a zero-filled image.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> Self {
        let len = layout.row_bytes(width) * height as usize;
        Self {
            width,
            height,
            layout,
            profile: None,
            data: RwLock::new(vec![0; len]),
        }
    }

    /// Wraps tightly packed pixel data.
    pub fn from_vec(
        width: u32,
        height: u32,
        layout: PixelLayout,
        data: Vec<u8>,
    ) -> EngineResult<Self> {
        let expected = layout.row_bytes(width) * height as usize;
        if data.len() != expected {
            return Err(EngineError::incompatible_data(format!(
                "expected {expected} bytes for {width}x{height} {layout}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            layout,
            profile: None,
            data: RwLock::new(data),
        })
    }

    /// Attaches a profile.
    pub fn with_profile(mut self, profile: Arc<dyn ProfileIdentity>) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Copy of all pixel data.
    pub fn to_vec(&self) -> Vec<u8> {
        self.data
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn row_range(&self, row: u32) -> EngineResult<std::ops::Range<usize>> {
        if row >= self.height {
            return Err(EngineError::not_found(format!(
                "row {row} of {}x{} image",
                self.width, self.height
            )));
        }
        let len = self.layout.row_bytes(self.width);
        let start = row as usize * len;
        Ok(start..start + len)
    }
}

impl ImageSource for MemoryImage {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_layout(&self) -> PixelLayout {
        self.layout
    }

    fn profile(&self) -> Option<Arc<dyn ProfileIdentity>> {
        self.profile.clone()
    }

    fn get_line(&self, row: u32) -> EngineResult<Vec<u8>> {
        let range = self.row_range(row)?;
        let data = self.data.read().unwrap_or_else(PoisonError::into_inner);
        Ok(data[range].to_vec())
    }

    fn set_line(&self, row: u32, line: &[u8]) -> EngineResult<()> {
        let range = self.row_range(row)?;
        if line.len() != range.len() {
            return Err(EngineError::incompatible_data(format!(
                "row of {} bytes, expected {}",
                line.len(),
                range.len()
            )));
        }
        let mut data = self.data.write().unwrap_or_else(PoisonError::into_inner);
        data[range].copy_from_slice(line);
        Ok(())
    }
}

/// A profile known only by name and colorspace.
///
/// Useful where no ICC backend is involved; two named profiles are the same
/// profile exactly when their names match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedProfile {
    name: String,
    colorspace: u32,
    channels: u8,
}

impl NamedProfile {
    /// Creates a profile for the ICC colorspace signature `colorspace`.
    pub fn new(name: impl Into<String>, colorspace: u32) -> Self {
        let channels = colorspace_from_signature(colorspace).channels().unwrap_or(0);
        Self {
            name: name.into(),
            colorspace,
            channels,
        }
    }
}

impl ProfileIdentity for NamedProfile {
    fn signature(&self, kind: SignatureKind) -> u32 {
        match kind {
            SignatureKind::ColorSpace => self.colorspace,
            SignatureKind::Pcs => signature::XYZ,
            SignatureKind::Class => signature::DISPLAY,
        }
    }

    fn channel_count(&self) -> u8 {
        self.channels
    }

    fn stable_hash(&self) -> Vec<u8> {
        self.name.as_bytes().to_vec()
    }

    fn description(&self) -> String {
        self.name.clone()
    }
}
