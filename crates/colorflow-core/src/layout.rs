//! Pixel layout descriptors and their packed wire encoding.
//!
//! A [`PixelLayout`] says how one pixel is laid out in memory: how many
//! color and extra (alpha) channels it has, the [`SampleType`] of each
//! channel, and a set of ordering flags. Internally the engine always works
//! with the structured form; the packed `u32` form exists for numeric
//! backends that describe formats that way.
//!
//! # Wire encoding
//!
//! The bit positions match the Little CMS 2 `TYPE_*` pixel format words,
//! so an encoded layout can be handed to lcms2 directly:
//!
//! ```text
//! bits  0..=2   bytes per sample (0 = 8 bytes)
//! bits  3..=6   color channels
//! bits  7..=9   extra channels
//! bit   10      swap (channels stored in reverse order)
//! bit   11      byte order (samples stored big-endian)
//! bit   12      planar
//! bit   13      reverted polarity (0 = full intensity)
//! bit   14      swap first (last channel stored first)
//! bits 16..=20  colorspace tag
//! bit   22      floating point
//! bit   23      premultiplied alpha
//! ```
//!
//! ```rust
//! use colorflow_core::{PixelLayout, SampleType, ColorSpaceTag};
//!
//! let rgba = PixelLayout::new(ColorSpaceTag::RGB, SampleType::U8, 3)
//!     .unwrap()
//!     .with_extra(1)
//!     .unwrap();
//! assert_eq!(rgba.channels(), 4);
//! assert_eq!(PixelLayout::decode(rgba.encode()).unwrap(), rgba);
//! ```

use crate::{EngineError, EngineResult};

const BYTES_SHIFT: u32 = 0;
const CHANNELS_SHIFT: u32 = 3;
const EXTRA_SHIFT: u32 = 7;
const SWAP_BIT: u32 = 1 << 10;
const ENDIAN_BIT: u32 = 1 << 11;
const PLANAR_BIT: u32 = 1 << 12;
const FLAVOR_BIT: u32 = 1 << 13;
const SWAP_FIRST_BIT: u32 = 1 << 14;
const COLORSPACE_SHIFT: u32 = 16;
const FLOAT_BIT: u32 = 1 << 22;
const PREMUL_BIT: u32 = 1 << 23;

const MAX_COLOR: u8 = 15;
const MAX_EXTRA: u8 = 7;

/// Numeric type of a single channel sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SampleType {
    /// 8-bit unsigned integer.
    #[default]
    U8,
    /// 16-bit unsigned integer.
    U16,
    /// 16-bit half-precision float.
    F16,
    /// 32-bit float.
    F32,
    /// 64-bit float.
    F64,
}

impl SampleType {
    /// All sample types, narrowest first.
    pub const ALL: [SampleType; 5] = [
        SampleType::U8,
        SampleType::U16,
        SampleType::F16,
        SampleType::F32,
        SampleType::F64,
    ];

    /// Bytes per sample.
    #[inline]
    pub const fn bytes(&self) -> usize {
        match self {
            Self::U8 => 1,
            Self::U16 | Self::F16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Whether this is a floating-point type.
    #[inline]
    pub const fn is_float(&self) -> bool {
        matches!(self, Self::F16 | Self::F32 | Self::F64)
    }

    /// Largest code value for integer types, 1.0 for floats.
    #[inline]
    pub const fn max_value(&self) -> f64 {
        match self {
            Self::U8 => 255.0,
            Self::U16 => 65535.0,
            _ => 1.0,
        }
    }

    /// Parses the short names used in options: `u8`, `u16`, `f16`, `f32`, `f64`.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "u8" | "uint8" => Some(Self::U8),
            "u16" | "uint16" => Some(Self::U16),
            "f16" | "half" => Some(Self::F16),
            "f32" | "float" => Some(Self::F32),
            "f64" | "double" => Some(Self::F64),
            _ => None,
        }
    }

    /// Short name, the inverse of [`SampleType::parse`].
    pub const fn name(&self) -> &'static str {
        match self {
            Self::U8 => "u8",
            Self::U16 => "u16",
            Self::F16 => "f16",
            Self::F32 => "f32",
            Self::F64 => "f64",
        }
    }

    fn bytes_field(&self) -> u32 {
        match self {
            Self::F64 => 0,
            other => other.bytes() as u32,
        }
    }

    fn from_fields(bytes: u32, float: bool) -> Option<Self> {
        match (bytes, float) {
            (1, false) => Some(Self::U8),
            (2, false) => Some(Self::U16),
            (2, true) => Some(Self::F16),
            (4, true) => Some(Self::F32),
            (0, true) => Some(Self::F64),
            _ => None,
        }
    }
}

impl std::fmt::Display for SampleType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Colorspace tag carried in the layout (5 bits).
///
/// Values follow the lcms2 `PT_*` numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ColorSpaceTag(u8);

impl ColorSpaceTag {
    /// Unspecified.
    pub const ANY: Self = Self(0);
    /// Grayscale.
    pub const GRAY: Self = Self(3);
    /// RGB.
    pub const RGB: Self = Self(4);
    /// CMY.
    pub const CMY: Self = Self(5);
    /// CMYK.
    pub const CMYK: Self = Self(6);
    /// YCbCr.
    pub const YCBCR: Self = Self(7);
    /// CIE XYZ.
    pub const XYZ: Self = Self(9);
    /// CIE Lab.
    pub const LAB: Self = Self(10);

    /// Creates a tag from its raw value; values above 31 do not fit.
    #[inline]
    pub const fn new(raw: u8) -> Option<Self> {
        if raw < 32 { Some(Self(raw)) } else { None }
    }

    /// Raw tag value.
    #[inline]
    pub const fn raw(&self) -> u8 {
        self.0
    }

    /// Number of color channels implied by the tag, if fixed.
    pub const fn channels(&self) -> Option<u8> {
        match self.0 {
            3 => Some(1),
            4 | 5 | 7 | 9 | 10 => Some(3),
            6 => Some(4),
            _ => None,
        }
    }
}

/// Structured description of one pixel's memory layout.
///
/// Invariants (enforced by the constructors): 1 to 15 color channels,
/// at most 7 extra channels, and therefore
/// `channels() == color_channels() + extra_channels()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelLayout {
    colorspace: ColorSpaceTag,
    sample: SampleType,
    color: u8,
    extra: u8,
    swap: bool,
    big_endian: bool,
    planar: bool,
    reverted: bool,
    swap_first: bool,
    premultiplied: bool,
}

impl PixelLayout {
    /// Creates an interleaved layout with `color` color channels and no extras.
    pub fn new(colorspace: ColorSpaceTag, sample: SampleType, color: u8) -> EngineResult<Self> {
        if color == 0 || color > MAX_COLOR {
            return Err(EngineError::incompatible_data(format!(
                "color channel count {color} outside 1..={MAX_COLOR}"
            )));
        }
        Ok(Self {
            colorspace,
            sample,
            color,
            extra: 0,
            swap: false,
            big_endian: false,
            planar: false,
            reverted: false,
            swap_first: false,
            premultiplied: false,
        })
    }

    /// 8-bit grayscale.
    pub fn gray8() -> Self {
        Self::fixed(ColorSpaceTag::GRAY, SampleType::U8, 1)
    }

    /// 8-bit RGB.
    pub fn rgb8() -> Self {
        Self::fixed(ColorSpaceTag::RGB, SampleType::U8, 3)
    }

    /// 8-bit RGB with alpha.
    pub fn rgba8() -> Self {
        Self {
            extra: 1,
            ..Self::rgb8()
        }
    }

    /// 16-bit RGB.
    pub fn rgb16() -> Self {
        Self::fixed(ColorSpaceTag::RGB, SampleType::U16, 3)
    }

    /// 32-bit float RGB.
    pub fn rgb_f32() -> Self {
        Self::fixed(ColorSpaceTag::RGB, SampleType::F32, 3)
    }

    /// 8-bit CMYK.
    pub fn cmyk8() -> Self {
        Self::fixed(ColorSpaceTag::CMYK, SampleType::U8, 4)
    }

    const fn fixed(colorspace: ColorSpaceTag, sample: SampleType, color: u8) -> Self {
        Self {
            colorspace,
            sample,
            color,
            extra: 0,
            swap: false,
            big_endian: false,
            planar: false,
            reverted: false,
            swap_first: false,
            premultiplied: false,
        }
    }

    /// Returns a copy with `extra` non-color channels.
    pub fn with_extra(self, extra: u8) -> EngineResult<Self> {
        if extra > MAX_EXTRA {
            return Err(EngineError::incompatible_data(format!(
                "extra channel count {extra} exceeds {MAX_EXTRA}"
            )));
        }
        Ok(Self { extra, ..self })
    }

    /// Returns a copy with `color` color channels.
    pub fn with_color_channels(self, color: u8) -> EngineResult<Self> {
        let fresh = Self::new(self.colorspace, self.sample, color)?;
        Ok(Self { color: fresh.color, ..self })
    }

    /// Returns a copy with a different sample type.
    pub fn with_sample(self, sample: SampleType) -> Self {
        Self { sample, ..self }
    }

    /// Returns a copy with a different colorspace tag.
    pub fn with_colorspace(self, colorspace: ColorSpaceTag) -> Self {
        Self { colorspace, ..self }
    }

    /// Returns a copy with channels stored in reverse order.
    pub fn with_swap(self, swap: bool) -> Self {
        Self { swap, ..self }
    }

    /// Returns a copy with big-endian samples.
    pub fn with_big_endian(self, big_endian: bool) -> Self {
        Self { big_endian, ..self }
    }

    /// Returns a copy with planar storage.
    pub fn with_planar(self, planar: bool) -> Self {
        Self { planar, ..self }
    }

    /// Returns a copy with reverted polarity.
    pub fn with_reverted(self, reverted: bool) -> Self {
        Self { reverted, ..self }
    }

    /// Returns a copy with the last channel stored first.
    pub fn with_swap_first(self, swap_first: bool) -> Self {
        Self { swap_first, ..self }
    }

    /// Returns a copy with premultiplied alpha.
    pub fn with_premultiplied(self, premultiplied: bool) -> Self {
        Self {
            premultiplied,
            ..self
        }
    }

    /// Colorspace tag.
    #[inline]
    pub fn colorspace(&self) -> ColorSpaceTag {
        self.colorspace
    }

    /// Sample type.
    #[inline]
    pub fn sample(&self) -> SampleType {
        self.sample
    }

    /// Total channel count (color + extra).
    #[inline]
    pub fn channels(&self) -> u8 {
        self.color + self.extra
    }

    /// Color channel count.
    #[inline]
    pub fn color_channels(&self) -> u8 {
        self.color
    }

    /// Extra (alpha and other non-color) channel count.
    #[inline]
    pub fn extra_channels(&self) -> u8 {
        self.extra
    }

    /// Channels stored in reverse order.
    #[inline]
    pub fn is_swapped(&self) -> bool {
        self.swap
    }

    /// Samples stored big-endian.
    #[inline]
    pub fn is_big_endian(&self) -> bool {
        self.big_endian
    }

    /// Planar storage.
    #[inline]
    pub fn is_planar(&self) -> bool {
        self.planar
    }

    /// Reverted polarity.
    #[inline]
    pub fn is_reverted(&self) -> bool {
        self.reverted
    }

    /// Last channel stored first.
    #[inline]
    pub fn is_swap_first(&self) -> bool {
        self.swap_first
    }

    /// Premultiplied alpha.
    #[inline]
    pub fn is_premultiplied(&self) -> bool {
        self.premultiplied
    }

    /// Bytes per sample.
    #[inline]
    pub fn bytes_per_sample(&self) -> usize {
        self.sample.bytes()
    }

    /// Bytes per pixel.
    #[inline]
    pub fn bytes_per_pixel(&self) -> usize {
        self.channels() as usize * self.sample.bytes()
    }

    /// Bytes used by `width` pixels of one row.
    #[inline]
    pub fn row_bytes(&self, width: u32) -> usize {
        width as usize * self.bytes_per_pixel()
    }

    /// Packs the layout into its wire form.
    pub fn encode(&self) -> u32 {
        let mut bits = (self.sample.bytes_field() << BYTES_SHIFT)
            | ((self.color as u32) << CHANNELS_SHIFT)
            | ((self.extra as u32) << EXTRA_SHIFT)
            | ((self.colorspace.raw() as u32) << COLORSPACE_SHIFT);
        if self.sample.is_float() {
            bits |= FLOAT_BIT;
        }
        for (set, bit) in [
            (self.swap, SWAP_BIT),
            (self.big_endian, ENDIAN_BIT),
            (self.planar, PLANAR_BIT),
            (self.reverted, FLAVOR_BIT),
            (self.swap_first, SWAP_FIRST_BIT),
            (self.premultiplied, PREMUL_BIT),
        ] {
            if set {
                bits |= bit;
            }
        }
        bits
    }

    /// Unpacks a wire-form layout.
    ///
    /// Fails for sample sizes or channel counts the engine cannot represent.
    pub fn decode(bits: u32) -> EngineResult<Self> {
        let bytes = (bits >> BYTES_SHIFT) & 0x7;
        let float = bits & FLOAT_BIT != 0;
        let sample = SampleType::from_fields(bytes, float).ok_or_else(|| {
            EngineError::incompatible_data(format!(
                "unsupported sample encoding: {bytes} bytes, float={float}"
            ))
        })?;
        let color = ((bits >> CHANNELS_SHIFT) & 0xF) as u8;
        let extra = ((bits >> EXTRA_SHIFT) & 0x7) as u8;
        let colorspace = ColorSpaceTag(((bits >> COLORSPACE_SHIFT) & 0x1F) as u8);

        let layout = Self::new(colorspace, sample, color)?
            .with_extra(extra)?
            .with_swap(bits & SWAP_BIT != 0)
            .with_big_endian(bits & ENDIAN_BIT != 0)
            .with_planar(bits & PLANAR_BIT != 0)
            .with_reverted(bits & FLAVOR_BIT != 0)
            .with_swap_first(bits & SWAP_FIRST_BIT != 0)
            .with_premultiplied(bits & PREMUL_BIT != 0);
        Ok(layout)
    }

    /// Stored position of logical channel `channel` within a pixel (or
    /// the plane index, for planar layouts).
    ///
    /// Logical order is color channels then extras. `swap_first` stores the
    /// last logical channel first; `swap` then reverses the stored order.
    pub fn channel_position(&self, channel: u8) -> usize {
        let n = self.channels() as usize;
        let c = channel as usize % n.max(1);
        let mut pos = if self.swap_first { (c + 1) % n } else { c };
        if self.swap {
            pos = n - 1 - pos;
        }
        pos
    }
}

impl Default for PixelLayout {
    fn default() -> Self {
        Self::rgb8()
    }
}

impl std::fmt::Display for PixelLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}c+{}x{}{}{}",
            self.color,
            self.extra,
            self.sample,
            if self.planar { " planar" } else { "" },
            if self.swap { " swapped" } else { "" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_layouts() -> Vec<PixelLayout> {
        let mut out = Vec::new();
        for sample in SampleType::ALL {
            for color in [1u8, 3, 4, 15] {
                for extra in [0u8, 1, 7] {
                    for flags in 0u8..64 {
                        let layout = PixelLayout::new(ColorSpaceTag::RGB, sample, color)
                            .unwrap()
                            .with_extra(extra)
                            .unwrap()
                            .with_swap(flags & 1 != 0)
                            .with_big_endian(flags & 2 != 0)
                            .with_planar(flags & 4 != 0)
                            .with_reverted(flags & 8 != 0)
                            .with_swap_first(flags & 16 != 0)
                            .with_premultiplied(flags & 32 != 0);
                        out.push(layout);
                    }
                }
            }
        }
        out
    }

    #[test]
    fn test_round_trip_all() {
        for layout in all_layouts() {
            assert_eq!(PixelLayout::decode(layout.encode()).unwrap(), layout);
        }
    }

    #[test]
    fn test_round_trip_colorspaces() {
        for raw in 0..32u8 {
            let tag = ColorSpaceTag::new(raw).unwrap();
            let layout = PixelLayout::gray8().with_colorspace(tag);
            assert_eq!(PixelLayout::decode(layout.encode()).unwrap(), layout);
        }
        assert!(ColorSpaceTag::new(32).is_none());
    }

    #[test]
    fn test_lcms_compatible_words() {
        // TYPE_RGB_8 = COLORSPACE_SH(PT_RGB)|CHANNELS_SH(3)|BYTES_SH(1)
        assert_eq!(PixelLayout::rgb8().encode(), (4 << 16) | (3 << 3) | 1);
        // TYPE_RGBA_8
        assert_eq!(PixelLayout::rgba8().encode(), (4 << 16) | (1 << 7) | (3 << 3) | 1);
        // TYPE_RGB_FLT
        assert_eq!(PixelLayout::rgb_f32().encode(), (1 << 22) | (4 << 16) | (3 << 3) | 4);
    }

    #[test]
    fn test_decode_rejects_bad_fields() {
        // 3 bytes per sample
        assert!(PixelLayout::decode((3 << 3) | 3).is_err());
        // zero color channels
        assert!(PixelLayout::decode(1).is_err());
    }

    #[test]
    fn test_channel_invariant() {
        for layout in all_layouts() {
            assert!(layout.channels() >= layout.color_channels() + layout.extra_channels());
        }
        assert!(PixelLayout::rgb8().with_extra(8).is_err());
        assert!(PixelLayout::new(ColorSpaceTag::ANY, SampleType::U8, 16).is_err());
    }

    #[test]
    fn test_channel_position() {
        let rgba = PixelLayout::rgba8();
        assert_eq!(rgba.channel_position(0), 0);
        // ARGB
        let argb = rgba.with_swap_first(true);
        assert_eq!(argb.channel_position(3), 0);
        assert_eq!(argb.channel_position(0), 1);
        // BGR
        let bgr = PixelLayout::rgb8().with_swap(true);
        assert_eq!(bgr.channel_position(0), 2);
        assert_eq!(bgr.channel_position(2), 0);
    }
}
