//! Conversion between stored samples and normalized floats.
//!
//! Filters that do arithmetic work on `f32` values in logical channel order
//! (color channels first, extras after). Integer samples are normalized to
//! `[0, 1]`; float samples pass through unchanged. Channel ordering flags,
//! byte order, planar storage and reverted polarity are resolved here so
//! filters never have to look at them.
//!
//! ```rust
//! use colorflow_core::{PixelLayout, sample};
//!
//! let bgr = PixelLayout::rgb8().with_swap(true);
//! let mut rgb = [0.0f32; 3];
//! sample::read_row(&bgr, &[0, 0, 255], 1, &mut rgb);
//! assert_eq!(rgb, [1.0, 0.0, 0.0]);
//! ```

use crate::{PixelLayout, SampleType};
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use half::f16;

/// Byte offset of logical `channel` of pixel `x` within a stored row.
#[inline]
pub fn offset(layout: &PixelLayout, width: usize, x: usize, channel: u8) -> usize {
    let pos = layout.channel_position(channel);
    let bps = layout.bytes_per_sample();
    if layout.is_planar() {
        (pos * width + x) * bps
    } else {
        (x * layout.channels() as usize + pos) * bps
    }
}

/// Reads one stored sample as a normalized value.
#[inline]
pub fn decode(sample: SampleType, big_endian: bool, bytes: &[u8]) -> f32 {
    match (sample, big_endian) {
        (SampleType::U8, _) => bytes[0] as f32 / 255.0,
        (SampleType::U16, false) => LittleEndian::read_u16(bytes) as f32 / 65535.0,
        (SampleType::U16, true) => BigEndian::read_u16(bytes) as f32 / 65535.0,
        (SampleType::F16, false) => f16::from_bits(LittleEndian::read_u16(bytes)).to_f32(),
        (SampleType::F16, true) => f16::from_bits(BigEndian::read_u16(bytes)).to_f32(),
        (SampleType::F32, false) => LittleEndian::read_f32(bytes),
        (SampleType::F32, true) => BigEndian::read_f32(bytes),
        (SampleType::F64, false) => LittleEndian::read_f64(bytes) as f32,
        (SampleType::F64, true) => BigEndian::read_f64(bytes) as f32,
    }
}

/// Reads one stored sample at full precision.
///
/// Same as [`decode`], except that `f64` samples are not narrowed.
#[inline]
pub fn decode_f64(sample: SampleType, big_endian: bool, bytes: &[u8]) -> f64 {
    match (sample, big_endian) {
        (SampleType::F64, false) => LittleEndian::read_f64(bytes),
        (SampleType::F64, true) => BigEndian::read_f64(bytes),
        _ => decode(sample, big_endian, bytes) as f64,
    }
}

/// Stores a value at full precision; the counterpart of [`decode_f64`].
#[inline]
pub fn encode_f64(sample: SampleType, big_endian: bool, value: f64, bytes: &mut [u8]) {
    match (sample, big_endian) {
        (SampleType::F64, false) => LittleEndian::write_f64(bytes, value),
        (SampleType::F64, true) => BigEndian::write_f64(bytes, value),
        _ => encode(sample, big_endian, value as f32, bytes),
    }
}

/// Stores a normalized value; integer types are clamped and rounded.
#[inline]
pub fn encode(sample: SampleType, big_endian: bool, value: f32, bytes: &mut [u8]) {
    match sample {
        SampleType::U8 => bytes[0] = (value.clamp(0.0, 1.0) * 255.0).round() as u8,
        SampleType::U16 => {
            let v = (value.clamp(0.0, 1.0) * 65535.0).round() as u16;
            if big_endian {
                BigEndian::write_u16(bytes, v)
            } else {
                LittleEndian::write_u16(bytes, v)
            }
        }
        SampleType::F16 => {
            let v = f16::from_f32(value).to_bits();
            if big_endian {
                BigEndian::write_u16(bytes, v)
            } else {
                LittleEndian::write_u16(bytes, v)
            }
        }
        SampleType::F32 => {
            if big_endian {
                BigEndian::write_f32(bytes, value)
            } else {
                LittleEndian::write_f32(bytes, value)
            }
        }
        SampleType::F64 => {
            if big_endian {
                BigEndian::write_f64(bytes, value as f64)
            } else {
                LittleEndian::write_f64(bytes, value as f64)
            }
        }
    }
}

/// Decodes `width` pixels of a stored row into `out`.
///
/// `out` receives `width * channels` values in logical order.
///
/// # Panics
///
/// Panics if `row` or `out` is too short.
pub fn read_row(layout: &PixelLayout, row: &[u8], width: usize, out: &mut [f32]) {
    let channels = layout.channels();
    let color = layout.color_channels();
    let bps = layout.bytes_per_sample();
    for x in 0..width {
        for c in 0..channels {
            let at = offset(layout, width, x, c);
            let mut v = decode(layout.sample(), layout.is_big_endian(), &row[at..at + bps]);
            if layout.is_reverted() && c < color {
                v = 1.0 - v;
            }
            out[x * channels as usize + c as usize] = v;
        }
    }
}

/// Encodes `width` pixels from logical-order values into a stored row.
///
/// # Panics
///
/// Panics if `row` or `input` is too short.
pub fn write_row(layout: &PixelLayout, input: &[f32], width: usize, row: &mut [u8]) {
    let channels = layout.channels();
    let color = layout.color_channels();
    let bps = layout.bytes_per_sample();
    for x in 0..width {
        for c in 0..channels {
            let mut v = input[x * channels as usize + c as usize];
            if layout.is_reverted() && c < color {
                v = 1.0 - v;
            }
            let at = offset(layout, width, x, c);
            encode(layout.sample(), layout.is_big_endian(), v, &mut row[at..at + bps]);
        }
    }
}
