use super::{OFFSET, single_input};
use crate::filter::{Filter, RegionIo, SharedContext, StreamDesc};
use colorflow_core::{EngineError, EngineResult, Options, PixelLayout, SampleType, sample};

const OFFSET_OPTION: &str = "offset";

/// Built context of [`OffsetFilter`].
///
/// Integer samples are shifted by code values through a lookup table,
/// float samples by value.
#[derive(Debug, Clone, PartialEq)]
pub enum OffsetTable {
    /// 256 entries.
    U8(Vec<u8>),
    /// 65536 entries.
    U16(Vec<u16>),
    /// Added to every float sample.
    Float(f64),
}

impl OffsetTable {
    /// Builds the table for `sample` and `offset`.
    pub fn new(sample: SampleType, offset: f64) -> Self {
        match sample {
            SampleType::U8 => OffsetTable::U8(
                (0..=255u32)
                    .map(|v| (v as f64 + offset).round().clamp(0.0, 255.0) as u8)
                    .collect(),
            ),
            SampleType::U16 => OffsetTable::U16(
                (0..=65535u32)
                    .map(|v| (v as f64 + offset).round().clamp(0.0, 65535.0) as u16)
                    .collect(),
            ),
            _ => OffsetTable::Float(offset),
        }
    }

    fn apply(&self, layout: &PixelLayout, bytes: &mut [u8]) {
        match self {
            OffsetTable::U8(table) => bytes[0] = table[bytes[0] as usize],
            OffsetTable::U16(table) => {
                let raw = [bytes[0], bytes[1]];
                let v = if layout.is_big_endian() {
                    u16::from_be_bytes(raw)
                } else {
                    u16::from_le_bytes(raw)
                };
                let out = table[v as usize];
                let out = if layout.is_big_endian() {
                    out.to_be_bytes()
                } else {
                    out.to_le_bytes()
                };
                bytes[..2].copy_from_slice(&out);
            }
            OffsetTable::Float(offset) => {
                let v = sample::decode_f64(layout.sample(), layout.is_big_endian(), bytes);
                sample::encode_f64(layout.sample(), layout.is_big_endian(), v + offset, bytes);
            }
        }
    }
}

/// Adds option `offset` (default 0) to every color sample; extra channels
/// pass unchanged. Integer results are clamped.
#[derive(Debug, Clone, Copy, Default)]
pub struct OffsetFilter;

impl Filter for OffsetFilter {
    fn registration(&self) -> &str {
        OFFSET
    }

    fn description(&self) -> &str {
        "constant offset"
    }

    fn output_desc(&self, inputs: &[StreamDesc], _options: &Options) -> EngineResult<StreamDesc> {
        single_input(inputs).cloned()
    }

    fn needs_context(&self) -> bool {
        true
    }

    fn affects_context(&self, key: &str) -> bool {
        key == OFFSET_OPTION
    }

    fn build_context(
        &self,
        _inputs: &[StreamDesc],
        output: &StreamDesc,
        options: &Options,
    ) -> EngineResult<SharedContext> {
        let offset = options.get_f64(OFFSET_OPTION)?.unwrap_or(0.0);
        Ok(std::sync::Arc::new(OffsetTable::new(output.layout.sample(), offset)))
    }

    fn execute(
        &self,
        context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        let table = context
            .and_then(|c| c.downcast_ref::<OffsetTable>())
            .ok_or_else(|| EngineError::not_found("offset table"))?;
        let layout = io.output_layout();
        let width = io.rect().width as usize;
        let bps = layout.bytes_per_sample();
        let color = layout.color_channels();
        io.map_rows(|_, src, dst| {
            dst.copy_from_slice(src);
            for x in 0..width {
                for c in 0..color {
                    let at = sample::offset(&layout, width, x, c);
                    table.apply(&layout, &mut dst[at..at + bps]);
                }
            }
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_u8_table_clamps() {
        let OffsetTable::U8(table) = OffsetTable::new(SampleType::U8, 5.0) else {
            panic!("expected u8 table");
        };
        assert_eq!(table[10], 15);
        assert_eq!(table[253], 255);
        let OffsetTable::U8(table) = OffsetTable::new(SampleType::U8, -20.0) else {
            panic!("expected u8 table");
        };
        assert_eq!(table[10], 0);
    }

    #[test]
    fn test_u16_big_endian() {
        let layout = PixelLayout::gray8()
            .with_sample(SampleType::U16)
            .with_big_endian(true);
        let table = OffsetTable::new(SampleType::U16, 256.0);
        let mut bytes = [0x01, 0x00];
        table.apply(&layout, &mut bytes);
        assert_eq!(bytes, [0x02, 0x00]);
    }

    #[test]
    fn test_f64_zero_offset_is_exact() {
        let layout = PixelLayout::gray8().with_sample(SampleType::F64);
        let table = OffsetTable::new(SampleType::F64, 0.0);
        assert_eq!(table, OffsetTable::Float(0.0));
        let mut bytes = 0.1f64.to_le_bytes();
        table.apply(&layout, &mut bytes);
        assert_eq!(f64::from_le_bytes(bytes), 0.1);
    }

    #[test]
    fn test_only_context_relevant_option() {
        assert!(OffsetFilter.affects_context("offset"));
        assert!(!OffsetFilter.affects_context("label"));
    }
}
