use super::{DEPTH, single_input};
use crate::filter::{Filter, RegionIo, SharedContext, StreamDesc};
use colorflow_core::{EngineError, EngineResult, Options, SampleType};

const SAMPLE_OPTION: &str = "sample_type";

/// Converts samples to the type named by option `sample_type`.
///
/// Values are normalized on the way, so `u8` 255 becomes `u16` 65535 and
/// `f32` 1.0.
#[derive(Debug, Clone, Copy, Default)]
pub struct DepthFilter;

fn target_sample(options: &Options) -> EngineResult<SampleType> {
    let name = options.find_string(SAMPLE_OPTION).ok_or_else(|| {
        EngineError::incompatible_option(SAMPLE_OPTION, "a target sample type is required")
    })?;
    SampleType::parse(name).ok_or_else(|| {
        EngineError::incompatible_option(SAMPLE_OPTION, format!("unknown sample type `{name}`"))
    })
}

impl Filter for DepthFilter {
    fn registration(&self) -> &str {
        DEPTH
    }

    fn description(&self) -> &str {
        "sample type conversion"
    }

    fn output_desc(&self, inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc> {
        let input = single_input(inputs)?;
        let sample = target_sample(options)?;
        Ok(StreamDesc {
            layout: input.layout.with_sample(sample).with_big_endian(false),
            ..input.clone()
        })
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        io.map_pixels(|src, dst| {
            dst.copy_from_slice(src);
            Ok(())
        })
    }
}
