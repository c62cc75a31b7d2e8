use super::{IMAGE_OPTION, OUTPUT_IMAGE, single_input};
use crate::filter::{Filter, RegionIo, SharedContext, StreamDesc};
use colorflow_core::{EngineError, EngineResult, Options};

/// Leaf node. Passes pixels through; when its `image` option is set, the
/// conversion writes successful pulls back into that image.
#[derive(Debug, Clone, Copy, Default)]
pub struct OutputFilter;

impl Filter for OutputFilter {
    fn registration(&self) -> &str {
        OUTPUT_IMAGE
    }

    fn description(&self) -> &str {
        "image sink"
    }

    fn output_desc(&self, inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc> {
        let input = single_input(inputs)?;
        if let Some(image) = options.get_image(IMAGE_OPTION) {
            if image.pixel_layout() != input.layout {
                return Err(EngineError::incompatible_data(format!(
                    "output image stores {}, stream delivers {}",
                    image.pixel_layout(),
                    input.layout
                )));
            }
            if image.width() != input.width || image.height() != input.height {
                return Err(EngineError::incompatible_data(format!(
                    "output image is {}x{}, stream is {}x{}",
                    image.width(),
                    image.height(),
                    input.width,
                    input.height
                )));
            }
        }
        Ok(input.clone())
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        _options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        io.copy_through()
    }
}
