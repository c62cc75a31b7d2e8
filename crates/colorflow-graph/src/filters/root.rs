use super::{IMAGE_OPTION, ROOT_IMAGE};
use crate::filter::{Filter, RegionIo, SharedContext, StreamDesc};
use colorflow_core::{Connector, EngineError, EngineResult, Options, copy_row_span};

/// Generator node reading rows of the `image` option.
#[derive(Debug, Clone, Copy, Default)]
pub struct RootFilter;

impl Filter for RootFilter {
    fn registration(&self) -> &str {
        ROOT_IMAGE
    }

    fn description(&self) -> &str {
        "image source"
    }

    fn plugs(&self) -> Vec<Connector> {
        Vec::new()
    }

    fn output_desc(&self, _inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc> {
        let image = options.get_image(IMAGE_OPTION).ok_or_else(|| {
            EngineError::incompatible_option(IMAGE_OPTION, "an image source is required")
        })?;
        Ok(StreamDesc::new(image.pixel_layout(), image.width(), image.height())
            .with_profile(image.profile()))
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        let image = options.get_image(IMAGE_OPTION).ok_or_else(|| {
            EngineError::incompatible_option(IMAGE_OPTION, "an image source is required")
        })?;
        let rect = io.rect();
        let layout = io.output_layout();
        if image.pixel_layout() != layout {
            return Err(EngineError::incompatible_data(format!(
                "image layout changed to {} during the pull",
                image.pixel_layout()
            )));
        }
        let width = image.width();
        io.generate_rows(|y, dst| {
            let line = image.get_line(rect.y + y)?;
            copy_row_span(&layout, &line, width, rect.x, dst, rect.width, 0, rect.width)
        })
    }
}
