use super::{SCALE, single_input};
use crate::filter::{Filter, RegionIo, SharedContext, StreamDesc};
use colorflow_core::{Connector, EngineError, EngineResult, Options, Rect, Support};

const FACTOR_OPTION: &str = "factor";

/// Nearest-neighbour resampling by option `factor` (> 0, default 1).
///
/// Output pixel `x` samples input pixel `floor((x + 0.5) / factor)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScaleFilter;

fn factor(options: &Options) -> EngineResult<f64> {
    let factor = options.get_f64(FACTOR_OPTION)?.unwrap_or(1.0);
    if factor <= 0.0 {
        return Err(EngineError::incompatible_option(
            FACTOR_OPTION,
            format!("{factor} is not positive"),
        ));
    }
    Ok(factor)
}

fn scaled(len: u32, factor: f64) -> u32 {
    ((len as f64 * factor).round() as u32).max(1)
}

impl Filter for ScaleFilter {
    fn registration(&self) -> &str {
        SCALE
    }

    fn description(&self) -> &str {
        "nearest-neighbour scale"
    }

    fn plugs(&self) -> Vec<Connector> {
        vec![Connector::image().with_planar(Support::Never)]
    }

    fn sockets(&self) -> Vec<Connector> {
        vec![Connector::image().with_planar(Support::Never)]
    }

    fn output_desc(&self, inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc> {
        let input = single_input(inputs)?;
        let factor = factor(options)?;
        Ok(StreamDesc {
            width: scaled(input.width, factor),
            height: scaled(input.height, factor),
            ..input.clone()
        })
    }

    fn in_place(&self) -> bool {
        false
    }

    fn upstream_rect(&self, rect: Rect, _plug: usize, options: &Options) -> EngineResult<Rect> {
        let inv = 1.0 / factor(options)?;
        Ok(rect.scale_outward(inv, inv))
    }

    fn execute(
        &self,
        _context: Option<&SharedContext>,
        options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()> {
        let factor = factor(options)?;
        let rect = io.rect();
        let bpp = io.output_layout().bytes_per_pixel();
        let (src, src_rect) = io
            .input(0)?
            .ok_or_else(|| EngineError::incompatible_data("scale needs a separate input"))?;
        let pick = |pos: u32, lo: u32, len: u32| -> u32 {
            let s = ((pos as f64 + 0.5) / factor).floor() as u32;
            s.clamp(lo, lo + len - 1) - lo
        };
        io.generate_rows(|y, dst| {
            let sy = pick(rect.y + y, src_rect.y, src_rect.height);
            let row = src.row(sy);
            for x in 0..rect.width {
                let sx = pick(rect.x + x, src_rect.x, src_rect.width) as usize;
                let d = x as usize * bpp;
                dst[d..d + bpp].copy_from_slice(&row[sx * bpp..(sx + 1) * bpp]);
            }
            Ok(())
        })
    }
}
