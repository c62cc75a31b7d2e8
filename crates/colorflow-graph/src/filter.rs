//! The filter contract.
//!
//! A [`Filter`] is the implementation behind a node: it declares its ports,
//! describes the stream it produces, maps output rectangles to the input
//! rectangles it needs, optionally builds a context, and executes over one
//! rectangle at a time through a [`RegionIo`].
//!
//! [`RegionIo`] hides the row loop. Its helpers walk the output rows, in
//! parallel on the rayon pool when the engine allows it, and check the
//! ticket's cancellation flag before every row.

use crate::config::EngineConfig;
use crate::ticket::CancelToken;
use colorflow_core::{
    BufferView, BufferViewMut, Connector, EngineError, EngineResult, Options, PixelLayout,
    ProfileIdentity, Rect, sample,
};
use rayon::prelude::*;
use std::any::Any;
use std::fmt::Debug;
use std::sync::Arc;

/// A built transform context, shared between the cache and executions.
pub type SharedContext = Arc<dyn Any + Send + Sync>;

/// Description of the stream leaving a node.
#[derive(Debug, Clone)]
pub struct StreamDesc {
    /// Pixel layout.
    pub layout: PixelLayout,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Profile of the pixel values.
    pub profile: Option<Arc<dyn ProfileIdentity>>,
}

impl StreamDesc {
    /// Creates a description without a profile.
    pub fn new(layout: PixelLayout, width: u32, height: u32) -> Self {
        Self {
            layout,
            width,
            height,
            profile: None,
        }
    }

    /// Attaches a profile.
    pub fn with_profile(mut self, profile: Option<Arc<dyn ProfileIdentity>>) -> Self {
        self.profile = profile;
        self
    }

    /// Full extent of the stream.
    pub fn rect(&self) -> Rect {
        Rect::from_size(self.width, self.height)
    }
}

/// A transform that can be placed in a conversion.
///
/// Implementations are shared between conversions and threads. All
/// per-node state lives in the node's options and context.
pub trait Filter: Send + Sync + Debug {
    /// Registration string, e.g. `//colour/offset.arith`.
    fn registration(&self) -> &str;

    /// Human-readable name.
    fn description(&self) -> &str {
        ""
    }

    /// Input ports, in order.
    fn plugs(&self) -> Vec<Connector> {
        vec![Connector::image()]
    }

    /// Output ports. Every socket carries the node's single output stream.
    fn sockets(&self) -> Vec<Connector> {
        vec![Connector::image()]
    }

    /// Describes the output stream for the given input streams.
    fn output_desc(&self, inputs: &[StreamDesc], options: &Options) -> EngineResult<StreamDesc>;

    /// Rectangle of input `plug` needed to produce `rect`.
    ///
    /// Must round outward. The engine clips the result to the input's
    /// extent.
    fn upstream_rect(&self, rect: Rect, _plug: usize, _options: &Options) -> EngineResult<Rect> {
        Ok(rect)
    }

    /// Whether the filter can read its input from the output buffer.
    ///
    /// When true and the input rectangle and layout match the output, the
    /// upstream node writes straight into the output and no intermediate
    /// buffer is allocated. Filters that move pixels around return false.
    fn in_place(&self) -> bool {
        true
    }

    /// Whether the filter builds a context before executing.
    fn needs_context(&self) -> bool {
        false
    }

    /// Whether option `key` changes the built context.
    fn affects_context(&self, _key: &str) -> bool {
        true
    }

    /// Builds the context for the given streams and options.
    fn build_context(
        &self,
        _inputs: &[StreamDesc],
        _output: &StreamDesc,
        _options: &Options,
    ) -> EngineResult<SharedContext> {
        Ok(Arc::new(()))
    }

    /// Whether concurrent executions over one context are safe.
    fn reentrant(&self) -> bool {
        true
    }

    /// Produces `io.rect()` into `io`'s output.
    fn execute(
        &self,
        context: Option<&SharedContext>,
        options: &Options,
        io: &mut RegionIo<'_>,
    ) -> EngineResult<()>;
}

/// Where a filter's input pixels are.
#[derive(Debug)]
pub(crate) enum Source<'a> {
    /// The upstream node wrote into the output buffer.
    InPlace { layout: PixelLayout },
    /// The upstream node wrote into a separate buffer covering `rect`.
    Buffer { view: BufferView<'a>, rect: Rect },
}

/// Input and output of one execution.
#[derive(Debug)]
pub struct RegionIo<'a> {
    rect: Rect,
    sources: Vec<Source<'a>>,
    output: BufferViewMut<'a>,
    cancel: &'a CancelToken,
    parallel: bool,
}

impl<'a> RegionIo<'a> {
    pub(crate) fn new(
        rect: Rect,
        sources: Vec<Source<'a>>,
        output: BufferViewMut<'a>,
        cancel: &'a CancelToken,
        config: &EngineConfig,
    ) -> Self {
        let parallel = config.use_pool(rect.height);
        Self {
            rect,
            sources,
            output,
            cancel,
            parallel,
        }
    }

    /// Rectangle being produced, in this node's output coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Output layout.
    pub fn output_layout(&self) -> PixelLayout {
        self.output.layout()
    }

    /// Number of inputs.
    pub fn input_count(&self) -> usize {
        self.sources.len()
    }

    /// Layout of input `plug`.
    pub fn input_layout(&self, plug: usize) -> EngineResult<PixelLayout> {
        match self.sources.get(plug) {
            Some(Source::InPlace { layout }) => Ok(*layout),
            Some(Source::Buffer { view, .. }) => Ok(view.layout()),
            None => Err(missing_input(plug)),
        }
    }

    /// Returns `true` if input 0 was delivered into the output buffer.
    pub fn is_in_place(&self) -> bool {
        matches!(self.sources.first(), Some(Source::InPlace { .. }))
    }

    /// Pixels of input `plug` and the rectangle they cover, in the input's
    /// own coordinates. `None` for an in-place input.
    pub fn input(&self, plug: usize) -> EngineResult<Option<(BufferView<'a>, Rect)>> {
        match self.sources.get(plug) {
            Some(Source::InPlace { .. }) => Ok(None),
            Some(Source::Buffer { view, rect }) => Ok(Some((*view, *rect))),
            None => Err(missing_input(plug)),
        }
    }

    /// Direct access to the output view.
    pub fn output(&mut self) -> &mut BufferViewMut<'a> {
        &mut self.output
    }

    /// The ticket's cancellation flag.
    pub fn cancel_token(&self) -> &CancelToken {
        self.cancel
    }

    /// Fills every output row with `f(y, row)`; `y` is relative to `rect`.
    pub fn generate_rows<F>(&mut self, f: F) -> EngineResult<()>
    where
        F: Fn(u32, &mut [u8]) -> EngineResult<()> + Sync,
    {
        let width = self.output.width();
        let row_len = self.output.layout().row_bytes(width);
        let cancel = self.cancel;
        let parallel = self.parallel;
        let (data, stride) = self.output.raw_mut();
        let run = |(y, chunk): (usize, &mut [u8])| -> EngineResult<()> {
            cancel.check()?;
            f(y as u32, &mut chunk[..row_len])
        };
        if parallel {
            data.par_chunks_mut(stride).enumerate().try_for_each(run)
        } else {
            data.chunks_mut(stride).enumerate().try_for_each(run)
        }
    }

    /// Maps input 0 onto the output row by row with `f(y, src, dst)`.
    ///
    /// Input and output must cover the same rectangle. For in-place input
    /// `src` is a copy of the row taken before `f` runs.
    pub fn map_rows<F>(&mut self, f: F) -> EngineResult<()>
    where
        F: Fn(u32, &[u8], &mut [u8]) -> EngineResult<()> + Sync,
    {
        match self.sources.first() {
            Some(Source::InPlace { .. }) => {
                let width = self.output.width();
                let row_len = self.output.layout().row_bytes(width);
                let cancel = self.cancel;
                let parallel = self.parallel;
                let (data, stride) = self.output.raw_mut();
                let run = |scratch: &mut Vec<u8>, (y, chunk): (usize, &mut [u8])| {
                    cancel.check()?;
                    let dst = &mut chunk[..row_len];
                    scratch.clear();
                    scratch.extend_from_slice(dst);
                    f(y as u32, scratch, dst)
                };
                if parallel {
                    data.par_chunks_mut(stride)
                        .enumerate()
                        .try_for_each_init(Vec::new, run)
                } else {
                    let mut scratch = Vec::new();
                    data.chunks_mut(stride)
                        .enumerate()
                        .try_for_each(|item| run(&mut scratch, item))
                }
            }
            Some(Source::Buffer { view, rect }) => {
                let (view, rect) = (*view, *rect);
                if rect.width != self.rect.width || rect.height != self.rect.height {
                    return Err(EngineError::incompatible_data(format!(
                        "input {rect} does not match output {}",
                        self.rect
                    )));
                }
                self.generate_rows(|y, dst| f(y, view.row(y), dst))
            }
            None => Err(missing_input(0)),
        }
    }

    /// Maps input 0 onto the output pixel row by pixel row in normalized
    /// floats, logical channel order.
    ///
    /// `f` receives `width * channels` values of the input layout and
    /// fills `width * channels` values of the output layout.
    pub fn map_pixels<F>(&mut self, f: F) -> EngineResult<()>
    where
        F: Fn(&[f32], &mut [f32]) -> EngineResult<()> + Sync,
    {
        let src_layout = self.input_layout(0)?;
        let dst_layout = self.output.layout();
        let width = self.rect.width as usize;
        self.map_rows(|_, src, dst| {
            let mut input = vec![0.0f32; width * src_layout.channels() as usize];
            let mut output = vec![0.0f32; width * dst_layout.channels() as usize];
            sample::read_row(&src_layout, src, width, &mut input);
            f(&input, &mut output)?;
            sample::write_row(&dst_layout, &output, width, dst);
            Ok(())
        })
    }

    /// Copies input 0 to the output unchanged.
    pub fn copy_through(&mut self) -> EngineResult<()> {
        if self.is_in_place() {
            return Ok(());
        }
        if self.input_layout(0)? != self.output.layout() {
            return Err(EngineError::incompatible_data(
                "pass-through needs identical input and output layouts",
            ));
        }
        self.map_rows(|_, src, dst| {
            dst.copy_from_slice(src);
            Ok(())
        })
    }
}

fn missing_input(plug: usize) -> EngineError {
    EngineError::not_found(format!("input {plug} was not delivered"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use colorflow_core::PixelBuffer;

    fn io_over<'a>(
        buf: &'a mut PixelBuffer,
        sources: Vec<Source<'a>>,
        cancel: &'a CancelToken,
        config: &EngineConfig,
    ) -> RegionIo<'a> {
        let rect = Rect::from_size(buf.width(), buf.height());
        RegionIo::new(rect, sources, buf.view_mut(), cancel, config)
    }

    #[test]
    fn test_generate_rows_parallel_and_serial() {
        for config in [EngineConfig::default(), EngineConfig::sequential()] {
            let mut buf = PixelBuffer::new(3, 40, PixelLayout::gray8()).unwrap();
            let cancel = CancelToken::new();
            let mut io = io_over(&mut buf, Vec::new(), &cancel, &config);
            io.generate_rows(|y, row| {
                row.fill(y as u8);
                Ok(())
            })
            .unwrap();
            assert_eq!(buf.row(39), &[39, 39, 39]);
        }
    }

    #[test]
    fn test_map_rows_in_place_sees_original() {
        let mut buf = PixelBuffer::from_vec(2, 1, PixelLayout::gray8(), vec![1, 2]).unwrap();
        let cancel = CancelToken::new();
        let config = EngineConfig::sequential();
        let sources = vec![Source::InPlace {
            layout: PixelLayout::gray8(),
        }];
        let mut io = io_over(&mut buf, sources, &cancel, &config);
        io.map_rows(|_, src, dst| {
            dst[0] = src[1];
            dst[1] = src[0];
            Ok(())
        })
        .unwrap();
        assert_eq!(buf.row(0), &[2, 1]);
    }

    #[test]
    fn test_cancelled_before_first_row() {
        let mut buf = PixelBuffer::new(2, 2, PixelLayout::gray8()).unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();
        let config = EngineConfig::sequential();
        let mut io = io_over(&mut buf, Vec::new(), &cancel, &config);
        let err = io
            .generate_rows(|_, row| {
                row.fill(9);
                Ok(())
            })
            .unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(buf.as_bytes(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_map_pixels_changes_depth() {
        let src = PixelBuffer::from_vec(2, 1, PixelLayout::gray8(), vec![0, 255]).unwrap();
        let out_layout = PixelLayout::gray8().with_sample(colorflow_core::SampleType::U16);
        let mut dst = PixelBuffer::new(2, 1, out_layout).unwrap();
        let cancel = CancelToken::new();
        let config = EngineConfig::sequential();
        let sources = vec![Source::Buffer {
            view: src.view(),
            rect: Rect::from_size(2, 1),
        }];
        let mut io = io_over(&mut dst, sources, &cancel, &config);
        io.map_pixels(|s, d| {
            d.copy_from_slice(s);
            Ok(())
        })
        .unwrap();
        assert_eq!(dst.as_bytes(), &[0, 0, 0xFF, 0xFF]);
    }
}
