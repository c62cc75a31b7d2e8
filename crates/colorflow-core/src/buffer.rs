//! Row-addressable pixel buffers and borrowed views into them.
//!
//! A [`PixelBuffer`] owns a 2-D array of pixels in one [`PixelLayout`],
//! stored row after row with an explicit stride in bytes. Views
//! ([`BufferView`], [`BufferViewMut`]) address a rectangle of a buffer
//! without copying, which is how a node hands a narrower region of its
//! output to the node upstream of it.
//!
//! Planar layouts are stored row-planar: each row holds one run of samples
//! per channel. Views of planar buffers must span the full row width.
//!
//! ```rust
//! use colorflow_core::{PixelBuffer, PixelLayout, Rect};
//!
//! let mut buf = PixelBuffer::new(4, 4, PixelLayout::gray8()).unwrap();
//! {
//!     let mut view = buf.view_mut().sub_view(Rect::new(1, 1, 2, 2)).unwrap();
//!     view.row_mut(0).copy_from_slice(&[7, 8]);
//! }
//! assert_eq!(buf.row(1), &[0, 7, 8, 0]);
//! ```

use crate::{EngineError, EngineResult, PixelLayout, Rect};
use tracing::trace;

/// An owned pixel buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBuffer {
    layout: PixelLayout,
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Allocates a zero-filled buffer with a tight stride.
    ///
    /// Returns [`EngineError::MemoryError`] if the allocation fails or the
    /// size overflows.
    pub fn new(width: u32, height: u32, layout: PixelLayout) -> EngineResult<Self> {
        let stride = layout.row_bytes(width);
        Self::with_stride(width, height, layout, stride)
    }

    /// Allocates a zero-filled buffer with an explicit stride.
    pub fn with_stride(
        width: u32,
        height: u32,
        layout: PixelLayout,
        stride: usize,
    ) -> EngineResult<Self> {
        let min_stride = layout.row_bytes(width);
        if stride < min_stride {
            return Err(EngineError::incompatible_data(format!(
                "stride {stride} is less than minimum {min_stride} for width {width}"
            )));
        }
        let size = stride
            .checked_mul(height as usize)
            .ok_or_else(|| EngineError::memory(usize::MAX, "buffer size overflows"))?;
        trace!(width, height, stride, "allocating pixel buffer");
        let mut data = Vec::new();
        data.try_reserve_exact(size)
            .map_err(|e| EngineError::memory(size, e.to_string()))?;
        data.resize(size, 0);
        Ok(Self {
            layout,
            width,
            height,
            stride,
            data,
        })
    }

    /// Wraps existing tightly packed data.
    pub fn from_vec(
        width: u32,
        height: u32,
        layout: PixelLayout,
        data: Vec<u8>,
    ) -> EngineResult<Self> {
        let stride = layout.row_bytes(width);
        let expected = stride * height as usize;
        if data.len() != expected {
            return Err(EngineError::incompatible_data(format!(
                "expected {expected} bytes for {width}x{height} {layout}, got {}",
                data.len()
            )));
        }
        Ok(Self {
            layout,
            width,
            height,
            stride,
            data,
        })
    }

    /// Pixel layout.
    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel bytes of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.layout.row_bytes(self.width)]
    }

    /// Mutable pixel bytes of row `y`.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.layout.row_bytes(self.width);
        &mut self.data[start..start + len]
    }

    /// Raw bytes including stride padding.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Pixel bytes of all rows, without padding.
    pub fn to_packed(&self) -> Vec<u8> {
        (0..self.height).flat_map(|y| self.row(y).iter().copied()).collect()
    }

    /// Read-only view of the whole buffer.
    pub fn view(&self) -> BufferView<'_> {
        BufferView {
            data: &self.data,
            layout: self.layout,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }

    /// Mutable view of the whole buffer.
    pub fn view_mut(&mut self) -> BufferViewMut<'_> {
        BufferViewMut {
            data: &mut self.data,
            layout: self.layout,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }
}

fn sub_range(
    layout: &PixelLayout,
    width: u32,
    height: u32,
    stride: usize,
    rect: Rect,
) -> EngineResult<std::ops::Range<usize>> {
    if !Rect::from_size(width, height).contains_rect(&rect) {
        return Err(EngineError::incompatible_data(format!(
            "{rect} exceeds view bounds {width}x{height}"
        )));
    }
    if layout.is_planar() && (rect.x != 0 || rect.width != width) {
        return Err(EngineError::incompatible_data(
            "planar views must span full rows",
        ));
    }
    if rect.is_empty() {
        return Ok(0..0);
    }
    let start = rect.y as usize * stride + rect.x as usize * layout.bytes_per_pixel();
    let len = (rect.height as usize - 1) * stride + layout.row_bytes(rect.width);
    Ok(start..start + len)
}

/// Borrowed read-only rectangle of pixels.
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    data: &'a [u8],
    layout: PixelLayout,
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> BufferView<'a> {
    /// Pixel layout.
    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel bytes of row `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &'a [u8] {
        let start = y as usize * self.stride;
        let data: &'a [u8] = self.data;
        &data[start..start + self.layout.row_bytes(self.width)]
    }

    /// A narrower view; `rect` is relative to this view.
    pub fn sub_view(&self, rect: Rect) -> EngineResult<BufferView<'a>> {
        let range = sub_range(&self.layout, self.width, self.height, self.stride, rect)?;
        let data: &'a [u8] = self.data;
        Ok(BufferView {
            data: &data[range],
            layout: self.layout,
            width: rect.width,
            height: rect.height,
            stride: self.stride,
        })
    }
}

/// Borrowed mutable rectangle of pixels.
#[derive(Debug)]
pub struct BufferViewMut<'a> {
    data: &'a mut [u8],
    layout: PixelLayout,
    width: u32,
    height: u32,
    stride: usize,
}

impl<'a> BufferViewMut<'a> {
    /// Pixel layout.
    #[inline]
    pub fn layout(&self) -> PixelLayout {
        self.layout
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Pixel bytes of row `y`.
    #[inline]
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.layout.row_bytes(self.width)]
    }

    /// Mutable pixel bytes of row `y`.
    #[inline]
    pub fn row_mut(&mut self, y: u32) -> &mut [u8] {
        let start = y as usize * self.stride;
        let len = self.layout.row_bytes(self.width);
        &mut self.data[start..start + len]
    }

    /// Shortens the lifetime so the view can be lent out again.
    pub fn reborrow(&mut self) -> BufferViewMut<'_> {
        BufferViewMut {
            data: &mut *self.data,
            layout: self.layout,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }

    /// Read-only access to the same pixels.
    pub fn as_view(&self) -> BufferView<'_> {
        BufferView {
            data: &*self.data,
            layout: self.layout,
            width: self.width,
            height: self.height,
            stride: self.stride,
        }
    }

    /// A narrower mutable view; `rect` is relative to this view.
    pub fn sub_view(self, rect: Rect) -> EngineResult<BufferViewMut<'a>> {
        let range = sub_range(&self.layout, self.width, self.height, self.stride, rect)?;
        let data: &'a mut [u8] = self.data;
        Ok(BufferViewMut {
            data: &mut data[range],
            layout: self.layout,
            width: rect.width,
            height: rect.height,
            stride: self.stride,
        })
    }

    /// Raw storage and stride; every chunk of `stride` bytes starts a row.
    pub fn raw_mut(&mut self) -> (&mut [u8], usize) {
        (&mut *self.data, self.stride)
    }

    /// Copies pixels from a view of identical size and layout.
    pub fn copy_from(&mut self, src: &BufferView<'_>) -> EngineResult<()> {
        if src.width() != self.width || src.height() != self.height || src.layout() != self.layout
        {
            return Err(EngineError::incompatible_data(format!(
                "cannot copy {}x{} {} into {}x{} {}",
                src.width(),
                src.height(),
                src.layout(),
                self.width,
                self.height,
                self.layout
            )));
        }
        for y in 0..self.height {
            self.row_mut(y).copy_from_slice(src.row(y));
        }
        Ok(())
    }
}

/// Copies `width` pixels starting at `src_x` of one stored row to `dst_x`
/// of another row of the same layout.
///
/// Rows of planar layouts hold one run per channel; `src_width` and
/// `dst_width` are the full widths of the two rows.
#[allow(clippy::too_many_arguments)]
pub fn copy_row_span(
    layout: &PixelLayout,
    src: &[u8],
    src_width: u32,
    src_x: u32,
    dst: &mut [u8],
    dst_width: u32,
    dst_x: u32,
    width: u32,
) -> EngineResult<()> {
    if src_x + width > src_width || dst_x + width > dst_width {
        return Err(EngineError::incompatible_data(format!(
            "span of {width} pixels does not fit rows of {src_width} and {dst_width}"
        )));
    }
    if layout.is_planar() {
        let bps = layout.bytes_per_sample();
        let len = width as usize * bps;
        for c in 0..layout.channels() as usize {
            let s = (c * src_width as usize + src_x as usize) * bps;
            let d = (c * dst_width as usize + dst_x as usize) * bps;
            dst[d..d + len].copy_from_slice(&src[s..s + len]);
        }
    } else {
        let bpp = layout.bytes_per_pixel();
        let len = width as usize * bpp;
        let s = src_x as usize * bpp;
        let d = dst_x as usize * bpp;
        dst[d..d + len].copy_from_slice(&src[s..s + len]);
    }
    Ok(())
}
