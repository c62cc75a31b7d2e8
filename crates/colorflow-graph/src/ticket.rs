//! Pull requests.
//!
//! A [`PixelAccessTicket`] carries one request through
//! [`Conversion::run_pixels`](crate::Conversion::run_pixels): the target
//! rectangle, the buffer that receives it, a cursor recording how many rows
//! are complete, and a [`CancelToken`] that another thread can set to stop
//! the request between rows.

use colorflow_core::{EngineError, EngineResult, ImageSource, PixelBuffer, PixelLayout, Rect};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::debug;

/// Cooperative cancellation flag shared between a ticket and its callers.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates an unset token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Rows already started still finish.
    pub fn cancel(&self) {
        if !self.0.swap(true, Ordering::SeqCst) {
            debug!("cancellation requested");
        }
    }

    /// Returns `true` once cancellation was requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(Cancelled)` once cancellation was requested.
    #[inline]
    pub fn check(&self) -> EngineResult<()> {
        if self.is_cancelled() {
            Err(EngineError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// State of one pull request.
#[derive(Debug)]
pub struct PixelAccessTicket {
    conversion: u64,
    rect: Rect,
    buffer: PixelBuffer,
    cursor: u32,
    cancel: CancelToken,
    output: Option<Arc<dyn ImageSource>>,
}

impl PixelAccessTicket {
    /// Creates a ticket with a fresh buffer for `rect`.
    ///
    /// Tickets are normally obtained from
    /// [`Conversion::ticket`](crate::Conversion::ticket).
    pub fn new(
        conversion: u64,
        rect: Rect,
        layout: PixelLayout,
        output: Option<Arc<dyn ImageSource>>,
    ) -> EngineResult<Self> {
        let buffer = PixelBuffer::new(rect.width, rect.height, layout)?;
        Ok(Self {
            conversion,
            rect,
            buffer,
            cursor: 0,
            cancel: CancelToken::new(),
            output,
        })
    }

    /// Id of the conversion the ticket belongs to.
    pub fn conversion_id(&self) -> u64 {
        self.conversion
    }

    /// Requested rectangle in output-image coordinates.
    pub fn rect(&self) -> Rect {
        self.rect
    }

    /// Destination buffer; its origin is the rectangle's top-left corner.
    pub fn buffer(&self) -> &PixelBuffer {
        &self.buffer
    }

    /// Mutable destination buffer.
    pub fn buffer_mut(&mut self) -> &mut PixelBuffer {
        &mut self.buffer
    }

    /// Consumes the ticket, returning its buffer.
    pub fn into_buffer(self) -> PixelBuffer {
        self.buffer
    }

    /// Rows of the rectangle completed so far.
    pub fn cursor(&self) -> u32 {
        self.cursor
    }

    pub(crate) fn set_cursor(&mut self, rows: u32) {
        self.cursor = rows;
    }

    /// Returns `true` once every row is complete.
    pub fn is_complete(&self) -> bool {
        self.cursor >= self.rect.height
    }

    /// A handle that cancels this ticket from anywhere.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Returns `true` once cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Image the result is written back into after a successful pull.
    pub fn output_image(&self) -> Option<&Arc<dyn ImageSource>> {
        self.output.as_ref()
    }

    pub(crate) fn parts(&mut self) -> (&mut PixelBuffer, &CancelToken) {
        (&mut self.buffer, &self.cancel)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_shares_cancellation() {
        let ticket = PixelAccessTicket::new(1, Rect::new(2, 2, 4, 4), PixelLayout::rgb8(), None)
            .unwrap();
        assert_eq!(ticket.buffer().width(), 4);
        assert_eq!(ticket.cursor(), 0);
        let token = ticket.cancel_token();
        assert!(token.check().is_ok());
        ticket.cancel();
        assert!(token.is_cancelled());
        assert!(token.check().unwrap_err().is_cancelled());
    }
}
