//! Rectangles used to address pixel regions.
//!
//! All coordinates use the standard image convention: origin (0, 0) at the
//! top-left corner, X to the right, Y downward. A rectangle is inclusive on
//! its left/top edges and exclusive on its right/bottom edges.
//!
//! # Sample units
//!
//! A pull request is expressed in the output image's pixels. Nodes that
//! resample work in their own sample grid; [`Rect::scale_outward`] maps a
//! rectangle between grids and always rounds outward so that no sample the
//! consumer needs is left out.
//!
//! ```rust
//! use colorflow_core::Rect;
//!
//! // Output pixels (1, 1, 3x3) at half resolution upstream.
//! let upstream = Rect::new(1, 1, 3, 3).scale_outward(0.5, 0.5);
//! assert_eq!(upstream, Rect::new(0, 0, 2, 2));
//! ```

/// A rectangle defined by origin (x, y) and dimensions (width, height).
///
/// A rectangle with zero width or height is empty.
///
/// # Example
///
/// ```rust
/// use colorflow_core::Rect;
///
/// let rect = Rect::new(10, 20, 100, 50);
/// assert_eq!(rect.right(), 110);
/// assert_eq!(rect.bottom(), 70);
/// assert_eq!(rect.area(), 5000);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Rect {
    /// X coordinate of the left edge (inclusive)
    pub x: u32,
    /// Y coordinate of the top edge (inclusive)
    pub y: u32,
    /// Width in samples
    pub width: u32,
    /// Height in samples
    pub height: u32,
}

impl Rect {
    /// Creates a new rectangle with the given origin and dimensions.
    #[inline]
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Creates a rectangle from origin (0, 0) with given dimensions.
    #[inline]
    pub const fn from_size(width: u32, height: u32) -> Self {
        Self::new(0, 0, width, height)
    }

    /// X coordinate of the right edge (exclusive).
    #[inline]
    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Y coordinate of the bottom edge (exclusive).
    #[inline]
    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    /// Area in samples.
    #[inline]
    pub const fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// Returns `true` if either dimension is zero.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Returns `true` if the point (px, py) is inside this rectangle.
    #[inline]
    pub const fn contains(&self, px: u32, py: u32) -> bool {
        px >= self.x && px < self.right() && py >= self.y && py < self.bottom()
    }

    /// Returns `true` if this rectangle fully contains another.
    ///
    /// ```rust
    /// use colorflow_core::Rect;
    ///
    /// let outer = Rect::new(0, 0, 100, 100);
    /// assert!(outer.contains_rect(&Rect::new(10, 10, 50, 50)));
    /// assert!(!outer.contains_rect(&Rect::new(90, 90, 20, 20)));
    /// ```
    #[inline]
    pub const fn contains_rect(&self, other: &Rect) -> bool {
        other.x >= self.x
            && other.y >= self.y
            && other.right() <= self.right()
            && other.bottom() <= self.bottom()
    }

    /// Returns the intersection of this rectangle with another.
    ///
    /// Returns `None` if the rectangles don't overlap.
    ///
    /// ```rust
    /// use colorflow_core::Rect;
    ///
    /// let a = Rect::new(0, 0, 100, 100);
    /// let b = Rect::new(50, 50, 100, 100);
    /// assert_eq!(a.intersect(&b), Some(Rect::new(50, 50, 50, 50)));
    /// ```
    #[inline]
    pub fn intersect(&self, other: &Rect) -> Option<Rect> {
        let x = self.x.max(other.x);
        let y = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());

        if x < right && y < bottom {
            Some(Rect::new(x, y, right - x, bottom - y))
        } else {
            None
        }
    }

    /// Clamps this rectangle to an image of the given size.
    #[inline]
    pub fn clamp_to(&self, max_width: u32, max_height: u32) -> Option<Rect> {
        self.intersect(&Rect::from_size(max_width, max_height))
    }

    /// Expresses this rectangle relative to the origin of `outer`.
    ///
    /// Returns `None` if `outer` does not contain `self`.
    #[inline]
    pub fn relative_to(&self, outer: &Rect) -> Option<Rect> {
        if !outer.contains_rect(self) {
            return None;
        }
        Some(Rect::new(
            self.x - outer.x,
            self.y - outer.y,
            self.width,
            self.height,
        ))
    }

    /// Maps this rectangle into a grid scaled by (`sx`, `sy`).
    ///
    /// The left/top edges are floored and the right/bottom edges ceiled,
    /// so the result covers every sample touched by the source rectangle.
    /// A non-empty rectangle never maps to an empty one. Non-positive or
    /// non-finite scales leave the rectangle unchanged.
    pub fn scale_outward(&self, sx: f64, sy: f64) -> Rect {
        let (x0, x1) = scale_span(self.x, self.right(), sx);
        let (y0, y1) = scale_span(self.y, self.bottom(), sy);
        Rect::new(x0, y0, x1 - x0, y1 - y0)
    }

    /// Splits the rectangle into horizontal stripes of at most `rows` rows.
    ///
    /// `rows == 0` yields the whole rectangle as a single stripe.
    pub fn stripes(&self, rows: u32) -> impl Iterator<Item = Rect> + '_ {
        let step = if rows == 0 { self.height.max(1) } else { rows };
        (self.y..self.bottom()).step_by(step as usize).map(move |y| {
            let height = step.min(self.bottom() - y);
            Rect::new(self.x, y, self.width, height)
        })
    }
}

fn scale_span(start: u32, end: u32, scale: f64) -> (u32, u32) {
    if !scale.is_finite() || scale <= 0.0 || scale == 1.0 {
        return (start, end);
    }
    let lo = (start as f64 * scale).floor().max(0.0);
    let mut hi = (end as f64 * scale).ceil();
    if end > start && hi <= lo {
        hi = lo + 1.0;
    }
    let lo = lo.min(u32::MAX as f64) as u32;
    let hi = hi.min(u32::MAX as f64) as u32;
    (lo, hi.max(lo))
}

impl std::fmt::Display for Rect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rect({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}
