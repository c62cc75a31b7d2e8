//! Port capability descriptors and producer/consumer negotiation.
//!
//! Every plug (input) and socket (output) of a node carries a
//! [`Connector`]. Two connectors can be joined when their type tags agree
//! and their capability sets overlap: at least one sample type in common,
//! overlapping channel ranges, and no layout flag that one side forbids
//! and the other insists on.
//!
//! ```rust
//! use colorflow_core::{Connector, SampleType, Support};
//!
//! let producer = Connector::image().with_sample_types(&[SampleType::U16]);
//! let consumer = Connector::image().with_sample_types(&[SampleType::U8, SampleType::U16]);
//! assert!(Connector::matches(&producer, &consumer));
//!
//! let swapped = Connector::image().with_swap(Support::Always);
//! let plain = Connector::image().with_swap(Support::Never);
//! assert!(!Connector::matches(&swapped, &plain));
//! ```

use crate::registration;
use crate::{PixelLayout, SampleType};
use std::ops::RangeInclusive;

/// Connector type tag for pixel data ports.
pub const IMAGE_DATA: &str = "//colour/image.data";

/// How a port relates to one boolean layout property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Support {
    /// The property must be unset.
    Never,
    /// The property must be set.
    Always,
    /// Either state is handled.
    #[default]
    Optional,
}

impl Support {
    /// Returns `true` if some state of the property satisfies both sides.
    #[inline]
    pub fn intersects(self, other: Support) -> bool {
        !matches!(
            (self, other),
            (Support::Never, Support::Always) | (Support::Always, Support::Never)
        )
    }

    /// Returns `true` if a concrete flag value is acceptable.
    #[inline]
    pub fn allows(self, value: bool) -> bool {
        match self {
            Support::Never => !value,
            Support::Always => value,
            Support::Optional => true,
        }
    }
}

/// Layout flags a port can produce or consume.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Capabilities {
    /// Planar storage (`Never` = interleaved only).
    pub planar: Support,
    /// Reversed channel order.
    pub swap: Support,
    /// Big-endian samples.
    pub byte_swap: Support,
    /// Reverted polarity.
    pub revert: Support,
    /// Premultiplied alpha (`Never` = straight alpha only).
    pub premultiplied: Support,
    /// Last channel stored first.
    pub swap_first: Support,
}

impl Capabilities {
    fn pairs(&self) -> [Support; 6] {
        [
            self.planar,
            self.swap,
            self.byte_swap,
            self.revert,
            self.premultiplied,
            self.swap_first,
        ]
    }

    /// Returns `true` if every property can be satisfied by both sides.
    pub fn intersects(&self, other: &Capabilities) -> bool {
        self.pairs()
            .iter()
            .zip(other.pairs().iter())
            .all(|(a, b)| a.intersects(*b))
    }

    /// Returns `true` if the flags of `layout` are all acceptable.
    pub fn allows(&self, layout: &PixelLayout) -> bool {
        self.planar.allows(layout.is_planar())
            && self.swap.allows(layout.is_swapped())
            && self.byte_swap.allows(layout.is_big_endian())
            && self.revert.allows(layout.is_reverted())
            && self.premultiplied.allows(layout.is_premultiplied())
            && self.swap_first.allows(layout.is_swap_first())
    }
}

/// Capability descriptor of one node port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Connector {
    /// Connector type tag, a registration string.
    pub kind: String,
    /// Accepted or produced sample types. Empty matches nothing.
    pub sample_types: Vec<SampleType>,
    /// Total channel count range.
    pub channels: RangeInclusive<u8>,
    /// Color channel count range.
    pub color_channels: RangeInclusive<u8>,
    /// Layout flags.
    pub caps: Capabilities,
    /// A mandatory plug must be connected before the graph can run.
    pub mandatory: bool,
}

impl Connector {
    /// Creates a connector of type `kind` accepting everything.
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            sample_types: SampleType::ALL.to_vec(),
            channels: 1..=22,
            color_channels: 1..=15,
            caps: Capabilities::default(),
            mandatory: true,
        }
    }

    /// Pixel data connector accepting any layout.
    pub fn image() -> Self {
        Self::new(IMAGE_DATA)
    }

    /// A connector that is not bound to anything yet; it matches nothing.
    pub fn unbound(kind: impl Into<String>) -> Self {
        Self {
            sample_types: Vec::new(),
            ..Self::new(kind)
        }
    }

    /// Restricts the sample types.
    pub fn with_sample_types(mut self, types: &[SampleType]) -> Self {
        self.sample_types = types.to_vec();
        self
    }

    /// Restricts the total channel range.
    pub fn with_channels(mut self, range: RangeInclusive<u8>) -> Self {
        self.channels = range;
        self
    }

    /// Restricts the color channel range.
    pub fn with_color_channels(mut self, range: RangeInclusive<u8>) -> Self {
        self.color_channels = range;
        self
    }

    /// Sets planar support.
    pub fn with_planar(mut self, support: Support) -> Self {
        self.caps.planar = support;
        self
    }

    /// Sets channel swap support.
    pub fn with_swap(mut self, support: Support) -> Self {
        self.caps.swap = support;
        self
    }

    /// Sets byte swap support.
    pub fn with_byte_swap(mut self, support: Support) -> Self {
        self.caps.byte_swap = support;
        self
    }

    /// Sets reverted polarity support.
    pub fn with_revert(mut self, support: Support) -> Self {
        self.caps.revert = support;
        self
    }

    /// Sets premultiplied alpha support.
    pub fn with_premultiplied(mut self, support: Support) -> Self {
        self.caps.premultiplied = support;
        self
    }

    /// Sets swap-first support.
    pub fn with_swap_first(mut self, support: Support) -> Self {
        self.caps.swap_first = support;
        self
    }

    /// Marks the connector optional.
    pub fn optional(mut self) -> Self {
        self.mandatory = false;
        self
    }

    /// Returns `true` if `producer` may feed `consumer`.
    ///
    /// Mismatched type tags short-circuit to `false`. The consumer's tag is
    /// used as the pattern, so a consumer can accept a family of producers.
    pub fn matches(producer: &Connector, consumer: &Connector) -> bool {
        if !registration::matches(&producer.kind, &consumer.kind) {
            return false;
        }
        if !producer
            .sample_types
            .iter()
            .any(|t| consumer.sample_types.contains(t))
        {
            return false;
        }
        ranges_overlap(&producer.channels, &consumer.channels)
            && ranges_overlap(&producer.color_channels, &consumer.color_channels)
            && producer.caps.intersects(&consumer.caps)
    }

    /// Returns `true` if a concrete layout satisfies this connector.
    pub fn accepts(&self, layout: &PixelLayout) -> bool {
        self.sample_types.contains(&layout.sample())
            && self.channels.contains(&layout.channels())
            && self.color_channels.contains(&layout.color_channels())
            && self.caps.allows(layout)
    }

    /// Describes why `layout` is rejected, for error messages.
    pub fn rejection(&self, layout: &PixelLayout) -> Option<String> {
        if !self.sample_types.contains(&layout.sample()) {
            return Some(format!("sample type {} not accepted", layout.sample()));
        }
        if !self.channels.contains(&layout.channels()) {
            return Some(format!(
                "{} channels outside {:?}",
                layout.channels(),
                self.channels
            ));
        }
        if !self.color_channels.contains(&layout.color_channels()) {
            return Some(format!(
                "{} color channels outside {:?}",
                layout.color_channels(),
                self.color_channels
            ));
        }
        if !self.caps.allows(layout) {
            return Some(format!("layout flags of {layout} not accepted"));
        }
        None
    }
}

fn ranges_overlap(a: &RangeInclusive<u8>, b: &RangeInclusive<u8>) -> bool {
    a.start().max(b.start()) <= a.end().min(b.end())
}
