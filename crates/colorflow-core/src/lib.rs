//! # colorflow-core
//!
//! Core types for the colorflow color-management graph.
//!
//! This crate holds everything a filter author needs without pulling in the
//! graph engine itself:
//!
//! - [`PixelLayout`] - compact description of how pixels are stored, with a
//!   32-bit wire encoding
//! - [`Connector`] - capability descriptor of a node port and the
//!   negotiation between producer and consumer
//! - [`PixelBuffer`], [`BufferView`], [`BufferViewMut`] - pixel storage and
//!   rectangular views into it
//! - [`Options`] - filter parameters
//! - [`ProfileIdentity`], [`ImageSource`] - interfaces to the profile and
//!   image collaborators
//! - [`EngineError`] - the error taxonomy shared by every crate
//!
//! ## Crate Structure
//!
//! ```text
//! colorflow-core (this crate)
//!    ^
//!    |
//!    +-- colorflow-graph (nodes, conversions, context cache, built-in filters)
//!    +-- colorflow-icc (lcms2-backed ICC filter)
//! ```

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod buffer;
pub mod connector;
pub mod error;
pub mod layout;
pub mod options;
pub mod provider;
pub mod rect;
pub mod registration;
pub mod sample;

pub use buffer::*;
pub use connector::*;
pub use error::*;
pub use layout::*;
pub use options::*;
pub use provider::{
    ImageSource, MemoryImage, NamedProfile, OpaqueHandle, ProfileIdentity, SignatureKind,
};
pub use rect::*;

/// Identifier of a node within a conversion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "node#{}", self.0)
    }
}

/// Prelude module for convenient imports.
///
/// ```
/// use colorflow_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::buffer::{BufferView, BufferViewMut, PixelBuffer};
    pub use crate::connector::{Connector, IMAGE_DATA, Support};
    pub use crate::error::{EngineError, EngineResult, ErrorKind};
    pub use crate::layout::{ColorSpaceTag, PixelLayout, SampleType};
    pub use crate::options::{OptionValue, Options};
    pub use crate::provider::{ImageSource, MemoryImage, ProfileIdentity};
    pub use crate::rect::Rect;
    pub use crate::NodeId;
}
