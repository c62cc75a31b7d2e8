//! # colorflow-graph
//!
//! Pull-based color transform graphs.
//!
//! A [`Conversion`] is an acyclic graph of [`FilterNode`]s, each wrapping a
//! registered [`Filter`]. Pixels are produced on demand: asking the output
//! node for a rectangle recursively asks its inputs for the rectangles they
//! need, down to the root images.
//!
//! Filters that need expensive preparation (lookup tables, color transforms)
//! build a *context* once. Contexts live in the engine's [`ContextCache`],
//! keyed by a [`ContextKey`] derived from everything that influences them,
//! so identical nodes in any conversion share one context and it is built
//! at most once.
//!
//! ## Quick Start
//!
//! ```rust
//! use colorflow_core::{MemoryImage, PixelLayout};
//! use colorflow_graph::{Conversion, Engine};
//! use std::sync::Arc;
//!
//! let engine = Engine::default().shared();
//! let image = MemoryImage::from_vec(2, 1, PixelLayout::gray8(), vec![1, 2]).unwrap();
//! let conv = Conversion::chain(engine, Arc::new(image), &[], None).unwrap();
//!
//! let mut ticket = conv.full_ticket().unwrap();
//! conv.run_pixels(&mut ticket).unwrap();
//! assert_eq!(ticket.buffer().as_bytes(), &[1, 2]);
//! ```
//!
//! ## Configuration
//!
//! [`EngineConfig`] controls row parallelism, striping and the cache size,
//! and loads from YAML.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod cache;
pub mod config;
pub mod conversion;
pub mod engine;
pub mod error;
pub mod filter;
pub mod filters;
pub mod key;
pub mod node;
pub mod registry;
pub mod ticket;

pub use cache::{CacheStats, ContextCache};
pub use config::EngineConfig;
pub use conversion::Conversion;
pub use engine::Engine;
pub use error::{ConfigError, ConnectError, ConnectResult};
pub use filter::{Filter, RegionIo, SharedContext, StreamDesc};
pub use key::{ContextKey, KeyBuilder};
pub use node::{FilterNode, NodeState, Plug, Socket};
pub use registry::FilterRegistry;
pub use ticket::{CancelToken, PixelAccessTicket};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{
        CancelToken, Conversion, Engine, EngineConfig, Filter, PixelAccessTicket, RegionIo,
        SharedContext, StreamDesc,
    };
    pub use colorflow_core::prelude::*;
}
