//! Built-in filters.
//!
//! | Registration | Purpose |
//! |---|---|
//! | `//colour/root.image` | reads an [`ImageSource`](colorflow_core::ImageSource) |
//! | `//colour/output.image` | pass-through leaf, written back to its image |
//! | `//colour/offset.arith` | adds a constant to color samples |
//! | `//colour/depth.convert` | changes the sample type |
//! | `//colour/scale.nearest` | nearest-neighbour resampling |

mod depth;
mod offset;
mod output;
mod root;
mod scale;

pub use depth::DepthFilter;
pub use offset::{OffsetFilter, OffsetTable};
pub use output::OutputFilter;
pub use root::RootFilter;
pub use scale::ScaleFilter;

use crate::filter::{Filter, StreamDesc};
use colorflow_core::{EngineError, EngineResult};
use std::sync::Arc;

/// Registration of [`RootFilter`].
pub const ROOT_IMAGE: &str = "//colour/root.image";
/// Registration of [`OutputFilter`].
pub const OUTPUT_IMAGE: &str = "//colour/output.image";
/// Registration of [`OffsetFilter`].
pub const OFFSET: &str = "//colour/offset.arith";
/// Registration of [`DepthFilter`].
pub const DEPTH: &str = "//colour/depth.convert";
/// Registration of [`ScaleFilter`].
pub const SCALE: &str = "//colour/scale.nearest";

/// Option holding the image of root and output nodes.
pub const IMAGE_OPTION: &str = "image";

/// Every built-in filter.
pub fn builtins() -> Vec<Arc<dyn Filter>> {
    vec![
        Arc::new(RootFilter),
        Arc::new(OutputFilter),
        Arc::new(OffsetFilter),
        Arc::new(DepthFilter),
        Arc::new(ScaleFilter),
    ]
}

/// The single input of a one-plug filter.
pub(crate) fn single_input(inputs: &[StreamDesc]) -> EngineResult<&StreamDesc> {
    match inputs {
        [input] => Ok(input),
        _ => Err(EngineError::incompatible_data(format!(
            "expected one input stream, got {}",
            inputs.len()
        ))),
    }
}
