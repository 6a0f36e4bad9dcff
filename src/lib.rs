//! Colour-tile mosaics built from raster images
//!
//! Images are reduced to a grid of average tile colours, each colour is
//! resolved to a vector swatch through a batching request dispatcher, and the
//! finished rows are emitted strictly in top-to-bottom order.

#![forbid(unsafe_code)]

/// Input/output operations and error handling
pub mod io;
/// Asset resolution, row ordering and mosaic assembly
pub mod mosaic;
/// Request transports, batch workers and the batching dispatcher
pub mod network;
/// Pixel aggregation and colour key encoding
pub mod tiling;

pub use io::error::{FetchError, MosaicError, Result};
