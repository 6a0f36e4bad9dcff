//! Pixel-to-tile reduction
//!
//! This module turns a decoded image into tile colours:
//! - Raster scan accumulation of per-tile channel sums
//! - Average colour encoding into lookup keys

/// Tile accumulation over raw pixel buffers
pub mod aggregate;
/// Colour key encoding
pub mod colour;

pub use aggregate::{PixelBuffer, TileAccumulator, TileGrid, aggregate};
pub use colour::{ColourKey, encode};
