//! Mosaic assembly: asset resolution and ordered row delivery
//!
//! This module contains:
//! - Parsed SVG tile assets
//! - The cached, coalescing colour resolver
//! - The row-ordering renderer and its display sink seam
//! - The builder tying them together for one image

/// Parsed vector tile assets
pub mod asset;
/// Build orchestration from tile grid to display sink
pub mod builder;
/// In-order row delivery
pub mod renderer;
/// Colour to asset resolution with caching and coalescing
pub mod resolver;

pub use asset::Asset;
pub use builder::{MosaicBuilder, MosaicConfig, MosaicSummary};
pub use renderer::{DisplaySink, OrderedRowRenderer, PlacedTile, RowState, Submission};
pub use resolver::{Resolution, ResolverStats, TileResolver};
