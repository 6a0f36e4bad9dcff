//! Input/output collaborators around the mosaic core

/// Command-line interface and batch file processing
pub mod cli;
/// Constants and runtime defaults
pub mod configuration;
/// Error types and tile context helpers
pub mod error;
/// Source image loading and decoding
pub mod image;
/// Terminal progress display
pub mod progress;
/// SVG document display sink
pub mod sink;
