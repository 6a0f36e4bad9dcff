//! Mosaic constants and runtime configuration defaults

// Tile geometry
/// Default tile width in source pixels
pub const DEFAULT_TILE_WIDTH: usize = 16;
/// Default tile height in source pixels
pub const DEFAULT_TILE_HEIGHT: usize = 16;

// Safety limit for user-supplied tile sizes
/// Maximum accepted tile dimension
pub const MAX_TILE_DIMENSION: usize = 4096;

// Batching
/// Requests collected before a batch is flushed without waiting
pub const DEFAULT_MAX_BATCH_REQUESTS: usize = 100;
/// Idle window after the first request of a batch before it is flushed
pub const DEFAULT_IDLE_WINDOW_MS: u64 = 1;
/// Requests executed in parallel inside one batch
pub const DEFAULT_WORKER_CONCURRENCY: usize = 8;

// Remote tile server
/// Server queried for colour tiles
pub const DEFAULT_SERVER_URL: &str = "http://localhost:8765";
/// Path prefix of the colour endpoint, followed by `/{colour}`
pub const COLOUR_ENDPOINT: &str = "/color";
/// Per-request timeout of the HTTP client
pub const REQUEST_TIMEOUT_SECS: u64 = 20;
/// Media type that switches response handling to JSON parsing
pub const JSON_MEDIA_TYPE: &str = "application/json";

// Progress bar display settings
/// Threshold for switching to batch progress mode
pub const MAX_INDIVIDUAL_PROGRESS_BARS: usize = 5;

// Output settings
/// Suffix added to output filenames
pub const OUTPUT_SUFFIX: &str = "_mosaic";
/// Extension of the generated mosaic document
pub const OUTPUT_EXTENSION: &str = "svg";
