//! Error types for mosaic construction and tile fetching

use std::fmt;
use std::path::PathBuf;

/// Failure of a single colour-asset request
///
/// Cloneable so that one failed fetch can be reported to every caller that
/// coalesced onto it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Server answered with a non-success status code
    Status {
        /// Requested URL
        url: String,
        /// HTTP status code returned by the server
        status: u16,
    },

    /// Response body declared a format it could not be parsed as
    Parse {
        /// Requested URL
        url: String,
        /// Parser message
        reason: String,
    },

    /// Request never produced a response
    Transport {
        /// Requested URL
        url: String,
        /// Underlying client message
        reason: String,
    },

    /// A batch result carried an id with no waiting caller
    Protocol {
        /// Unmatched request id
        id: u64,
    },

    /// The dispatcher shut down before the request settled
    Disconnected,
}

impl FetchError {
    /// HTTP status carried by the error, if any
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status { url, status } => write!(f, "'{url}' answered with status {status}"),
            Self::Parse { url, reason } => write!(f, "Failed to parse response of '{url}': {reason}"),
            Self::Transport { url, reason } => write!(f, "Request to '{url}' failed: {reason}"),
            Self::Protocol { id } => write!(f, "Batch result for unknown request id {id}"),
            Self::Disconnected => write!(f, "Dispatcher shut down before the request settled"),
        }
    }
}

impl std::error::Error for FetchError {}

/// Main error type for all mosaic operations
#[derive(Debug)]
pub enum MosaicError {
    /// No image was supplied at the given location
    MissingInput {
        /// Path that was expected to hold an image
        path: PathBuf,
    },

    /// The supplied file is not an image type the decoder recognises
    UnsupportedImage {
        /// Path to the rejected file
        path: PathBuf,
    },

    /// Failed to decode the source image
    ImageDecode {
        /// Path to the image file
        path: PathBuf,
        /// Underlying image decoding error
        source: image::ImageError,
    },

    /// Source pixel data doesn't match its declared dimensions
    InvalidSourceData {
        /// Description of what's wrong with the source data
        reason: String,
    },

    /// Parameter validation failed
    InvalidParameter {
        /// Name of the invalid parameter
        parameter: &'static str,
        /// Provided value that failed validation
        value: String,
        /// Explanation of why the value is invalid
        reason: String,
    },

    /// A tile was asked for its colour before any pixel was counted
    EmptyTile {
        /// Tile row
        row: usize,
        /// Tile column
        column: usize,
    },

    /// Fetching the asset for a tile failed, aborting the build
    Fetch {
        /// Tile row
        row: usize,
        /// Tile column
        column: usize,
        /// Colour key that was being resolved
        key: String,
        /// Underlying fetch failure
        source: FetchError,
    },

    /// A batch result could not be matched to a pending request
    WorkerProtocol {
        /// Unmatched request id
        id: u64,
    },

    /// A row was handed to the renderer more than once
    DuplicateRow {
        /// Offending row index
        row: usize,
    },

    /// HTTP client could not be constructed
    HttpClient {
        /// Underlying client message
        reason: String,
    },

    /// General file system operation failure
    FileSystem {
        /// Path involved in the operation
        path: PathBuf,
        /// Description of the operation that failed
        operation: &'static str,
        /// Underlying I/O error
        source: std::io::Error,
    },
}

impl fmt::Display for MosaicError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingInput { path } => {
                write!(f, "No image provided at '{}'", path.display())
            }
            Self::UnsupportedImage { path } => {
                write!(
                    f,
                    "'{}' is not an image type we know how to handle",
                    path.display()
                )
            }
            Self::ImageDecode { path, source } => {
                write!(f, "Failed to decode image '{}': {source}", path.display())
            }
            Self::InvalidSourceData { reason } => {
                write!(f, "Invalid source data: {reason}")
            }
            Self::InvalidParameter {
                parameter,
                value,
                reason,
            } => {
                write!(f, "Invalid parameter '{parameter}' = '{value}': {reason}")
            }
            Self::EmptyTile { row, column } => {
                write!(f, "Tile ({row}, {column}) has no pixels to average")
            }
            Self::Fetch {
                row,
                column,
                key,
                source,
            } => {
                write!(
                    f,
                    "Failed to fetch tile ({row}, {column}) for colour {key}: {source}"
                )
            }
            Self::WorkerProtocol { id } => {
                write!(f, "Worker returned a result for unknown request id {id}")
            }
            Self::DuplicateRow { row } => {
                write!(f, "Row {row} was submitted more than once")
            }
            Self::HttpClient { reason } => {
                write!(f, "Failed to initialise HTTP client: {reason}")
            }
            Self::FileSystem {
                path,
                operation,
                source,
            } => {
                write!(
                    f,
                    "File system error during {operation} on '{}': {source}",
                    path.display()
                )
            }
        }
    }
}

impl std::error::Error for MosaicError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::ImageDecode { source, .. } => Some(source),
            Self::Fetch { source, .. } => Some(source),
            Self::FileSystem { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Convenience type alias for mosaic results
pub type Result<T> = std::result::Result<T, MosaicError>;

/// Attaches tile coordinates to a failed fetch
pub trait WithTile<T> {
    /// Convert a fetch failure into a build failure for the given tile
    ///
    /// # Errors
    ///
    /// Propagates the original fetch error wrapped in [`MosaicError::Fetch`]
    fn at_tile(self, row: usize, column: usize, key: &str) -> Result<T>;
}

impl<T> WithTile<T> for std::result::Result<T, FetchError> {
    fn at_tile(self, row: usize, column: usize, key: &str) -> Result<T> {
        self.map_err(|source| match source {
            FetchError::Protocol { id } => MosaicError::WorkerProtocol { id },
            source => MosaicError::Fetch {
                row,
                column,
                key: key.to_string(),
                source,
            },
        })
    }
}

impl From<image::ImageError> for MosaicError {
    fn from(err: image::ImageError) -> Self {
        Self::ImageDecode {
            path: PathBuf::from("<unknown>"),
            source: err,
        }
    }
}

impl From<std::io::Error> for MosaicError {
    fn from(err: std::io::Error) -> Self {
        Self::FileSystem {
            path: PathBuf::from("<unknown>"),
            operation: "unknown",
            source: err,
        }
    }
}

/// Create an invalid parameter error
pub fn invalid_parameter(
    parameter: &'static str,
    value: &impl ToString,
    reason: &impl ToString,
) -> MosaicError {
    MosaicError::InvalidParameter {
        parameter,
        value: value.to_string(),
        reason: reason.to_string(),
    }
}
