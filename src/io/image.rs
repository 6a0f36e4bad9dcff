//! Source image loading into raw RGBA samples

use crate::io::error::{MosaicError, Result};
use crate::tiling::aggregate::PixelBuffer;
use image::ImageFormat;
use std::path::{Path, PathBuf};

/// Decoded image owning its RGBA samples
#[derive(Debug, Clone)]
pub struct DecodedImage {
    samples: Vec<u8>,
    width: usize,
    height: usize,
}

impl DecodedImage {
    /// Wrap already decoded RGBA samples
    ///
    /// # Errors
    ///
    /// Returns an error if the sample count does not match the dimensions
    pub fn from_rgba(samples: Vec<u8>, width: usize, height: usize) -> Result<Self> {
        PixelBuffer::new(&samples, width, height)?;
        Ok(Self {
            samples,
            width,
            height,
        })
    }

    /// Image width in pixels
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Image height in pixels
    pub const fn height(&self) -> usize {
        self.height
    }

    /// Borrow the samples as a pixel buffer
    ///
    /// # Errors
    ///
    /// Never fails for images built through this type's constructors
    pub fn buffer(&self) -> Result<PixelBuffer<'_>> {
        PixelBuffer::new(&self.samples, self.width, self.height)
    }
}

/// Whether the decoder recognises the file's extension as an image format
pub fn is_supported_image(path: &Path) -> bool {
    ImageFormat::from_path(path).is_ok_and(|format| format.reading_enabled())
}

/// Load and decode an image file into RGBA samples
///
/// # Errors
///
/// Returns an error if:
/// - Nothing exists at `path`
/// - The extension is not a readable image format
/// - The file cannot be decoded
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<DecodedImage> {
    let path_buf: PathBuf = path.as_ref().to_path_buf();
    if !path_buf.is_file() {
        return Err(MosaicError::MissingInput { path: path_buf });
    }
    if !is_supported_image(&path_buf) {
        return Err(MosaicError::UnsupportedImage { path: path_buf });
    }

    let img = image::open(&path_buf).map_err(|e| MosaicError::ImageDecode {
        path: path_buf.clone(),
        source: e,
    })?;
    let rgba_img = img.to_rgba8();
    let (width, height) = (rgba_img.width() as usize, rgba_img.height() as usize);

    DecodedImage::from_rgba(rgba_img.into_raw(), width, height)
}
