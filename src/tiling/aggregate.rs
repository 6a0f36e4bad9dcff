//! Single-pass aggregation of raster pixels into per-tile colour sums
//!
//! The scan walks the RGBA samples in raster order, keeping a pixel cursor
//! that advances once per completed pixel. Each sample is credited to the
//! tile under the cursor, so the whole image is summarised without ever
//! materialising individual tiles.

use crate::io::configuration::MAX_TILE_DIMENSION;
use crate::io::error::{MosaicError, Result, invalid_parameter};
use ndarray::Array2;

/// Number of interleaved channel values per pixel
pub const CHANNELS: usize = 4;

/// Borrowed view of decoded RGBA samples
#[derive(Debug, Clone, Copy)]
pub struct PixelBuffer<'a> {
    samples: &'a [u8],
    width: usize,
    height: usize,
}

impl<'a> PixelBuffer<'a> {
    /// Wrap raw RGBA samples with their declared dimensions
    ///
    /// # Errors
    ///
    /// Returns an error if the sample count is not `width * height * 4`
    pub fn new(samples: &'a [u8], width: usize, height: usize) -> Result<Self> {
        let expected = width
            .checked_mul(height)
            .and_then(|pixels| pixels.checked_mul(CHANNELS))
            .ok_or_else(|| MosaicError::InvalidSourceData {
                reason: format!("{width}x{height} image is too large"),
            })?;

        if samples.len() != expected {
            return Err(MosaicError::InvalidSourceData {
                reason: format!(
                    "{width}x{height} image needs {expected} samples, got {}",
                    samples.len()
                ),
            });
        }

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

    /// Raw samples in raster order
    pub const fn samples(&self) -> &'a [u8] {
        self.samples
    }
}

/// Running channel sums for one tile of the source image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileAccumulator {
    x: usize,
    y: usize,
    red: u64,
    green: u64,
    blue: u64,
    alpha: u64,
    count: u64,
}

impl TileAccumulator {
    /// Create an empty accumulator for the tile at column `x`, row `y`
    pub const fn new(x: usize, y: usize) -> Self {
        Self {
            x,
            y,
            red: 0,
            green: 0,
            blue: 0,
            alpha: 0,
            count: 0,
        }
    }

    /// Tile column
    pub const fn x(&self) -> usize {
        self.x
    }

    /// Tile row
    pub const fn y(&self) -> usize {
        self.y
    }

    /// Number of complete pixels folded into the sums
    pub const fn count(&self) -> u64 {
        self.count
    }

    /// Channel sums in R, G, B, A order
    pub const fn sums(&self) -> [u64; 4] {
        [self.red, self.green, self.blue, self.alpha]
    }

    /// Floor-averaged channels, or `None` while no pixel has been counted
    pub fn average(&self) -> Option<[u8; 4]> {
        if self.count == 0 {
            return None;
        }
        let channel = |sum: u64| u8::try_from(sum / self.count).unwrap_or(u8::MAX);
        Some([
            channel(self.red),
            channel(self.green),
            channel(self.blue),
            channel(self.alpha),
        ])
    }

    fn add_sample(&mut self, offset: usize, value: u8) {
        let value = u64::from(value);
        match offset {
            0 => self.red += value,
            1 => self.green += value,
            2 => self.blue += value,
            _ => {
                self.alpha += value;
                self.count += 1;
            }
        }
    }
}

/// Tile accumulators laid out by (row, column)
#[derive(Debug, Clone)]
pub struct TileGrid {
    tiles: Array2<Option<TileAccumulator>>,
    tile_width: usize,
    tile_height: usize,
}

impl TileGrid {
    /// Number of tile rows
    pub fn rows(&self) -> usize {
        self.tiles.nrows()
    }

    /// Number of tile columns
    pub fn cols(&self) -> usize {
        self.tiles.ncols()
    }

    /// Tile width in source pixels
    pub const fn tile_width(&self) -> usize {
        self.tile_width
    }

    /// Tile height in source pixels
    pub const fn tile_height(&self) -> usize {
        self.tile_height
    }

    /// Accumulator at the given tile coordinates
    pub fn get(&self, row: usize, column: usize) -> Option<&TileAccumulator> {
        self.tiles.get((row, column)).and_then(Option::as_ref)
    }

    /// Accumulators of one row in ascending column order
    pub fn row(&self, row: usize) -> impl Iterator<Item = &TileAccumulator> + '_ {
        (0..self.cols()).filter_map(move |column| self.get(row, column))
    }

    /// Every accumulator, row by row
    pub fn iter(&self) -> impl Iterator<Item = &TileAccumulator> + '_ {
        (0..self.rows()).flat_map(move |row| self.row(row))
    }

    /// Total number of tiles that received at least one sample
    pub fn tile_count(&self) -> usize {
        self.tiles.iter().filter(|tile| tile.is_some()).count()
    }

    /// Sum of pixel counts over every tile
    pub fn total_samples(&self) -> u64 {
        self.iter().map(TileAccumulator::count).sum()
    }
}

/// Partition a pixel buffer into tiles and sum each tile's channels
///
/// Edge tiles that extend past the image border are partial and average
/// only the pixels they actually cover.
///
/// # Errors
///
/// Returns an error if either tile dimension is zero or above
/// [`MAX_TILE_DIMENSION`]
pub fn aggregate(buffer: &PixelBuffer<'_>, tile_width: usize, tile_height: usize) -> Result<TileGrid> {
    validate_dimension("tile_width", tile_width)?;
    validate_dimension("tile_height", tile_height)?;

    let rows = buffer.height().div_ceil(tile_height);
    let cols = buffer.width().div_ceil(tile_width);
    let mut tiles: Array2<Option<TileAccumulator>> = Array2::from_elem((rows, cols), None);

    let (mut column, mut row) = (0usize, 0usize);
    for (index, &value) in buffer.samples().iter().enumerate() {
        let tile_x = column / tile_width;
        let tile_y = row / tile_height;

        let Some(slot) = tiles.get_mut((tile_y, tile_x)) else {
            return Err(MosaicError::InvalidSourceData {
                reason: format!("pixel ({column}, {row}) lies outside the tile grid"),
            });
        };
        let offset = index % CHANNELS;
        slot.get_or_insert_with(|| TileAccumulator::new(tile_x, tile_y))
            .add_sample(offset, value);

        if offset == CHANNELS - 1 {
            column += 1;
            if column >= buffer.width() {
                column = 0;
                row += 1;
            }
        }
    }

    Ok(TileGrid {
        tiles,
        tile_width,
        tile_height,
    })
}

fn validate_dimension(parameter: &'static str, value: usize) -> Result<()> {
    if value == 0 {
        return Err(invalid_parameter(parameter, &value, &"must be positive"));
    }
    if value > MAX_TILE_DIMENSION {
        return Err(invalid_parameter(
            parameter,
            &value,
            &format!("must not exceed {MAX_TILE_DIMENSION}"),
        ));
    }
    Ok(())
}
