//! Mosaic assembly from an aggregated tile grid
//!
//! Every tile's colour is resolved up front so that requests share batches.
//! Completions arrive on dispatcher threads and are forwarded over a channel
//! to the building thread, which gathers them per row and feeds complete rows
//! to the [`OrderedRowRenderer`].

use crate::io::configuration::{DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH, MAX_TILE_DIMENSION};
use crate::io::error::{FetchError, MosaicError, Result, WithTile, invalid_parameter};
use crate::mosaic::asset::Asset;
use crate::mosaic::renderer::{DisplaySink, OrderedRowRenderer, PlacedTile};
use crate::mosaic::resolver::TileResolver;
use crate::tiling::aggregate::TileGrid;
use crate::tiling::colour::{ColourKey, encode};
use crossbeam_channel::unbounded;
use std::collections::HashMap;

/// Tile geometry and caching policy of a mosaic run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MosaicConfig {
    /// Tile width in source pixels
    pub tile_width: usize,
    /// Tile height in source pixels
    pub tile_height: usize,
    /// Reuse fetched assets across tiles and images
    pub caching: bool,
}

impl Default for MosaicConfig {
    fn default() -> Self {
        Self {
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            caching: true,
        }
    }
}

impl MosaicConfig {
    /// Check the tile geometry
    ///
    /// # Errors
    ///
    /// Returns an error if a tile dimension is zero or exceeds
    /// [`MAX_TILE_DIMENSION`]
    pub fn validate(&self) -> Result<()> {
        for (parameter, value) in [
            ("tile_width", self.tile_width),
            ("tile_height", self.tile_height),
        ] {
            if value == 0 || value > MAX_TILE_DIMENSION {
                return Err(invalid_parameter(
                    parameter,
                    &value,
                    &format!("must be between 1 and {MAX_TILE_DIMENSION}"),
                ));
            }
        }
        Ok(())
    }
}

/// Totals of a finished build
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MosaicSummary {
    /// Rows displayed
    pub rows: usize,
    /// Tiles displayed
    pub tiles: usize,
    /// Distinct colours in the mosaic
    pub distinct_colours: usize,
}

struct TileEvent {
    row: usize,
    column: usize,
    outcome: std::result::Result<Asset, FetchError>,
}

struct RowGather {
    expected: usize,
    tiles: Vec<PlacedTile>,
}

/// Drives one mosaic build against a shared resolver
pub struct MosaicBuilder<'a> {
    resolver: &'a TileResolver,
    progress: Option<Box<dyn FnMut(usize, usize) + 'a>>,
}

impl<'a> MosaicBuilder<'a> {
    /// Create a builder resolving through `resolver`
    pub fn new(resolver: &'a TileResolver) -> Self {
        Self {
            resolver,
            progress: None,
        }
    }

    /// Report (rows rendered, total rows) after each displayed batch of rows
    #[must_use]
    pub fn with_progress(mut self, progress: impl FnMut(usize, usize) + 'a) -> Self {
        self.progress = Some(Box::new(progress));
        self
    }

    /// Resolve every tile of `grid` and display the rows in order
    ///
    /// # Errors
    ///
    /// Returns the first tile failure (the build stops, leaving any rows
    /// already displayed in place), or the sink's error
    pub fn build(&mut self, grid: &TileGrid, sink: &mut dyn DisplaySink) -> Result<MosaicSummary> {
        let total_rows = grid.rows();
        let mut keys: HashMap<(usize, usize), ColourKey> = HashMap::new();
        let mut gathers: HashMap<usize, RowGather> = HashMap::new();

        for row in 0..total_rows {
            let mut expected = 0;
            for accumulator in grid.row(row) {
                keys.insert((row, accumulator.x()), encode(accumulator)?);
                expected += 1;
            }
            gathers.insert(
                row,
                RowGather {
                    expected,
                    tiles: Vec::with_capacity(expected),
                },
            );
        }

        let (events_tx, events_rx) = unbounded();
        let mut ordered: Vec<(&(usize, usize), &ColourKey)> = keys.iter().collect();
        ordered.sort_by_key(|(position, _)| **position);
        for (&(row, column), key) in ordered {
            let events_tx = events_tx.clone();
            self.resolver.resolve(key).on_settled(move |outcome| {
                // Receiver is gone once the build has failed
                let _ = events_tx.send(TileEvent {
                    row,
                    column,
                    outcome,
                });
            });
        }
        drop(events_tx);

        let mut renderer = OrderedRowRenderer::new();
        let mut tiles = 0;

        // Rows without tiles only arise from empty images, but are released
        // in order all the same
        let empty_rows: Vec<usize> = gathers
            .iter()
            .filter(|(_, gather)| gather.expected == 0)
            .map(|(&row, _)| row)
            .collect();
        for row in empty_rows {
            gathers.remove(&row);
            renderer.submit_row(row, Vec::new(), sink)?;
        }
        if renderer.rendered_rows() > 0 {
            self.report(renderer.rendered_rows(), total_rows);
        }

        while renderer.rendered_rows() < total_rows {
            let Ok(event) = events_rx.recv() else {
                return Err(MosaicError::Fetch {
                    row: renderer.next_row(),
                    column: 0,
                    key: String::new(),
                    source: FetchError::Disconnected,
                });
            };

            let key = keys
                .get(&(event.row, event.column))
                .map(ColourKey::as_str)
                .unwrap_or_default();
            let mut asset = event.outcome.at_tile(event.row, event.column, key)?;
            asset.place(event.column, event.row);

            let complete = gathers.get_mut(&event.row).is_some_and(|gather| {
                gather.tiles.push(PlacedTile {
                    column: event.column,
                    asset,
                });
                gather.tiles.len() == gather.expected
            });

            if complete {
                if let Some(gather) = gathers.remove(&event.row) {
                    tiles += gather.tiles.len();
                    let before = renderer.rendered_rows();
                    renderer.submit_row(event.row, gather.tiles, sink)?;
                    if renderer.rendered_rows() > before {
                        self.report(renderer.rendered_rows(), total_rows);
                    }
                }
            }
        }

        let mut distinct: Vec<&ColourKey> = keys.values().collect();
        distinct.sort_unstable();
        distinct.dedup();

        Ok(MosaicSummary {
            rows: renderer.rendered_rows(),
            tiles,
            distinct_colours: distinct.len(),
        })
    }

    fn report(&mut self, rendered: usize, total: usize) {
        if let Some(progress) = self.progress.as_mut() {
            progress(rendered, total);
        }
    }
}
