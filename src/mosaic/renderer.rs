//! In-order delivery of rows that complete out of order
//!
//! Rows become ready whenever their last tile resolves, which can be in any
//! order. The renderer hands rows to the display sink strictly by index:
//! a row arriving ahead of its turn is parked in a buffer keyed by row index
//! and released as soon as every earlier row has been displayed.

use crate::io::error::{MosaicError, Result};
use crate::mosaic::asset::Asset;
use std::collections::BTreeMap;

/// One tile of a row together with its column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedTile {
    /// Tile column within its row
    pub column: usize,
    /// Asset to display
    pub asset: Asset,
}

/// Receives finished rows in display order
pub trait DisplaySink {
    /// Display one row whose tiles are sorted by ascending column
    ///
    /// # Errors
    ///
    /// Returns an error if the row cannot be written
    fn display_row(&mut self, row: usize, tiles: &[PlacedTile]) -> Result<()>;
}

/// Lifecycle of a row inside the renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    /// Not yet submitted
    Pending,
    /// Submitted and waiting for earlier rows
    Ready,
    /// Handed to the sink
    Rendered,
}

/// What happened to a submitted row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Submission {
    /// The row and this many rows in total (itself included) were displayed
    Rendered(usize),
    /// The row is waiting for an earlier row
    Buffered,
}

/// Row-ordering state machine
#[derive(Debug, Default)]
pub struct OrderedRowRenderer {
    next_row: usize,
    buffered: BTreeMap<usize, Vec<PlacedTile>>,
}

impl OrderedRowRenderer {
    /// Create a renderer expecting row 0 first
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of the next row the sink will receive
    pub const fn next_row(&self) -> usize {
        self.next_row
    }

    /// Rows already handed to the sink
    pub const fn rendered_rows(&self) -> usize {
        self.next_row
    }

    /// Rows waiting for an earlier row, in ascending order
    pub fn buffered_rows(&self) -> Vec<usize> {
        self.buffered.keys().copied().collect()
    }

    /// Current state of a row
    pub fn state(&self, row: usize) -> RowState {
        if row < self.next_row {
            RowState::Rendered
        } else if self.buffered.contains_key(&row) {
            RowState::Ready
        } else {
            RowState::Pending
        }
    }

    /// Accept a completed row, displaying it and any rows it unblocks
    ///
    /// # Errors
    ///
    /// Returns [`MosaicError::DuplicateRow`] if the row was already submitted,
    /// or the sink's error if displaying fails
    pub fn submit_row(
        &mut self,
        row: usize,
        mut tiles: Vec<PlacedTile>,
        sink: &mut dyn DisplaySink,
    ) -> Result<Submission> {
        if self.state(row) != RowState::Pending {
            return Err(MosaicError::DuplicateRow { row });
        }
        tiles.sort_by_key(|tile| tile.column);

        if row != self.next_row {
            log::trace!("row {row} ready before row {}; buffering", self.next_row);
            self.buffered.insert(row, tiles);
            return Ok(Submission::Buffered);
        }

        sink.display_row(row, &tiles)?;
        self.next_row += 1;
        let mut rendered = 1;

        // A buffered row leaves the buffer only once the sink has accepted it
        while let Some(tiles) = self.buffered.get(&self.next_row) {
            sink.display_row(self.next_row, tiles)?;
            self.buffered.remove(&self.next_row);
            self.next_row += 1;
            rendered += 1;
        }

        Ok(Submission::Rendered(rendered))
    }
}
