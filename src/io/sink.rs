//! Streaming SVG document output for finished mosaic rows

use crate::io::error::{MosaicError, Result};
use crate::mosaic::renderer::{DisplaySink, PlacedTile};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Writes rows into a standalone SVG document as they are displayed
///
/// Each row becomes a `<g class="mosaic-row">` group and each tile is
/// translated to its grid cell. The document is only well-formed once
/// [`SvgDocumentSink::finish`] has run.
pub struct SvgDocumentSink<W: Write> {
    writer: W,
    tile_width: usize,
    tile_height: usize,
    rows_written: usize,
}

impl<W: Write> SvgDocumentSink<W> {
    /// Start a document of `cols` x `rows` tiles on `writer`
    ///
    /// # Errors
    ///
    /// Returns an error if the document header cannot be written
    pub fn new(
        mut writer: W,
        cols: usize,
        rows: usize,
        tile_width: usize,
        tile_height: usize,
    ) -> Result<Self> {
        let width = cols * tile_width;
        let height = rows * tile_height;
        writeln!(
            writer,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{height}" viewBox="0 0 {width} {height}">"#
        )?;

        Ok(Self {
            writer,
            tile_width,
            tile_height,
            rows_written: 0,
        })
    }

    /// Rows written so far
    pub const fn rows_written(&self) -> usize {
        self.rows_written
    }

    /// Close the document and return the writer
    ///
    /// # Errors
    ///
    /// Returns an error if the closing tag cannot be written or flushed
    pub fn finish(mut self) -> Result<W> {
        writeln!(self.writer, "</svg>")?;
        self.writer.flush()?;
        Ok(self.writer)
    }
}

impl SvgDocumentSink<BufWriter<File>> {
    /// Create the output file, including missing parent directories
    ///
    /// # Errors
    ///
    /// Returns an error if the directory or file cannot be created
    pub fn create(
        path: &Path,
        cols: usize,
        rows: usize,
        tile_width: usize,
        tile_height: usize,
    ) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| MosaicError::FileSystem {
                path: parent.to_path_buf(),
                operation: "create directory",
                source: e,
            })?;
        }

        let file = File::create(path).map_err(|e| MosaicError::FileSystem {
            path: PathBuf::from(path),
            operation: "create file",
            source: e,
        })?;

        Self::new(BufWriter::new(file), cols, rows, tile_width, tile_height)
    }
}

impl<W: Write> DisplaySink for SvgDocumentSink<W> {
    fn display_row(&mut self, row: usize, tiles: &[PlacedTile]) -> Result<()> {
        let y = row * self.tile_height;
        writeln!(self.writer, r#"  <g class="mosaic-row" data-row="{row}">"#)?;
        for tile in tiles {
            let x = tile.column * self.tile_width;
            writeln!(
                self.writer,
                r#"    <g transform="translate({x},{y})">{}</g>"#,
                tile.asset.markup()
            )?;
        }
        writeln!(self.writer, "  </g>")?;
        self.rows_written += 1;
        Ok(())
    }
}
