//! Tests for mosaic assembly from tile grids

#[cfg(test)]
mod tests {
    use colormosaic::mosaic::builder::{MosaicBuilder, MosaicConfig};
    use colormosaic::mosaic::renderer::{DisplaySink, PlacedTile};
    use colormosaic::mosaic::resolver::TileResolver;
    use colormosaic::network::dispatcher::{Dispatcher, DispatcherConfig};
    use colormosaic::network::swatch::SwatchTransport;
    use colormosaic::network::transport::{Method, RawResponse, Transport};
    use colormosaic::tiling::aggregate::{PixelBuffer, TileGrid, aggregate};
    use colormosaic::{FetchError, MosaicError, Result};
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const RED: [u8; 4] = [255, 0, 0, 255];
    const GREEN: [u8; 4] = [0, 255, 0, 255];
    const BLUE: [u8; 4] = [0, 0, 255, 255];

    /// Serves swatches, delaying one colour and refusing another
    struct ScriptedTransport {
        swatches: SwatchTransport,
        slow: Option<&'static str>,
        missing: Option<&'static str>,
    }

    impl Transport for ScriptedTransport {
        fn send(
            &self,
            method: Method,
            url: &str,
            body: Option<&str>,
        ) -> std::result::Result<RawResponse, FetchError> {
            if self.slow.is_some_and(|slow| url.ends_with(slow)) {
                thread::sleep(Duration::from_millis(150));
            }
            if self.missing.is_some_and(|missing| url.ends_with(missing)) {
                return Ok(RawResponse::status(404));
            }
            self.swatches.send(method, url, body)
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        rows: Vec<(usize, Vec<(usize, String)>)>,
    }

    impl DisplaySink for RecordingSink {
        fn display_row(&mut self, row: usize, tiles: &[PlacedTile]) -> Result<()> {
            let tiles = tiles
                .iter()
                .map(|tile| {
                    assert_eq!(tile.asset.placement(), Some((tile.column, row)));
                    (tile.column, tile.asset.fill().unwrap_or_default().to_string())
                })
                .collect();
            self.rows.push((row, tiles));
            Ok(())
        }
    }

    fn resolver_over(transport: ScriptedTransport) -> TileResolver {
        let dispatcher = Dispatcher::new(
            Arc::new(transport),
            DispatcherConfig {
                worker_concurrency: 16,
                ..DispatcherConfig::default()
            },
        )
        .expect("dispatcher");
        TileResolver::new(Arc::new(dispatcher), true)
    }

    fn transport(slow: Option<&'static str>, missing: Option<&'static str>) -> ScriptedTransport {
        ScriptedTransport {
            swatches: SwatchTransport::new(1, 1),
            slow,
            missing,
        }
    }

    /// One pixel per tile, rows given top to bottom
    fn grid(rows: &[&[[u8; 4]]]) -> TileGrid {
        let width = rows.first().map_or(0, |row| row.len());
        let samples: Vec<u8> = rows.iter().flat_map(|row| row.iter().flatten()).copied().collect();
        let buffer = PixelBuffer::new(&samples, width, rows.len()).expect("buffer");
        aggregate(&buffer, 1, 1).expect("aggregate")
    }

    // Tests rows reach the sink in order even when the first row is slowest
    // Verified by submitting rows in completion order
    #[test]
    fn test_rows_displayed_in_order() {
        let resolver = resolver_over(transport(Some("ff0000ff"), None));
        let grid = grid(&[&[RED, RED], &[GREEN, BLUE], &[BLUE, GREEN]]);
        let mut sink = RecordingSink::default();

        let summary = MosaicBuilder::new(&resolver)
            .build(&grid, &mut sink)
            .expect("build");

        let rows: Vec<usize> = sink.rows.iter().map(|(row, _)| *row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(summary.rows, 3);
        assert_eq!(summary.tiles, 6);
        assert_eq!(summary.distinct_colours, 3);
    }

    // Tests each row's tiles arrive sorted with their own colours
    // Verified by placing tiles at the wrong column
    #[test]
    fn test_row_contents() {
        let resolver = resolver_over(transport(None, None));
        let grid = grid(&[&[RED, GREEN, BLUE]]);
        let mut sink = RecordingSink::default();

        MosaicBuilder::new(&resolver)
            .build(&grid, &mut sink)
            .expect("build");

        assert_eq!(
            sink.rows,
            vec![(
                0,
                vec![
                    (0, "#ff0000".to_string()),
                    (1, "#00ff00".to_string()),
                    (2, "#0000ff".to_string()),
                ]
            )]
        );
    }

    // Tests repeated colours are fetched once per build
    // Verified by disabling coalescing in the resolver
    #[test]
    fn test_repeated_colours_fetched_once() {
        let resolver = resolver_over(transport(None, None));
        let grid = grid(&[&[RED, RED, RED], &[RED, RED, RED]]);
        let mut sink = RecordingSink::default();

        MosaicBuilder::new(&resolver)
            .build(&grid, &mut sink)
            .expect("build");

        let stats = resolver.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.coalesced + stats.cache_hits, 5);
    }

    // Tests a failed tile aborts the build with its coordinates
    // Verified by skipping failed tiles
    #[test]
    fn test_failed_tile_aborts() {
        let resolver = resolver_over(transport(None, Some("0000ffff")));
        let grid = grid(&[&[RED, RED], &[GREEN, BLUE]]);
        let mut sink = RecordingSink::default();

        let result = MosaicBuilder::new(&resolver).build(&grid, &mut sink);

        match result {
            Err(MosaicError::Fetch {
                row,
                column,
                key,
                source,
            }) => {
                assert_eq!((row, column), (1, 1));
                assert_eq!(key, "0000ffff");
                assert_eq!(source.status(), Some(404));
            }
            other => unreachable!("expected a fetch failure, got {other:?}"),
        }
        assert!(sink.rows.iter().all(|(row, _)| *row == 0));
    }

    // Tests progress reports end at the total row count
    // Verified by reporting before the row is displayed
    #[test]
    fn test_progress_reports() {
        let resolver = resolver_over(transport(Some("ff0000ff"), None));
        let grid = grid(&[&[RED], &[GREEN], &[BLUE], &[GREEN]]);
        let mut sink = RecordingSink::default();
        let mut reports = Vec::new();

        MosaicBuilder::new(&resolver)
            .with_progress(|rendered, total| reports.push((rendered, total)))
            .build(&grid, &mut sink)
            .expect("build");

        assert_eq!(reports.last(), Some(&(4, 4)));
        assert!(reports.windows(2).all(|pair| pair[0].0 < pair[1].0));
    }

    // Tests an empty grid builds an empty mosaic
    // Verified by waiting for tiles that never come
    #[test]
    fn test_empty_grid() {
        let resolver = resolver_over(transport(None, None));
        let grid = grid(&[]);
        let mut sink = RecordingSink::default();

        let summary = MosaicBuilder::new(&resolver)
            .build(&grid, &mut sink)
            .expect("build");

        assert_eq!(summary.rows, 0);
        assert!(sink.rows.is_empty());
    }

    // Tests rows without tiles still display and complete the progress
    // Verified by releasing empty rows silently
    #[test]
    fn test_zero_width_rows_report_progress() {
        let resolver = resolver_over(transport(None, None));
        let buffer = PixelBuffer::new(&[], 0, 3).expect("buffer");
        let grid = aggregate(&buffer, 1, 1).expect("aggregate");
        let mut sink = RecordingSink::default();
        let mut reports = Vec::new();

        let summary = MosaicBuilder::new(&resolver)
            .with_progress(|rendered, total| reports.push((rendered, total)))
            .build(&grid, &mut sink)
            .expect("build");

        assert_eq!(summary.rows, 3);
        assert_eq!(summary.tiles, 0);
        let rows: Vec<usize> = sink.rows.iter().map(|(row, _)| *row).collect();
        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(reports.last(), Some(&(3, 3)));
    }

    // Tests default geometry and validation
    // Verified by accepting zero-width tiles
    #[test]
    fn test_mosaic_config() {
        let config = MosaicConfig::default();
        assert_eq!((config.tile_width, config.tile_height), (16, 16));
        assert!(config.caching);
        assert!(config.validate().is_ok());

        let invalid = MosaicConfig {
            tile_height: 0,
            ..config
        };
        assert!(matches!(
            invalid.validate(),
            Err(MosaicError::InvalidParameter {
                parameter: "tile_height",
                ..
            })
        ));
    }
}
