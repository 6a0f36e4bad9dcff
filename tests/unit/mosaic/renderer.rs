//! Tests for in-order row delivery

#[cfg(test)]
mod tests {
    use colormosaic::mosaic::asset::Asset;
    use colormosaic::mosaic::renderer::{
        DisplaySink, OrderedRowRenderer, PlacedTile, RowState, Submission,
    };
    use colormosaic::{MosaicError, Result};

    #[derive(Default)]
    struct RecordingSink {
        rows: Vec<(usize, Vec<usize>)>,
        fail_on: Option<usize>,
    }

    impl DisplaySink for RecordingSink {
        fn display_row(&mut self, row: usize, tiles: &[PlacedTile]) -> Result<()> {
            if self.fail_on == Some(row) {
                return Err(MosaicError::InvalidSourceData {
                    reason: "sink closed".to_string(),
                });
            }
            self.rows
                .push((row, tiles.iter().map(|tile| tile.column).collect()));
            Ok(())
        }
    }

    fn tiles(columns: &[usize]) -> Vec<PlacedTile> {
        let asset = Asset::parse("/test", "<svg/>").expect("valid svg");
        columns
            .iter()
            .map(|&column| PlacedTile {
                column,
                asset: asset.clone(),
            })
            .collect()
    }

    fn displayed(sink: &RecordingSink) -> Vec<usize> {
        sink.rows.iter().map(|(row, _)| *row).collect()
    }

    // Tests rows completing as 2, 0, 1 are displayed as 0, 1, 2
    // Verified by displaying rows on arrival
    #[test]
    fn test_out_of_order_rows() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink::default();

        assert_eq!(
            renderer.submit_row(2, tiles(&[0]), &mut sink).expect("row 2"),
            Submission::Buffered
        );
        assert!(sink.rows.is_empty());
        assert_eq!(renderer.buffered_rows(), vec![2]);

        assert_eq!(
            renderer.submit_row(0, tiles(&[0]), &mut sink).expect("row 0"),
            Submission::Rendered(1)
        );
        assert_eq!(
            renderer.submit_row(1, tiles(&[0]), &mut sink).expect("row 1"),
            Submission::Rendered(2)
        );

        assert_eq!(displayed(&sink), vec![0, 1, 2]);
        assert_eq!(renderer.rendered_rows(), 3);
        assert!(renderer.buffered_rows().is_empty());
    }

    // Tests a single submission can release a long run of buffered rows
    // Verified by releasing only one buffered row
    #[test]
    fn test_reverse_order_cascade() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink::default();

        for row in (1..5).rev() {
            renderer.submit_row(row, tiles(&[0]), &mut sink).expect("buffered");
        }
        assert!(sink.rows.is_empty());

        assert_eq!(
            renderer.submit_row(0, tiles(&[0]), &mut sink).expect("row 0"),
            Submission::Rendered(5)
        );
        assert_eq!(displayed(&sink), vec![0, 1, 2, 3, 4]);
    }

    // Tests tiles reach the sink sorted by column
    // Verified by passing tiles in arrival order
    #[test]
    fn test_tiles_sorted_by_column() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink::default();

        renderer
            .submit_row(0, tiles(&[3, 0, 2, 1]), &mut sink)
            .expect("row 0");

        assert_eq!(sink.rows, vec![(0, vec![0, 1, 2, 3])]);
    }

    // Tests row state transitions
    // Verified by reporting buffered rows as pending
    #[test]
    fn test_row_states() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink::default();

        assert_eq!(renderer.state(0), RowState::Pending);
        renderer.submit_row(1, tiles(&[0]), &mut sink).expect("row 1");
        assert_eq!(renderer.state(1), RowState::Ready);
        renderer.submit_row(0, tiles(&[0]), &mut sink).expect("row 0");
        assert_eq!(renderer.state(0), RowState::Rendered);
        assert_eq!(renderer.state(1), RowState::Rendered);
        assert_eq!(renderer.next_row(), 2);
    }

    // Tests resubmitting a row is rejected whether buffered or rendered
    // Verified by overwriting buffered rows
    #[test]
    fn test_duplicate_rows_rejected() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink::default();

        renderer.submit_row(1, tiles(&[0]), &mut sink).expect("row 1");
        assert!(matches!(
            renderer.submit_row(1, tiles(&[0]), &mut sink),
            Err(MosaicError::DuplicateRow { row: 1 })
        ));

        renderer.submit_row(0, tiles(&[0]), &mut sink).expect("row 0");
        assert!(matches!(
            renderer.submit_row(0, tiles(&[0]), &mut sink),
            Err(MosaicError::DuplicateRow { row: 0 })
        ));
        assert_eq!(displayed(&sink), vec![0, 1]);
    }

    // Tests sink failures propagate to the submitter
    // Verified by ignoring sink errors
    #[test]
    fn test_sink_error_propagates() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink {
            fail_on: Some(0),
            ..RecordingSink::default()
        };

        assert!(renderer.submit_row(0, tiles(&[0]), &mut sink).is_err());
        assert_eq!(renderer.rendered_rows(), 0);
    }

    // Tests a buffered row the sink rejects stays buffered rather than lost
    // Verified by removing buffered rows before displaying them
    #[test]
    fn test_rejected_buffered_row_stays_ready() {
        let mut renderer = OrderedRowRenderer::new();
        let mut sink = RecordingSink {
            fail_on: Some(1),
            ..RecordingSink::default()
        };

        assert_eq!(
            renderer.submit_row(1, tiles(&[0]), &mut sink).expect("row 1"),
            Submission::Buffered
        );
        assert!(renderer.submit_row(0, tiles(&[0]), &mut sink).is_err());

        assert_eq!(displayed(&sink), vec![0]);
        assert_eq!(renderer.rendered_rows(), 1);
        assert_eq!(renderer.state(1), RowState::Ready);
        assert_eq!(renderer.buffered_rows(), vec![1]);
        assert!(matches!(
            renderer.submit_row(1, tiles(&[0]), &mut sink),
            Err(MosaicError::DuplicateRow { row: 1 })
        ));
    }
}
