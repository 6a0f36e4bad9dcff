//! Tests for mosaic configuration constants

#[cfg(test)]
mod tests {
    use colormosaic::io::configuration::{
        COLOUR_ENDPOINT, DEFAULT_IDLE_WINDOW_MS, DEFAULT_MAX_BATCH_REQUESTS, DEFAULT_SERVER_URL,
        DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH, DEFAULT_WORKER_CONCURRENCY, JSON_MEDIA_TYPE,
        MAX_INDIVIDUAL_PROGRESS_BARS, MAX_TILE_DIMENSION, OUTPUT_EXTENSION, OUTPUT_SUFFIX,
    };

    // Tests default tile geometry
    // Verified by changing default tile sizes
    #[test]
    fn test_default_tile_size() {
        assert_eq!(DEFAULT_TILE_WIDTH, 16);
        assert_eq!(DEFAULT_TILE_HEIGHT, 16);
        assert!(DEFAULT_TILE_WIDTH <= MAX_TILE_DIMENSION);
        assert!(DEFAULT_TILE_HEIGHT <= MAX_TILE_DIMENSION);
    }

    // Tests batching defaults
    // Verified by changing batch size and idle window
    #[test]
    fn test_batching_defaults() {
        assert_eq!(DEFAULT_MAX_BATCH_REQUESTS, 100);
        assert_eq!(DEFAULT_IDLE_WINDOW_MS, 1);
        assert!(DEFAULT_WORKER_CONCURRENCY > 0);
    }

    // Tests colour endpoint shape
    // Verified by removing leading slash
    #[test]
    fn test_colour_endpoint() {
        assert_eq!(COLOUR_ENDPOINT, "/color");
        assert!(DEFAULT_SERVER_URL.starts_with("http://"));
        assert!(!DEFAULT_SERVER_URL.ends_with('/'));
    }

    // Tests JSON media type
    // Verified by changing media type string
    #[test]
    fn test_json_media_type() {
        assert_eq!(JSON_MEDIA_TYPE, "application/json");
    }

    // Tests progress bar limit
    // Verified by increasing bar limit
    #[test]
    fn test_max_progress_bars_value() {
        assert_eq!(MAX_INDIVIDUAL_PROGRESS_BARS, 5);
    }

    // Tests filesystem safety of suffix
    // Verified by adding special character
    #[test]
    fn test_output_suffix_no_special_chars() {
        assert!(OUTPUT_SUFFIX.starts_with('_'));
        for ch in OUTPUT_SUFFIX.chars() {
            assert!(
                ch.is_alphanumeric() || ch == '_' || ch == '-',
                "Output suffix contains invalid character: {ch}"
            );
        }
        assert_eq!(OUTPUT_EXTENSION, "svg");
    }
}
