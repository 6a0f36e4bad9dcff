//! Tests for colour key encoding and parsing

#[cfg(test)]
mod tests {
    use colormosaic::MosaicError;
    use colormosaic::tiling::aggregate::{PixelBuffer, TileAccumulator, aggregate};
    use colormosaic::tiling::colour::{ColourKey, encode};

    // Tests a red tile encodes as lowercase RRGGBBAA
    // Verified by formatting hex in upper case
    #[test]
    fn test_encode_red_tile() {
        let samples = [255, 0, 0, 255].repeat(16);
        let buffer = PixelBuffer::new(&samples, 4, 4).expect("buffer");
        let grid = aggregate(&buffer, 2, 2).expect("aggregate");

        for tile in grid.iter() {
            assert_eq!(encode(tile).expect("key").as_str(), "ff0000ff");
        }
    }

    // Tests single digit channels are zero padded
    // Verified by removing the width specifier
    #[test]
    fn test_from_channels_padding() {
        let key = ColourKey::from_channels([1, 2, 10, 0]);
        assert_eq!(key.as_str(), "01020a00");
        assert_eq!(key.as_str().len(), 8);
        assert_eq!(key.channels(), [1, 2, 10, 0]);
    }

    // Tests parsing normalises case and rejects bad input
    // Verified by accepting seven digit keys
    #[test]
    fn test_parse() {
        assert_eq!(
            ColourKey::parse("FF00AA80").expect("valid").as_str(),
            "ff00aa80"
        );
        assert!(ColourKey::parse("ff00aa8").is_err());
        assert!(ColourKey::parse("ff00aa8g").is_err());
        assert!(ColourKey::parse("").is_err());
    }

    // Tests empty accumulators cannot be encoded
    // Verified by encoding empty tiles as transparent black
    #[test]
    fn test_encode_empty_tile() {
        let result = encode(&TileAccumulator::new(2, 5));
        assert!(matches!(
            result,
            Err(MosaicError::EmptyTile { row: 5, column: 2 })
        ));
    }

    // Tests equal averages produce equal keys
    // Verified by including tile position in the key
    #[test]
    fn test_equal_colours_share_key() {
        let samples = [10, 20, 30, 40].repeat(4);
        let buffer = PixelBuffer::new(&samples, 4, 1).expect("buffer");
        let grid = aggregate(&buffer, 2, 1).expect("aggregate");

        let keys: Vec<ColourKey> = grid.iter().map(|tile| encode(tile).expect("key")).collect();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys.first(), keys.last());
        assert_eq!(keys.first().map(ToString::to_string), Some("0a141e28".to_string()));
    }
}
