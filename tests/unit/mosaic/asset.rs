//! Tests for SVG asset parsing and placement

#[cfg(test)]
mod tests {
    use colormosaic::FetchError;
    use colormosaic::mosaic::asset::Asset;

    const SWATCH: &str = r##"
        <svg xmlns="http://www.w3.org/2000/svg" width="16" height="8">
            <g><ellipse cx="8" cy="4" rx="8" ry="4" fill="#ff0000"/></g>
        </svg>
    "##;

    // Tests root attributes and first fill are extracted
    // Verified by reading fill from the root only
    #[test]
    fn test_parse_swatch() {
        let asset = Asset::parse("/color/ff0000ff", SWATCH).expect("valid svg");

        assert_eq!(asset.width(), Some("16"));
        assert_eq!(asset.height(), Some("8"));
        assert_eq!(asset.fill(), Some("#ff0000"));
        assert!(asset.markup().starts_with("<svg"));
        assert_eq!(asset.placement(), None);
    }

    // Tests malformed markup is a parse failure naming its source
    // Verified by accepting any text
    #[test]
    fn test_parse_malformed() {
        let result = Asset::parse("/color/00000000", "<svg><g></svg>");

        match result {
            Err(FetchError::Parse { url, .. }) => assert_eq!(url, "/color/00000000"),
            other => unreachable!("expected a parse failure, got {other:?}"),
        }
    }

    // Tests documents must have an svg root
    // Verified by skipping the root element check
    #[test]
    fn test_parse_wrong_root() {
        let result = Asset::parse("/x", "<html><body/></html>");
        assert!(matches!(result, Err(FetchError::Parse { .. })));
    }

    // Tests placing a clone leaves the original untouched
    // Verified by sharing placement between clones
    #[test]
    fn test_clones_are_independent() {
        let original = Asset::parse("/color/ff0000ff", SWATCH).expect("valid svg");
        let mut first = original.clone();
        let mut second = original.clone();

        first.place(0, 0);
        second.place(3, 1);

        assert_eq!(first.placement(), Some((0, 0)));
        assert_eq!(second.placement(), Some((3, 1)));
        assert_eq!(original.placement(), None);
    }
}
