//! Parsed SVG tile assets

use crate::io::error::FetchError;

/// Renderable vector tile
///
/// Owns its markup, so clones share nothing: placing one copy never moves
/// another or the cached original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    markup: String,
    width: Option<String>,
    height: Option<String>,
    fill: Option<String>,
    placement: Option<(usize, usize)>,
}

impl Asset {
    /// Parse SVG markup fetched from `source`
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Parse`] if the markup is not well-formed XML or
    /// its root element is not `<svg>`
    pub fn parse(source: &str, markup: &str) -> Result<Self, FetchError> {
        let parse_error = |reason: String| FetchError::Parse {
            url: source.to_string(),
            reason,
        };

        let document = roxmltree::Document::parse(markup).map_err(|e| parse_error(e.to_string()))?;
        let root = document.root_element();
        if root.tag_name().name() != "svg" {
            return Err(parse_error(format!(
                "expected an <svg> root element, found <{}>",
                root.tag_name().name()
            )));
        }

        let fill = root
            .descendants()
            .find_map(|node| node.attribute("fill"))
            .map(str::to_string);

        Ok(Self {
            markup: markup.trim().to_string(),
            width: root.attribute("width").map(str::to_string),
            height: root.attribute("height").map(str::to_string),
            fill,
            placement: None,
        })
    }

    /// Source markup
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// Declared width of the root element
    pub fn width(&self) -> Option<&str> {
        self.width.as_deref()
    }

    /// Declared height of the root element
    pub fn height(&self) -> Option<&str> {
        self.height.as_deref()
    }

    /// First fill colour in document order
    pub fn fill(&self) -> Option<&str> {
        self.fill.as_deref()
    }

    /// Grid position assigned by a consumer, as (column, row)
    pub const fn placement(&self) -> Option<(usize, usize)> {
        self.placement
    }

    /// Assign this copy to a grid position
    pub const fn place(&mut self, column: usize, row: usize) {
        self.placement = Some((column, row));
    }
}
