//! Canonical colour identifiers derived from tile averages

use crate::io::error::{MosaicError, Result, invalid_parameter};
use crate::tiling::aggregate::TileAccumulator;
use std::fmt;

/// Eight lowercase hex digits in RRGGBBAA order
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColourKey(String);

impl ColourKey {
    /// Build a key from channel bytes
    pub fn from_channels(channels: [u8; 4]) -> Self {
        let [red, green, blue, alpha] = channels;
        Self(format!("{red:02x}{green:02x}{blue:02x}{alpha:02x}"))
    }

    /// Parse a key from text, accepting either hex case
    ///
    /// # Errors
    ///
    /// Returns an error unless the text is exactly eight hex digits
    pub fn parse(text: &str) -> Result<Self> {
        if text.len() != 8 || !text.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid_parameter(
                "colour",
                &text,
                &"expected eight hex digits (RRGGBBAA)",
            ));
        }
        Ok(Self(text.to_ascii_lowercase()))
    }

    /// Key text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Channel bytes in R, G, B, A order
    pub fn channels(&self) -> [u8; 4] {
        let mut channels = [0u8; 4];
        for (index, channel) in channels.iter_mut().enumerate() {
            *channel = self
                .0
                .get(index * 2..index * 2 + 2)
                .and_then(|pair| u8::from_str_radix(pair, 16).ok())
                .unwrap_or(0);
        }
        channels
    }
}

impl fmt::Display for ColourKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ColourKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Encode a finished accumulator as its average colour key
///
/// # Errors
///
/// Returns [`MosaicError::EmptyTile`] if the accumulator never counted a pixel
pub fn encode(accumulator: &TileAccumulator) -> Result<ColourKey> {
    accumulator
        .average()
        .map(ColourKey::from_channels)
        .ok_or(MosaicError::EmptyTile {
            row: accumulator.y(),
            column: accumulator.x(),
        })
}
