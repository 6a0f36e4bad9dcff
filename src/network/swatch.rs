//! Offline transport that answers colour requests with generated swatches

use crate::io::configuration::COLOUR_ENDPOINT;
use crate::io::error::FetchError;
use crate::network::transport::{Method, RawResponse, Transport};
use crate::tiling::colour::ColourKey;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Media type of generated swatches
pub const SVG_MEDIA_TYPE: &str = "image/svg+xml";

/// Serves `/color/{key}` locally with an SVG ellipse of that colour
///
/// Any other path, method, or malformed key answers 404.
#[derive(Debug)]
pub struct SwatchTransport {
    tile_width: usize,
    tile_height: usize,
    latency: Duration,
    requests: AtomicUsize,
}

impl SwatchTransport {
    /// Create a transport producing swatches of the given size
    pub const fn new(tile_width: usize, tile_height: usize) -> Self {
        Self {
            tile_width,
            tile_height,
            latency: Duration::ZERO,
            requests: AtomicUsize::new(0),
        }
    }

    /// Delay every response by `latency`
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Number of requests answered so far
    pub fn request_count(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }

    /// Markup for the swatch of one colour
    pub fn swatch(&self, key: &ColourKey) -> String {
        let [red, green, blue, alpha] = key.channels();
        let (width, height) = (self.tile_width, self.tile_height);
        let opacity = f64::from(alpha) / 255.0;
        format!(
            concat!(
                r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}">"#,
                r#"<ellipse cx="{cx}" cy="{cy}" rx="{cx}" ry="{cy}" "#,
                r##"fill="#{r:02x}{g:02x}{b:02x}" fill-opacity="{o:.3}"/></svg>"##
            ),
            w = width,
            h = height,
            cx = width as f64 / 2.0,
            cy = height as f64 / 2.0,
            r = red,
            g = green,
            b = blue,
            o = opacity,
        )
    }

    fn colour_from_path(url: &str) -> Option<ColourKey> {
        let path = url.split_once("://").map_or(url, |(_, rest)| {
            rest.find('/').map_or("", |start| rest.get(start..).unwrap_or(""))
        });
        let key = path
            .strip_prefix(COLOUR_ENDPOINT)
            .and_then(|rest| rest.strip_prefix('/'))?;
        ColourKey::parse(key).ok()
    }
}

impl Transport for SwatchTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        _body: Option<&str>,
    ) -> Result<RawResponse, FetchError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            std::thread::sleep(self.latency);
        }

        match (method, Self::colour_from_path(url)) {
            (Method::Get, Some(key)) => Ok(RawResponse::ok(SVG_MEDIA_TYPE, self.swatch(&key))),
            _ => Ok(RawResponse::status(404)),
        }
    }
}
