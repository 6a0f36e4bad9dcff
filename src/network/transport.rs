//! Single request execution and response interpretation
//!
//! A [`Transport`] performs one raw exchange with a server. Interpretation of
//! the exchange is shared by every caller: non-success statuses become
//! [`FetchError::Status`], JSON media types are parsed, anything else is kept
//! as text.

use crate::io::configuration::{JSON_MEDIA_TYPE, REQUEST_TIMEOUT_SECS};
use crate::io::error::{FetchError, MosaicError, Result};
use std::fmt;
use std::time::Duration;

/// HTTP method of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// Retrieve a resource
    Get,
    /// Submit a payload
    Post,
}

impl Method {
    /// Upper-case method name
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a successful response body should be handed back
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// Parse as JSON when the response declares a JSON media type
    #[default]
    Negotiate,
    /// Always return the raw text
    Text,
}

/// Successful response body
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Raw body text
    Text(String),
    /// Parsed JSON document
    Json(serde_json::Value),
}

impl Payload {
    /// Body text, if the payload was kept as text
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Json(_) => None,
        }
    }

    /// Consume the payload, rendering JSON back to text when needed
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Json(value) => value.to_string(),
        }
    }
}

/// Unprocessed outcome of one exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    /// HTTP status code
    pub status: u16,
    /// Declared `Content-Type` header, if any
    pub content_type: Option<String>,
    /// Body text
    pub body: String,
}

impl RawResponse {
    /// Successful response with the given media type
    pub fn ok(content_type: &str, body: impl Into<String>) -> Self {
        Self {
            status: 200,
            content_type: Some(content_type.to_string()),
            body: body.into(),
        }
    }

    /// Response carrying only a status code
    pub const fn status(status: u16) -> Self {
        Self {
            status,
            content_type: None,
            body: String::new(),
        }
    }
}

/// Performs one raw request/response exchange
pub trait Transport: Send + Sync {
    /// Send a request and return whatever the server answered
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transport`] when no response was received
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> std::result::Result<RawResponse, FetchError>;
}

/// Blocking HTTP transport resolving paths against a base URL
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::blocking::Client,
    base_url: String,
}

impl HttpTransport {
    /// Create a transport for the given server
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialised
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .map_err(|e| MosaicError::HttpClient {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Server all relative paths are resolved against
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn resolve(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }
}

impl Transport for HttpTransport {
    fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&str>,
    ) -> std::result::Result<RawResponse, FetchError> {
        let target = self.resolve(url);
        let transport_error = |e: reqwest::Error| FetchError::Transport {
            url: target.clone(),
            reason: e.to_string(),
        };

        let mut request = match method {
            Method::Get => self.client.get(&target),
            Method::Post => self.client.post(&target),
        };
        if let Some(body) = body {
            request = request.body(body.to_string());
        }

        let response = request.send().map_err(transport_error)?;
        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let body = response.text().map_err(transport_error)?;

        Ok(RawResponse {
            status,
            content_type,
            body,
        })
    }
}

/// Check whether a `Content-Type` header names the JSON media type
pub fn is_json_content_type(content_type: &str) -> bool {
    content_type
        .split(';')
        .map(str::trim)
        .any(|token| token.eq_ignore_ascii_case(JSON_MEDIA_TYPE))
}

/// Turn a raw exchange into a payload or a fetch failure
///
/// # Errors
///
/// Returns [`FetchError::Status`] for non-2xx statuses and
/// [`FetchError::Parse`] for bodies that declare JSON but don't parse
pub fn interpret_response(
    url: &str,
    response: RawResponse,
    format: BodyFormat,
) -> std::result::Result<Payload, FetchError> {
    if !(200..300).contains(&response.status) {
        return Err(FetchError::Status {
            url: url.to_string(),
            status: response.status,
        });
    }

    let declares_json = response
        .content_type
        .as_deref()
        .is_some_and(is_json_content_type);

    if format == BodyFormat::Negotiate && declares_json {
        return serde_json::from_str(&response.body)
            .map(Payload::Json)
            .map_err(|e| {
                log::warn!("Caught an error trying to parse JSON response of {url}: {e}");
                FetchError::Parse {
                    url: url.to_string(),
                    reason: e.to_string(),
                }
            });
    }

    Ok(Payload::Text(response.body))
}

/// Perform a single unbatched request
///
/// # Errors
///
/// Returns the transport failure or the interpretation failure of the response
pub fn request(
    transport: &dyn Transport,
    method: Method,
    url: &str,
    payload: Option<&str>,
) -> std::result::Result<Payload, FetchError> {
    let response = transport.send(method, url, payload)?;
    interpret_response(url, response, BodyFormat::Negotiate)
}
