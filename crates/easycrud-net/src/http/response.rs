//! HTTP response types.

use bytes::Bytes;
use serde::de::DeserializeOwned;

use super::envelope::Envelope;
use crate::error::{NetworkError, Result};

/// A fully received HTTP response.
///
/// The body is buffered while the request watchdog is running, so by the time
/// a caller sees an `HttpResponse` the transfer is complete.
#[derive(Clone, Debug)]
pub struct HttpResponse {
    status: u16,
    url: String,
    headers: http::HeaderMap,
    body: Bytes,
}

impl HttpResponse {
    pub(crate) fn new(status: u16, url: String, headers: http::HeaderMap, body: Bytes) -> Self {
        Self {
            status,
            url,
            headers,
            body,
        }
    }

    /// Get the HTTP status code.
    pub fn status(&self) -> u16 {
        self.status
    }

    /// Check if the response indicates success (2xx status).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Get the response headers.
    pub fn headers(&self) -> &http::HeaderMap {
        &self.headers
    }

    /// Get a specific header value.
    pub fn header(&self, name: impl AsRef<str>) -> Option<&str> {
        self.headers
            .get(name.as_ref())
            .and_then(|v| v.to_str().ok())
    }

    /// Get the Content-Type header value.
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Get the final URL after redirects.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Body length in bytes.
    pub fn len(&self) -> usize {
        self.body.len()
    }

    /// Whether the body is empty.
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }

    /// Borrow the raw body.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Take the raw body.
    pub fn into_bytes(self) -> Bytes {
        self.body
    }

    /// Get the response body as text.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Parse the response body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Outcome of a request after content-type branching.
#[derive(Clone, Debug)]
pub enum ApiResponse {
    /// A successful JSON envelope (`code == 0`).
    Envelope(Envelope),
    /// Binary or untyped content passed through unchanged.
    Raw(HttpResponse),
}

impl ApiResponse {
    /// The envelope, if this was a JSON response.
    pub fn envelope(&self) -> Option<&Envelope> {
        match self {
            Self::Envelope(envelope) => Some(envelope),
            Self::Raw(_) => None,
        }
    }

    /// Consume into the envelope, failing for raw responses.
    pub fn into_envelope(self) -> Result<Envelope> {
        match self {
            Self::Envelope(envelope) => Ok(envelope),
            Self::Raw(response) => Err(NetworkError::InvalidBody(format!(
                "expected a JSON envelope, got {}",
                response.content_type().unwrap_or("no content type")
            ))),
        }
    }

    /// Deserialize the envelope's `data`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        self.into_envelope()?.into_data()
    }
}
