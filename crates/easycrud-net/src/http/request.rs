//! HTTP request description.

use std::time::Duration;

use bytes::Bytes;
use serde::Serialize;

use easycrud_core::logging::targets;

/// HTTP request methods.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    /// HTTP GET method.
    Get,
    /// HTTP POST method.
    Post,
    /// HTTP PUT method.
    Put,
    /// HTTP DELETE method.
    Delete,
    /// HTTP PATCH method.
    Patch,
}

impl HttpMethod {
    pub(crate) fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
            Self::Patch => reqwest::Method::PATCH,
        }
    }
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Get => write!(f, "GET"),
            Self::Post => write!(f, "POST"),
            Self::Put => write!(f, "PUT"),
            Self::Delete => write!(f, "DELETE"),
            Self::Patch => write!(f, "PATCH"),
        }
    }
}

/// The body of an HTTP request.
#[derive(Clone, Debug, Default)]
pub enum RequestBody {
    /// No body.
    #[default]
    None,
    /// JSON body.
    Json(serde_json::Value),
    /// Raw binary body.
    Bytes(Bytes),
}

/// A request to send through an [`HttpClient`](super::HttpClient).
///
/// `url` is kept exactly as given: relative paths are joined onto the
/// client's base API when sent, and the route key used for duplicate
/// cancellation is built from the unjoined value.
///
/// ```
/// use std::time::Duration;
/// use easycrud_net::http::HttpRequest;
///
/// let request = HttpRequest::post("/user/query")
///     .json(&serde_json::json!({ "pagenum": 1, "pagesize": 10 }))
///     .timeout(Duration::from_secs(2))
///     .retry(1);
/// assert_eq!(request.route_key(), "POST:/user/query");
/// ```
#[derive(Clone, Debug)]
pub struct HttpRequest {
    /// The HTTP method.
    pub method: HttpMethod,
    /// Request URL, absolute or relative to the base API.
    pub url: String,
    /// Query parameters.
    pub query: Vec<(String, String)>,
    /// Request body.
    pub body: RequestBody,
    /// Overrides the client's timeout (watchdog window or transport timeout).
    pub timeout: Option<Duration>,
    /// Overrides the client's retry count.
    pub retry: Option<u32>,
    /// Overrides the client's retry delay.
    pub retry_delay: Option<Duration>,
    /// Overrides the client's duplicate-cancellation flag.
    pub cancel_duplicates: Option<bool>,
}

impl HttpRequest {
    /// Create a request with the given method and URL.
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            query: Vec::new(),
            body: RequestBody::None,
            timeout: None,
            retry: None,
            retry_delay: None,
            cancel_duplicates: None,
        }
    }

    /// Create a GET request.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Get, url)
    }

    /// Create a POST request.
    pub fn post(url: impl Into<String>) -> Self {
        Self::new(HttpMethod::Post, url)
    }

    /// Add a query parameter.
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Set a JSON body from a serializable value.
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_value(body) {
            Ok(value) => self.body = RequestBody::Json(value),
            Err(e) => {
                tracing::error!(target: targets::HTTP, "Failed to serialize JSON body: {}", e);
            }
        }
        self
    }

    /// Set a raw binary body.
    pub fn bytes(mut self, body: impl Into<Bytes>) -> Self {
        self.body = RequestBody::Bytes(body.into());
        self
    }

    /// Override the timeout for this request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Override the retry count for this request.
    pub fn retry(mut self, retry: u32) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Override the delay between retries for this request.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay = Some(delay);
        self
    }

    /// Exempt this request from duplicate cancellation.
    pub fn keep_duplicates(mut self) -> Self {
        self.cancel_duplicates = Some(false);
        self
    }

    /// The key used for per-route duplicate cancellation: `METHOD:url`.
    pub fn route_key(&self) -> String {
        format!("{}:{}", self.method, self.url)
    }
}

/// Join a request path onto a base URL unless the path is already absolute.
pub(crate) fn join_url(base: &str, path: &str) -> String {
    if path.starts_with("http://") || path.starts_with("https://") || base.is_empty() {
        return path.to_string();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
