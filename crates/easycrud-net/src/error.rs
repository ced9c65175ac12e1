//! Error types for the EasyCrud HTTP layer.

use std::fmt;

/// Network-specific errors.
#[derive(Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// HTTP request failed.
    Request(String),
    /// Invalid URL provided.
    InvalidUrl(String),
    /// Request timed out (transport timeout or watchdog expiry with no retries left).
    Timeout,
    /// Connection refused or failed.
    Connection(String),
    /// Invalid header name or value.
    InvalidHeader(String),
    /// JSON serialization/deserialization error.
    Json(String),
    /// I/O error.
    Io(String),
    /// Request was superseded by a newer request on the same route.
    Cancelled,
    /// Response body did not have the expected shape.
    InvalidBody(String),
    /// HTTP error status (4xx or 5xx).
    HttpStatus {
        /// The HTTP status code.
        status: u16,
        /// Optional error message from the response body.
        message: Option<String>,
    },
    /// The backend envelope carried a non-zero `code`.
    Api {
        /// Application error code.
        code: i64,
        /// Application error message.
        message: String,
    },
}

impl NetworkError {
    /// Whether this error is a route cancellation.
    ///
    /// Cancellations are never shown to the user and never reset a loading state.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Whether this error is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout)
    }

    /// Whether the fixed retry policy should try again after this error.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Connection(_))
    }
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request(msg) => write!(f, "HTTP request error: {msg}"),
            Self::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
            Self::Timeout => write!(f, "Request timed out"),
            Self::Connection(msg) => write!(f, "Connection error: {msg}"),
            Self::InvalidHeader(msg) => write!(f, "Invalid header: {msg}"),
            Self::Json(msg) => write!(f, "JSON error: {msg}"),
            Self::Io(msg) => write!(f, "I/O error: {msg}"),
            Self::Cancelled => write!(f, "Request was cancelled"),
            Self::InvalidBody(msg) => write!(f, "Invalid response body: {msg}"),
            Self::HttpStatus { status, message } => {
                if let Some(msg) = message {
                    write!(f, "HTTP {status}: {msg}")
                } else {
                    write!(f, "HTTP {status}")
                }
            }
            Self::Api { code, message } => write!(f, "API error {code}: {message}"),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<reqwest::Error> for NetworkError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connection(err.to_string())
        } else {
            Self::Request(err.to_string())
        }
    }
}

impl From<url::ParseError> for NetworkError {
    fn from(err: url::ParseError) -> Self {
        Self::InvalidUrl(err.to_string())
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err.to_string())
    }
}

impl From<http::header::InvalidHeaderValue> for NetworkError {
    fn from(err: http::header::InvalidHeaderValue) -> Self {
        Self::InvalidHeader(err.to_string())
    }
}

/// A specialized Result type for network operations.
pub type Result<T> = std::result::Result<T, NetworkError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classifiers() {
        assert!(NetworkError::Cancelled.is_cancelled());
        assert!(!NetworkError::Cancelled.is_retryable());
        assert!(NetworkError::Timeout.is_timeout());
        assert!(NetworkError::Timeout.is_retryable());
        assert!(NetworkError::Connection("refused".into()).is_retryable());
        assert!(!NetworkError::Api { code: 1, message: String::new() }.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = NetworkError::Api {
            code: 40001,
            message: "User: not found".into(),
        };
        assert_eq!(err.to_string(), "API error 40001: User: not found");
        let err = NetworkError::HttpStatus {
            status: 404,
            message: None,
        };
        assert_eq!(err.to_string(), "HTTP 404");
    }
}
