//! Networking for EasyCrud.
//!
//! - [`http`]: the retrying, de-duplicating HTTP client
//! - [`settings`]: client settings from defaults, TOML or the environment
//! - [`error`]: the shared [`NetworkError`] type

pub mod error;
pub mod http;
pub mod settings;

pub use error::{NetworkError, Result};
pub use http::{
    ApiResponse, Envelope, HttpClient, HttpClientBuilder, HttpMethod, HttpRequest, Notification,
    NotificationLevel, PageInfo, SessionStore,
};
pub use settings::{ClientSettings, SettingsError};
