//! HTTP client for EasyCrud.
//!
//! The client injects the session token, counts in-flight requests for a
//! progress indicator, cancels superseded requests per route, decodes the
//! backend's JSON envelope and retries timeouts.
//!
//! # Example
//!
//! ```ignore
//! use easycrud_net::http::{HttpClient, HttpRequest, ApiResponse};
//!
//! let client = HttpClient::builder()
//!     .base_url("https://admin.example.com/api")
//!     .build()?;
//!
//! // Envelope `data` only
//! let roles: Vec<serde_json::Value> = client.get("/role/all").await?;
//!
//! // Full response, manual timeout retry
//! match client.request(HttpRequest::post("/user/export")).await? {
//!     ApiResponse::Envelope(envelope) => println!("page: {:?}", envelope.page),
//!     ApiResponse::Raw(response) => println!("{} bytes", response.len()),
//! }
//!
//! // Save a file via the configured sink
//! let saved = client.download(HttpRequest::post("/user/export")).await?;
//! ```

mod activity;
mod client;
mod download;
mod envelope;
mod notify;
mod request;
mod response;
mod retry;
mod routes;
mod session;

pub use activity::{ActivityGuard, ActivityIndicator, DEFAULT_START_DELAY};
pub use client::{HttpClient, HttpClientBuilder, RAW_CONTENT_TYPES};
pub use download::{DirectorySink, DownloadSink, DownloadedFile, UNKNOWN_FILENAME, resolve_filename};
pub use envelope::{Envelope, PageInfo};
pub use notify::{Notification, NotificationLevel};
pub use request::{HttpMethod, HttpRequest, RequestBody};
pub use response::{ApiResponse, HttpResponse};
pub use retry::RetryConfig;
pub use routes::{RequestId, RouteRegistry, RouteTicket};
pub use session::SessionStore;
