//! HTTP client implementation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use easycrud_core::Signal;
use easycrud_core::logging::targets;
use serde::Serialize;
use serde::de::DeserializeOwned;

use super::activity::{ActivityIndicator, DEFAULT_START_DELAY};
use super::download::{DirectorySink, DownloadSink, DownloadedFile, resolve_filename};
use super::envelope::Envelope;
use super::notify::Notification;
use super::request::{HttpRequest, RequestBody, join_url};
use super::response::{ApiResponse, HttpResponse};
use super::retry::RetryConfig;
use super::routes::{RouteRegistry, RouteTicket};
use super::session::SessionStore;
use crate::error::{NetworkError, Result};
use crate::settings::ClientSettings;

/// Content types returned to the caller without envelope decoding.
pub const RAW_CONTENT_TYPES: [&str; 2] = ["application/octet-stream", "application/x-msdownload"];

const TIMED_OUT_TITLE: &str = "Request timed out";
const EMPTY_DOWNLOAD_MESSAGE: &str = "Response data is empty, possibly intercepted. Skipping download.";

/// Builder for creating an HTTP client with custom configuration.
pub struct HttpClientBuilder {
    settings: ClientSettings,
    session: Option<Arc<SessionStore>>,
    sink: Option<Arc<dyn DownloadSink>>,
    progress_delay: Duration,
    transport_retry: Option<RetryConfig>,
}

impl Default for HttpClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::from_settings(ClientSettings::default())
    }

    /// Start from loaded settings.
    pub fn from_settings(settings: ClientSettings) -> Self {
        Self {
            settings,
            session: None,
            sink: None,
            progress_delay: DEFAULT_START_DELAY,
            transport_retry: None,
        }
    }

    /// Set the base API that relative paths are joined onto.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.settings.base_api = base_url.into();
        self
    }

    /// Set the watchdog window / transport timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.settings.timeout_ms = duration_ms(timeout);
        self
    }

    /// Set how many times a timed-out request is retried.
    pub fn retry(mut self, retry: u32) -> Self {
        self.settings.retry = retry;
        self
    }

    /// Set the pause before each retry.
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.settings.retry_delay_ms = duration_ms(delay);
        self
    }

    /// Set the download watchdog window.
    pub fn download_timeout(mut self, timeout: Duration) -> Self {
        self.settings.download_timeout_ms = duration_ms(timeout);
        self
    }

    /// Enable or disable per-route duplicate cancellation.
    pub fn cancel_duplicates(mut self, enabled: bool) -> Self {
        self.settings.cancel_duplicates = enabled;
        self
    }

    /// Set the session key the token is read from.
    pub fn token_name(mut self, name: impl Into<String>) -> Self {
        self.settings.token_name = name.into();
        self
    }

    /// Share an existing session store.
    pub fn session(mut self, session: Arc<SessionStore>) -> Self {
        self.session = Some(session);
        self
    }

    /// Where downloads are saved.
    pub fn download_sink(mut self, sink: impl DownloadSink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Debounce before the progress indicator starts.
    pub fn progress_delay(mut self, delay: Duration) -> Self {
        self.progress_delay = delay;
        self
    }

    /// Retry policy for [`HttpClient::retry_request`]. Defaults to a fixed
    /// delay built from the retry settings.
    pub fn transport_retry(mut self, config: RetryConfig) -> Self {
        self.transport_retry = Some(config);
        self
    }

    /// Build the HTTP client.
    pub fn build(self) -> Result<HttpClient> {
        let mut default_headers = http::HeaderMap::new();
        default_headers.insert(
            http::header::CONTENT_TYPE,
            http::HeaderValue::from_static("application/json"),
        );

        let client = reqwest::Client::builder()
            .default_headers(default_headers)
            .build()?;

        let session = self
            .session
            .unwrap_or_else(|| Arc::new(SessionStore::new(self.settings.token_name.clone())));
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(DirectorySink::default()));
        let transport_retry = self.transport_retry.unwrap_or_else(|| {
            RetryConfig::fixed(self.settings.retry, self.settings.retry_delay())
        });

        Ok(HttpClient {
            inner: Arc::new(HttpClientInner {
                client,
                settings: self.settings,
                session,
                sink,
                transport_retry,
                routes: RouteRegistry::new(),
                activity: ActivityIndicator::new(self.progress_delay),
                notifications: Signal::new(),
                unauthorized: Signal::new(),
            }),
        })
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Internal state for the HTTP client.
struct HttpClientInner {
    client: reqwest::Client,
    settings: ClientSettings,
    session: Arc<SessionStore>,
    sink: Arc<dyn DownloadSink>,
    transport_retry: RetryConfig,
    routes: RouteRegistry,
    activity: ActivityIndicator,
    notifications: Signal<Notification>,
    unauthorized: Signal<String>,
}

/// Cancels a single attempt after a window, unless progress disarmed it.
struct Watchdog {
    window: Duration,
    armed: AtomicBool,
}

impl Watchdog {
    fn new(window: Duration) -> Self {
        Self {
            window,
            armed: AtomicBool::new(true),
        }
    }

    fn disarm(&self) {
        self.armed.store(false, Ordering::Relaxed);
    }

    async fn expired(&self) {
        tokio::time::sleep(self.window).await;
        if !self.armed.load(Ordering::Relaxed) {
            std::future::pending::<()>().await;
        }
    }
}

/// The HTTP client behind every CRUD instance.
///
/// The client is cheaply cloneable and thread-safe. Clones share the same
/// connection pool, session, route registry and progress indicator.
///
/// Two retry policies are offered:
///
/// - [`request`](Self::request) sends without a transport timeout and runs a
///   watchdog per attempt. When the watchdog fires the attempt is abandoned,
///   and after the retry delay a fresh attempt starts with one retry fewer.
///   The first received body chunk disarms the watchdog.
/// - [`retry_request`](Self::retry_request) uses the transport timeout and
///   retries timeouts and connection failures on a fixed schedule.
///
/// # Example
///
/// ```ignore
/// use easycrud_net::http::{HttpClient, HttpRequest};
///
/// let client = HttpClient::builder()
///     .base_url("https://admin.example.com/api")
///     .build()?;
///
/// client.notifications().connect(|n| println!("{:?}", n));
///
/// let users: Vec<serde_json::Value> = client
///     .post("/user/query", &serde_json::json!({ "pagenum": 1, "pagesize": 10 }))
///     .await?;
/// ```
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<HttpClientInner>,
}

impl HttpClient {
    /// Create a builder for configuring a new HTTP client.
    pub fn builder() -> HttpClientBuilder {
        HttpClientBuilder::new()
    }

    /// Build a client straight from settings.
    pub fn from_settings(settings: ClientSettings) -> Result<Self> {
        HttpClientBuilder::from_settings(settings).build()
    }

    /// The client's settings.
    pub fn settings(&self) -> &ClientSettings {
        &self.inner.settings
    }

    /// The session store the auth token is read from.
    pub fn session(&self) -> &Arc<SessionStore> {
        &self.inner.session
    }

    /// The progress indicator fed by this client's requests.
    pub fn activity(&self) -> &ActivityIndicator {
        &self.inner.activity
    }

    /// Pending request registry.
    pub fn routes(&self) -> &RouteRegistry {
        &self.inner.routes
    }

    /// Notifications for the user (API errors, timeouts, skipped downloads).
    pub fn notifications(&self) -> &Signal<Notification> {
        &self.inner.notifications
    }

    /// Emitted with the request URL whenever the server answers 401.
    pub fn unauthorized(&self) -> &Signal<String> {
        &self.inner.unauthorized
    }

    /// Raise a notification through this client.
    pub fn notify(&self, notification: Notification) {
        tracing::debug!(target: targets::HTTP, level = ?notification.level, message = %notification.message, "notification");
        self.inner.notifications.emit(notification);
    }

    /// Send with the watchdog timeout and manual retry.
    ///
    /// Resolves to [`NetworkError::Cancelled`] if a newer request on the same
    /// route supersedes this one, and to [`NetworkError::Timeout`] (after a
    /// "request timed out" notification) once every retry has timed out.
    pub async fn request(&self, request: HttpRequest) -> Result<ApiResponse> {
        let window = request
            .timeout
            .unwrap_or_else(|| self.inner.settings.timeout());
        let retry = RetryConfig::fixed(
            request.retry.unwrap_or(self.inner.settings.retry),
            request
                .retry_delay
                .unwrap_or_else(|| self.inner.settings.retry_delay()),
        );

        self.run(&request, retry, NetworkError::is_timeout, || {
            self.watched_attempt(&request, window)
        })
        .await
    }

    /// Send with a transport timeout and fixed automatic retry.
    pub async fn retry_request(&self, request: HttpRequest) -> Result<ApiResponse> {
        let timeout = request
            .timeout
            .unwrap_or_else(|| self.inner.settings.timeout());
        let base = &self.inner.transport_retry;
        let retry = if request.retry.is_none() && request.retry_delay.is_none() {
            base.clone()
        } else {
            RetryConfig::fixed(
                request.retry.unwrap_or(base.max_retries),
                request.retry_delay.unwrap_or_else(|| base.initial_delay()),
            )
        };

        self.run(&request, retry, NetworkError::is_retryable, || {
            self.timed_attempt(&request, timeout)
        })
        .await
    }

    /// Send once with no watchdog and no envelope handling.
    pub async fn raw_request(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut ticket = self.ticket(&request);
        let _activity = self.inner.activity.begin();

        let response = tokio::select! {
            _ = ticket.cancelled() => return Err(NetworkError::Cancelled),
            response = self.transfer(&request, request.timeout, None, false) => response?,
        };

        if !response.is_success() {
            return Err(self.status_error(&request, &response));
        }
        Ok(response)
    }

    /// Download a file through the configured sink.
    ///
    /// Returns `Ok(None)` (with a warning notification) when the server sends
    /// an empty body.
    pub async fn download(&self, request: HttpRequest) -> Result<Option<DownloadedFile>> {
        let mut ticket = self.ticket(&request);
        let window = request
            .timeout
            .unwrap_or_else(|| self.inner.settings.download_timeout());
        let _activity = self.inner.activity.begin();
        let watchdog = Watchdog::new(window);

        let response = tokio::select! {
            _ = ticket.cancelled() => return Err(NetworkError::Cancelled),
            _ = watchdog.expired() => {
                tracing::warn!(target: targets::DOWNLOAD, url = %request.url, "download timed out before any data arrived");
                return Err(NetworkError::Timeout);
            }
            response = self.transfer(&request, None, Some(&watchdog), true) => response?,
        };

        if !response.is_success() {
            return Err(self.status_error(&request, &response));
        }

        if response.is_empty() {
            tracing::warn!(target: targets::DOWNLOAD, url = %request.url, "empty download body");
            self.notify(Notification::warning(EMPTY_DOWNLOAD_MESSAGE));
            return Ok(None);
        }

        let filename = resolve_filename(response.header("content-disposition"), &request.url);
        let path = self.inner.sink.save(&filename, response.body())?;
        self.inner.activity.set_fraction(1.0);

        Ok(Some(DownloadedFile {
            filename,
            path,
            size: response.len() as u64,
        }))
    }

    /// GET and return the envelope's `data`.
    pub async fn get<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        self.request(HttpRequest::get(url)).await?.into_data()
    }

    /// POST a JSON body and return the envelope's `data`.
    pub async fn post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.request(HttpRequest::post(url).json(body))
            .await?
            .into_data()
    }

    /// GET with the fixed retry policy and return the envelope's `data`.
    pub async fn retry_get<R: DeserializeOwned>(&self, url: &str) -> Result<R> {
        self.retry_request(HttpRequest::get(url))
            .await?
            .into_data()
    }

    /// POST with the fixed retry policy and return the envelope's `data`.
    pub async fn retry_post<B, R>(&self, url: &str, body: &B) -> Result<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        self.retry_request(HttpRequest::post(url).json(body))
            .await?
            .into_data()
    }

    /// POST a JSON body and return the whole envelope.
    pub async fn post_envelope<B>(&self, url: &str, body: &B) -> Result<Envelope>
    where
        B: Serialize + ?Sized,
    {
        self.request(HttpRequest::post(url).json(body))
            .await?
            .into_envelope()
    }

    fn ticket(&self, request: &HttpRequest) -> RouteTicket {
        let cancel = request
            .cancel_duplicates
            .unwrap_or(self.inner.settings.cancel_duplicates);
        if cancel {
            self.inner.routes.register(request.route_key())
        } else {
            RouteTicket::detached(request.route_key())
        }
    }

    async fn run<F, Fut>(
        &self,
        request: &HttpRequest,
        retry: RetryConfig,
        retry_on: fn(&NetworkError) -> bool,
        attempt: F,
    ) -> Result<ApiResponse>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<ApiResponse>>,
    {
        let mut ticket = self.ticket(request);
        let mut remaining = retry.max_retries;
        let mut delay = retry.initial_delay();

        loop {
            let outcome = tokio::select! {
                _ = ticket.cancelled() => Err(NetworkError::Cancelled),
                outcome = attempt() => outcome,
            };

            match outcome {
                Ok(response) => return Ok(response),
                Err(e) if retry_on(&e) && remaining > 0 => {
                    remaining -= 1;
                    tracing::warn!(
                        target: targets::HTTP,
                        route = ticket.key(),
                        error = %e,
                        remaining,
                        "retrying request"
                    );
                    tokio::select! {
                        _ = ticket.cancelled() => {
                            tracing::debug!(target: targets::HTTP, route = ticket.key(), "request cancelled during retry delay");
                            return Err(NetworkError::Cancelled);
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    delay = retry.next_delay(delay);
                }
                Err(NetworkError::Timeout) => {
                    tracing::error!(target: targets::HTTP, route = ticket.key(), "request timed out, no retries left");
                    self.notify(Notification::error_titled(TIMED_OUT_TITLE));
                    return Err(NetworkError::Timeout);
                }
                Err(NetworkError::Cancelled) => {
                    tracing::debug!(target: targets::HTTP, route = ticket.key(), "request superseded");
                    return Err(NetworkError::Cancelled);
                }
                Err(e) => {
                    tracing::error!(target: targets::HTTP, route = ticket.key(), error = %e, "request failed");
                    return Err(e);
                }
            }
        }
    }

    async fn watched_attempt(&self, request: &HttpRequest, window: Duration) -> Result<ApiResponse> {
        let _activity = self.inner.activity.begin();
        let watchdog = Watchdog::new(window);

        let response = tokio::select! {
            _ = watchdog.expired() => {
                tracing::warn!(target: targets::HTTP, url = %request.url, ?window, "watchdog expired");
                return Err(NetworkError::Timeout);
            }
            response = self.transfer(request, None, Some(&watchdog), false) => response?,
        };

        self.interpret(request, response)
    }

    async fn timed_attempt(&self, request: &HttpRequest, timeout: Duration) -> Result<ApiResponse> {
        let _activity = self.inner.activity.begin();
        let response = self.transfer(request, Some(timeout), None, false).await?;
        self.interpret(request, response)
    }

    fn build_request(
        &self,
        request: &HttpRequest,
        transport_timeout: Option<Duration>,
    ) -> Result<reqwest::RequestBuilder> {
        let mut url = url::Url::parse(&join_url(&self.inner.settings.base_api, &request.url))?;
        if !request.query.is_empty() {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in &request.query {
                pairs.append_pair(key, value);
            }
        }

        let mut builder = self
            .inner
            .client
            .request(request.method.to_reqwest(), url);

        if let Some(token) = self.inner.session.token() {
            builder = builder.header(
                http::header::AUTHORIZATION,
                http::HeaderValue::from_str(&token)?,
            );
        }

        if let Some(timeout) = transport_timeout {
            builder = builder.timeout(timeout);
        }

        builder = match &request.body {
            RequestBody::None => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Bytes(bytes) => builder.body(bytes.clone()),
        };

        Ok(builder)
    }

    /// Send and buffer the body. Every received chunk disarms the watchdog.
    async fn transfer(
        &self,
        request: &HttpRequest,
        transport_timeout: Option<Duration>,
        watchdog: Option<&Watchdog>,
        report_progress: bool,
    ) -> Result<HttpResponse> {
        let mut response = self.build_request(request, transport_timeout)?.send().await?;

        let status = response.status().as_u16();
        let url = response.url().to_string();
        let headers = response.headers().clone();
        let total = response.content_length();

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if let Some(watchdog) = watchdog {
                watchdog.disarm();
            }
            body.extend_from_slice(&chunk);

            if report_progress {
                match total {
                    Some(total) if total > 0 => {
                        self.inner
                            .activity
                            .set_fraction(body.len() as f32 / total as f32);
                    }
                    _ => self.inner.activity.advance(),
                }
            }
        }

        Ok(HttpResponse::new(status, url, headers, Bytes::from(body)))
    }

    /// Branch on status and content type.
    fn interpret(&self, request: &HttpRequest, response: HttpResponse) -> Result<ApiResponse> {
        if !response.is_success() {
            return Err(self.status_error(request, &response));
        }

        let mime = response.content_type().map(|ct| {
            ct.split(';')
                .next()
                .unwrap_or_default()
                .trim()
                .to_ascii_lowercase()
        });

        let Some(mime) = mime else {
            tracing::warn!(
                target: targets::HTTP,
                url = %request.url,
                "response has no Content-Type, passing it through untouched"
            );
            return Ok(ApiResponse::Raw(response));
        };

        if RAW_CONTENT_TYPES.contains(&mime.as_str()) {
            return Ok(ApiResponse::Raw(response));
        }

        let envelope: Envelope = response.json()?;
        if !envelope.is_ok() {
            self.notify(Notification::from_api_message(&envelope.message));
            return Err(NetworkError::Api {
                code: envelope.code,
                message: envelope.message,
            });
        }

        Ok(ApiResponse::Envelope(envelope))
    }

    fn status_error(&self, request: &HttpRequest, response: &HttpResponse) -> NetworkError {
        let status = response.status();
        if status == 401 {
            tracing::warn!(target: targets::HTTP, url = %request.url, "unauthorized");
            self.inner.unauthorized.emit(request.url.clone());
        }
        NetworkError::HttpStatus {
            status,
            message: (!response.is_empty()).then(|| response.text()),
        }
    }
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("settings", &self.inner.settings)
            .field("routes", &self.inner.routes)
            .field("activity", &self.inner.activity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_applies_settings() {
        let client = HttpClient::builder()
            .base_url("http://localhost:9000/api")
            .timeout(Duration::from_millis(750))
            .retry(1)
            .token_name("adminToken")
            .build()
            .unwrap();

        assert_eq!(client.settings().base_api, "http://localhost:9000/api");
        assert_eq!(client.settings().timeout(), Duration::from_millis(750));
        assert_eq!(client.settings().retry, 1);
        assert_eq!(client.session().token_name(), "adminToken");
    }

    #[tokio::test]
    async fn test_watchdog_disarm_prevents_expiry() {
        let watchdog = Watchdog::new(Duration::from_millis(10));
        watchdog.disarm();
        let fired = tokio::time::timeout(Duration::from_millis(50), watchdog.expired()).await;
        assert!(fired.is_err());
    }
}
