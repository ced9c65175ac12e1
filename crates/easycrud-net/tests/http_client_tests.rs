//! Integration tests for the HTTP client against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use easycrud_net::NetworkError;
use easycrud_net::http::{
    ApiResponse, DirectorySink, HttpClient, HttpRequest, Notification, NotificationLevel,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_secs(2))
        .retry(0)
        .build()
        .expect("Failed to build client")
}

fn collect_notifications(client: &HttpClient) -> Arc<Mutex<Vec<Notification>>> {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let seen_clone = seen.clone();
    client.notifications().connect(move |n| {
        seen_clone.lock().push(n.clone());
    });
    seen
}

#[tokio::test]
async fn test_post_unwraps_envelope_and_sends_token() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/query"))
        .and(header("Authorization", "tok-123"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": [{"id": 1, "userName": "alice"}],
            "page": {"pageNum": 1, "pageSize": 10, "pages": 1, "total": 1}
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    client.session().set_token("tok-123");

    let rows: Vec<Value> = client
        .post("/user/query", &json!({"pagenum": 1, "pagesize": 10}))
        .await
        .expect("Request failed");

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["userName"], "alice");
}

#[tokio::test]
async fn test_non_zero_code_notifies_and_rejects() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/add"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 40001,
            "message": "Duplicate user:userName already exists",
            "data": null,
            "page": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let seen = collect_notifications(&client);

    let result = client.request(HttpRequest::post("/user/add").json(&json!({}))).await;

    assert_eq!(
        result.unwrap_err(),
        NetworkError::Api {
            code: 40001,
            message: "Duplicate user:userName already exists".into()
        }
    );
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].level, NotificationLevel::Error);
    assert_eq!(seen[0].title.as_deref(), Some("Duplicate user"));
    assert_eq!(seen[0].message, "userName already exists");
}

#[tokio::test]
async fn test_binary_content_passes_through_raw() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/file"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![1u8, 2, 3], "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .request(HttpRequest::get("/file"))
        .await
        .expect("Request failed");

    match response {
        ApiResponse::Raw(raw) => assert_eq!(raw.body().as_ref(), &[1u8, 2, 3]),
        ApiResponse::Envelope(_) => panic!("binary body should not be decoded"),
    }
}

#[tokio::test]
async fn test_missing_content_type_passes_through_raw() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/empty"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let response = client
        .request(HttpRequest::get("/empty"))
        .await
        .expect("Request failed");

    assert!(matches!(response, ApiResponse::Raw(_)));
}

#[tokio::test]
async fn test_newer_request_cancels_pending_one_on_same_route() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/user/query"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "message": "ok", "data": [], "page": null}))
                .set_delay(Duration::from_millis(200)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (first, second) = tokio::join!(
        client.request(HttpRequest::post("/user/query").json(&json!({"pagenum": 1}))),
        client.request(HttpRequest::post("/user/query").json(&json!({"pagenum": 2}))),
    );

    assert_eq!(first.unwrap_err(), NetworkError::Cancelled);
    assert!(second.is_ok());
    assert!(client.routes().is_empty());
}

#[tokio::test]
async fn test_duplicate_cancellation_can_be_disabled() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/log"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "message": "ok", "data": null, "page": null}))
                .set_delay(Duration::from_millis(100)),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let (first, second) = tokio::join!(
        client.request(HttpRequest::post("/log").keep_duplicates()),
        client.request(HttpRequest::post("/log").keep_duplicates()),
    );

    assert!(first.is_ok());
    assert!(second.is_ok());
}

#[tokio::test]
async fn test_watchdog_timeout_retries_then_rejects() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "message": "ok", "data": null, "page": null}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(100))
        .retry(2)
        .retry_delay(Duration::from_millis(50))
        .build()
        .expect("Failed to build client");
    let seen = collect_notifications(&client);

    let result = client.request(HttpRequest::post("/slow")).await;

    assert_eq!(result.unwrap_err(), NetworkError::Timeout);
    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 3);

    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].title.as_deref(), Some("Request timed out"));
}

#[tokio::test]
async fn test_fixed_retry_uses_transport_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login/login"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "message": "ok", "data": null, "page": null}))
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_millis(100))
        .retry(1)
        .retry_delay(Duration::from_millis(10))
        .build()
        .expect("Failed to build client");

    let result = client
        .retry_request(HttpRequest::post("/login/login").json(&json!({"userName": "a"})))
        .await;

    assert!(result.unwrap_err().is_timeout());
    let received = server.received_requests().await.expect("recording enabled");
    assert_eq!(received.len(), 2);
}

#[tokio::test]
async fn test_unauthorized_status_emits_signal() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/user/info"))
        .respond_with(ResponseTemplate::new(401))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let hits = Arc::new(Mutex::new(Vec::new()));
    let hits_clone = hits.clone();
    client.unauthorized().connect(move |url| {
        hits_clone.lock().push(url.clone());
    });

    let result: Result<Value, _> = client.get("/user/info").await;

    assert!(matches!(
        result.unwrap_err(),
        NetworkError::HttpStatus { status: 401, .. }
    ));
    assert_eq!(*hits.lock(), vec!["/user/info".to_string()]);
}

#[tokio::test]
async fn test_download_saves_with_disposition_filename() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    Mock::given(method("POST"))
        .and(path("/user/export"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header(
                    "Content-Disposition",
                    "attachment; filename*=UTF-8''users%202024.csv",
                )
                .set_body_raw(b"id,name\n1,alice\n".to_vec(), "application/octet-stream"),
        )
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .base_url(server.uri())
        .download_sink(DirectorySink::new(dir.path()))
        .build()
        .expect("Failed to build client");

    let saved = client
        .download(HttpRequest::post("/user/export"))
        .await
        .expect("Download failed")
        .expect("file expected");

    assert_eq!(saved.filename, "users 2024.csv");
    assert_eq!(saved.size, 16);
    assert_eq!(
        std::fs::read_to_string(dir.path().join("users 2024.csv")).unwrap(),
        "id,name\n1,alice\n"
    );
}

#[tokio::test]
async fn test_empty_download_is_skipped_with_warning() {
    let server = MockServer::start().await;
    let dir = tempfile::tempdir().expect("tempdir");

    Mock::given(method("POST"))
        .and(path("/files/report.pdf"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = HttpClient::builder()
        .base_url(server.uri())
        .download_sink(DirectorySink::new(dir.path()))
        .build()
        .expect("Failed to build client");
    let seen = collect_notifications(&client);

    let saved = client
        .download(HttpRequest::post("/files/report.pdf"))
        .await
        .expect("Download failed");

    assert!(saved.is_none());
    assert_eq!(seen.lock()[0].level, NotificationLevel::Warning);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[tokio::test]
async fn test_activity_returns_to_idle() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/ping"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"code": 0, "message": "ok", "data": "pong", "page": null})),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let finished = Arc::new(Mutex::new(0));
    let finished_clone = finished.clone();
    client.activity().finished().connect(move |_| {
        *finished_clone.lock() += 1;
    });

    let pong: String = client.get("/ping").await.expect("Request failed");

    assert_eq!(pong, "pong");
    assert_eq!(client.activity().in_flight(), 0);
    assert_eq!(*finished.lock(), 1);
}
