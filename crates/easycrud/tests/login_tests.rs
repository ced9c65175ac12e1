//! Login flow tests against a mock backend.

use std::sync::Arc;
use std::time::Duration;

use easycrud::{CrudError, Login, LoginRequest};
use easycrud_net::{HttpClient, Notification, NotificationLevel};
use parking_lot::Mutex;
use serde_json::json;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpClient {
    HttpClient::builder()
        .base_url(server.uri())
        .timeout(Duration::from_secs(2))
        .retry(1)
        .retry_delay(Duration::from_millis(10))
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
async fn test_login_stores_token_and_decodes_rights() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/login"))
        .and(body_partial_json(json!({"userName": "admin", "password": "enc:secret"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {
                "token": "tok-42",
                "userInfo": {"name": "Admin"},
                "rights": "{\"user\": {\"query\": true}}",
                "userId": 1,
                "roleIdList": [1, 3]
            },
            "page": null
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let seen = collect_notifications(&client);
    let login = Login::new(client.clone()).password_encoder(|p| format!("enc:{p}"));

    let session = login
        .login(&LoginRequest::new("admin", "secret"))
        .await
        .expect("login failed");

    assert_eq!(session.rights["user"]["query"], json!(true));
    assert_eq!(session.result.role_id_list, vec![1, 3]);
    assert_eq!(client.session().token().as_deref(), Some("tok-42"));
    assert_eq!(seen.lock()[0].level, NotificationLevel::Success);

    login.logout();
    assert_eq!(client.session().token(), None);
}

#[tokio::test]
async fn test_login_without_token_fails() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "ok",
            "data": {"token": "", "userInfo": {"name": "Admin"}, "rights": "{}"},
            "page": null
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let seen = collect_notifications(&client);

    let err = Login::new(client.clone())
        .login(&LoginRequest::new("admin", "wrong"))
        .await
        .unwrap_err();

    assert!(matches!(err, CrudError::Login(_)));
    assert_eq!(client.session().token(), None);
    let seen = seen.lock();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0].level, NotificationLevel::Error);
}

#[tokio::test]
async fn test_verify_code_returns_image_bytes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/login/getVerifyCode"))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(vec![0x89, b'P', b'N', b'G'], "image/png"),
        )
        .mount(&server)
        .await;

    let login = Login::new(client_for(&server));
    let image = login.verify_code().await.expect("captcha failed");

    assert_eq!(image.as_ref(), &[0x89, b'P', b'N', b'G']);
}
