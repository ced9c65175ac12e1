//! Login flow.
//!
//! [`Login`] posts credentials with the client's fixed retry policy, checks
//! that the backend returned a usable session, stores the token and reports
//! the outcome as a notification.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use easycrud_core::logging::targets;
use easycrud_net::{HttpClient, HttpRequest, Notification};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{CrudError, Result};

/// Default login endpoint.
pub const LOGIN_PATH: &str = "/login/login";
/// Default captcha endpoint.
pub const VERIFY_CODE_PATH: &str = "/login/getVerifyCode";

/// Credentials as posted to the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginRequest {
    /// Account name.
    pub user_name: String,
    /// Password, after the configured encoder.
    pub password: String,
    /// Captcha answer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verify_code: Option<String>,
    /// Remember the credentials locally.
    #[serde(default)]
    pub remember: bool,
}

impl LoginRequest {
    /// Credentials without captcha.
    pub fn new(user_name: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user_name: user_name.into(),
            password: password.into(),
            ..Self::default()
        }
    }

    /// Attach a captcha answer.
    pub fn verify_code(mut self, code: impl Into<String>) -> Self {
        self.verify_code = Some(code.into());
        self
    }
}

/// What the backend returns on login.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoginResult {
    /// Session token.
    pub token: String,
    /// Profile of the logged-in user.
    pub user_info: Value,
    /// Permission tree, JSON-encoded.
    pub rights: String,
    /// User id.
    pub user_id: i64,
    /// Roles held by the user.
    pub role_id_list: Vec<i64>,
}

/// A validated login.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginSession {
    /// The raw response.
    pub result: LoginResult,
    /// `rights`, decoded.
    pub rights: Value,
}

type PasswordEncoder = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Posts credentials and installs the returned token.
#[derive(Clone)]
pub struct Login {
    client: HttpClient,
    path: String,
    verify_code_path: String,
    encode_password: PasswordEncoder,
}

impl Login {
    /// A login flow on `client` using the default endpoints. Passwords are
    /// sent as given.
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            path: LOGIN_PATH.to_string(),
            verify_code_path: VERIFY_CODE_PATH.to_string(),
            encode_password: Arc::new(str::to_string),
        }
    }

    /// Use a different login endpoint.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    /// Use a different captcha endpoint.
    pub fn verify_code_path(mut self, path: impl Into<String>) -> Self {
        self.verify_code_path = path.into();
        self
    }

    /// Transform passwords before sending, e.g. to hash them.
    pub fn password_encoder(mut self, f: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        self.encode_password = Arc::new(f);
        self
    }

    /// Log in. On success the token is stored in the client's session.
    pub async fn login(&self, request: &LoginRequest) -> Result<LoginSession> {
        match self.try_login(request).await {
            Ok(session) => {
                self.client.notify(Notification::success("Login successful"));
                Ok(session)
            }
            Err(e) => {
                tracing::warn!(target: targets::SESSION, user = %request.user_name, error = %e, "login failed");
                self.client.notify(Notification::error(
                    "Login failed, please check your account and password",
                ));
                Err(e)
            }
        }
    }

    async fn try_login(&self, request: &LoginRequest) -> Result<LoginSession> {
        let body = LoginRequest {
            password: (self.encode_password)(&request.password),
            ..request.clone()
        };
        let result: LoginResult = self.client.retry_post(&self.path, &body).await?;

        if result.token.is_empty() {
            return Err(CrudError::Login("response has no token".into()));
        }
        if result.user_info.is_null() {
            return Err(CrudError::Login("response has no user info".into()));
        }
        if result.rights.is_empty() {
            return Err(CrudError::Login("response has no rights".into()));
        }
        let rights: Value = serde_json::from_str(&result.rights)
            .map_err(|e| CrudError::Login(format!("rights are not valid JSON: {e}")))?;

        self.client.session().set_token(result.token.clone());
        tracing::info!(target: targets::SESSION, user_id = result.user_id, "logged in");
        Ok(LoginSession { result, rights })
    }

    /// Fetch the captcha image.
    pub async fn verify_code(&self) -> Result<Bytes> {
        let request = HttpRequest::get(&self.verify_code_path).timeout(Duration::from_secs(2));
        Ok(self.client.raw_request(request).await?.into_bytes())
    }

    /// Drop the stored token.
    pub fn logout(&self) {
        self.client.session().clear_token();
        tracing::info!(target: targets::SESSION, "logged out");
    }
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login")
            .field("path", &self.path)
            .field("verify_code_path", &self.verify_code_path)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_request_serializes_camel_case() {
        let request = LoginRequest::new("admin", "secret").verify_code("x7k2");
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({"userName": "admin", "password": "secret", "verifyCode": "x7k2", "remember": false})
        );
    }

    #[test]
    fn test_result_tolerates_missing_fields() {
        let result: LoginResult = serde_json::from_value(json!({"token": "t"})).unwrap();
        assert_eq!(result.token, "t");
        assert!(result.role_id_list.is_empty());
        assert!(result.user_info.is_null());
    }
}
