//! Session-scoped key/value storage holding the auth token.

use std::collections::HashMap;

use parking_lot::RwLock;

use easycrud_core::logging::targets;

/// Session storage shared between the login flow and the HTTP client.
///
/// The token lives under a configurable key so several clients can share one
/// store without clobbering each other.
#[derive(Debug)]
pub struct SessionStore {
    token_name: String,
    values: RwLock<HashMap<String, String>>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new("token")
    }
}

impl SessionStore {
    /// Create an empty store that keeps the token under `token_name`.
    pub fn new(token_name: impl Into<String>) -> Self {
        Self {
            token_name: token_name.into(),
            values: RwLock::new(HashMap::new()),
        }
    }

    /// The key the token is stored under.
    pub fn token_name(&self) -> &str {
        &self.token_name
    }

    /// The current auth token, if any.
    pub fn token(&self) -> Option<String> {
        self.get(&self.token_name)
    }

    /// Store a new auth token.
    pub fn set_token(&self, token: impl Into<String>) {
        tracing::debug!(target: targets::SESSION, key = %self.token_name, "token stored");
        self.set(self.token_name.clone(), token);
    }

    /// Forget the auth token.
    pub fn clear_token(&self) {
        self.values.write().remove(&self.token_name);
    }

    /// Read an arbitrary session value.
    pub fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    /// Write an arbitrary session value.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) {
        self.values.write().insert(key.into(), value.into());
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.values.write().clear();
    }
}
