//! The backend's JSON response envelope.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

/// Pagination metadata attached to list responses.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PageInfo {
    /// Current page (1-based).
    pub page_num: u64,
    /// Page size.
    pub page_size: u64,
    /// Number of pages.
    pub pages: u64,
    /// Total number of records.
    pub total: u64,
}

/// `{ code, message, data, page }` as returned by every JSON endpoint.
///
/// A `code` of `0` is success; anything else is an application error.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Application status code.
    pub code: i64,
    /// Human-readable message, possibly `"Title:Body"`.
    #[serde(default)]
    pub message: String,
    /// Payload.
    #[serde(default)]
    pub data: Value,
    /// Page metadata, `null` for non-list responses.
    #[serde(default)]
    pub page: Option<PageInfo>,
}

impl Envelope {
    /// Whether the envelope reports success.
    pub fn is_ok(&self) -> bool {
        self.code == 0
    }

    /// Deserialize `data` into a concrete type.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_value(self.data.clone())?)
    }

    /// Consume the envelope, deserializing `data`.
    pub fn into_data<T: DeserializeOwned>(self) -> Result<T> {
        Ok(serde_json::from_value(self.data)?)
    }
}
