//! Row model: JSON records, the soft-delete flag and identity keys.

use serde::de::{self, DeserializeOwned};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A row or form as a JSON object keyed by field name.
pub type Record = serde_json::Map<String, Value>;

/// Field holding the soft-delete flag.
pub const DELETE_FLAG: &str = "deleteFlag";

/// Anything that can be shown in the table.
///
/// Rows travel as JSON records: identity lookup, form seeding and in-place
/// patching all work on [`Record`]s and convert back with serde.
pub trait CrudRow: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// Convert to a record. Fails if the row does not serialize to an object.
    fn to_record(&self) -> serde_json::Result<Record> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            other => Err(de::Error::custom(format!(
                "row must serialize to an object, got {other}"
            ))),
        }
    }

    /// Build a row from a record.
    fn from_record(record: Record) -> serde_json::Result<Self> {
        serde_json::from_value(Value::Object(record))
    }
}

impl<T> CrudRow for T where T: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {}

/// Soft-delete state of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeleteFlag {
    /// `0`
    #[default]
    Active,
    /// `1`
    Disabled,
}

impl DeleteFlag {
    /// The opposite flag.
    pub fn toggle(self) -> Self {
        match self {
            Self::Active => Self::Disabled,
            Self::Disabled => Self::Active,
        }
    }

    /// Wire value.
    pub fn as_i64(self) -> i64 {
        match self {
            Self::Active => 0,
            Self::Disabled => 1,
        }
    }

    /// Parse a wire value.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value.as_i64()? {
            0 => Some(Self::Active),
            1 => Some(Self::Disabled),
            _ => None,
        }
    }

    /// Read the flag from a record.
    pub fn of(record: &Record) -> Option<Self> {
        record.get(DELETE_FLAG).and_then(Self::from_value)
    }

    /// The value a delete/toggle request sends: `1` for active rows, `0`
    /// for everything else (including rows without a flag).
    pub fn toggled_for(record: &Record) -> Self {
        match Self::of(record) {
            Some(Self::Active) => Self::Disabled,
            _ => Self::Active,
        }
    }
}

impl From<DeleteFlag> for Value {
    fn from(flag: DeleteFlag) -> Self {
        Value::from(flag.as_i64())
    }
}

impl Serialize for DeleteFlag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_i64())
    }
}

impl<'de> Deserialize<'de> for DeleteFlag {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match i64::deserialize(deserializer)? {
            0 => Ok(Self::Active),
            1 => Ok(Self::Disabled),
            other => Err(de::Error::custom(format!("deleteFlag must be 0 or 1, got {other}"))),
        }
    }
}

/// Audit fields every backend table carries. Flatten it into row types:
///
/// ```
/// use easycrud::BaseRow;
/// use serde::{Deserialize, Serialize};
///
/// #[derive(Clone, Serialize, Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct Role {
///     role_id: u64,
///     role_name: String,
///     #[serde(flatten)]
///     base: BaseRow,
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseRow {
    /// Account that last touched the row.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_name: Option<String>,
    /// Soft-delete flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delete_flag: Option<DeleteFlag>,
    /// Creation timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Update timestamp as sent by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
}

/// How rows are identified in mutation requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowIdentity {
    /// `rowKey`
    Single(String),
    /// `rowKeys`
    Composite(Vec<String>),
}

impl RowIdentity {
    /// `rowKeys` when non-empty, otherwise `rowKey`, otherwise nothing.
    pub fn resolve(row_key: Option<&str>, row_keys: &[String]) -> Option<Self> {
        if !row_keys.is_empty() {
            Some(Self::Composite(row_keys.to_vec()))
        } else {
            row_key.map(|key| Self::Single(key.to_string()))
        }
    }

    /// Field names making up the identity.
    pub fn keys(&self) -> &[String] {
        match self {
            Self::Single(key) => std::slice::from_ref(key),
            Self::Composite(keys) => keys,
        }
    }
}

/// Pick the identity fields out of a row. Missing fields come back as `null`.
pub fn value_from_row(record: &Record, identity: &RowIdentity) -> Record {
    identity
        .keys()
        .iter()
        .map(|key| (key.clone(), record.get(key).cloned().unwrap_or(Value::Null)))
        .collect()
}
