//! Error types for the CRUD engine.

use std::fmt;

use easycrud_net::NetworkError;
use thiserror::Error;

/// The four field sets of a schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldSet {
    /// Search form fields.
    Filter,
    /// Create/edit form fields.
    Editor,
    /// Initially checked table columns.
    Column,
    /// All selectable table columns, in display order.
    Expand,
}

impl fmt::Display for FieldSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Filter => write!(f, "filter"),
            Self::Editor => write!(f, "editor"),
            Self::Column => write!(f, "column"),
            Self::Expand => write!(f, "expand"),
        }
    }
}

/// Invalid CRUD configuration, detected when a [`Crud`](crate::Crud) is built.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    /// A field set names a field with no column definition.
    #[error("`{set}` field `{field}` has no column definition")]
    UnknownField {
        /// The field set containing the name.
        set: FieldSet,
        /// The unresolved name.
        field: String,
    },
    /// The root `url` is empty.
    #[error("`url` is required")]
    MissingUrl,
    /// Options could not be parsed.
    #[error("invalid options: {0}")]
    Parse(String),
}

/// Errors returned by CRUD operations.
#[derive(Debug, Error)]
pub enum CrudError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The request failed. The client has already notified the user where
    /// appropriate.
    #[error(transparent)]
    Network(#[from] NetworkError),
    /// A row could not be converted to or from its JSON record.
    #[error("row conversion failed: {0}")]
    Row(#[from] serde_json::Error),
    /// The login response was missing required data.
    #[error("login failed: {0}")]
    Login(String),
}

impl CrudError {
    /// Whether this is a superseded request.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Network(e) if e.is_cancelled())
    }
}

/// A specialized Result type for CRUD operations.
pub type Result<T> = std::result::Result<T, CrudError>;
