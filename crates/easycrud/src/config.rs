//! Configuration resolution.
//!
//! Callers describe a table with [`CrudProps`]: the serializable
//! [`CrudOptions`] (loadable from JSON or TOML) plus the parts that are code,
//! namely the [`Schema`], the [`Hooks`] and an optional row-button predicate.
//! [`CrudConfig::resolve`] fills every default and validates the result.
//!
//! Defaults merge one level deep: a partial `pagination` table replaces only
//! the keys it names.

use std::fmt;
use std::sync::Arc;

use easycrud_core::logging::targets;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::hooks::Hooks;
use crate::row::{CrudRow, DeleteFlag, Record, RowIdentity};
use crate::schema::Schema;

/// Default form label width.
pub const DEFAULT_LABEL_WIDTH: u32 = 120;
/// Default drawer size.
pub const DEFAULT_DRAWER_SIZE: u32 = 500;
/// Default pagination layout.
pub const DEFAULT_PAGINATION_LAYOUT: &str = "total, ->, sizes, prev, pager, next, jumper";

/// Widget attribute overrides, passed through to the host.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttrsOptions {
    /// Form attributes.
    pub form: Record,
    /// Drawer attributes.
    pub drawer: Record,
    /// Table attributes.
    pub table: Record,
    /// Pagination attributes.
    pub pagination: Record,
}

/// Alignment of the row-action menu column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MenuAlign {
    /// Left aligned.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Right aligned.
    Right,
}

/// Partial table settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TableOptions {
    /// Show the row-action menu column.
    pub menu_visible: Option<bool>,
    /// Menu column alignment.
    pub menu_align: Option<MenuAlign>,
    /// Menu column width.
    pub menu_width: Option<u32>,
    /// Show the menu column title.
    pub menu_title: Option<bool>,
}

/// Partial pagination settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PaginationOptions {
    /// Initial page.
    pub current: Option<u64>,
    /// Initial page size.
    pub page_size: Option<u64>,
    /// Selectable page sizes.
    pub page_sizes: Option<Vec<u64>>,
    /// Pager layout string.
    pub layout: Option<String>,
}

/// Partial button permissions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonAuthOptions {
    /// Allow creating rows.
    pub add: Option<bool>,
    /// Allow editing rows.
    pub edit: Option<bool>,
    /// Allow deleting rows.
    pub delete: Option<bool>,
}

/// Partial endpoint names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EndpointOptions {
    /// Query endpoint.
    pub query: Option<String>,
    /// Create endpoint.
    pub add: Option<String>,
    /// Update endpoint.
    pub edit: Option<String>,
    /// Delete endpoint.
    pub delete: Option<String>,
    /// Soft-delete toggle endpoint.
    pub delete_flag: Option<String>,
}

/// The serializable part of a CRUD configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CrudOptions {
    /// Log form changes and dispatch decisions.
    pub debug: Option<bool>,
    /// Query as soon as the table is mounted.
    pub is_after_mount_query: Option<bool>,
    /// Root URL, joined with the endpoint names.
    pub url: String,
    /// Single primary key field.
    pub row_key: Option<String>,
    /// Composite key fields. Takes precedence over `row_key` in requests.
    pub row_keys: Vec<String>,
    /// Widget attributes.
    pub attrs: AttrsOptions,
    /// Endpoint names.
    pub api_endpoints: EndpointOptions,
    /// Button permissions.
    pub button_auth: ButtonAuthOptions,
    /// Table settings.
    pub table: TableOptions,
    /// Pagination settings.
    pub pagination: PaginationOptions,
}

impl CrudOptions {
    /// Options with only the root URL set.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Parse camelCase JSON options.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Parse camelCase TOML options.
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        toml::from_str(toml).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// Decides whether a row shows its edit/delete buttons.
pub type RowPredicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// Everything a caller supplies to build a [`Crud`](crate::Crud).
pub struct CrudProps<T> {
    /// Serializable options.
    pub options: CrudOptions,
    /// Field definitions.
    pub source: Schema,
    /// Lifecycle hooks.
    pub hooks: Hooks<T>,
    /// Row-button predicate; defaults to "row is active".
    pub def_but_visible: Option<RowPredicate<T>>,
}

impl<T: CrudRow> CrudProps<T> {
    /// Props for `url` backed by `source`, with no hooks.
    pub fn new(url: impl Into<String>, source: Schema) -> Self {
        Self::from_options(CrudOptions::new(url), source)
    }

    /// Props from parsed options.
    pub fn from_options(options: CrudOptions, source: Schema) -> Self {
        Self {
            options,
            source,
            hooks: Hooks::new(),
            def_but_visible: None,
        }
    }

    /// Set the single primary key.
    pub fn row_key(mut self, key: impl Into<String>) -> Self {
        self.options.row_key = Some(key.into());
        self
    }

    /// Set the composite key.
    pub fn row_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.row_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Install hooks.
    pub fn hooks(mut self, hooks: Hooks<T>) -> Self {
        self.hooks = hooks;
        self
    }

    /// Enable debug logging of form changes.
    pub fn debug(mut self, debug: bool) -> Self {
        self.options.debug = Some(debug);
        self
    }

    /// Query on mount.
    pub fn query_after_mount(mut self, enabled: bool) -> Self {
        self.options.is_after_mount_query = Some(enabled);
        self
    }

    /// Override the row-button predicate.
    pub fn def_but_visible(mut self, f: impl Fn(&T) -> bool + Send + Sync + 'static) -> Self {
        self.def_but_visible = Some(Arc::new(f));
        self
    }

    /// Apply arbitrary option changes.
    pub fn with_options(mut self, f: impl FnOnce(&mut CrudOptions)) -> Self {
        f(&mut self.options);
        self
    }
}

/// Resolved widget attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct Attrs {
    /// Form attributes; `labelWidth` defaults to 120.
    pub form: Record,
    /// Drawer attributes; `size` defaults to 500.
    pub drawer: Record,
    /// Table attributes.
    pub table: Record,
    /// Pagination attributes.
    pub pagination: Record,
}

/// Resolved endpoint names.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiEndpoints {
    /// Query endpoint.
    pub query: String,
    /// Create endpoint.
    pub add: String,
    /// Update endpoint.
    pub edit: String,
    /// Delete endpoint.
    pub delete: String,
    /// Soft-delete toggle endpoint.
    pub delete_flag: String,
}

/// Resolved button permissions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonAuth {
    /// Allow creating rows.
    pub add: bool,
    /// Allow editing rows.
    pub edit: bool,
    /// Allow deleting rows.
    pub delete: bool,
}

/// Resolved table settings.
pub struct TableConfig<T> {
    /// Show the row-action menu column.
    pub menu_visible: bool,
    /// Menu column alignment.
    pub menu_align: MenuAlign,
    /// Menu column width.
    pub menu_width: u32,
    /// Show the menu column title.
    pub menu_title: bool,
    /// Row-button predicate.
    pub def_but_visible: RowPredicate<T>,
}

impl<T> fmt::Debug for TableConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableConfig")
            .field("menu_visible", &self.menu_visible)
            .field("menu_align", &self.menu_align)
            .field("menu_width", &self.menu_width)
            .field("menu_title", &self.menu_title)
            .finish_non_exhaustive()
    }
}

/// Resolved pagination settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationConfig {
    /// Initial page.
    pub current: u64,
    /// Initial page size.
    pub page_size: u64,
    /// Selectable page sizes.
    pub page_sizes: Vec<u64>,
    /// Pager layout.
    pub layout: String,
}

/// A fully resolved configuration. Every field has a value.
pub struct CrudConfig<T> {
    /// Debug logging.
    pub debug: bool,
    /// Query on mount.
    pub is_after_mount_query: bool,
    /// Root URL.
    pub url: String,
    /// Single primary key.
    pub row_key: Option<String>,
    /// Composite key.
    pub row_keys: Vec<String>,
    /// Field definitions.
    pub source: Schema,
    /// Widget attributes.
    pub attrs: Attrs,
    /// Lifecycle hooks.
    pub hooks: Hooks<T>,
    /// Endpoint names.
    pub api_endpoints: ApiEndpoints,
    /// Button permissions.
    pub button_auth: ButtonAuth,
    /// Table settings.
    pub table: TableConfig<T>,
    /// Pagination settings.
    pub pagination: PaginationConfig,
}

fn with_default(defaults: &[(&str, Value)], overrides: Record) -> Record {
    let mut merged: Record = defaults
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect();
    merged.extend(overrides);
    merged
}

impl<T: CrudRow> CrudConfig<T> {
    /// Fill defaults and validate.
    pub fn resolve(props: CrudProps<T>) -> Result<Self, ConfigError> {
        let CrudProps {
            options,
            source,
            hooks,
            def_but_visible,
        } = props;

        if options.url.is_empty() {
            return Err(ConfigError::MissingUrl);
        }
        source.validate()?;

        let def_but_visible = def_but_visible.unwrap_or_else(|| {
            Arc::new(|row: &T| {
                row.to_record()
                    .is_ok_and(|record| DeleteFlag::of(&record) == Some(DeleteFlag::Active))
            })
        });

        let endpoints = options.api_endpoints;
        let pagination = options.pagination;
        let table = options.table;
        let auth = options.button_auth;

        let config = Self {
            debug: options.debug.unwrap_or(false),
            is_after_mount_query: options.is_after_mount_query.unwrap_or(false),
            url: options.url,
            row_key: options.row_key,
            row_keys: options.row_keys,
            source,
            attrs: Attrs {
                form: with_default(
                    &[("labelWidth", Value::from(DEFAULT_LABEL_WIDTH))],
                    options.attrs.form,
                ),
                drawer: with_default(
                    &[("size", Value::from(DEFAULT_DRAWER_SIZE))],
                    options.attrs.drawer,
                ),
                table: options.attrs.table,
                pagination: options.attrs.pagination,
            },
            hooks,
            api_endpoints: ApiEndpoints {
                query: endpoints.query.unwrap_or_else(|| "query".into()),
                add: endpoints.add.unwrap_or_else(|| "add".into()),
                edit: endpoints.edit.unwrap_or_else(|| "edit".into()),
                delete: endpoints.delete.unwrap_or_else(|| "delete".into()),
                delete_flag: endpoints.delete_flag.unwrap_or_else(|| "deleteFlag".into()),
            },
            button_auth: ButtonAuth {
                add: auth.add.unwrap_or(true),
                edit: auth.edit.unwrap_or(true),
                delete: auth.delete.unwrap_or(true),
            },
            table: TableConfig {
                menu_visible: table.menu_visible.unwrap_or(true),
                menu_align: table.menu_align.unwrap_or_default(),
                menu_width: table.menu_width.unwrap_or(150),
                menu_title: table.menu_title.unwrap_or(true),
                def_but_visible,
            },
            pagination: PaginationConfig {
                current: pagination.current.unwrap_or(1),
                page_size: pagination.page_size.unwrap_or(10),
                page_sizes: pagination.page_sizes.unwrap_or_else(|| vec![10, 20, 50, 100]),
                layout: pagination
                    .layout
                    .unwrap_or_else(|| DEFAULT_PAGINATION_LAYOUT.to_string()),
            },
        };

        tracing::debug!(
            target: targets::CONFIG,
            url = %config.url,
            hooks = config.hooks.len(),
            fields = config.source.len(),
            "resolved CRUD configuration"
        );
        Ok(config)
    }
}

impl<T> CrudConfig<T> {
    /// `{url}/{endpoint}`.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.url.trim_end_matches('/'), endpoint)
    }

    /// How rows are identified in delete and toggle requests.
    pub fn identity(&self) -> Option<RowIdentity> {
        RowIdentity::resolve(self.row_key.as_deref(), &self.row_keys)
    }
}

impl<T> fmt::Debug for CrudConfig<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CrudConfig")
            .field("debug", &self.debug)
            .field("is_after_mount_query", &self.is_after_mount_query)
            .field("url", &self.url)
            .field("row_key", &self.row_key)
            .field("row_keys", &self.row_keys)
            .field("attrs", &self.attrs)
            .field("api_endpoints", &self.api_endpoints)
            .field("button_auth", &self.button_auth)
            .field("table", &self.table)
            .field("pagination", &self.pagination)
            .finish_non_exhaustive()
    }
}
