//! EasyCrud: a configuration-driven CRUD engine.
//!
//! A [`Schema`] of column definitions and four field lists drives a search
//! form, a paginated table and a create/edit drawer. [`Crud`] runs the
//! actions (query, add, edit, remove, submit) against a JSON backend through
//! an [`HttpClient`], calling the configured [`Hooks`] at each step.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use easycrud::{ColumnDef, Crud, CrudProps, NullHost, Schema};
//! use easycrud_net::HttpClient;
//! use serde_json::Value;
//!
//! # async fn run() -> easycrud::Result<()> {
//! let schema = Schema::new()
//!     .define("userName", ColumnDef::new("User name"))
//!     .with_common_columns()
//!     .filter(["userName", "deleteFlag"])
//!     .editor(["userName"])
//!     .column(["userName", "createTime"])
//!     .expand(["userName", "deleteFlag", "createTime"]);
//!
//! let client = HttpClient::builder().base_url("http://localhost:8080/api").build()?;
//! let crud: Crud<Value> = Crud::new(
//!     CrudProps::new("/user", schema).row_key("userId"),
//!     client,
//!     Arc::new(NullHost),
//! )?;
//!
//! crud.query(Default::default()).await?;
//! println!("{} rows", crud.rows().len());
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod error;
pub mod form;
pub mod hooks;
pub mod host;
pub mod login;
pub mod row;
pub mod schema;
pub mod table;
pub mod validate;

pub use actions::{ActionOutcome, Crud, RowActions};
pub use config::{CrudConfig, CrudOptions, CrudProps};
pub use error::{ConfigError, CrudError, FieldSet, Result};
pub use form::{DrawerState, FieldChange, FormKind, FormModel, FormStore};
pub use hooks::{HookName, HookOutcome, HookPayload, Hooks};
pub use host::{CrudHost, NullHost};
pub use login::{Login, LoginRequest, LoginResult, LoginSession};
pub use row::{BaseRow, CrudRow, DeleteFlag, Record, RowIdentity, value_from_row};
pub use schema::{ColumnDef, ComponentKind, EditMode, Fields, Schema, common_columns};
pub use table::{LoadState, Pagination, TableStore};
pub use validate::{AcceptAll, FieldError, FormValidator, InvalidFields, Rule, RuleValidator};

pub use easycrud_net::HttpClient;
