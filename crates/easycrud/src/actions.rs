//! The action handler.
//!
//! [`Crud`] ties the resolved configuration, the form and table stores, the
//! hooks and the HTTP client together. Each action is a fixed sequence of
//! store updates, hook points and requests:
//!
//! | action   | sequence                                                           |
//! |----------|--------------------------------------------------------------------|
//! | query    | loading, `beforeQuery`, POST query, `afterQuery`, rows, idle        |
//! | add      | `beforeAdd`, open drawer                                           |
//! | edit     | fill edit form, `beforeEdit`, open drawer                           |
//! | remove   | `beforeRemove`, confirm, POST delete, `afterRemove`, notify         |
//! | submit   | validate, `beforeSubmit`, then the create or update sequence        |
//!
//! A hook that aborts stops its action with no further changes.

use std::sync::Arc;

use easycrud_core::logging::targets;
use easycrud_core::{ConnectionId, Signal};
use easycrud_net::{ApiResponse, HttpClient, HttpRequest, Notification};
use parking_lot::Mutex;
use serde_json::Value;

use crate::config::{CrudConfig, CrudProps};
use crate::error::Result;
use crate::form::{DrawerState, FieldChange, FormKind, FormStore};
use crate::hooks::{HookName, HookOutcome, HookPayload};
use crate::host::CrudHost;
use crate::row::{CrudRow, DELETE_FLAG, DeleteFlag, Record, value_from_row};
use crate::schema::EditMode;
use crate::table::{LoadState, Pagination, TableStore};
use crate::validate::{FormValidator, InvalidFields};

/// Query payload key for the page number.
pub const PAGENUM: &str = "pagenum";
/// Query payload key for the page size.
pub const PAGESIZE: &str = "pagesize";

const DELETE_CONFIRM_TITLE: &str = "Notice";
const DELETE_CONFIRM_MESSAGE: &str = "Are you sure you want to delete this row?";

/// How an action ended when it did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Every step ran.
    Completed,
    /// A hook stopped the action.
    Aborted(HookName),
    /// The user declined the confirmation.
    Dismissed,
    /// The edit form failed validation.
    Invalid(InvalidFields),
    /// The action could not run in the current state.
    Skipped,
}

impl ActionOutcome {
    /// Whether every step ran.
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Buttons offered on a table row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RowActions {
    /// Show the edit button.
    pub edit: bool,
    /// Show the delete button.
    pub delete: bool,
}

struct CrudInner<T> {
    config: CrudConfig<T>,
    client: HttpClient,
    host: Arc<dyn CrudHost>,
    form: Mutex<FormStore<T>>,
    table: Mutex<TableStore<T>>,
    field_changed: Signal<FieldChange>,
    forwarding: ConnectionId,
}

impl<T> Drop for CrudInner<T> {
    fn drop(&mut self) {
        self.client.notifications().disconnect(self.forwarding);
    }
}

/// A configured CRUD table.
///
/// Cloning is cheap and clones share state. Store locks are never held
/// across a request, so actions may run concurrently; overlapping queries
/// are resolved by the client's per-route cancellation.
pub struct Crud<T> {
    inner: Arc<CrudInner<T>>,
}

impl<T> Clone for Crud<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: CrudRow> Crud<T> {
    /// Resolve `props` and build the stores.
    ///
    /// Client notifications are forwarded to `host` for as long as this
    /// table lives.
    pub fn new(props: CrudProps<T>, client: HttpClient, host: Arc<dyn CrudHost>) -> Result<Self> {
        let config = CrudConfig::resolve(props)?;
        let form = FormStore::new(&config.source, config.debug);
        let table = TableStore::new(&config.source.fields, &config.pagination);

        let forward_to = host.clone();
        let forwarding = client
            .notifications()
            .connect(move |notification| forward_to.notify(notification.clone()));

        tracing::debug!(target: targets::ACTIONS, url = %config.url, "CRUD table created");

        Ok(Self {
            inner: Arc::new(CrudInner {
                config,
                client,
                host,
                form: Mutex::new(form),
                table: Mutex::new(table),
                field_changed: Signal::new(),
                forwarding,
            }),
        })
    }

    /// The resolved configuration.
    pub fn config(&self) -> &CrudConfig<T> {
        &self.inner.config
    }

    /// The HTTP client.
    pub fn client(&self) -> &HttpClient {
        &self.inner.client
    }

    /// Emitted for every form field change.
    pub fn field_changed(&self) -> &Signal<FieldChange> {
        &self.inner.field_changed
    }

    /// Run `f` with the form store, then emit the changes it made.
    pub fn with_form<R>(&self, f: impl FnOnce(&mut FormStore<T>) -> R) -> R {
        let (result, changes) = {
            let mut form = self.inner.form.lock();
            let result = f(&mut form);
            (result, form.drain_changes())
        };
        for change in changes {
            self.inner.field_changed.emit(change);
        }
        result
    }

    /// Run `f` with the table store.
    pub fn with_table<R>(&self, f: impl FnOnce(&TableStore<T>) -> R) -> R {
        f(&self.inner.table.lock())
    }

    /// Snapshot of the current rows.
    pub fn rows(&self) -> Vec<T> {
        self.inner.table.lock().rows().to_vec()
    }

    /// Loading state.
    pub fn load_state(&self) -> LoadState {
        self.inner.table.lock().load_state()
    }

    /// Page position.
    pub fn pagination(&self) -> Pagination {
        self.inner.table.lock().pagination().clone()
    }

    /// Drawer state.
    pub fn drawer(&self) -> DrawerState<T> {
        self.inner.form.lock().drawer().clone()
    }

    /// Values of the form of `kind`.
    pub fn form_values(&self, kind: FormKind) -> Record {
        self.inner.form.lock().model(kind).values().clone()
    }

    /// Set a search form field.
    pub fn set_search_field(&self, field: impl Into<String>, value: Value) -> bool {
        self.with_form(|form| form.search_mut().set(field, value))
    }

    /// Set an edit form field.
    pub fn set_edit_field(&self, field: impl Into<String>, value: Value) -> bool {
        self.with_form(|form| form.edit_mut().set(field, value))
    }

    /// Reset a form. With `restore_defaults` the values return to their
    /// initialization snapshot; otherwise only the host widget is reset.
    pub fn reset(&self, kind: FormKind, restore_defaults: bool) {
        if restore_defaults {
            self.with_form(|form| form.restore_defaults(kind));
        } else {
            self.inner.host.reset_form_widget(kind);
        }
    }

    /// Close the drawer without submitting.
    pub fn close_drawer(&self) {
        self.with_form(FormStore::close_drawer);
    }

    /// Checked columns in display order.
    pub fn table_columns(&self) -> Vec<String> {
        self.inner.table.lock().table_columns()
    }

    /// Replace the checked columns.
    pub fn set_checked_columns<I, S>(&self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.table.lock().set_checked_columns(names);
    }

    /// Whether the create button is offered.
    pub fn can_add(&self) -> bool {
        self.inner.config.button_auth.add
    }

    /// Buttons offered on `row`.
    pub fn row_actions(&self, row: &T) -> RowActions {
        let config = &self.inner.config;
        let visible = (config.table.def_but_visible)(row);
        RowActions {
            edit: config.button_auth.edit && visible,
            delete: config.button_auth.delete && visible,
        }
    }

    /// Editor fields shown in the drawer for `mode`.
    pub fn visible_fields(&self, mode: EditMode) -> Vec<String> {
        let source = &self.inner.config.source;
        source
            .fields
            .editor
            .iter()
            .filter(|name| source.get(name).is_some_and(|def| def.is_visible(mode)))
            .cloned()
            .collect()
    }

    /// Whether `field` is read-only in the drawer for `mode`.
    pub fn is_disabled(&self, field: &str, mode: EditMode) -> bool {
        self.inner
            .config
            .source
            .get(field)
            .is_some_and(|def| def.is_disabled(mode))
    }

    /// Text for `field` in `row`.
    pub fn render_cell(&self, field: &str, row: &T) -> Result<String> {
        let record = row.to_record()?;
        Ok(match self.inner.config.source.get(field) {
            Some(def) => def.render_cell(field, &record),
            None => String::new(),
        })
    }

    fn notify(&self, notification: Notification) {
        self.inner.client.notify(notification);
    }

    fn endpoint(&self, name: &str) -> String {
        self.inner.config.endpoint_url(name)
    }

    /// Query once after mounting, if configured to.
    pub async fn mount(&self) -> Result<ActionOutcome> {
        if self.inner.config.is_after_mount_query {
            self.query(Record::new()).await
        } else {
            Ok(ActionOutcome::Skipped)
        }
    }

    /// Move to `page` and query.
    pub async fn set_page(&self, page: u64) -> Result<ActionOutcome> {
        self.inner.table.lock().set_current_page(page);
        self.query(Record::new()).await
    }

    /// Change the page size and query.
    pub async fn set_page_size(&self, size: u64) -> Result<ActionOutcome> {
        self.inner.table.lock().set_page_size(size);
        self.query(Record::new()).await
    }

    /// Load the current page.
    ///
    /// The payload is the page position, then the search form, then
    /// `extra`, later keys winning. A superseded query leaves the table
    /// loading for the query that replaced it.
    pub async fn query(&self, extra: Record) -> Result<ActionOutcome> {
        let inner = &self.inner;
        let (page, size) = {
            let mut table = inner.table.lock();
            table.set_load_state(LoadState::Loading);
            let pagination = table.pagination();
            (pagination.current_page, pagination.page_size)
        };

        let payload = self.with_form(|form| {
            let mut data = Record::new();
            data.insert(PAGENUM.into(), page.into());
            data.insert(PAGESIZE.into(), size.into());
            data.extend(form.search().filled_values());
            data.extend(extra);
            form.set_form_data(data);
            let proceed = inner.config.hooks.proceed(HookName::BeforeQuery, form);
            let data = form.take_form_data();
            proceed.then_some(data)
        });
        let Some(payload) = payload else {
            return Ok(ActionOutcome::Aborted(HookName::BeforeQuery));
        };

        let url = self.endpoint(&inner.config.api_endpoints.query);
        tracing::debug!(target: targets::ACTIONS, %url, ?payload, "query");
        let response = inner
            .client
            .request(HttpRequest::post(url).json(&payload))
            .await
            .and_then(ApiResponse::into_envelope);
        let envelope = match response {
            Ok(envelope) => envelope,
            Err(e) => {
                if !e.is_cancelled() {
                    inner.table.lock().set_load_state(LoadState::Idle);
                }
                return Err(e.into());
            }
        };

        let rows: Vec<T> = if envelope.data.is_null() {
            Vec::new()
        } else {
            match envelope.data_as() {
                Ok(rows) => rows,
                Err(e) => {
                    inner.table.lock().set_load_state(LoadState::Idle);
                    return Err(e.into());
                }
            }
        };

        match inner
            .config
            .hooks
            .dispatch(HookName::AfterQuery, HookPayload::Rows(rows))
        {
            HookOutcome::Continue(HookPayload::Rows(rows)) => {
                inner.table.lock().replace_rows(rows, envelope.page.as_ref());
                Ok(ActionOutcome::Completed)
            }
            _ => Ok(ActionOutcome::Aborted(HookName::AfterQuery)),
        }
    }

    /// Open the drawer for a new row.
    pub fn add(&self) -> ActionOutcome {
        let hooks = &self.inner.config.hooks;
        let proceed = self.with_form(|form| {
            form.begin_opening(DrawerState::Creating);
            let proceed = hooks.proceed(HookName::BeforeAdd, form);
            form.finish_opening(proceed);
            proceed
        });
        if proceed {
            ActionOutcome::Completed
        } else {
            ActionOutcome::Aborted(HookName::BeforeAdd)
        }
    }

    /// Fill the edit form from `row` and open the drawer.
    pub fn edit(&self, row: &T) -> Result<ActionOutcome> {
        let record = row.to_record()?;
        let config = &self.inner.config;
        let proceed = self.with_form(|form| {
            for field in &config.source.fields.editor {
                let value = record.get(field).cloned().unwrap_or(Value::Null);
                form.edit_mut().set(field.clone(), value);
            }
            form.begin_opening(DrawerState::Editing {
                current_row: row.clone(),
            });
            let proceed = config.hooks.proceed(HookName::BeforeEdit, form);
            form.finish_opening(proceed);
            proceed
        });
        Ok(if proceed {
            ActionOutcome::Completed
        } else {
            ActionOutcome::Aborted(HookName::BeforeEdit)
        })
    }

    /// Soft-delete `row` after confirmation.
    ///
    /// Sends the row identity and the toggled delete flag. Needs `rowKey` or
    /// `rowKeys`.
    pub async fn remove(&self, row: &T) -> Result<ActionOutcome> {
        let config = &self.inner.config;
        let Some(identity) = config.identity() else {
            tracing::warn!(target: targets::ACTIONS, "cannot remove: neither rowKey nor rowKeys is set");
            return Ok(ActionOutcome::Skipped);
        };
        let record = row.to_record()?;
        let mut data = value_from_row(&record, &identity);
        data.insert(DELETE_FLAG.into(), DeleteFlag::toggled_for(&record).into());

        let payload = self.with_form(|form| {
            form.set_form_data(data);
            let proceed = config.hooks.proceed(HookName::BeforeRemove, form);
            let data = form.take_form_data();
            proceed.then_some(data)
        });
        let Some(payload) = payload else {
            return Ok(ActionOutcome::Aborted(HookName::BeforeRemove));
        };

        if !self
            .inner
            .host
            .confirm(DELETE_CONFIRM_TITLE, DELETE_CONFIRM_MESSAGE)
            .await
        {
            tracing::debug!(target: targets::ACTIONS, "remove dismissed");
            return Ok(ActionOutcome::Dismissed);
        }

        let url = self.endpoint(&config.api_endpoints.delete);
        self.inner
            .client
            .request(HttpRequest::post(url).json(&payload))
            .await?;

        if self.with_form(|form| config.hooks.proceed(HookName::AfterRemove, form)) {
            self.notify(Notification::success("Deleted successfully"));
        }
        Ok(ActionOutcome::Completed)
    }

    /// Flip `row`'s delete flag and update it in place.
    pub async fn toggle_delete_flag(&self, row: &T) -> Result<ActionOutcome> {
        let config = &self.inner.config;
        let Some(identity) = config.identity() else {
            tracing::warn!(target: targets::ACTIONS, "cannot toggle: neither rowKey nor rowKeys is set");
            return Ok(ActionOutcome::Skipped);
        };
        let record = row.to_record()?;
        let mut payload = value_from_row(&record, &identity);
        payload.insert(DELETE_FLAG.into(), DeleteFlag::toggled_for(&record).into());

        let url = self.endpoint(&config.api_endpoints.delete_flag);
        self.inner
            .client
            .request(HttpRequest::post(url).json(&payload))
            .await?;

        self.inner.table.lock().patch_row(identity.keys(), &payload)?;
        Ok(ActionOutcome::Completed)
    }

    /// Validate and submit the edit form.
    ///
    /// Runs the create sequence when the drawer is creating and the update
    /// sequence when it is editing. A closed drawer is skipped.
    pub async fn submit(&self, validator: &dyn FormValidator) -> Result<ActionOutcome> {
        let config = &self.inner.config;
        let (mode, values) = {
            let form = self.inner.form.lock();
            (form.drawer().mode(), form.edit().values().clone())
        };
        let Some(mode) = mode else {
            tracing::warn!(target: targets::ACTIONS, "submit ignored: drawer is closed");
            return Ok(ActionOutcome::Skipped);
        };

        if let Err(invalid) = validator.validate(&config.source, mode, &values) {
            tracing::debug!(target: targets::ACTIONS, fields = ?invalid.keys().collect::<Vec<_>>(), "validation failed");
            let warn = self.with_form(|form| {
                config
                    .hooks
                    .dispatch(
                        HookName::SubmitValidateErr,
                        HookPayload::ValidationFailed {
                            invalid_fields: &invalid,
                            form,
                        },
                    )
                    .is_continue()
            });
            if warn {
                self.notify(Notification::warning("Validation failed"));
            }
            return Ok(ActionOutcome::Invalid(invalid));
        }

        if !self.with_form(|form| config.hooks.proceed(HookName::BeforeSubmit, form)) {
            return Ok(ActionOutcome::Aborted(HookName::BeforeSubmit));
        }

        match mode {
            EditMode::Create => self.submit_add().await,
            EditMode::Edit => self.submit_edit().await,
        }
    }

    async fn submit_add(&self) -> Result<ActionOutcome> {
        let config = &self.inner.config;
        let payload = self.with_form(|form| {
            form.set_form_data(form.edit().filled_values());
            let proceed = config.hooks.proceed(HookName::BeforeSubmitAdd, form);
            let data = form.take_form_data();
            proceed.then_some(data)
        });
        let Some(payload) = payload else {
            return Ok(ActionOutcome::Aborted(HookName::BeforeSubmitAdd));
        };

        let url = self.endpoint(&config.api_endpoints.add);
        self.inner
            .client
            .request(HttpRequest::post(url).json(&payload))
            .await?;

        let seed = self.with_form(|form| {
            config
                .hooks
                .proceed(HookName::AfterSubmitAdd, form)
                .then(|| {
                    form.close_drawer();
                    form.edit().filled_values()
                })
        });
        let Some(seed) = seed else {
            return Ok(ActionOutcome::Aborted(HookName::AfterSubmitAdd));
        };
        self.notify(Notification::success("Added successfully"));
        self.requery(seed).await;
        Ok(ActionOutcome::Completed)
    }

    async fn submit_edit(&self) -> Result<ActionOutcome> {
        let config = &self.inner.config;
        let payload = self.with_form(|form| -> Result<Option<Record>> {
            let mut data = match form.drawer().current_row() {
                Some(row) => row.to_record()?,
                None => Record::new(),
            };
            data.extend(form.edit().filled_values());
            form.set_form_data(data);
            let proceed = config.hooks.proceed(HookName::BeforeSubmitEdit, form);
            let data = form.take_form_data();
            Ok(proceed.then_some(data))
        })?;
        let Some(payload) = payload else {
            return Ok(ActionOutcome::Aborted(HookName::BeforeSubmitEdit));
        };

        let url = self.endpoint(&config.api_endpoints.edit);
        self.inner
            .client
            .request(HttpRequest::post(url).json(&payload))
            .await?;

        let proceed = self.with_form(|form| {
            let proceed = config.hooks.proceed(HookName::AfterSubmitEdit, form);
            if proceed {
                form.close_drawer();
            }
            proceed
        });
        if !proceed {
            return Ok(ActionOutcome::Aborted(HookName::AfterSubmitEdit));
        }

        match &config.row_key {
            Some(key) => {
                self.inner
                    .table
                    .lock()
                    .patch_row(std::slice::from_ref(key), &payload)?;
                self.notify(Notification::success("Updated successfully"));
            }
            None => {
                self.notify(Notification::success("Updated successfully"));
                self.requery(payload).await;
            }
        }
        Ok(ActionOutcome::Completed)
    }

    /// Follow-up query after a mutation. Its failure does not undo the
    /// mutation; the client has already reported it.
    async fn requery(&self, extra: Record) {
        if let Err(e) = self.query(extra).await {
            if !e.is_cancelled() {
                tracing::warn!(target: targets::ACTIONS, error = %e, "follow-up query failed");
            }
        }
    }
}

impl<T> std::fmt::Debug for Crud<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crud")
            .field("url", &self.inner.config.url)
            .field("client", &self.inner.client)
            .finish_non_exhaustive()
    }
}
