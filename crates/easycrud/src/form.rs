//! Search and edit form stores.
//!
//! The [`FormStore`] owns both form models, the drawer state and the
//! submission buffer that request hooks edit. Field writes are recorded as
//! [`FieldChange`]s; the engine drains and emits them after releasing its
//! lock so slots may read the store.

use std::fmt;

use easycrud_core::logging::targets;
use serde_json::Value;

use crate::row::Record;
use crate::schema::{EditMode, Schema};

/// Which form a model backs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormKind {
    /// The search form above the table.
    Search,
    /// The create/edit form in the drawer.
    Edit,
}

/// A field write that changed a value.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldChange {
    /// Form that changed.
    pub form: FormKind,
    /// Field name.
    pub field: String,
    /// Previous value.
    pub old: Value,
    /// New value.
    pub new: Value,
}

/// Values of one form, seeded from the schema defaults.
#[derive(Debug, Clone)]
pub struct FormModel {
    kind: FormKind,
    fields: Vec<String>,
    values: Record,
    defaults: Record,
    debug: bool,
    changes: Vec<FieldChange>,
}

impl FormModel {
    fn new(kind: FormKind, fields: &[String], defaults: Record, debug: bool) -> Self {
        Self {
            kind,
            fields: fields.to_vec(),
            values: defaults.clone(),
            defaults,
            debug,
            changes: Vec::new(),
        }
    }

    /// Which form this is.
    pub fn kind(&self) -> FormKind {
        self.kind
    }

    /// Current values.
    pub fn values(&self) -> &Record {
        &self.values
    }

    /// The values captured at initialization.
    pub fn defaults(&self) -> &Record {
        &self.defaults
    }

    /// Values that have been filled in. Unset (`null`) fields are left out
    /// so request bodies never carry them.
    pub fn filled_values(&self) -> Record {
        self.values
            .iter()
            .filter(|(_, value)| !value.is_null())
            .map(|(field, value)| (field.clone(), value.clone()))
            .collect()
    }

    /// Field names this form accepts.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Current value of `field`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set `field`, recording a change if the value differs.
    ///
    /// Returns `true` if the value changed. Fields outside this form's
    /// classification set are rejected with a warning.
    pub fn set(&mut self, field: impl Into<String>, value: Value) -> bool {
        let field = field.into();
        if !self.fields.contains(&field) {
            tracing::warn!(target: targets::FORM, form = ?self.kind, field = %field, "ignoring unknown form field");
            return false;
        }
        let old = self.values.get(&field).cloned().unwrap_or(Value::Null);
        if old == value && self.values.contains_key(&field) {
            return false;
        }
        if self.debug {
            tracing::debug!(
                target: targets::FORM,
                form = ?self.kind,
                field = %field,
                from = %old,
                to = %value,
                "form field changed"
            );
        }
        self.values.insert(field.clone(), value.clone());
        self.changes.push(FieldChange {
            form: self.kind,
            field,
            old,
            new: value,
        });
        true
    }

    /// Write every default back onto the model.
    pub fn restore_defaults(&mut self) {
        let defaults = self.defaults.clone();
        for (field, value) in defaults {
            self.set(field, value);
        }
    }

    fn drain_changes(&mut self) -> Vec<FieldChange> {
        std::mem::take(&mut self.changes)
    }
}

/// Drawer visibility and mode.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawerState<T> {
    /// Hidden.
    Closed,
    /// Open for a new row.
    Creating,
    /// Open for an existing row.
    Editing {
        /// The row being edited, as it was when the drawer opened.
        current_row: T,
    },
}

impl<T> DrawerState<T> {
    /// Whether the drawer is visible.
    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }

    /// The open mode.
    pub fn mode(&self) -> Option<EditMode> {
        match self {
            Self::Closed => None,
            Self::Creating => Some(EditMode::Create),
            Self::Editing { .. } => Some(EditMode::Edit),
        }
    }

    /// Drawer title, derived from the mode.
    pub fn title(&self) -> Option<&'static str> {
        self.mode().map(EditMode::title)
    }

    /// The row under edit.
    pub fn current_row(&self) -> Option<&T> {
        match self {
            Self::Editing { current_row } => Some(current_row),
            _ => None,
        }
    }
}

/// Both forms, the drawer and the submission buffer.
pub struct FormStore<T> {
    search: FormModel,
    edit: FormModel,
    search_visible: bool,
    drawer: DrawerState<T>,
    opening: Option<DrawerState<T>>,
    form_data: Record,
}

impl<T> FormStore<T> {
    /// Seed both forms from `schema`.
    pub fn new(schema: &Schema, debug: bool) -> Self {
        Self {
            search: FormModel::new(
                FormKind::Search,
                &schema.fields.filter,
                schema.defaults_for(FormKind::Search),
                debug,
            ),
            edit: FormModel::new(
                FormKind::Edit,
                &schema.fields.editor,
                schema.defaults_for(FormKind::Edit),
                debug,
            ),
            search_visible: true,
            drawer: DrawerState::Closed,
            opening: None,
            form_data: Record::new(),
        }
    }

    /// The search form.
    pub fn search(&self) -> &FormModel {
        &self.search
    }

    /// The search form, mutably.
    pub fn search_mut(&mut self) -> &mut FormModel {
        &mut self.search
    }

    /// The edit form.
    pub fn edit(&self) -> &FormModel {
        &self.edit
    }

    /// The edit form, mutably.
    pub fn edit_mut(&mut self) -> &mut FormModel {
        &mut self.edit
    }

    /// The form of `kind`.
    pub fn model(&self, kind: FormKind) -> &FormModel {
        match kind {
            FormKind::Search => &self.search,
            FormKind::Edit => &self.edit,
        }
    }

    /// The form of `kind`, mutably.
    pub fn model_mut(&mut self, kind: FormKind) -> &mut FormModel {
        match kind {
            FormKind::Search => &mut self.search,
            FormKind::Edit => &mut self.edit,
        }
    }

    /// Whether the search form is shown.
    pub fn search_visible(&self) -> bool {
        self.search_visible
    }

    /// Show or hide the search form.
    pub fn set_search_visible(&mut self, visible: bool) {
        self.search_visible = visible;
    }

    /// Current drawer state.
    pub fn drawer(&self) -> &DrawerState<T> {
        &self.drawer
    }

    /// The state the drawer is about to enter. Set only while
    /// `beforeAdd`/`beforeEdit` run.
    pub fn opening(&self) -> Option<&DrawerState<T>> {
        self.opening.as_ref()
    }

    /// Payload of the request being prepared.
    pub fn form_data(&self) -> &Record {
        &self.form_data
    }

    /// Payload of the request being prepared, mutably.
    pub fn form_data_mut(&mut self) -> &mut Record {
        &mut self.form_data
    }

    pub(crate) fn set_form_data(&mut self, data: Record) {
        self.form_data = data;
    }

    pub(crate) fn take_form_data(&mut self) -> Record {
        std::mem::take(&mut self.form_data)
    }

    pub(crate) fn begin_opening(&mut self, state: DrawerState<T>) {
        self.opening = Some(state);
    }

    /// Move the pending state into the drawer, or drop it when `proceed` is
    /// false.
    pub(crate) fn finish_opening(&mut self, proceed: bool) {
        match self.opening.take() {
            Some(state) if proceed => self.drawer = state,
            _ => {}
        }
    }

    /// Hide the drawer.
    pub fn close_drawer(&mut self) {
        self.drawer = DrawerState::Closed;
    }

    /// Restore `kind`'s values to their initialization snapshot.
    pub fn restore_defaults(&mut self, kind: FormKind) {
        self.model_mut(kind).restore_defaults();
    }

    pub(crate) fn drain_changes(&mut self) -> Vec<FieldChange> {
        let mut changes = self.search.drain_changes();
        changes.extend(self.edit.drain_changes());
        changes
    }
}

impl<T> fmt::Debug for FormStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormStore")
            .field("search", &self.search.values)
            .field("edit", &self.edit.values)
            .field("search_visible", &self.search_visible)
            .field("drawer", &self.drawer.mode())
            .field("form_data", &self.form_data)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::schema::ColumnDef;

    fn store() -> FormStore<Value> {
        let schema = Schema::new()
            .define("userName", ColumnDef::new("User name"))
            .define("status", ColumnDef::new("Status").search_default(1).add_default(0))
            .filter(["userName", "status"])
            .editor(["userName", "status"]);
        FormStore::new(&schema, true)
    }

    #[test]
    fn test_seeded_from_defaults() {
        let form = store();
        assert_eq!(form.search().get("status"), Some(&json!(1)));
        assert_eq!(form.edit().get("status"), Some(&json!(0)));
        assert_eq!(form.search().get("userName"), Some(&Value::Null));
        assert!(form.search_visible());
        assert_eq!(form.drawer(), &DrawerState::Closed);
    }

    #[test]
    fn test_changes_are_recorded_only_on_difference() {
        let mut form = store();
        assert!(form.search_mut().set("userName", json!("bob")));
        assert!(!form.search_mut().set("userName", json!("bob")));
        assert!(form.edit_mut().set("status", json!(1)));

        let changes = form.drain_changes();
        assert_eq!(changes.len(), 2);
        assert_eq!(changes[0].form, FormKind::Search);
        assert_eq!(changes[0].old, Value::Null);
        assert_eq!(changes[1].new, json!(1));
        assert!(form.drain_changes().is_empty());
    }

    #[test]
    fn test_reset_round_trip() {
        let mut form = store();
        let snapshot = form.search().values().clone();
        form.search_mut().set("userName", json!("carol"));
        form.search_mut().set("status", json!(0));

        form.restore_defaults(FormKind::Search);

        assert_eq!(form.search().values(), &snapshot);
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let mut form = store();
        assert!(!form.search_mut().set("extra", json!(true)));
        assert!(form.search().get("extra").is_none());
        assert!(form.drain_changes().is_empty());
    }

    #[test]
    fn test_filled_values_skip_unset_fields() {
        let mut form = store();
        assert_eq!(
            serde_json::to_value(form.search().filled_values()).unwrap(),
            json!({"status": 1})
        );

        form.search_mut().set("userName", json!("dave"));
        assert_eq!(
            serde_json::to_value(form.search().filled_values()).unwrap(),
            json!({"userName": "dave", "status": 1})
        );
    }

    #[test]
    fn test_drawer_state_derives_title() {
        let creating: DrawerState<Value> = DrawerState::Creating;
        assert_eq!(creating.title(), Some("Create"));
        let editing = DrawerState::Editing {
            current_row: json!({"id": 1}),
        };
        assert_eq!(editing.mode(), Some(EditMode::Edit));
        assert_eq!(editing.current_row(), Some(&json!({"id": 1})));
        assert_eq!(DrawerState::<Value>::Closed.title(), None);
    }

    #[test]
    fn test_opening_is_discarded_on_abort() {
        let mut form = store();
        form.begin_opening(DrawerState::Creating);
        assert!(form.opening().is_some());
        form.finish_opening(false);
        assert!(form.opening().is_none());
        assert!(!form.drawer().is_open());

        form.begin_opening(DrawerState::Creating);
        form.finish_opening(true);
        assert!(form.drawer().is_open());
    }
}
