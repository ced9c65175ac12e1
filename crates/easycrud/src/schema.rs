//! Column definitions and the field sets that select them.
//!
//! A [`Schema`] is the single source of truth for every field the engine
//! knows: what widget edits it, its defaults, its table presentation and its
//! validation rules. The four [`Fields`] lists only name fields; every name
//! must resolve to a definition, which [`Schema::validate`] checks.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{ConfigError, FieldSet};
use crate::form::FormKind;
use crate::row::{DELETE_FLAG, DeleteFlag, Record};
use crate::validate::Rule;

/// Which drawer form is open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EditMode {
    /// Adding a new row.
    Create,
    /// Editing an existing row.
    Edit,
}

impl EditMode {
    /// Drawer title for this mode.
    pub fn title(self) -> &'static str {
        match self {
            Self::Create => "Create",
            Self::Edit => "Edit",
        }
    }
}

impl fmt::Display for EditMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.title())
    }
}

/// Widget used to edit a field.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ComponentKind {
    /// Single-line text input.
    #[default]
    Input,
    /// Numeric input.
    InputNumber,
    /// Drop-down select.
    Select,
    /// Radio button group.
    RadioGroup,
    /// On/off switch.
    Switch,
    /// Date picker.
    DatePicker,
    /// Date and time picker.
    DateTimePicker,
    /// The soft-delete toggle.
    DeleteFlag,
    /// A host-provided widget, looked up by name.
    Custom(String),
}

type ModePredicate = Arc<dyn Fn(EditMode) -> bool + Send + Sync>;
type CellRenderer = Arc<dyn Fn(&Record) -> String + Send + Sync>;

/// Properties with optional per-form overrides.
///
/// [`resolve`](Self::resolve) layers the override for the form kind on top
/// of the common properties.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ModeProps {
    /// Applied in every form.
    pub common: Record,
    /// Applied in the search form only.
    pub search: Record,
    /// Applied in the edit form only.
    pub edit: Record,
}

impl ModeProps {
    /// Effective properties for `kind`.
    pub fn resolve(&self, kind: FormKind) -> Record {
        let overrides = match kind {
            FormKind::Search => &self.search,
            FormKind::Edit => &self.edit,
        };
        let mut props = self.common.clone();
        props.extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        props
    }
}

/// Definition of one field.
#[derive(Clone, Default)]
pub struct ColumnDef {
    /// Human-readable label.
    pub label: String,
    /// Editing widget.
    pub component: ComponentKind,
    /// Initial value in the search form.
    pub search_default: Option<Value>,
    /// Initial value in the edit form.
    pub add_default: Option<Value>,
    /// Widget properties.
    pub component_props: ModeProps,
    /// Form-item properties.
    pub form_props: ModeProps,
    /// Table column properties.
    pub table_props: Record,
    /// Validation rules, checked on submit.
    pub rules: Vec<Rule>,
    /// Grid span in the edit form.
    pub span: Option<u8>,
    visible: Option<ModePredicate>,
    disabled: Option<ModePredicate>,
    renderer: Option<CellRenderer>,
}

impl ColumnDef {
    /// A text input with the given label.
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }

    /// Use a different widget.
    pub fn component(mut self, component: ComponentKind) -> Self {
        self.component = component;
        self
    }

    /// Initial search-form value.
    pub fn search_default(mut self, value: impl Into<Value>) -> Self {
        self.search_default = Some(value.into());
        self
    }

    /// Initial edit-form value.
    pub fn add_default(mut self, value: impl Into<Value>) -> Self {
        self.add_default = Some(value.into());
        self
    }

    /// Set a widget property for every form.
    pub fn component_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.component_props.common.insert(key.into(), value.into());
        self
    }

    /// Set a widget property for one form kind only.
    pub fn component_prop_for(
        mut self,
        kind: FormKind,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Self {
        let target = match kind {
            FormKind::Search => &mut self.component_props.search,
            FormKind::Edit => &mut self.component_props.edit,
        };
        target.insert(key.into(), value.into());
        self
    }

    /// Set a form-item property for every form.
    pub fn form_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.form_props.common.insert(key.into(), value.into());
        self
    }

    /// Set a table column property.
    pub fn table_prop(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.table_props.insert(key.into(), value.into());
        self
    }

    /// Add a validation rule.
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Grid span in the edit form.
    pub fn span(mut self, span: u8) -> Self {
        self.span = Some(span);
        self
    }

    /// Show the field only in modes where `f` returns true.
    pub fn visible_when(mut self, f: impl Fn(EditMode) -> bool + Send + Sync + 'static) -> Self {
        self.visible = Some(Arc::new(f));
        self
    }

    /// Disable the field in modes where `f` returns true.
    pub fn disabled_when(mut self, f: impl Fn(EditMode) -> bool + Send + Sync + 'static) -> Self {
        self.disabled = Some(Arc::new(f));
        self
    }

    /// Render table cells with `f` instead of the raw value.
    pub fn render(mut self, f: impl Fn(&Record) -> String + Send + Sync + 'static) -> Self {
        self.renderer = Some(Arc::new(f));
        self
    }

    /// Whether the field is shown in the drawer for `mode`. Defaults to true.
    pub fn is_visible(&self, mode: EditMode) -> bool {
        self.visible.as_ref().is_none_or(|f| f(mode))
    }

    /// Whether the field is read-only in the drawer for `mode`. Defaults to false.
    pub fn is_disabled(&self, mode: EditMode) -> bool {
        self.disabled.as_ref().is_some_and(|f| f(mode))
    }

    /// Text for this field's cell in `row`.
    pub fn render_cell(&self, field: &str, row: &Record) -> String {
        if let Some(renderer) = &self.renderer {
            return renderer(row);
        }
        match row.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        }
    }
}

impl fmt::Debug for ColumnDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ColumnDef")
            .field("label", &self.label)
            .field("component", &self.component)
            .field("search_default", &self.search_default)
            .field("add_default", &self.add_default)
            .field("rules", &self.rules.len())
            .field("custom_renderer", &self.renderer.is_some())
            .finish_non_exhaustive()
    }
}

/// The four ordered field lists.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fields {
    /// Search form.
    pub filter: Vec<String>,
    /// Create/edit form.
    pub editor: Vec<String>,
    /// Initially checked table columns.
    pub column: Vec<String>,
    /// Every selectable table column, in display order.
    pub expand: Vec<String>,
}

impl Fields {
    /// The list for `set`.
    pub fn get(&self, set: FieldSet) -> &[String] {
        match set {
            FieldSet::Filter => &self.filter,
            FieldSet::Editor => &self.editor,
            FieldSet::Column => &self.column,
            FieldSet::Expand => &self.expand,
        }
    }
}

/// Field definitions plus the lists that select them.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    /// Field lists.
    pub fields: Fields,
    definitions: HashMap<String, ColumnDef>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace a definition.
    pub fn define(mut self, name: impl Into<String>, def: ColumnDef) -> Self {
        self.definitions.insert(name.into(), def);
        self
    }

    /// Add the shared audit columns from [`common_columns`].
    pub fn with_common_columns(mut self) -> Self {
        self.definitions.extend(common_columns());
        self
    }

    /// Set the search form fields.
    pub fn filter<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.filter = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the edit form fields.
    pub fn editor<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.editor = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the initially checked table columns.
    pub fn column<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.column = names.into_iter().map(Into::into).collect();
        self
    }

    /// Set the selectable table columns.
    pub fn expand<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields.expand = names.into_iter().map(Into::into).collect();
        self
    }

    /// Look up a definition.
    pub fn get(&self, name: &str) -> Option<&ColumnDef> {
        self.definitions.get(name)
    }

    /// Number of definitions.
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    /// Whether there are no definitions.
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    /// Check that every listed field has a definition.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for set in [
            FieldSet::Filter,
            FieldSet::Editor,
            FieldSet::Column,
            FieldSet::Expand,
        ] {
            if let Some(field) = self
                .fields
                .get(set)
                .iter()
                .find(|name| !self.definitions.contains_key(name.as_str()))
            {
                return Err(ConfigError::UnknownField {
                    set,
                    field: field.clone(),
                });
            }
        }
        Ok(())
    }

    /// Initial values for a form of the given kind.
    ///
    /// Every field in the kind's list gets a key; fields without a default
    /// start as `null`.
    pub fn defaults_for(&self, kind: FormKind) -> Record {
        let names = match kind {
            FormKind::Search => &self.fields.filter,
            FormKind::Edit => &self.fields.editor,
        };
        names
            .iter()
            .map(|name| {
                let value = self
                    .get(name)
                    .and_then(|def| match kind {
                        FormKind::Search => def.search_default.clone(),
                        FormKind::Edit => def.add_default.clone(),
                    })
                    .unwrap_or(Value::Null);
                (name.clone(), value)
            })
            .collect()
    }
}

/// Audit column definitions shared by every table.
pub fn common_columns() -> Vec<(String, ColumnDef)> {
    vec![
        (
            "operatorName".to_string(),
            ColumnDef::new("Operator")
                .table_prop("width", 100)
                .table_prop("align", "center"),
        ),
        (
            DELETE_FLAG.to_string(),
            ColumnDef::new("Status")
                .component(ComponentKind::DeleteFlag)
                .search_default(DeleteFlag::Active)
                .table_prop("width", 70)
                .table_prop("align", "center")
                .render(|row| match DeleteFlag::of(row) {
                    Some(DeleteFlag::Active) => "Enabled".to_string(),
                    Some(DeleteFlag::Disabled) => "Disabled".to_string(),
                    None => String::new(),
                }),
        ),
        (
            "createTime".to_string(),
            ColumnDef::new("Created")
                .table_prop("width", 175)
                .table_prop("align", "center"),
        ),
        (
            "updateTime".to_string(),
            ColumnDef::new("Updated")
                .table_prop("width", 175)
                .table_prop("align", "center"),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn user_schema() -> Schema {
        Schema::new()
            .define("userName", ColumnDef::new("User name"))
            .define(
                "status",
                ColumnDef::new("Status")
                    .component(ComponentKind::Select)
                    .search_default(1)
                    .add_default(0),
            )
            .define(
                "password",
                ColumnDef::new("Password").visible_when(|mode| mode == EditMode::Create),
            )
            .with_common_columns()
            .filter(["userName", "status"])
            .editor(["userName", "status", "password"])
            .column(["userName"])
            .expand(["userName", "status", "deleteFlag"])
    }

    #[test]
    fn test_valid_schema() {
        assert_eq!(user_schema().validate(), Ok(()));
    }

    #[test]
    fn test_unknown_field_is_rejected() {
        let schema = user_schema().column(["userName", "nickName"]);
        assert_eq!(
            schema.validate(),
            Err(ConfigError::UnknownField {
                set: FieldSet::Column,
                field: "nickName".into()
            })
        );
    }

    #[test]
    fn test_defaults_for_each_form() {
        let schema = user_schema();
        assert_eq!(
            Value::Object(schema.defaults_for(FormKind::Search)),
            json!({"userName": null, "status": 1})
        );
        assert_eq!(
            Value::Object(schema.defaults_for(FormKind::Edit)),
            json!({"userName": null, "status": 0, "password": null})
        );
    }

    #[test]
    fn test_visibility_predicates() {
        let schema = user_schema();
        let password = schema.get("password").unwrap();
        assert!(password.is_visible(EditMode::Create));
        assert!(!password.is_visible(EditMode::Edit));
        assert!(!password.is_disabled(EditMode::Edit));
    }

    #[test]
    fn test_mode_props_override_common() {
        let def = ColumnDef::new("Name")
            .component_prop("clearable", true)
            .component_prop("placeholder", "Name")
            .component_prop_for(FormKind::Search, "placeholder", "Search by name");
        let search = def.component_props.resolve(FormKind::Search);
        assert_eq!(search["placeholder"], json!("Search by name"));
        assert_eq!(search["clearable"], json!(true));
        let edit = def.component_props.resolve(FormKind::Edit);
        assert_eq!(edit["placeholder"], json!("Name"));
    }

    #[test]
    fn test_common_columns() {
        let schema = Schema::new().with_common_columns();
        assert_eq!(schema.len(), 4);
        let flag = schema.get("deleteFlag").unwrap();
        assert_eq!(flag.search_default, Some(json!(0)));
        assert_eq!(flag.table_props["width"], json!(70));
        assert_eq!(schema.get("createTime").unwrap().table_props["width"], json!(175));

        let row = json!({"deleteFlag": 1}).as_object().cloned().unwrap();
        assert_eq!(flag.render_cell("deleteFlag", &row), "Disabled");
        let op = schema.get("operatorName").unwrap();
        assert_eq!(op.render_cell("operatorName", &row), "");
    }
}
