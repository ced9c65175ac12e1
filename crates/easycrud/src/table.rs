//! Table store: rows, pagination, loading state and column selection.

use easycrud_core::logging::targets;
use easycrud_net::PageInfo;
use serde_json::Value;

use crate::config::PaginationConfig;
use crate::row::{CrudRow, Record};
use crate::schema::Fields;

/// Whether a query is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    /// No query in flight.
    #[default]
    Idle,
    /// A query is in flight.
    Loading,
}

/// Current page position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// 1-based page, or 0 after a response without page info.
    pub current_page: u64,
    /// Rows per page.
    pub page_size: u64,
    /// Total rows reported by the backend.
    pub total: u64,
    /// Selectable page sizes.
    pub page_sizes: Vec<u64>,
    /// Pager layout.
    pub layout: String,
}

impl Pagination {
    fn new(config: &PaginationConfig) -> Self {
        Self {
            current_page: config.current,
            page_size: config.page_size,
            total: 0,
            page_sizes: config.page_sizes.clone(),
            layout: config.layout.clone(),
        }
    }
}

/// Rows shown in the table and the state around them.
#[derive(Debug, Clone)]
pub struct TableStore<T> {
    rows: Vec<T>,
    load_state: LoadState,
    pagination: Pagination,
    expand: Vec<String>,
    checked_columns: Vec<String>,
}

impl<T: CrudRow> TableStore<T> {
    /// An empty table using the pagination defaults and the schema's
    /// initially checked columns.
    pub fn new(fields: &Fields, pagination: &PaginationConfig) -> Self {
        Self {
            rows: Vec::new(),
            load_state: LoadState::Idle,
            pagination: Pagination::new(pagination),
            expand: fields.expand.clone(),
            checked_columns: fields
                .column
                .iter()
                .filter(|name| fields.expand.contains(name))
                .cloned()
                .collect(),
        }
    }

    /// Current rows.
    pub fn rows(&self) -> &[T] {
        &self.rows
    }

    /// Loading state.
    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    /// Whether a query is outstanding.
    pub fn is_loading(&self) -> bool {
        self.load_state == LoadState::Loading
    }

    /// Page position.
    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// Columns the user has checked.
    pub fn checked_columns(&self) -> &[String] {
        &self.checked_columns
    }

    /// Checked columns in display order.
    pub fn table_columns(&self) -> Vec<String> {
        self.expand
            .iter()
            .filter(|name| self.checked_columns.contains(name))
            .cloned()
            .collect()
    }

    /// Replace the checked columns. Names outside the selectable set are
    /// ignored.
    pub fn set_checked_columns<I, S>(&mut self, names: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.checked_columns = names
            .into_iter()
            .map(Into::into)
            .filter(|name| {
                let known = self.expand.contains(name);
                if !known {
                    tracing::warn!(target: targets::TABLE, column = %name, "ignoring unknown column");
                }
                known
            })
            .collect();
    }

    pub(crate) fn set_load_state(&mut self, state: LoadState) {
        self.load_state = state;
    }

    pub(crate) fn set_current_page(&mut self, page: u64) {
        self.pagination.current_page = page;
    }

    pub(crate) fn set_page_size(&mut self, size: u64) {
        self.pagination.page_size = size;
    }

    /// Install a query result. Without page info the total and current
    /// page fall to 0.
    pub(crate) fn replace_rows(&mut self, rows: Vec<T>, page: Option<&PageInfo>) {
        self.rows = rows;
        self.pagination.total = page.map_or(0, |p| p.total);
        self.pagination.current_page = page.map_or(0, |p| p.page_num);
        self.load_state = LoadState::Idle;
        tracing::debug!(
            target: targets::TABLE,
            rows = self.rows.len(),
            total = self.pagination.total,
            page = self.pagination.current_page,
            "table rows replaced"
        );
    }

    /// Merge `patch` into the first row whose `keys` all equal the patch's.
    ///
    /// Returns `false` when no row matches.
    pub(crate) fn patch_row(&mut self, keys: &[String], patch: &Record) -> serde_json::Result<bool> {
        for row in &mut self.rows {
            let mut record = row.to_record()?;
            let matches = keys.iter().all(|key| {
                let value = patch.get(key).unwrap_or(&Value::Null);
                !value.is_null() && record.get(key) == Some(value)
            });
            if matches {
                record.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
                *row = T::from_record(record)?;
                return Ok(true);
            }
        }
        tracing::warn!(target: targets::TABLE, ?keys, "no row matches the patch");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn table() -> TableStore<Value> {
        let fields = Fields {
            column: vec!["userName".into(), "phone".into()],
            expand: vec!["id".into(), "userName".into(), "phone".into(), "email".into()],
            ..Fields::default()
        };
        let pagination = PaginationConfig {
            current: 1,
            page_size: 10,
            page_sizes: vec![10, 20],
            layout: "total".into(),
        };
        TableStore::new(&fields, &pagination)
    }

    fn record(value: Value) -> Record {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_column_selection_keeps_display_order() {
        let mut table = table();
        assert_eq!(table.table_columns(), vec!["userName", "phone"]);
        table.set_checked_columns(["email", "nope", "id"]);
        assert_eq!(table.checked_columns(), &["email".to_string(), "id".to_string()]);
        assert_eq!(table.table_columns(), vec!["id", "email"]);
    }

    #[test]
    fn test_replace_rows_without_page_info() {
        let mut table = table();
        table.set_load_state(LoadState::Loading);
        table.replace_rows(vec![json!({"id": 1})], None);
        assert_eq!(table.pagination().total, 0);
        assert_eq!(table.pagination().current_page, 0);
        assert_eq!(table.load_state(), LoadState::Idle);
    }

    #[test]
    fn test_replace_rows_with_page_info() {
        let mut table = table();
        let page = PageInfo {
            page_num: 3,
            page_size: 10,
            pages: 5,
            total: 42,
        };
        table.replace_rows(vec![json!({"id": 1}), json!({"id": 2})], Some(&page));
        assert_eq!(table.rows().len(), 2);
        assert_eq!(table.pagination().total, 42);
        assert_eq!(table.pagination().current_page, 3);
    }

    #[test]
    fn test_patch_row_in_place() {
        let mut table = table();
        table.replace_rows(
            vec![json!({"id": 1, "userName": "a"}), json!({"id": 2, "userName": "b"})],
            None,
        );
        let patched = table
            .patch_row(&["id".into()], &record(json!({"id": 2, "userName": "bee"})))
            .unwrap();
        assert!(patched);
        assert_eq!(table.rows()[1], json!({"id": 2, "userName": "bee"}));
        assert_eq!(table.rows()[0], json!({"id": 1, "userName": "a"}));

        let missing = table
            .patch_row(&["id".into()], &record(json!({"id": 9})))
            .unwrap();
        assert!(!missing);
    }
}
