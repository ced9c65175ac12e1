//! Lifecycle hooks.
//!
//! Every action runs its named hooks at fixed points. A hook receives the
//! payload for that point and either passes it on with
//! [`HookOutcome::Continue`] (possibly modified) or stops the action with
//! [`HookOutcome::Abort`]. Unregistered hooks pass the payload through
//! unchanged.
//!
//! Hooks run synchronously while the engine holds its form lock, so they must
//! not call back into the [`Crud`](crate::Crud) that dispatched them.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use easycrud_core::logging::targets;

use crate::form::FormStore;
use crate::validate::InvalidFields;

/// The hook points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookName {
    /// Before the query request; the form store's buffer holds the payload.
    BeforeQuery,
    /// After the query response; receives the rows.
    AfterQuery,
    /// Before the create drawer opens.
    BeforeAdd,
    /// Before the edit drawer opens, after the edit form was filled.
    BeforeEdit,
    /// Before the delete confirmation; the buffer holds the payload.
    BeforeRemove,
    /// After a successful delete.
    AfterRemove,
    /// After validation passed, before branching on the drawer mode.
    BeforeSubmit,
    /// After validation failed.
    SubmitValidateErr,
    /// Before the create request; the buffer holds the payload.
    BeforeSubmitAdd,
    /// After a successful create.
    AfterSubmitAdd,
    /// Before the update request; the buffer holds the payload.
    BeforeSubmitEdit,
    /// After a successful update.
    AfterSubmitEdit,
}

impl HookName {
    /// Every hook point.
    pub const ALL: [HookName; 12] = [
        Self::BeforeQuery,
        Self::AfterQuery,
        Self::BeforeAdd,
        Self::BeforeEdit,
        Self::BeforeRemove,
        Self::AfterRemove,
        Self::BeforeSubmit,
        Self::SubmitValidateErr,
        Self::BeforeSubmitAdd,
        Self::AfterSubmitAdd,
        Self::BeforeSubmitEdit,
        Self::AfterSubmitEdit,
    ];

    /// Configuration key of the hook.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeQuery => "beforeQuery",
            Self::AfterQuery => "afterQuery",
            Self::BeforeAdd => "beforeAdd",
            Self::BeforeEdit => "beforeEdit",
            Self::BeforeRemove => "beforeRemove",
            Self::AfterRemove => "afterRemove",
            Self::BeforeSubmit => "beforeSubmit",
            Self::SubmitValidateErr => "submitValidateErr",
            Self::BeforeSubmitAdd => "beforeSubmitAdd",
            Self::AfterSubmitAdd => "afterSubmitAdd",
            Self::BeforeSubmitEdit => "beforeSubmitEdit",
            Self::AfterSubmitEdit => "afterSubmitEdit",
        }
    }
}

impl fmt::Display for HookName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of a hook.
#[derive(Debug, Clone, PartialEq)]
pub enum HookOutcome<P> {
    /// Carry on with this payload.
    Continue(P),
    /// Stop the action.
    Abort,
}

impl<P> HookOutcome<P> {
    /// Whether the action may proceed.
    pub fn is_continue(&self) -> bool {
        matches!(self, Self::Continue(_))
    }

    /// Whether the action was stopped.
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Abort)
    }

    /// The payload, if the action may proceed.
    pub fn into_continue(self) -> Option<P> {
        match self {
            Self::Continue(payload) => Some(payload),
            Self::Abort => None,
        }
    }

    /// Map the payload.
    pub fn map<Q>(self, f: impl FnOnce(P) -> Q) -> HookOutcome<Q> {
        match self {
            Self::Continue(payload) => HookOutcome::Continue(f(payload)),
            Self::Abort => HookOutcome::Abort,
        }
    }
}

impl From<bool> for HookOutcome<()> {
    fn from(proceed: bool) -> Self {
        if proceed { Self::Continue(()) } else { Self::Abort }
    }
}

/// What a hook receives.
pub enum HookPayload<'a, T> {
    /// The form store, for every hook except `afterQuery` and
    /// `submitValidateErr`.
    Form(&'a mut FormStore<T>),
    /// Rows from a query response.
    Rows(Vec<T>),
    /// Failed rules plus the form store.
    ValidationFailed {
        /// Failed rules by field.
        invalid_fields: &'a InvalidFields,
        /// The form store.
        form: &'a mut FormStore<T>,
    },
}

impl<T> fmt::Debug for HookPayload<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Form(_) => f.write_str("Form"),
            Self::Rows(rows) => f.debug_tuple("Rows").field(&rows.len()).finish(),
            Self::ValidationFailed { invalid_fields, .. } => f
                .debug_struct("ValidationFailed")
                .field("invalid_fields", &invalid_fields.len())
                .finish(),
        }
    }
}

type HookFn<T> =
    Arc<dyn for<'a> Fn(HookPayload<'a, T>) -> HookOutcome<HookPayload<'a, T>> + Send + Sync>;

/// Registered hooks, at most one per [`HookName`].
pub struct Hooks<T> {
    handlers: HashMap<HookName, HookFn<T>>,
}

impl<T> Default for Hooks<T> {
    fn default() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }
}

impl<T> Clone for Hooks<T> {
    fn clone(&self) -> Self {
        Self {
            handlers: self.handlers.clone(),
        }
    }
}

impl<T: 'static> Hooks<T> {
    /// No hooks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw hook, replacing any previous one for `name`.
    pub fn register<F>(mut self, name: HookName, hook: F) -> Self
    where
        F: for<'a> Fn(HookPayload<'a, T>) -> HookOutcome<HookPayload<'a, T>> + Send + Sync + 'static,
    {
        self.handlers.insert(name, Arc::new(hook));
        self
    }

    /// Register a hook that inspects or edits the form store.
    ///
    /// Return `true` to proceed.
    pub fn on_form<F>(self, name: HookName, hook: F) -> Self
    where
        F: Fn(&mut FormStore<T>) -> bool + Send + Sync + 'static,
    {
        self.register(name, move |payload| match payload {
            HookPayload::Form(form) => {
                if hook(&mut *form) {
                    HookOutcome::Continue(HookPayload::Form(form))
                } else {
                    HookOutcome::Abort
                }
            }
            other => HookOutcome::Continue(other),
        })
    }

    /// Register the `afterQuery` hook. Return `None` to discard the rows.
    pub fn after_query<F>(self, hook: F) -> Self
    where
        F: Fn(Vec<T>) -> Option<Vec<T>> + Send + Sync + 'static,
    {
        self.register(HookName::AfterQuery, move |payload| match payload {
            HookPayload::Rows(rows) => match hook(rows) {
                Some(rows) => HookOutcome::Continue(HookPayload::Rows(rows)),
                None => HookOutcome::Abort,
            },
            other => HookOutcome::Continue(other),
        })
    }

    /// Register the `submitValidateErr` hook. Return `false` to suppress the
    /// default warning.
    pub fn submit_validate_err<F>(self, hook: F) -> Self
    where
        F: Fn(&InvalidFields, &mut FormStore<T>) -> bool + Send + Sync + 'static,
    {
        self.register(HookName::SubmitValidateErr, move |payload| match payload {
            HookPayload::ValidationFailed {
                invalid_fields,
                form,
            } => {
                if hook(invalid_fields, &mut *form) {
                    HookOutcome::Continue(HookPayload::ValidationFailed {
                        invalid_fields,
                        form,
                    })
                } else {
                    HookOutcome::Abort
                }
            }
            other => HookOutcome::Continue(other),
        })
    }

    /// Whether a hook is registered for `name`.
    pub fn contains(&self, name: HookName) -> bool {
        self.handlers.contains_key(&name)
    }

    /// Number of registered hooks.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Whether no hooks are registered.
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Run the hook for `name`. Without one, the payload passes through.
    pub fn dispatch<'a>(
        &self,
        name: HookName,
        payload: HookPayload<'a, T>,
    ) -> HookOutcome<HookPayload<'a, T>> {
        let Some(hook) = self.handlers.get(&name) else {
            return HookOutcome::Continue(payload);
        };
        let outcome = hook(payload);
        if outcome.is_abort() {
            tracing::debug!(target: targets::HOOKS, hook = %name, "hook aborted action");
        } else {
            tracing::trace!(target: targets::HOOKS, hook = %name, "hook passed");
        }
        outcome
    }

    /// Dispatch a form-store hook and report whether to proceed.
    pub fn proceed(&self, name: HookName, form: &mut FormStore<T>) -> bool {
        self.dispatch(name, HookPayload::Form(form)).is_continue()
    }
}

impl<T> fmt::Debug for Hooks<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.handlers.keys().map(|name| name.as_str()).collect();
        names.sort_unstable();
        f.debug_struct("Hooks").field("registered", &names).finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::{Value, json};

    use super::*;
    use crate::schema::{ColumnDef, Schema};

    fn store() -> FormStore<Value> {
        let schema = Schema::new()
            .define("userName", ColumnDef::new("User name"))
            .filter(["userName"])
            .editor(["userName"]);
        FormStore::new(&schema, false)
    }

    #[test]
    fn test_unregistered_hook_is_identity() {
        let hooks = Hooks::<Value>::new();
        for name in HookName::ALL {
            let rows = vec![json!({"id": 1})];
            match hooks.dispatch(name, HookPayload::Rows(rows.clone())) {
                HookOutcome::Continue(HookPayload::Rows(out)) => assert_eq!(out, rows),
                other => panic!("{name} changed the payload: {other:?}"),
            }
        }
        let mut form = store();
        assert!(hooks.proceed(HookName::BeforeQuery, &mut form));
    }

    #[test]
    fn test_form_hook_can_edit_and_abort() {
        let hooks = Hooks::<Value>::new()
            .on_form(HookName::BeforeQuery, |form| {
                form.form_data_mut().insert("tenant".into(), json!(7));
                true
            })
            .on_form(HookName::BeforeAdd, |_| false);
        let mut form = store();

        assert!(hooks.proceed(HookName::BeforeQuery, &mut form));
        assert_eq!(form.form_data()["tenant"], json!(7));
        assert!(!hooks.proceed(HookName::BeforeAdd, &mut form));
        assert_eq!(hooks.len(), 2);
    }

    #[test]
    fn test_after_query_can_filter_rows() {
        let hooks = Hooks::<Value>::new().after_query(|rows| {
            Some(rows.into_iter().filter(|r| r["id"] != json!(2)).collect())
        });
        let rows = vec![json!({"id": 1}), json!({"id": 2})];
        let kept = hooks
            .dispatch(HookName::AfterQuery, HookPayload::Rows(rows))
            .into_continue();
        assert!(matches!(kept, Some(HookPayload::Rows(ref r)) if r.len() == 1));
    }

    #[test]
    fn test_bool_into_outcome() {
        assert!(HookOutcome::from(true).is_continue());
        assert!(HookOutcome::from(false).is_abort());
        assert_eq!(HookOutcome::Continue(2).map(|n| n * 2), HookOutcome::Continue(4));
    }
}
