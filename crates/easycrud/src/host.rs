//! The seam between the engine and the UI that displays it.

use easycrud_core::logging::targets;
use easycrud_net::Notification;
use futures_util::FutureExt;
use futures_util::future::BoxFuture;

use crate::form::FormKind;

/// UI services the engine needs.
pub trait CrudHost: Send + Sync {
    /// Ask the user to confirm. Resolves to `true` on confirmation.
    fn confirm(&self, title: &str, message: &str) -> BoxFuture<'static, bool>;

    /// Show a notification.
    fn notify(&self, notification: Notification);

    /// Reset the widget state of a form (validation marks, touched flags).
    fn reset_form_widget(&self, kind: FormKind);
}

/// A host with no UI: confirms everything and drops notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullHost;

impl CrudHost for NullHost {
    fn confirm(&self, _title: &str, _message: &str) -> BoxFuture<'static, bool> {
        futures_util::future::ready(true).boxed()
    }

    fn notify(&self, notification: Notification) {
        tracing::trace!(
            target: targets::ACTIONS,
            message = %notification.message,
            "dropping notification"
        );
    }

    fn reset_form_widget(&self, _kind: FormKind) {}
}
