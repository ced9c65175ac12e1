//! Logging facilities for EasyCrud.
//!
//! EasyCrud uses the `tracing` crate for instrumentation. Every log call names
//! an explicit target from [`targets`], so subsystems can be filtered with the
//! usual `RUST_LOG` directives:
//!
//! ```text
//! RUST_LOG=easycrud::actions=debug,easycrud_net::http=warn
//! ```
//!
//! Applications install their own subscriber. [`init_tracing`] is a
//! convenience for binaries and tests that just want formatted output.

use tracing_subscriber::EnvFilter;

/// Target names for log filtering.
pub mod targets {
    /// Signal/slot system target.
    pub const SIGNAL: &str = "easycrud_core::signal";
    /// Configuration resolution target.
    pub const CONFIG: &str = "easycrud::config";
    /// Hook dispatch target.
    pub const HOOKS: &str = "easycrud::hooks";
    /// Search/edit form stores target.
    pub const FORM: &str = "easycrud::form";
    /// Table store target.
    pub const TABLE: &str = "easycrud::table";
    /// Action handler (query/add/edit/remove/submit) target.
    pub const ACTIONS: &str = "easycrud::actions";
    /// HTTP client target.
    pub const HTTP: &str = "easycrud_net::http";
    /// File download target.
    pub const DOWNLOAD: &str = "easycrud_net::download";
    /// Session/token target.
    pub const SESSION: &str = "easycrud_net::session";
}

/// Install a formatted `tracing` subscriber filtered by `RUST_LOG`.
///
/// Falls back to `info` when `RUST_LOG` is unset or invalid. Calling this more
/// than once is harmless; later calls leave the first subscriber in place.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!(target: targets::CONFIG, "subscriber installed");
    }
}
