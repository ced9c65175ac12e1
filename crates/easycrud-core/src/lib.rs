//! Core primitives for EasyCrud.
//!
//! This crate provides the observer and logging building blocks shared by the
//! HTTP client and the CRUD engine:
//!
//! - [`Signal`]: type-safe signal/slot notifications
//! - [`Property`]: values with change detection
//! - [`logging`]: tracing targets and subscriber setup

pub mod logging;
mod property;
mod signal;

pub use property::Property;
pub use signal::{ConnectionId, Signal};
