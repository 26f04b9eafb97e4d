//! The kanthu offline worker.
//!
//! One [`WorkerContext`] exists per worker generation. Every host event is a
//! named async function taking that context:
//!
//! - [`lifecycle::install`] / [`lifecycle::activate`]
//! - [`interceptor::handle_fetch`]
//! - [`sync::replay`] and [`sync::queue_submission`]
//! - [`notify::push`] / [`notify::notification_click`]
//!
//! Handlers return their result instead of responding through a side
//! channel; the host adapter forwards it to the platform event.

pub mod context;
pub mod interceptor;
pub mod lifecycle;
pub mod notify;
pub mod sync;

#[cfg(test)]
pub(crate) mod testing;

pub use context::{WorkerContext, WorkerState};
pub use interceptor::{FetchOutcome, ResponseSource};
pub use lifecycle::{ActivationReport, InstallReport};
pub use notify::{ClickOutcome, NotificationAction, NotificationIntent};
pub use sync::{SyncOutcome, SyncTag};
