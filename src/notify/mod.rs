//! Notification channel between the core and whatever presents it.
//!
//! The supervisor and the archive coordinator push [`Notification`]s into a
//! [`NotificationSink`] handed to them at construction. Pushes are
//! fire-and-forget: a sink never reports back and never blocks the caller
//! for long.
//!
//! # Examples
//!
//! ```
//! use mineserve::notify::{EventHub, LogLine, Notification, NotificationSink};
//!
//! let hub = EventHub::new(16);
//! let mut rx = hub.subscribe();
//! hub.notify(Notification::ConsoleLog(LogLine::info("Starting server...")));
//! assert_eq!(rx.try_recv().unwrap().name(), "console-log");
//! ```

mod hub;
mod types;

pub use hub::{DEFAULT_HISTORY_LIMIT, EventHub};
pub use types::{LogKind, LogLine, Notification};

use std::sync::Arc;

/// Receiver of core notifications.
pub trait NotificationSink: Send + Sync {
    /// Push one notification. Must not block for long.
    fn notify(&self, notification: Notification);
}

impl<T: NotificationSink + ?Sized> NotificationSink for Arc<T> {
    fn notify(&self, notification: Notification) {
        (**self).notify(notification)
    }
}

/// Sink that logs notifications through `tracing` and drops them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, notification: Notification) {
        match notification.log_line() {
            Some(line) => tracing::info!(event = notification.name(), "{}", line.message),
            None => tracing::debug!(event = notification.name(), ?notification),
        }
    }
}
