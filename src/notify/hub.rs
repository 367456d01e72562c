//! Broadcast sink backing the gateway's event stream.
//!
//! Notifications are fanned out to every subscriber through a Tokio
//! broadcast channel. Console and backup lines are additionally kept in a
//! bounded history so a client that connects late can render what it missed.

use super::types::Notification;
use super::NotificationSink;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// Default number of log lines kept for late subscribers.
pub const DEFAULT_HISTORY_LIMIT: usize = 1000;

/// Fans notifications out to all connected clients.
pub struct EventHub {
    /// Broadcast channel for sending events to all subscribers
    sender: broadcast::Sender<Notification>,
    /// Most recent console and backup lines, oldest first
    history: Mutex<VecDeque<Notification>>,
    /// Maximum number of entries in `history`
    history_limit: usize,
}

impl EventHub {
    /// Create a new hub with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        Self::with_history(capacity, DEFAULT_HISTORY_LIMIT)
    }

    /// Create a new hub keeping at most `history_limit` log lines
    pub fn with_history(capacity: usize, history_limit: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            history: Mutex::new(VecDeque::with_capacity(history_limit.min(1024))),
            history_limit,
        }
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Returns the most recent log notifications, oldest first.
    ///
    /// `limit` caps the number of entries returned, counting from the newest.
    pub fn recent(&self, limit: Option<usize>) -> Vec<Notification> {
        let history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        let skip = limit.map_or(0, |limit| history.len().saturating_sub(limit));
        history.iter().skip(skip).cloned().collect()
    }

    fn remember(&self, notification: &Notification) {
        if self.history_limit == 0 || notification.log_line().is_none() {
            return;
        }
        let mut history = match self.history.lock() {
            Ok(history) => history,
            Err(poisoned) => poisoned.into_inner(),
        };
        history.push_back(notification.clone());
        while history.len() > self.history_limit {
            history.pop_front();
        }
    }
}

impl Default for EventHub {
    fn default() -> Self {
        Self::new(256)
    }
}

impl NotificationSink for EventHub {
    fn notify(&self, notification: Notification) {
        self.remember(&notification);
        let event_type = notification.name();
        match self.sender.send(notification) {
            Ok(receivers) => {
                tracing::trace!(event_type, receivers, "Notification broadcast");
            }
            Err(_) => {
                tracing::trace!(event_type, "Notification created but no subscribers connected");
            }
        }
    }
}
