//! SSE framing for notifications.
//!
//! Each notification becomes one frame: `event:` carries the notification
//! name and `data:` its JSON payload.

use crate::notify::Notification;
use actix_web::web::Bytes;
use futures::Stream;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

/// Format one SSE frame for the wire
pub fn format_frame(event: &str, data: &str, id: Option<u64>) -> Bytes {
    let mut result = String::new();

    if let Some(id) = id {
        result.push_str(&format!("id: {}\n", id));
    }

    result.push_str(&format!("event: {}\n", event));
    // Multi-line payloads need one data field per line
    for line in data.split('\n') {
        result.push_str(&format!("data: {}\n", line));
    }
    result.push('\n');

    Bytes::from(result)
}

/// Format a notification, or `None` if its payload cannot be serialized
pub fn format_notification(notification: &Notification, id: Option<u64>) -> Option<Bytes> {
    match notification.payload_json() {
        Ok(data) => Some(format_frame(notification.name(), &data, id)),
        Err(e) => {
            tracing::error!(
                error = %e,
                event_type = notification.name(),
                "Failed to serialize SSE event payload"
            );
            None
        }
    }
}

/// Stream `initial` followed by everything received on `receiver`.
///
/// A slow client that falls behind skips the missed notifications and keeps
/// streaming; the stream ends when the hub is dropped.
pub fn notification_stream(
    initial: Vec<Notification>,
    mut receiver: broadcast::Receiver<Notification>,
) -> impl Stream<Item = Result<Bytes, actix_web::Error>> {
    async_stream::stream! {
        let mut next_id = 0u64;

        for notification in initial {
            if let Some(frame) = format_notification(&notification, Some(next_id)) {
                next_id += 1;
                yield Ok::<_, actix_web::Error>(frame);
            }
        }

        loop {
            match receiver.recv().await {
                Ok(notification) => {
                    tracing::trace!(event_type = notification.name(), "Sending SSE event to client");
                    if let Some(frame) = format_notification(&notification, Some(next_id)) {
                        next_id += 1;
                        yield Ok(frame);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "SSE client lagging, notifications dropped");
                }
                Err(RecvError::Closed) => {
                    tracing::debug!("Notification hub closed, ending SSE stream");
                    break;
                }
            }
        }
    }
}
