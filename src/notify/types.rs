//! Notification payloads pushed from the core to the presentation layer.

use crate::properties::PropertiesMap;
use crate::server::ServerStatus;
use serde::{Deserialize, Serialize};

/// Severity tag of a log line shown to the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    /// Regular output
    Info,
    /// Failure or stderr output
    Error,
    /// Completed operation (archive created)
    Success,
}

/// A single log line with its wall-clock time of day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    /// Message, trimmed of surrounding whitespace
    pub message: String,
    /// Severity tag
    #[serde(rename = "type")]
    pub kind: LogKind,
    /// Local time of day, `HH:MM:SS`
    pub timestamp: String,
}

impl LogLine {
    /// Creates a log line stamped with the current local time.
    pub fn new(message: impl AsRef<str>, kind: LogKind) -> Self {
        Self {
            message: message.as_ref().trim().to_string(),
            kind,
            timestamp: chrono::Local::now().format("%H:%M:%S").to_string(),
        }
    }

    pub fn info(message: impl AsRef<str>) -> Self {
        Self::new(message, LogKind::Info)
    }

    pub fn error(message: impl AsRef<str>) -> Self {
        Self::new(message, LogKind::Error)
    }

    pub fn success(message: impl AsRef<str>) -> Self {
        Self::new(message, LogKind::Success)
    }
}

/// Every event the core can push to the notification channel.
///
/// Serialized adjacently tagged so the wire form reads
/// `{"event": "server-status", "payload": {"status": "online"}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum Notification {
    /// A line of process output or a supervisor message
    ConsoleLog(LogLine),
    /// The supervisor's status changed
    ServerStatus {
        /// New status
        status: ServerStatus,
    },
    /// Number of connected players changed; the payload is the bare count
    PlayerCountUpdate(usize),
    /// Connected player list changed
    PlayerListUpdate {
        /// Sorted player names
        names: Vec<String>,
    },
    /// A message from the archive coordinator
    BackupLog(LogLine),
    /// The properties file was rewritten
    PropertiesUpdated {
        /// Properties as saved
        properties: PropertiesMap,
    },
}

impl Notification {
    /// Wire name of the event, also used as the SSE `event:` field.
    pub fn name(&self) -> &'static str {
        match self {
            Notification::ConsoleLog(_) => "console-log",
            Notification::ServerStatus { .. } => "server-status",
            Notification::PlayerCountUpdate(_) => "player-count-update",
            Notification::PlayerListUpdate { .. } => "player-list-update",
            Notification::BackupLog(_) => "backup-log",
            Notification::PropertiesUpdated { .. } => "properties-updated",
        }
    }

    /// Returns the log line carried by console and backup events.
    pub fn log_line(&self) -> Option<&LogLine> {
        match self {
            Notification::ConsoleLog(line) | Notification::BackupLog(line) => Some(line),
            _ => None,
        }
    }

    /// Serializes only the payload part, as sent in an SSE `data:` field.
    pub fn payload_json(&self) -> serde_json::Result<String> {
        match self {
            Notification::ConsoleLog(line) | Notification::BackupLog(line) => {
                serde_json::to_string(line)
            }
            Notification::ServerStatus { status } => {
                serde_json::to_string(&serde_json::json!({ "status": status }))
            }
            Notification::PlayerCountUpdate(count) => serde_json::to_string(count),
            Notification::PlayerListUpdate { names } => {
                serde_json::to_string(&serde_json::json!({ "names": names }))
            }
            Notification::PropertiesUpdated { properties } => serde_json::to_string(properties),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_line_is_trimmed() {
        let line = LogLine::info("  [12:00:00] [Server thread/INFO]: hello\n");
        assert_eq!(line.message, "[12:00:00] [Server thread/INFO]: hello");
        assert_eq!(line.kind, LogKind::Info);
        assert_eq!(line.timestamp.len(), 8);
    }

    #[test]
    fn test_notification_wire_format() {
        let n = Notification::ServerStatus {
            status: ServerStatus::Online,
        };
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["event"], "server-status");
        assert_eq!(json["payload"]["status"], "online");
        assert_eq!(n.payload_json().unwrap(), r#"{"status":"online"}"#);

        let n = Notification::ConsoleLog(LogLine::error("boom"));
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json["event"], "console-log");
        assert_eq!(json["payload"]["type"], "error");
        assert_eq!(json["payload"]["message"], "boom");

        let n = Notification::PlayerCountUpdate(3);
        let json = serde_json::to_value(&n).unwrap();
        assert_eq!(json, serde_json::json!({ "event": "player-count-update", "payload": 3 }));
        assert_eq!(n.payload_json().unwrap(), "3");
    }
}
