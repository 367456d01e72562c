use crate::classifier::{ClassifiedLine, LogEvent};
use crate::notify::{LogLine, Notification};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Status of the managed server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerStatus {
    /// No process is running
    #[default]
    Offline,
    /// Process spawned, world still loading
    Starting,
    /// Readiness line seen
    Online,
    /// Stop command written, waiting for exit
    Stopping,
}

impl ServerStatus {
    /// Whether moving from `self` to `next` is an allowed edge.
    pub fn can_transition_to(self, next: ServerStatus) -> bool {
        use ServerStatus::*;
        matches!(
            (self, next),
            (Offline, Starting)
                | (Starting, Online)
                | (Starting, Stopping)
                | (Online, Stopping)
                | (Starting, Offline)
                | (Online, Offline)
                | (Stopping, Offline)
        )
    }

    /// Wire name of the status.
    pub fn as_str(self) -> &'static str {
        match self {
            ServerStatus::Offline => "offline",
            ServerStatus::Starting => "starting",
            ServerStatus::Online => "online",
            ServerStatus::Stopping => "stopping",
        }
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Names of the currently connected players, kept sorted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerSet {
    names: BTreeSet<String>,
}

impl PlayerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a player; returns `false` if already present.
    pub fn insert(&mut self, name: impl Into<String>) -> bool {
        self.names.insert(name.into())
    }

    /// Removes a player; returns `false` if absent.
    pub fn remove(&mut self, name: &str) -> bool {
        self.names.remove(name)
    }

    /// Empties the set; returns `false` if it was already empty.
    pub fn clear(&mut self) -> bool {
        let changed = !self.names.is_empty();
        self.names.clear();
        changed
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Sorted player names.
    pub fn names(&self) -> Vec<String> {
        self.names.iter().cloned().collect()
    }
}

/// Status and membership of one supervisor, with no I/O attached.
///
/// Every mutator returns the notifications it produced, in the order they
/// must be delivered. The supervisor forwards them while still holding its
/// lock, so observers see the same order the state changed in.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    status: ServerStatus,
    players: PlayerSet,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> ServerStatus {
        self.status
    }

    pub fn players(&self) -> &PlayerSet {
        &self.players
    }

    /// A process was spawned successfully.
    pub fn begin_start(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        if self.players.clear() {
            self.push_players(&mut out);
        }
        self.transition(ServerStatus::Starting, &mut out);
        out
    }

    /// The stop command was delivered to the process.
    pub fn begin_stop(&mut self) -> Vec<Notification> {
        let mut out = Vec::new();
        self.transition(ServerStatus::Stopping, &mut out);
        out
    }

    /// Applies one classified output line.
    ///
    /// The line itself is always echoed as a console log (blank lines are
    /// dropped). Membership events only notify when they change the set,
    /// and readiness only counts while starting.
    pub fn apply(&mut self, line: &ClassifiedLine) -> Vec<Notification> {
        let mut out = Vec::new();
        if !line.text.trim().is_empty() {
            let log = match line.event {
                LogEvent::Error => LogLine::error(&line.text),
                _ => LogLine::info(&line.text),
            };
            out.push(Notification::ConsoleLog(log));
        }

        match &line.event {
            LogEvent::Joined { player } => {
                if self.players.insert(player.clone()) {
                    self.push_players(&mut out);
                }
            }
            LogEvent::Left { player } => {
                if self.players.remove(player) {
                    self.push_players(&mut out);
                }
            }
            LogEvent::Ready => {
                if self.status == ServerStatus::Starting {
                    self.transition(ServerStatus::Online, &mut out);
                }
            }
            LogEvent::Info | LogEvent::Error => {}
        }
        out
    }

    /// The process exited with `code` (`None` when killed by a signal).
    pub fn finish(&mut self, code: Option<i32>) -> Vec<Notification> {
        let message = match code {
            Some(code) => format!("Server stopped with code {}", code),
            None => "Server stopped by signal".to_string(),
        };
        let mut out = vec![Notification::ConsoleLog(LogLine::info(message))];
        if self.players.clear() {
            self.push_players(&mut out);
        }
        self.transition(ServerStatus::Offline, &mut out);
        out
    }

    fn transition(&mut self, next: ServerStatus, out: &mut Vec<Notification>) {
        if self.status == next {
            return;
        }
        if !self.status.can_transition_to(next) {
            tracing::warn!(from = %self.status, to = %next, "Ignoring invalid status transition");
            return;
        }
        tracing::debug!(from = %self.status, to = %next, "Server status changed");
        self.status = next;
        out.push(Notification::ServerStatus { status: next });
    }

    fn push_players(&self, out: &mut Vec<Notification>) {
        out.push(Notification::PlayerCountUpdate(self.players.len()));
        out.push(Notification::PlayerListUpdate {
            names: self.players.names(),
        });
    }
}
