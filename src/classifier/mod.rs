//! Classification of server console output.
//!
//! [`LogClassifier::classify`] turns one complete line of process output into
//! a [`ClassifiedLine`]. It is pure and total: lines no matcher recognises
//! come back as generic info (stdout) or error (stderr) passthroughs, never
//! as failures. Line buffering happens before this point; the classifier is
//! never handed partial or multi-line chunks.
//!
//! The rules live in an ordered list of [`LineMatcher`]s so additional
//! server flavours can be supported without touching the supervisor.
//!
//! # Examples
//!
//! ```
//! use mineserve::classifier::{LogClassifier, LogEvent, OutputStream};
//!
//! let classifier = LogClassifier::default();
//! let line = classifier.classify("[12:00:00] [Server thread/INFO]: Alice joined the game", OutputStream::Stdout);
//! assert_eq!(line.event, LogEvent::Joined { player: "Alice".to_string() });
//! ```

mod matchers;

pub use matchers::{LineMatcher, PatternKind, PatternMatcher, ReadyMatcher, default_matchers};

use serde::{Deserialize, Serialize};

/// Which pipe a line arrived on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// Structured meaning of one output line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// A player connected
    Joined { player: String },
    /// A player disconnected
    Left { player: String },
    /// The server finished initialising
    Ready,
    /// Plain stdout line
    Info,
    /// Plain stderr line
    Error,
}

/// A line together with its classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedLine {
    /// The line as received, without its terminator
    pub text: String,
    /// Origin of the line
    pub stream: OutputStream,
    /// Classified event
    pub event: LogEvent,
}

/// Ordered list of matchers; the first match wins.
pub struct LogClassifier {
    matchers: Vec<Box<dyn LineMatcher>>,
}

impl LogClassifier {
    /// Creates a classifier from an explicit matcher list.
    pub fn new(matchers: Vec<Box<dyn LineMatcher>>) -> Self {
        Self { matchers }
    }

    /// Appends a matcher after the existing ones.
    pub fn with_matcher(mut self, matcher: impl LineMatcher + 'static) -> Self {
        self.matchers.push(Box::new(matcher));
        self
    }

    /// Names of the configured matchers in evaluation order.
    pub fn matcher_names(&self) -> Vec<&str> {
        self.matchers.iter().map(|m| m.name()).collect()
    }

    /// Classifies a single line.
    ///
    /// Stderr lines are never matched against the rules; the process only
    /// reports failures there.
    pub fn classify(&self, line: &str, stream: OutputStream) -> ClassifiedLine {
        let event = match stream {
            OutputStream::Stderr => LogEvent::Error,
            OutputStream::Stdout => self
                .matchers
                .iter()
                .find_map(|m| m.matches(line))
                .unwrap_or(LogEvent::Info),
        };
        ClassifiedLine {
            text: line.to_string(),
            stream,
            event,
        }
    }
}

impl Default for LogClassifier {
    fn default() -> Self {
        Self::new(default_matchers())
    }
}

impl std::fmt::Debug for LogClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogClassifier")
            .field("matchers", &self.matcher_names())
            .finish()
    }
}
