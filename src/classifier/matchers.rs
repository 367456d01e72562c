use super::LogEvent;
use regex_lite::Regex;

/// One output-format rule.
///
/// Matchers are evaluated in order by [`super::LogClassifier`]; the first one
/// returning `Some` decides the event for a line.
pub trait LineMatcher: Send + Sync {
    /// Short identifier used in diagnostics
    fn name(&self) -> &str;

    /// Returns the event for `line`, or `None` to let the next matcher try.
    fn matches(&self, line: &str) -> Option<LogEvent>;
}

/// Which membership change a [`PatternMatcher`] reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatternKind {
    Join,
    Leave,
}

/// Regex-based membership matcher; capture group 1 is the player name.
pub struct PatternMatcher {
    name: String,
    kind: PatternKind,
    patterns: Vec<Regex>,
}

impl PatternMatcher {
    /// Compiles `patterns`; each must have a capture group for the player name.
    pub fn new(
        name: impl Into<String>,
        kind: PatternKind,
        patterns: &[&str],
    ) -> Result<Self, regex_lite::Error> {
        let patterns = patterns
            .iter()
            .map(|p| Regex::new(p))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            name: name.into(),
            kind,
            patterns,
        })
    }
}

impl LineMatcher for PatternMatcher {
    fn name(&self) -> &str {
        &self.name
    }

    fn matches(&self, line: &str) -> Option<LogEvent> {
        let player = self.patterns.iter().find_map(|re| {
            re.captures(line)
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
        })?;
        if player.is_empty() {
            return None;
        }
        Some(match self.kind {
            PatternKind::Join => LogEvent::Joined { player },
            PatternKind::Leave => LogEvent::Left { player },
        })
    }
}

/// Readiness signal: a line holding both `Done` and `!`.
///
/// Java editions print `Done (3.512s)! For help, type "help"` once the world
/// is loaded and the socket is accepting connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct ReadyMatcher;

impl LineMatcher for ReadyMatcher {
    fn name(&self) -> &str {
        "ready"
    }

    fn matches(&self, line: &str) -> Option<LogEvent> {
        (line.contains("Done") && line.contains('!')).then_some(LogEvent::Ready)
    }
}

// Names are anchored after the `]: ` log prefix so chat lines such as
// `<Bob> Alice joined the game` never count.
const JOIN_PATTERNS: &[&str] = &[
    r"(?:^|\]:\s*)(\w{1,16}) (?:\(formerly known as \w{1,16}\) )?joined the game",
    r"(?:^|\]:\s*)(\w{1,16})\[/[^\]]*\] logged in with entity id",
    r"UUID of player (\w{1,16}) is ",
    r"Player connected: ([^,]+), xuid",
];

const LEAVE_PATTERNS: &[&str] = &[
    r"(?:^|\]:\s*)(\w{1,16}) left the game",
    r"(?:^|\]:\s*)(\w{1,16}) lost connection:",
    r"Player disconnected: ([^,]+), xuid",
];

/// Matchers for vanilla, Paper/Spigot, Fabric and Bedrock dedicated servers,
/// in evaluation order.
pub fn default_matchers() -> Vec<Box<dyn LineMatcher>> {
    let mut matchers: Vec<Box<dyn LineMatcher>> = Vec::with_capacity(3);
    match PatternMatcher::new("join", PatternKind::Join, JOIN_PATTERNS) {
        Ok(m) => matchers.push(Box::new(m)),
        Err(e) => tracing::error!(error = %e, "Built-in join patterns failed to compile"),
    }
    match PatternMatcher::new("leave", PatternKind::Leave, LEAVE_PATTERNS) {
        Ok(m) => matchers.push(Box::new(m)),
        Err(e) => tracing::error!(error = %e, "Built-in leave patterns failed to compile"),
    }
    matchers.push(Box::new(ReadyMatcher));
    matchers
}
