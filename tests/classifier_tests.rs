#![cfg(test)]

use mineserve::classifier::{
    LineMatcher, LogClassifier, LogEvent, OutputStream, PatternKind, PatternMatcher,
};

fn classify(line: &str) -> LogEvent {
    LogClassifier::default()
        .classify(line, OutputStream::Stdout)
        .event
}

fn joined(name: &str) -> LogEvent {
    LogEvent::Joined {
        player: name.to_string(),
    }
}

fn left(name: &str) -> LogEvent {
    LogEvent::Left {
        player: name.to_string(),
    }
}

#[test]
fn test_vanilla_lines() {
    assert_eq!(
        classify("[14:02:11] [Server thread/INFO]: Steve joined the game"),
        joined("Steve")
    );
    assert_eq!(
        classify("[14:05:40] [Server thread/INFO]: Steve left the game"),
        left("Steve")
    );
    assert_eq!(
        classify(r#"[14:01:58] [Server thread/INFO]: Done (12.345s)! For help, type "help""#),
        LogEvent::Ready
    );
    assert_eq!(
        classify("[14:01:50] [Server thread/INFO]: Preparing spawn area: 83%"),
        LogEvent::Info
    );
}

#[test]
fn test_bedrock_lines() {
    assert_eq!(
        classify("[2026-10-19 14:02:11:123 INFO] Player connected: Bedrock Guy, xuid: 2535400000000000"),
        joined("Bedrock Guy")
    );
    assert_eq!(
        classify("[2026-10-19 14:09:00:456 INFO] Player disconnected: Bedrock Guy, xuid: 2535400000000000"),
        left("Bedrock Guy")
    );
}

#[test]
fn test_chat_does_not_fake_a_join() {
    assert_eq!(
        classify("[14:03:00] [Server thread/INFO]: <Alex> Steve joined the game"),
        LogEvent::Info
    );
}

#[test]
fn test_stderr_is_always_error() {
    let classifier = LogClassifier::default();
    let line = classifier.classify(
        "[14:02:11] [Server thread/INFO]: Steve joined the game",
        OutputStream::Stderr,
    );
    assert_eq!(line.event, LogEvent::Error);
    assert_eq!(line.stream, OutputStream::Stderr);
}

#[test]
fn test_classification_keeps_text() {
    let line = LogClassifier::default().classify("  indented  ", OutputStream::Stdout);
    assert_eq!(line.text, "  indented  ");
    assert_eq!(line.event, LogEvent::Info);
}

struct ProxyReady;

impl LineMatcher for ProxyReady {
    fn name(&self) -> &str {
        "proxy-ready"
    }

    fn matches(&self, line: &str) -> Option<LogEvent> {
        line.contains("Listening on /").then_some(LogEvent::Ready)
    }
}

#[test]
fn test_custom_matchers_extend_the_defaults() {
    let classifier = LogClassifier::default().with_matcher(ProxyReady);
    assert_eq!(
        classifier.matcher_names(),
        vec!["join", "leave", "ready", "proxy-ready"]
    );
    assert_eq!(
        classifier
            .classify("[INFO]: Listening on /0.0.0.0:25577", OutputStream::Stdout)
            .event,
        LogEvent::Ready
    );
}

#[test]
fn test_first_matcher_wins() {
    let greedy = PatternMatcher::new("greedy", PatternKind::Leave, &[r"(\w+) joined"]).unwrap();
    let classifier = LogClassifier::new(vec![Box::new(greedy)]);
    assert_eq!(
        classifier
            .classify("Steve joined the game", OutputStream::Stdout)
            .event,
        left("Steve")
    );
    assert!(PatternMatcher::new("broken", PatternKind::Join, &["(unclosed"]).is_err());
}
