//! Property store for the server's line-oriented `key=value` file.
//!
//! Parsing is lenient: blank lines, comment lines (`#` or `!`) and lines
//! without an `=` are skipped, never reported. Keys are trimmed; everything
//! after the first `=` is the value, further `=` characters included.
//!
//! Writing always regenerates the comment header, so comments present in the
//! original file are not preserved.
//!
//! # Examples
//!
//! ```
//! use mineserve::properties;
//!
//! let map = properties::parse("#comment\nmotd=a=b\n\npvp=true\n");
//! assert_eq!(map.get("motd"), Some("a=b"));
//! assert_eq!(map.get("pvp"), Some("true"));
//! ```

mod map;

pub use map::PropertiesMap;

use crate::error::{Error, Result};
use std::path::Path;

/// First line of every written file.
pub const HEADER_TITLE: &str = "Minecraft server properties";

/// Parses file content into an ordered map.
pub fn parse(content: &str) -> PropertiesMap {
    let mut map = PropertiesMap::new();
    for line in content.lines() {
        parse_line(&mut map, line);
    }
    map
}

/// Parses raw file content. Lines that are not valid UTF-8 are skipped
/// like any other malformed line.
pub fn parse_bytes(content: &[u8]) -> PropertiesMap {
    let mut map = PropertiesMap::new();
    for (number, line) in content.split(|b| *b == b'\n').enumerate() {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        match std::str::from_utf8(line) {
            Ok(line) => parse_line(&mut map, line),
            Err(_) => tracing::debug!(line = number + 1, "Skipping property line that is not UTF-8"),
        }
    }
    map
}

fn parse_line(map: &mut PropertiesMap, line: &str) {
    let trimmed = line.trim_start();
    if trimmed.is_empty() || trimmed.starts_with('#') || trimmed.starts_with('!') {
        return;
    }
    let Some((key, value)) = trimmed.split_once('=') else {
        tracing::trace!(line, "Skipping property line without '='");
        return;
    };
    let key = key.trim();
    if !key.is_empty() {
        map.insert(key, value);
    }
}

/// Renders a map with a fresh header block.
pub fn render(map: &PropertiesMap) -> String {
    let mut content = format!(
        "#{}\n#Generated by mineserve {}\n",
        HEADER_TITLE,
        chrono::Local::now().format("%a %b %d %H:%M:%S %Y")
    );
    for (key, value) in map.iter() {
        content.push_str(key);
        content.push('=');
        content.push_str(value);
        content.push('\n');
    }
    content
}

/// Reads a properties file. A missing file reads as an empty map.
pub fn read(path: impl AsRef<Path>) -> Result<PropertiesMap> {
    let path = path.as_ref();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "Properties file absent");
        return Ok(PropertiesMap::new());
    }
    let content = std::fs::read(path).map_err(|e| {
        Error::Properties(format!("Failed to read {}: {}", path.display(), e))
    })?;
    Ok(parse_bytes(&content))
}

/// Writes a properties file, replacing any existing content.
///
/// Every entry must read back unchanged, so keys that would be trimmed or
/// taken for a comment are rejected along with line breaks.
pub fn write(path: impl AsRef<Path>, map: &PropertiesMap) -> Result<()> {
    let path = path.as_ref();
    for (key, value) in map.iter() {
        if !is_writable(key, value) {
            return Err(Error::Properties(format!("Invalid property entry: {:?}", key)));
        }
    }
    std::fs::write(path, render(map)).map_err(|e| {
        Error::Properties(format!("Failed to write {}: {}", path.display(), e))
    })
}

fn is_writable(key: &str, value: &str) -> bool {
    !key.is_empty()
        && key == key.trim()
        && !key.starts_with(['#', '!'])
        && !key.contains(['=', '\n', '\r'])
        && !value.contains(['\n', '\r'])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_skips_noise() {
        let content = "#Minecraft server properties\n! bang comment\n\n   \nnot a property\n=orphan\n  level-name = world\r\nmotd=A=B=C\n";
        let map = parse(content);
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("level-name"), Some(" world"));
        assert_eq!(map.get("motd"), Some("A=B=C"));
    }

    #[test]
    fn test_parse_empty_value_and_duplicates() {
        let map = parse("seed=\nseed=42\n");
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("seed"), Some("42"));
    }

    #[test]
    fn test_render_has_header_then_entries() {
        let map: PropertiesMap = [("pvp", "false"), ("max-players", "20")].into_iter().collect();
        let rendered = render(&map);
        let lines: Vec<&str> = rendered.lines().collect();
        assert_eq!(lines[0], "#Minecraft server properties");
        assert!(lines[1].starts_with('#'));
        assert_eq!(&lines[2..], &["pvp=false", "max-players=20"]);
        assert_eq!(parse(&rendered), map);
    }

    #[test]
    fn test_parse_bytes_skips_only_undecodable_lines() {
        let map = parse_bytes(b"pvp=true\r\nmotd=caf\xE9\nmax-players=20\n");
        assert_eq!(map.len(), 2);
        assert_eq!(map.get("pvp"), Some("true"));
        assert_eq!(map.get("max-players"), Some("20"));
        assert_eq!(map.get("motd"), None);
    }
}
