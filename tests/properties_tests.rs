#![cfg(test)]

use mineserve::error::Error;
use mineserve::properties::{self, HEADER_TITLE, PropertiesMap};

#[test]
fn test_read_missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let map = properties::read(dir.path().join("server.properties")).unwrap();
    assert!(map.is_empty());
}

#[test]
fn test_write_then_read() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.properties");

    let map: PropertiesMap = [
        ("motd", "A Minecraft Server"),
        ("level-seed", ""),
        ("rcon.password", "a=b"),
        ("max-players", "20"),
    ]
    .into_iter()
    .collect();
    properties::write(&path, &map).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.starts_with(&format!("#{}\n", HEADER_TITLE)));

    let read = properties::read(&path).unwrap();
    assert_eq!(read, map);
    assert_eq!(
        read.keys().collect::<Vec<_>>(),
        vec!["motd", "level-seed", "rcon.password", "max-players"]
    );
}

#[test]
fn test_write_drops_existing_comments() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.properties");
    std::fs::write(&path, "# hand written note\npvp=true\n").unwrap();

    let mut map = properties::read(&path).unwrap();
    map.insert("pvp", "false");
    properties::write(&path, &map).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(!content.contains("hand written note"));
    assert!(content.ends_with("pvp=false\n"));
}

#[test]
fn test_write_rejects_line_breaks() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.properties");

    let mut map = PropertiesMap::new();
    map.insert("motd", "line one\nop=Mallory");
    let result = properties::write(&path, &map);
    assert!(matches!(result, Err(Error::Properties(_))));
    assert!(!path.exists());
}

#[test]
fn test_write_rejects_keys_that_would_not_read_back() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.properties");

    for key in ["#motd", "!motd", " pvp ", "pvp ", "\tpvp"] {
        let map: PropertiesMap = [(key, "true")].into_iter().collect();
        let result = properties::write(&path, &map);
        assert!(matches!(result, Err(Error::Properties(_))), "{:?} was written", key);
    }
    assert!(!path.exists());
}

#[test]
fn test_read_skips_lines_that_are_not_utf8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("server.properties");
    std::fs::write(&path, b"pvp=true\nmotd=caf\xE9\nmax-players=20\n").unwrap();

    let map = properties::read(&path).unwrap();
    assert_eq!(
        map.iter().collect::<Vec<_>>(),
        vec![("pvp", "true"), ("max-players", "20")]
    );
}

#[test]
fn test_json_body_accepts_scalars() {
    let map: PropertiesMap =
        serde_json::from_str(r#"{"difficulty": "hard", "view-distance": 12, "hardcore": false}"#)
            .unwrap();
    assert_eq!(map.get("view-distance"), Some("12"));
    assert_eq!(map.get("hardcore"), Some("false"));
    assert_eq!(
        serde_json::to_string(&map).unwrap(),
        r#"{"difficulty":"hard","view-distance":"12","hardcore":"false"}"#
    );
}
