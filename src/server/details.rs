use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Metadata file an installer leaves in the managed directory.
pub const DETAILS_FILE: &str = "mineserve.json";

/// What is installed in the managed directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerDetails {
    /// Server flavour, e.g. `vanilla` or `paper`
    #[serde(rename = "type")]
    pub kind: String,
    /// Game version
    pub version: String,
    /// Installation time as written by the installer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installed_at: Option<String>,
}

/// Reads the details file from `dir`; `Ok(None)` when there is none.
pub fn read_details(dir: &Path) -> Result<Option<ServerDetails>> {
    let path = dir.join(DETAILS_FILE);
    let content = match std::fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| Error::Properties(format!("Invalid {}: {}", DETAILS_FILE, e)))
}
