use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// How the server process is launched from the managed directory.
///
/// The resulting command line is
/// `<java> -Xmx<max_memory> -Xms<min_memory> -jar <jar> [extra_args...] nogui`,
/// run with the managed directory as its working directory.
///
/// # Examples
///
/// ```
/// use mineserve::config::ServerConfig;
///
/// let server_config = ServerConfig {
///     max_memory: "4G".to_string(),
///     ..ServerConfig::default()
/// };
/// assert_eq!(server_config.jar, "server.jar");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Java executable. An absolute path or a command available in the PATH.
    pub java: String,

    /// Jar file name inside the managed directory.
    pub jar: String,

    /// Maximum heap, e.g. `2G`.
    pub max_memory: String,

    /// Initial heap, e.g. `1G`.
    pub min_memory: String,

    /// Extra arguments placed after the jar and before `nogui`.
    pub extra_args: Vec<String>,

    /// Environment variables to set when launching the server.
    /// These will be combined with the current environment.
    pub env: HashMap<String, String>,

    /// Properties file name inside the managed directory.
    pub properties_file: String,

    /// License marker file name inside the managed directory.
    pub eula_file: String,

    /// Console command that makes the server shut down on its own.
    pub stop_command: String,

    /// How long `restart` waits for the old process to exit.
    pub restart_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            java: "java".to_string(),
            jar: "server.jar".to_string(),
            max_memory: "2G".to_string(),
            min_memory: "1G".to_string(),
            extra_args: Vec::new(),
            env: HashMap::new(),
            properties_file: "server.properties".to_string(),
            eula_file: "eula.txt".to_string(),
            stop_command: "stop".to_string(),
            restart_timeout_secs: 60,
        }
    }
}

impl ServerConfig {
    /// Arguments passed to the java executable.
    pub fn launch_args(&self) -> Vec<String> {
        let mut args = vec![
            format!("-Xmx{}", self.max_memory),
            format!("-Xms{}", self.min_memory),
            "-jar".to_string(),
            self.jar.clone(),
        ];
        args.extend(self.extra_args.iter().cloned());
        args.push("nogui".to_string());
        args
    }
}

/// Archive coordinator settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ArchiveConfig {
    /// Reserved subdirectory of the managed directory holding archives.
    pub dir_name: String,

    /// Whether the recurring archive timer starts with the application.
    pub auto_enabled: bool,

    /// Minutes between automatic archives. Zero or less disables the timer.
    pub interval_minutes: i64,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            dir_name: "backups".to_string(),
            auto_enabled: false,
            interval_minutes: 0,
        }
    }
}

/// Bearer token settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BearerAuthConfig {
    /// Token expected in the `Authorization: Bearer <token>` header.
    pub token: String,
}

/// Gateway authentication settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Bearer token authentication; `None` leaves the gateway open.
    pub bearer: Option<BearerAuthConfig>,
}

/// HTTP/SSE gateway settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatewayConfig {
    /// Address to bind, e.g. `127.0.0.1`.
    #[serde(default = "default_gateway_address")]
    pub address: String,

    /// Port to bind.
    #[serde(default = "default_gateway_port")]
    pub port: u16,

    /// Number of actix workers; defaults to [`super::DEFAULT_WORKERS`].
    #[serde(default)]
    pub workers: Option<usize>,

    /// Optional authentication.
    #[serde(default)]
    pub authenticate: Option<AuthConfig>,
}

fn default_gateway_address() -> String {
    "127.0.0.1".to_string()
}

fn default_gateway_port() -> u16 {
    3030
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            address: default_gateway_address(),
            port: default_gateway_port(),
            workers: None,
            authenticate: None,
        }
    }
}

/// Main configuration for mineserve.
///
/// # JSON Schema
///
/// ```json
/// {
///   "serverDir": "/srv/minecraft",
///   "server": { "java": "java", "jar": "server.jar", "maxMemory": "2G", "minMemory": "1G" },
///   "archive": { "dirName": "backups", "autoEnabled": true, "intervalMinutes": 30 },
///   "gateway": { "address": "127.0.0.1", "port": 3030 }
/// }
/// ```
///
/// Every section is optional and falls back to its defaults.
///
/// # Examples
///
/// ```
/// use mineserve::config::Config;
///
/// let config = Config::parse_from_str(r#"{ "archive": { "intervalMinutes": 15 } }"#).unwrap();
/// assert_eq!(config.archive.interval_minutes, 15);
/// assert_eq!(config.archive.dir_name, "backups");
/// assert!(config.server_dir.is_none());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Last bound managed directory, restored at startup when it still exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_dir: Option<PathBuf>,

    /// Launch settings.
    pub server: ServerConfig,

    /// Archive settings.
    pub archive: ArchiveConfig,

    /// Gateway settings; the gateway is not started when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gateway: Option<GatewayConfig>,
}

impl Config {
    /// Loads a configuration from a file path.
    ///
    /// Files ending in `.yaml` or `.yml` are parsed as YAML, everything else
    /// as JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// * The file cannot be read
    /// * The file contents are not valid JSON/YAML
    /// * The document does not conform to the expected schema
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::ConfigParse(format!("Failed to read config file: {}", e)))?;

        if is_yaml(path) {
            Self::parse_from_yaml_str(&content)
        } else {
            Self::parse_from_str(&content)
        }
    }

    /// Parses a configuration from a JSON string.
    pub fn parse_from_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse JSON config: {}", e)))
    }

    /// Parses a configuration from a YAML string.
    pub fn parse_from_yaml_str(content: &str) -> Result<Self> {
        serde_yaml::from_str(content)
            .map_err(|e| Error::ConfigParse(format!("Failed to parse YAML config: {}", e)))
    }

    /// Writes the configuration back, in the format chosen by the extension.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let content = if is_yaml(path) {
            serde_yaml::to_string(self).map_err(|e| Error::Serialization(e.to_string()))?
        } else {
            serde_json::to_string_pretty(self).map_err(|e| Error::Serialization(e.to_string()))?
        };
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn is_yaml(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
