use crate::config::{ArchiveConfig, Config, GatewayConfig, ServerConfig};
use crate::error::{Error, Result};

fn is_memory_size(value: &str) -> bool {
    let Some(unit) = value.chars().last() else {
        return false;
    };
    let digits = &value[..value.len() - unit.len_utf8()];
    matches!(unit, 'K' | 'k' | 'M' | 'm' | 'G' | 'g')
        && !digits.is_empty()
        && digits.chars().all(|c| c.is_ascii_digit())
}

fn is_plain_file_name(name: &str) -> bool {
    !name.trim().is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// Validates the launch settings
pub fn validate_server_config(config: &ServerConfig) -> Result<()> {
    if config.java.trim().is_empty() {
        return Err(Error::ConfigInvalid("Java command is empty".to_string()));
    }

    if !is_plain_file_name(&config.jar) {
        return Err(Error::ConfigInvalid(format!(
            "Jar '{}' must be a file name inside the server directory",
            config.jar
        )));
    }

    for (name, value) in [("maxMemory", &config.max_memory), ("minMemory", &config.min_memory)] {
        if !is_memory_size(value) {
            return Err(Error::ConfigInvalid(format!(
                "{} '{}' is not a size like 1024M or 2G",
                name, value
            )));
        }
    }

    for (name, value) in [
        ("propertiesFile", &config.properties_file),
        ("eulaFile", &config.eula_file),
    ] {
        if !is_plain_file_name(value) {
            return Err(Error::ConfigInvalid(format!(
                "{} '{}' must be a file name inside the server directory",
                name, value
            )));
        }
    }

    if config.stop_command.trim().is_empty() || config.stop_command.contains(['\n', '\r']) {
        return Err(Error::ConfigInvalid(
            "Stop command must be a single non-empty line".to_string(),
        ));
    }

    Ok(())
}

/// Validates the archive settings
pub fn validate_archive_config(config: &ArchiveConfig) -> Result<()> {
    if !is_plain_file_name(&config.dir_name) {
        return Err(Error::ConfigInvalid(format!(
            "Archive directory '{}' must be a plain directory name",
            config.dir_name
        )));
    }
    Ok(())
}

/// Validates the gateway settings
pub fn validate_gateway_config(config: &GatewayConfig) -> Result<()> {
    if config.port == 0 {
        return Err(Error::ConfigInvalid("Gateway port must not be 0".to_string()));
    }
    if config.workers == Some(0) {
        return Err(Error::ConfigInvalid(
            "Gateway workers must be at least 1".to_string(),
        ));
    }
    if let Some(bearer) = config.authenticate.as_ref().and_then(|a| a.bearer.as_ref()) {
        if bearer.token.trim().is_empty() {
            return Err(Error::ConfigInvalid("Bearer token is empty".to_string()));
        }
    }
    Ok(())
}

/// Full configuration validation
pub fn validate_config(config: &Config) -> Result<()> {
    validate_server_config(&config.server)?;
    validate_archive_config(&config.archive)?;
    if let Some(gateway) = &config.gateway {
        validate_gateway_config(gateway)?;
    }
    Ok(())
}
