//! Configuration module for mineserve.
//!
//! This module handles parsing, validation, and persistence of the
//! application configuration: how the server is launched, where archives go,
//! whether the HTTP gateway runs, and which server directory was last bound.
//! Configurations load from JSON or YAML files.
//!
//! # Examples
//!
//! Loading a configuration from a file:
//!
//! ```no_run
//! use mineserve::config::Config;
//!
//! let config = Config::from_file("mineserve.json").unwrap();
//! println!("Launching {}", config.server.jar);
//! ```
//!
//! Creating a configuration programmatically:
//!
//! ```
//! use mineserve::config::{ArchiveConfig, Config, validate_config};
//!
//! let config = Config {
//!     archive: ArchiveConfig {
//!         auto_enabled: true,
//!         interval_minutes: 30,
//!         ..ArchiveConfig::default()
//!     },
//!     ..Config::default()
//! };
//! validate_config(&config).unwrap();
//! ```
mod parser;
pub mod validator;

pub use parser::{ArchiveConfig, AuthConfig, BearerAuthConfig, Config, GatewayConfig, ServerConfig};
pub use validator::validate_config;

/// Default number of gateway worker threads.
pub const DEFAULT_WORKERS: usize = 4;
