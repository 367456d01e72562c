/// Error handling module for mineserve.
///
/// This module defines the error types used throughout the library.
/// Every public operation of the supervisor and the archive coordinator
/// returns one of these errors to programmatic callers, after pushing a
/// human-readable line onto the notification channel.
///
/// # Example
///
/// ```
/// use mineserve::error::{Error, Result};
///
/// fn handle_error(result: Result<()>) {
///     match result {
///         Ok(_) => println!("Operation succeeded"),
///         Err(Error::DirectoryUnbound) => println!("Pick a server directory first"),
///         Err(Error::MissingArtifact(path)) => println!("Missing {}", path.display()),
///         Err(Error::ServerRunning) => println!("Stop the server first"),
///         Err(e) => println!("Other error: {}", e),
///     }
/// }
/// ```
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur in the mineserve library.
///
/// Each variant includes enough context to render a message for the
/// console without further lookups.
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to parse configuration from a file or string.
    ///
    /// This error occurs when:
    /// - The configuration JSON or YAML is malformed
    /// - Field types are incorrect
    /// - The configuration file cannot be read
    #[error("Failed to parse configuration: {0}")]
    ConfigParse(String),

    /// Configuration parsed but contains invalid values.
    ///
    /// This error occurs when:
    /// - The java command or jar name is empty
    /// - A memory setting is not of the form `<digits>[KMG]`
    /// - The archive directory name is empty or contains a separator
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// No managed directory is bound.
    #[error("Server directory not set")]
    DirectoryUnbound,

    /// The path handed to a bind operation is not an existing directory.
    #[error("Server directory not found: {}", .0.display())]
    DirectoryNotFound(PathBuf),

    /// The executable artifact (the server jar) is absent from the managed directory.
    #[error("{} not found", .0.display())]
    MissingArtifact(PathBuf),

    /// Error when starting or talking to the server process.
    ///
    /// This error occurs when:
    /// - The process fails to spawn
    /// - Writing to the process input stream fails
    #[error("Server process error: {0}")]
    Process(String),

    /// The server is not running.
    ///
    /// This error occurs when:
    /// - Sending a command while no process is alive
    #[error("Server not running")]
    NotRunning,

    /// The server is running and the operation requires it to be stopped.
    ///
    /// This error occurs when:
    /// - Rebinding the managed directory while a process is alive
    /// - Resetting the managed directory while a process is alive
    #[error("Server is running")]
    ServerRunning,

    /// A console command or one of its arguments is not acceptable.
    ///
    /// This error occurs when:
    /// - The command is empty
    /// - The command or an argument contains a line break
    /// - A player name is empty or contains a control character or `"`
    #[error("Invalid command: {0}")]
    InvalidCommand(String),

    /// The requested operation is not supported by the server.
    #[error("Unsupported operation: {0}")]
    Unsupported(String),

    /// The properties file or installer metadata could not be read or written.
    #[error("Properties error: {0}")]
    Properties(String),

    /// The archive file could not be produced.
    ///
    /// Per-entry failures never surface here; they are counted in the report.
    #[error("Archive error: {0}")]
    Archive(String),

    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Error in serializing or deserializing data.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Unauthorized access to the gateway.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Any other error not covered by the above categories.
    #[error("Other error: {0}")]
    Other(String),
}

/// Result type for mineserve operations.
pub type Result<T> = std::result::Result<T, Error>;
