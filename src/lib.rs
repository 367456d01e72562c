/*!
 # mineserve

 A Rust library for supervising a Minecraft dedicated server.

 ## Overview

 mineserve provides functionality to:
 - Start, stop and restart the server process from a managed directory
 - Derive live state (status, connected players) from the server console
 - Send console commands and player moderation commands
 - Read and rewrite `server.properties`
 - Archive the managed directory into zip files, on demand or on a timer
 - Optionally expose all of it over HTTP with a Server-Sent Events stream

 ## Basic Usage

 ```no_run
 use mineserve::{Mineserve, Result};

 #[tokio::main]
 async fn main() -> Result<()> {
     // Create the application from a config file
     let app = Mineserve::from_config_file("mineserve.json")?;
     let mut events = app.subscribe();

     // Point it at a server directory and start the server
     app.bind_directory("/srv/minecraft").await?;
     app.supervisor().start().await?;

     // Watch the console
     while let Ok(notification) = events.recv().await {
         println!("{}: {}", notification.name(), notification.payload_json().unwrap_or_default());
     }

     Ok(())
 }
 ```

 ## Features

 - **Process supervision**: One server process at a time, with a strict status state machine
 - **Console classification**: Player joins, leaves and readiness parsed from log lines
 - **Archives**: Zip snapshots of the server directory with per-file failure tolerance
 - **Configuration**: JSON or YAML config files, persisted directory binding
 - **Gateway**: HTTP + SSE surface with bearer authentication and CORS
*/

pub mod archive;
pub mod classifier;
pub mod config;
pub mod error;
pub mod gateway;
pub mod notify;
pub mod properties;
pub mod server;

pub use archive::{ArchiveCoordinator, ArchiveReport};
pub use config::Config;
pub use error::{Error, Result};
pub use gateway::GatewayHandle;
pub use notify::{EventHub, Notification};
pub use server::{ServerStatus, Supervisor};

use notify::{LogLine, NotificationSink};
use server::{Launcher, ProcessLauncher, ResetReport};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;

/// Configure and run a supervised Minecraft server
///
/// This struct is the main entry point: it wires one [`Supervisor`], one
/// [`ArchiveCoordinator`] and the [`EventHub`] both report to, and keeps
/// their directory bindings in step. Clones share the same components.
/// All public methods are instrumented with `tracing` spans.
#[derive(Clone)]
pub struct Mineserve {
    /// Configuration, updated when the directory or archive settings change
    config: Arc<Mutex<Config>>,
    /// File the configuration was loaded from, if any
    config_path: Option<Arc<PathBuf>>,
    /// Notification hub shared by all components
    hub: Arc<EventHub>,
    /// Server process supervisor
    supervisor: Supervisor,
    /// Archive coordinator
    archives: ArchiveCoordinator,
}

impl Mineserve {
    /// Create a new application from a configuration file path
    ///
    /// The configuration is validated, and later directory or archive
    /// changes are written back to the same file.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(path), fields(config_path = ?path.as_ref()))]
    pub fn from_config_file(path: impl AsRef<Path>) -> Result<Self> {
        tracing::info!("Loading configuration from file");
        let config = Config::from_file(path.as_ref())?;
        config::validate_config(&config)?;
        Ok(Self::build(
            config,
            Some(path.as_ref().to_path_buf()),
            Arc::new(ProcessLauncher),
        ))
    }

    /// Create a new application from a JSON configuration string
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config))]
    pub fn from_config_str(config: &str) -> Result<Self> {
        tracing::info!("Loading configuration from string");
        let config = Config::parse_from_str(config)?;
        config::validate_config(&config)?;
        Ok(Self::new(config))
    }

    /// Create a new application from a configuration
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(config), fields(jar = %config.server.jar))]
    pub fn new(config: Config) -> Self {
        Self::build(config, None, Arc::new(ProcessLauncher))
    }

    /// Create a new application that spawns processes through `launcher`
    pub fn with_launcher(config: Config, launcher: Arc<dyn Launcher>) -> Self {
        Self::build(config, None, launcher)
    }

    fn build(config: Config, config_path: Option<PathBuf>, launcher: Arc<dyn Launcher>) -> Self {
        tracing::info!("Creating new Mineserve");
        let hub = Arc::new(EventHub::default());
        let sink: Arc<dyn NotificationSink> = hub.clone();
        let supervisor = Supervisor::with_launcher(config.server.clone(), sink.clone(), launcher);
        let archives = ArchiveCoordinator::new(config.archive.dir_name.clone(), sink);
        Self {
            config: Arc::new(Mutex::new(config)),
            config_path: config_path.map(Arc::new),
            hub,
            supervisor,
            archives,
        }
    }

    /// Snapshot of the current configuration
    pub fn config(&self) -> Config {
        self.lock_config().clone()
    }

    /// The notification hub
    pub fn hub(&self) -> &Arc<EventHub> {
        &self.hub
    }

    /// Subscribe to all notifications from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Notification> {
        self.hub.subscribe()
    }

    /// The process supervisor
    pub fn supervisor(&self) -> &Supervisor {
        &self.supervisor
    }

    /// The archive coordinator
    pub fn archives(&self) -> &ArchiveCoordinator {
        &self.archives
    }

    /// Re-applies persisted settings: the last bound directory, if it still
    /// exists, and the automatic archive timer.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn restore(&self) -> Result<()> {
        let config = self.config();

        match &config.server_dir {
            Some(dir) if dir.is_dir() => {
                self.bind_directory(dir).await?;
            }
            Some(dir) => {
                tracing::warn!(server_dir = %dir.display(), "Saved server directory no longer exists");
                self.lock_config().server_dir = None;
                self.persist();
            }
            None => tracing::debug!("No saved server directory"),
        }

        if config.archive.auto_enabled {
            self.archives
                .configure_auto_archive(true, config.archive.interval_minutes);
        }
        Ok(())
    }

    /// Bind the managed directory for both the supervisor and the archives
    ///
    /// An empty path unbinds it. The binding is persisted when the
    /// configuration came from a file. If the archives cannot be bound, the
    /// supervisor keeps its previous directory and the error is returned.
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn bind_directory(&self, path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let previous = self.supervisor.directory().await;
        let bound = self.supervisor.bind_directory(path).await?;
        if let Err(e) = self
            .archives
            .bind(bound.as_deref().unwrap_or(Path::new("")))
        {
            self.rollback_directory(previous).await;
            return Err(e);
        }

        let message = match &bound {
            Some(dir) => format!("Server directory set to {}", dir.display()),
            None => "Server directory cleared".to_string(),
        };
        self.hub
            .notify(Notification::ConsoleLog(LogLine::info(message)));

        self.lock_config().server_dir = bound.clone();
        self.persist();
        Ok(bound)
    }

    /// Delete everything in the managed directory except the archives
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn reset_directory(&self) -> Result<ResetReport> {
        self.supervisor
            .reset_directory(self.archives.dir_name())
            .await
    }

    /// Create an archive on a blocking thread
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn create_archive(&self, reason: Option<String>) -> Result<ArchiveReport> {
        let archives = self.archives.clone();
        tokio::task::spawn_blocking(move || archives.create_archive(reason.as_deref()))
            .await
            .map_err(|e| Error::Other(format!("Archive task failed: {}", e)))?
    }

    /// Enable or disable automatic archives and remember the choice
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub fn configure_auto_archive(&self, enabled: bool, interval_minutes: i64) {
        self.archives
            .configure_auto_archive(enabled, interval_minutes);
        {
            let mut config = self.lock_config();
            config.archive.auto_enabled = enabled;
            config.archive.interval_minutes = interval_minutes;
        }
        self.persist();
    }

    /// Start the HTTP/SSE gateway configured under `gateway`
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn start_gateway(&self) -> Result<GatewayHandle> {
        let gateway_config = self.config().gateway.ok_or_else(|| {
            Error::ConfigInvalid("No gateway section in the configuration".to_string())
        })?;
        gateway::start_gateway(self.clone(), gateway_config).await
    }

    /// Stop the automatic archives and the server, waiting for it to exit
    ///
    /// This method is instrumented with `tracing`.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        if self.archives.auto_archive_interval().is_some() {
            self.archives.set_auto_archive_interval(None);
        }
        if !self.supervisor.is_running().await {
            return Ok(());
        }

        let mut status = self.supervisor.subscribe_status();
        self.supervisor.stop().await?;
        let secs = self.supervisor.config().restart_timeout_secs;
        let stopped = tokio::time::timeout(
            Duration::from_secs(secs),
            status.wait_for(|s| *s == ServerStatus::Offline),
        )
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false);
        if stopped {
            tracing::info!("Server stopped for shutdown");
            Ok(())
        } else {
            tracing::warn!(timeout_secs = secs, "Server still running at shutdown");
            Err(Error::Process(format!(
                "Server did not stop within {} seconds",
                secs
            )))
        }
    }

    /// Puts the supervisor back on the directory the archives still hold
    async fn rollback_directory(&self, previous: Option<PathBuf>) {
        let target = previous.unwrap_or_default();
        match self.supervisor.bind_directory(&target).await {
            Ok(_) => tracing::warn!(dir = %target.display(), "Directory binding rolled back"),
            Err(e) => {
                // The previous directory is gone too; leave both unbound
                tracing::warn!(error = %e, "Directory rollback failed, unbinding");
                let _ = self.supervisor.bind_directory("").await;
                let _ = self.archives.bind("");
                self.lock_config().server_dir = None;
                self.persist();
            }
        }
    }

    fn lock_config(&self) -> std::sync::MutexGuard<'_, Config> {
        self.config
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist(&self) {
        let Some(path) = &self.config_path else {
            return;
        };
        let config = self.config();
        match config.save_to_file(path.as_path()) {
            Ok(()) => tracing::debug!(config_path = %path.display(), "Configuration saved"),
            Err(e) => tracing::warn!(config_path = %path.display(), error = %e, "Failed to save configuration"),
        }
    }
}

impl std::fmt::Debug for Mineserve {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mineserve")
            .field("config_path", &self.config_path)
            .field("supervisor", &self.supervisor)
            .field("archives", &self.archives)
            .finish_non_exhaustive()
    }
}
