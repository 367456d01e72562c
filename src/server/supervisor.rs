use super::details::{ServerDetails, read_details};
use super::lines::LineBuffer;
use super::process::{LaunchSpec, Launcher, ProcessId, ProcessInput, ProcessLauncher, ProcessOutput};
use super::state::{RunState, ServerStatus};
use crate::classifier::{LogClassifier, OutputStream};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::notify::{LogLine, Notification, NotificationSink};
use crate::properties::{self, PropertiesMap};
use futures::future::BoxFuture;
use futures::io::{AsyncReadExt, AsyncWriteExt};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, mpsc, watch};

/// Capacity of the per-run output channel.
const SIGNAL_CAPACITY: usize = 256;
const READ_CHUNK: usize = 8 * 1024;
/// How long output may keep flowing after the process exited.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const EULA_ACCEPTED: &str = "#By changing the setting below to TRUE you are indicating your agreement to our EULA (https://aka.ms/MinecraftEULA).\neula=true\n";

/// Output of one run, funnelled through a single channel so lines and the
/// exit are applied in the order they were produced.
#[derive(Debug)]
enum ProcessSignal {
    Line { stream: OutputStream, text: String },
    Exited(Option<i32>),
}

struct ManagedProcess {
    id: ProcessId,
    pid: Option<u32>,
    stdin: ProcessInput,
}

#[derive(Default)]
struct SupervisorState {
    directory: Option<PathBuf>,
    process: Option<ManagedProcess>,
    run: RunState,
}

struct Inner {
    config: ServerConfig,
    sink: Arc<dyn NotificationSink>,
    launcher: Arc<dyn Launcher>,
    classifier: LogClassifier,
    state: Mutex<SupervisorState>,
    status_tx: watch::Sender<ServerStatus>,
}

/// Outcome of [`Supervisor::reset_directory`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ResetReport {
    /// Top-level entries deleted
    pub removed: usize,
    /// Top-level entries that could not be deleted
    pub failed: usize,
}

/// Owns at most one server process and everything known about it.
///
/// All operations serialize on an internal lock, and every state change is
/// pushed to the notification sink while that lock is held. Failures are
/// reported twice: as an `Error: ...` console line for the user, and as the
/// returned [`Error`] for the caller.
///
/// Cloning is cheap; clones share the same process.
///
/// # Examples
///
/// ```no_run
/// use mineserve::config::ServerConfig;
/// use mineserve::notify::EventHub;
/// use mineserve::server::Supervisor;
/// use std::sync::Arc;
///
/// # async fn run() -> mineserve::error::Result<()> {
/// let hub = Arc::new(EventHub::default());
/// let supervisor = Supervisor::new(ServerConfig::default(), hub.clone());
/// supervisor.bind_directory("/srv/minecraft").await?;
/// supervisor.start().await?;
/// supervisor.send_command("say hello").await?;
/// supervisor.stop().await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Supervisor {
    inner: Arc<Inner>,
}

impl Supervisor {
    /// Creates a supervisor that launches real processes.
    pub fn new(config: ServerConfig, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_launcher(config, sink, Arc::new(ProcessLauncher))
    }

    /// Creates a supervisor with a custom launcher.
    pub fn with_launcher(
        config: ServerConfig,
        sink: Arc<dyn NotificationSink>,
        launcher: Arc<dyn Launcher>,
    ) -> Self {
        Self::with_parts(config, sink, launcher, LogClassifier::default())
    }

    /// Creates a supervisor with a custom launcher and output classifier.
    pub fn with_parts(
        config: ServerConfig,
        sink: Arc<dyn NotificationSink>,
        launcher: Arc<dyn Launcher>,
        classifier: LogClassifier,
    ) -> Self {
        let (status_tx, _) = watch::channel(ServerStatus::Offline);
        Self {
            inner: Arc::new(Inner {
                config,
                sink,
                launcher,
                classifier,
                state: Mutex::new(SupervisorState::default()),
                status_tx,
            }),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.inner.config
    }

    /// Current status.
    pub fn status(&self) -> ServerStatus {
        *self.inner.status_tx.borrow()
    }

    /// Receiver that observes every status change.
    pub fn subscribe_status(&self) -> watch::Receiver<ServerStatus> {
        self.inner.status_tx.subscribe()
    }

    /// Bound managed directory, if any.
    pub async fn directory(&self) -> Option<PathBuf> {
        self.inner.state.lock().await.directory.clone()
    }

    /// Whether a process is alive.
    pub async fn is_running(&self) -> bool {
        self.inner.state.lock().await.process.is_some()
    }

    /// OS id of the running process.
    pub async fn pid(&self) -> Option<u32> {
        self.inner
            .state
            .lock()
            .await
            .process
            .as_ref()
            .and_then(|p| p.pid)
    }

    /// Sorted names of connected players.
    pub async fn players(&self) -> Vec<String> {
        self.inner.state.lock().await.run.players().names()
    }

    /// Re-sends the current player list to the sink and returns it.
    pub async fn announce_players(&self) -> Vec<String> {
        let state = self.inner.state.lock().await;
        let names = state.run.players().names();
        self.inner.sink.notify(Notification::PlayerListUpdate {
            names: names.clone(),
        });
        names
    }

    /// Binds the managed directory. An empty path unbinds it.
    ///
    /// Returns the absolute directory now bound. Rebinding while a process
    /// is alive is refused, since the process keeps running in the old one.
    #[tracing::instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub async fn bind_directory(&self, path: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let path = path.as_ref();
        let mut state = self.inner.state.lock().await;
        if state.process.is_some() {
            return self.inner.fail(Error::ServerRunning);
        }

        if path.as_os_str().is_empty() {
            tracing::info!("Server directory cleared");
            state.directory = None;
            return Ok(None);
        }

        if !path.is_dir() {
            return self.inner.fail(Error::DirectoryNotFound(path.to_path_buf()));
        }
        let dir = std::path::absolute(path).or_else(|e| self.inner.fail(e.into()))?;
        tracing::info!(dir = %dir.display(), "Server directory bound");
        state.directory = Some(dir.clone());
        Ok(Some(dir))
    }

    /// Starts the server. Does nothing if a process is already alive.
    ///
    /// The directory and jar are checked, the EULA is accepted, and only
    /// once the process has spawned does the status move to `starting`.
    /// A failed spawn leaves every piece of state untouched.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        if state.process.is_some() {
            tracing::debug!("Start requested while a process is alive");
            return Ok(());
        }

        let Some(dir) = state.directory.clone() else {
            return self.inner.fail(Error::DirectoryUnbound);
        };
        let jar = dir.join(&self.inner.config.jar);
        if !jar.is_file() {
            return self.inner.fail(Error::MissingArtifact(jar));
        }

        self.inner.log("Starting server...");

        match accept_eula(&dir.join(&self.inner.config.eula_file)) {
            Ok(true) => self.inner.log("Accepting EULA automatically..."),
            Ok(false) => {}
            Err(e) => return self.inner.fail(e),
        }

        let spec = LaunchSpec::java(&self.inner.config, &dir);
        let spawned = match self.inner.launcher.launch(&spec).await {
            Ok(spawned) => spawned,
            Err(e) => return self.inner.fail(e),
        };

        let id = ProcessId::new();
        tracing::info!(process_id = %id, pid = ?spawned.pid, "Server started");
        state.process = Some(ManagedProcess {
            id,
            pid: spawned.pid,
            stdin: spawned.stdin,
        });
        let notifications = state.run.begin_start();
        self.inner.publish(&state, notifications);

        tokio::spawn(watch_process(
            self.inner.clone(),
            id,
            spawned.stdout,
            spawned.stderr,
            spawned.exit,
        ));
        Ok(())
    }

    /// Asks the server to shut down. Does nothing if no process is alive.
    ///
    /// Returns once the stop command is written; the status reaches
    /// `offline` when the process actually exits.
    #[tracing::instrument(skip(self))]
    pub async fn stop(&self) -> Result<()> {
        let mut state = self.inner.state.lock().await;
        let Some(process) = state.process.as_mut() else {
            tracing::debug!("Stop requested while offline");
            return Ok(());
        };

        self.inner.log("Stopping server...");
        if let Err(e) = write_line(&mut process.stdin, &self.inner.config.stop_command).await {
            return self.inner.fail(e);
        }
        let notifications = state.run.begin_stop();
        self.inner.publish(&state, notifications);
        Ok(())
    }

    /// Stops the server if it is running, waits for it to exit, then starts it.
    #[tracing::instrument(skip(self))]
    pub async fn restart(&self) -> Result<()> {
        let mut status_rx = self.subscribe_status();
        if self.is_running().await {
            self.stop().await?;
            let secs = self.inner.config.restart_timeout_secs;
            let stopped = tokio::time::timeout(
                Duration::from_secs(secs),
                status_rx.wait_for(|status| *status == ServerStatus::Offline),
            )
            .await
            .map(|r| r.is_ok())
            .unwrap_or(false);
            if !stopped {
                return self.inner.fail(Error::Process(format!(
                    "Server did not stop within {} seconds",
                    secs
                )));
            }
        }
        self.start().await
    }

    /// Writes one line to the server console.
    pub async fn send_command(&self, command: &str) -> Result<()> {
        let command = command.trim();
        if command.is_empty() {
            return self
                .inner
                .fail(Error::InvalidCommand("Command is empty".to_string()));
        }
        if command.contains(['\n', '\r']) {
            return self.inner.fail(Error::InvalidCommand(
                "Command must be a single line".to_string(),
            ));
        }

        let mut state = self.inner.state.lock().await;
        let Some(process) = state.process.as_mut() else {
            return self.inner.fail(Error::NotRunning);
        };
        if let Err(e) = write_line(&mut process.stdin, command).await {
            return self.inner.fail(e);
        }
        tracing::debug!(command, "Command sent");
        self.inner.log(format!("> {}", command));
        Ok(())
    }

    /// Kicks a player, with `Kicked by admin` as the default reason.
    pub async fn kick(&self, player: &str, reason: Option<&str>) -> Result<()> {
        let player = self.player_arg(player)?;
        let reason = reason_or(reason, "Kicked by admin");
        self.send_command(&format!("kick {} {}", player, reason)).await
    }

    /// Bans a player, with `Banned by admin` as the default reason.
    ///
    /// The vanilla console has no timed bans, so a non-empty `duration`
    /// fails with [`Error::Unsupported`] and nothing is sent.
    pub async fn ban(&self, player: &str, reason: Option<&str>, duration: Option<&str>) -> Result<()> {
        let player = self.player_arg(player)?;
        if duration.is_some_and(|d| !d.trim().is_empty()) {
            return self.inner.fail(Error::Unsupported(
                "Timed bans are not supported by the server console".to_string(),
            ));
        }
        let reason = reason_or(reason, "Banned by admin");
        self.send_command(&format!("ban {} {}", player, reason)).await
    }

    /// Grants operator status.
    pub async fn op(&self, player: &str) -> Result<()> {
        let player = self.player_arg(player)?;
        self.send_command(&format!("op {}", player)).await
    }

    /// Revokes operator status.
    pub async fn deop(&self, player: &str) -> Result<()> {
        let player = self.player_arg(player)?;
        self.send_command(&format!("deop {}", player)).await
    }

    /// Reads the properties file. A missing file reads as empty.
    pub async fn get_properties(&self) -> Result<PropertiesMap> {
        let path = self.bound_path(&self.inner.config.properties_file).await?;
        properties::read(&path).or_else(|e| self.inner.fail(e))
    }

    /// Rewrites the properties file and announces the new contents.
    pub async fn save_properties(&self, map: PropertiesMap) -> Result<()> {
        let path = self.bound_path(&self.inner.config.properties_file).await?;
        properties::write(&path, &map).or_else(|e| self.inner.fail(e))?;
        tracing::info!(path = %path.display(), entries = map.len(), "Properties saved");
        self.inner.log("Server properties saved");
        self.inner
            .sink
            .notify(Notification::PropertiesUpdated { properties: map });
        Ok(())
    }

    /// Installer metadata for the bound directory, if present.
    pub async fn server_details(&self) -> Result<Option<ServerDetails>> {
        let dir = self.bound_path("").await?;
        read_details(&dir).or_else(|e| self.inner.fail(e))
    }

    /// Deletes every top-level entry of the managed directory except `keep`.
    ///
    /// Refused while a process is alive. Entries that cannot be deleted are
    /// counted and skipped.
    #[tracing::instrument(skip(self))]
    pub async fn reset_directory(&self, keep: &str) -> Result<ResetReport> {
        let state = self.inner.state.lock().await;
        if state.process.is_some() {
            return self.inner.fail(Error::ServerRunning);
        }
        let Some(dir) = state.directory.clone() else {
            return self.inner.fail(Error::DirectoryUnbound);
        };

        let entries = std::fs::read_dir(&dir).or_else(|e| self.inner.fail(e.into()))?;
        let mut report = ResetReport::default();
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read directory entry");
                    report.failed += 1;
                    continue;
                }
            };
            if entry.file_name() == keep {
                continue;
            }
            let path = entry.path();
            let removed = match entry.file_type() {
                Ok(kind) if kind.is_dir() => std::fs::remove_dir_all(&path),
                Ok(_) => std::fs::remove_file(&path),
                Err(e) => Err(e),
            };
            match removed {
                Ok(()) => report.removed += 1,
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove entry");
                    report.failed += 1;
                }
            }
        }

        self.inner.log(format!(
            "Server directory reset: {} entries removed, {} failed",
            report.removed, report.failed
        ));
        Ok(report)
    }

    async fn bound_path(&self, file: &str) -> Result<PathBuf> {
        let state = self.inner.state.lock().await;
        match &state.directory {
            Some(dir) if file.is_empty() => Ok(dir.clone()),
            Some(dir) => Ok(dir.join(file)),
            None => self.inner.fail(Error::DirectoryUnbound),
        }
    }

    fn player_arg(&self, player: &str) -> Result<String> {
        let player = player.trim();
        if player.is_empty() || player.chars().any(|c| c.is_control() || c == '"') {
            return self
                .inner
                .fail(Error::InvalidCommand(format!("Invalid player name '{}'", player)));
        }
        // Bedrock gamertags may contain spaces
        if player.contains(' ') {
            Ok(format!("\"{}\"", player))
        } else {
            Ok(player.to_string())
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("status", &self.status())
            .field("classifier", &self.inner.classifier)
            .finish_non_exhaustive()
    }
}

impl Inner {
    fn log(&self, message: impl AsRef<str>) {
        self.sink
            .notify(Notification::ConsoleLog(LogLine::info(message)));
    }

    fn fail<T>(&self, error: Error) -> Result<T> {
        tracing::warn!(error = %error, "Server operation failed");
        self.sink
            .notify(Notification::ConsoleLog(LogLine::error(format!("Error: {}", error))));
        Err(error)
    }

    fn publish(&self, state: &SupervisorState, notifications: Vec<Notification>) {
        for notification in notifications {
            self.sink.notify(notification);
        }
        let status = state.run.status();
        self.status_tx.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status;
                true
            }
        });
    }

    /// Applies one signal; returns `true` once the run is over.
    async fn apply(&self, id: ProcessId, signal: ProcessSignal) -> bool {
        let mut state = self.state.lock().await;
        let exited = matches!(signal, ProcessSignal::Exited(_));
        if state.process.as_ref().map(|p| p.id) != Some(id) {
            tracing::debug!(process_id = %id, "Dropping signal from a previous run");
            return exited;
        }

        let notifications = match signal {
            ProcessSignal::Line { stream, text } => {
                let line = self.classifier.classify(&text, stream);
                state.run.apply(&line)
            }
            ProcessSignal::Exited(code) => {
                tracing::info!(process_id = %id, ?code, "Server process exited");
                state.process = None;
                state.run.finish(code)
            }
        };
        self.publish(&state, notifications);
        exited
    }
}

/// Pumps one run's output into the supervisor until the process exits.
async fn watch_process(
    inner: Arc<Inner>,
    id: ProcessId,
    stdout: ProcessOutput,
    stderr: ProcessOutput,
    exit: BoxFuture<'static, Option<i32>>,
) {
    let (tx, mut rx) = mpsc::channel(SIGNAL_CAPACITY);
    let mut out_task = tokio::spawn(read_lines(stdout, OutputStream::Stdout, tx.clone()));
    let mut err_task = tokio::spawn(read_lines(stderr, OutputStream::Stderr, tx.clone()));

    tokio::spawn(async move {
        let code = exit.await;
        let drained = tokio::time::timeout(DRAIN_TIMEOUT, async {
            let _ = (&mut out_task).await;
            let _ = (&mut err_task).await;
        })
        .await;
        if drained.is_err() {
            tracing::warn!(process_id = %id, "Output still open after exit, closing it");
            out_task.abort();
            err_task.abort();
        }
        let _ = tx.send(ProcessSignal::Exited(code)).await;
    });

    while let Some(signal) = rx.recv().await {
        if inner.apply(id, signal).await {
            break;
        }
    }
}

async fn read_lines(mut reader: ProcessOutput, stream: OutputStream, tx: mpsc::Sender<ProcessSignal>) {
    let mut buffer = LineBuffer::new();
    let mut chunk = vec![0u8; READ_CHUNK];
    loop {
        let n = match reader.read(&mut chunk).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                tracing::debug!(?stream, error = %e, "Output stream failed");
                break;
            }
        };
        for text in buffer.push(&chunk[..n]) {
            if tx.send(ProcessSignal::Line { stream, text }).await.is_err() {
                return;
            }
        }
    }
    if let Some(text) = buffer.finish() {
        let _ = tx.send(ProcessSignal::Line { stream, text }).await;
    }
}

async fn write_line(stdin: &mut ProcessInput, line: &str) -> Result<()> {
    let mut bytes = line.as_bytes().to_vec();
    bytes.push(b'\n');
    stdin
        .write_all(&bytes)
        .await
        .map_err(|e| Error::Process(format!("Failed to write to server input: {}", e)))?;
    stdin
        .flush()
        .await
        .map_err(|e| Error::Process(format!("Failed to flush server input: {}", e)))
}

/// Writes an accepted EULA unless one is already there; `true` if written.
fn accept_eula(path: &Path) -> Result<bool> {
    let accepted = match std::fs::read(path) {
        Ok(content) => properties::parse_bytes(&content)
            .get("eula")
            .is_some_and(|v| v.trim().eq_ignore_ascii_case("true")),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => return Err(e.into()),
    };
    if accepted {
        return Ok(false);
    }
    std::fs::write(path, EULA_ACCEPTED)?;
    Ok(true)
}

fn reason_or<'a>(reason: Option<&'a str>, default: &'a str) -> &'a str {
    match reason.map(str::trim) {
        Some(r) if !r.is_empty() => r,
        _ => default,
    }
}
