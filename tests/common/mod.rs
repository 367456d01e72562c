#![allow(dead_code)]

use async_trait::async_trait;
use futures::channel::{mpsc as fmpsc, oneshot};
use futures::io::AsyncWrite;
use futures::stream::TryStreamExt;
use mineserve::error::{Error, Result};
use mineserve::notify::{LogKind, Notification, NotificationSink};
use mineserve::server::{LaunchSpec, Launcher, ServerStatus, SpawnedProcess, Supervisor};
use std::io;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;

pub const WAIT: Duration = Duration::from_secs(3);

/// Sink that keeps every notification it receives.
#[derive(Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn all(&self) -> Vec<Notification> {
        self.notifications.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.notifications.lock().unwrap().clear();
    }

    pub fn console_messages(&self) -> Vec<(LogKind, String)> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::ConsoleLog(line) => Some((line.kind, line.message)),
                _ => None,
            })
            .collect()
    }

    pub fn backup_messages(&self) -> Vec<(LogKind, String)> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::BackupLog(line) => Some((line.kind, line.message)),
                _ => None,
            })
            .collect()
    }

    pub fn errors(&self) -> Vec<String> {
        self.console_messages()
            .into_iter()
            .filter(|(kind, _)| *kind == LogKind::Error)
            .map(|(_, message)| message)
            .collect()
    }

    pub fn statuses(&self) -> Vec<ServerStatus> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::ServerStatus { status } => Some(status),
                _ => None,
            })
            .collect()
    }

    pub fn player_counts(&self) -> Vec<usize> {
        self.all()
            .into_iter()
            .filter_map(|n| match n {
                Notification::PlayerCountUpdate(count) => Some(count),
                _ => None,
            })
            .collect()
    }

    /// Polls until `predicate` holds for the recorded notifications.
    pub async fn wait_for(&self, predicate: impl Fn(&[Notification]) -> bool) -> bool {
        let deadline = tokio::time::Instant::now() + WAIT;
        loop {
            if predicate(&self.all()) {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

impl NotificationSink for RecordingSink {
    fn notify(&self, notification: Notification) {
        self.notifications.lock().unwrap().push(notification);
    }
}

/// Stdin double that records what the supervisor writes.
#[derive(Clone, Default)]
pub struct RecordingInput {
    written: Arc<Mutex<Vec<u8>>>,
    broken: Arc<AtomicBool>,
}

impl AsyncWrite for RecordingInput {
    fn poll_write(self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        if self.broken.load(Ordering::SeqCst) {
            return Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "pipe closed")));
        }
        self.written.lock().unwrap().extend_from_slice(buf);
        Poll::Ready(Ok(buf.len()))
    }

    fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }

    fn poll_close(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Poll::Ready(Ok(()))
    }
}

type Chunks = fmpsc::UnboundedSender<io::Result<Vec<u8>>>;

/// Test-side handle of one fake process run.
pub struct FakeProcess {
    pub spec: LaunchSpec,
    stdout: Chunks,
    stderr: Chunks,
    exit: oneshot::Sender<Option<i32>>,
    input: RecordingInput,
}

impl FakeProcess {
    pub fn stdout_line(&self, line: &str) {
        self.stdout_chunk(format!("{}\n", line).as_bytes());
    }

    pub fn stdout_chunk(&self, bytes: &[u8]) {
        let _ = self.stdout.unbounded_send(Ok(bytes.to_vec()));
    }

    pub fn stderr_line(&self, line: &str) {
        let _ = self.stderr.unbounded_send(Ok(format!("{}\n", line).into_bytes()));
    }

    /// Everything written to stdin so far.
    pub fn input(&self) -> String {
        String::from_utf8_lossy(&self.input.written.lock().unwrap()).into_owned()
    }

    /// Makes further stdin writes fail.
    pub fn break_input(&self) {
        self.input.broken.store(true, Ordering::SeqCst);
    }

    /// Closes both output streams and reports the exit code.
    pub fn exit(self, code: Option<i32>) {
        drop(self.stdout);
        drop(self.stderr);
        let _ = self.exit.send(code);
    }
}

/// Launcher whose processes are driven by the test.
pub struct FakeLauncher {
    processes: mpsc::UnboundedSender<FakeProcess>,
    fail: AtomicBool,
}

impl FakeLauncher {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<FakeProcess>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Arc::new(Self {
                processes: tx,
                fail: AtomicBool::new(false),
            }),
            rx,
        )
    }

    /// Makes the next launches fail as if the executable were missing.
    pub fn fail_spawns(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl Launcher for FakeLauncher {
    async fn launch(&self, spec: &LaunchSpec) -> Result<SpawnedProcess> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Process(format!(
                "Failed to start process: {} not found",
                spec.program
            )));
        }

        let (stdout_tx, stdout_rx) = fmpsc::unbounded();
        let (stderr_tx, stderr_rx) = fmpsc::unbounded();
        let (exit_tx, exit_rx) = oneshot::channel();
        let input = RecordingInput::default();

        let _ = self.processes.send(FakeProcess {
            spec: spec.clone(),
            stdout: stdout_tx,
            stderr: stderr_tx,
            exit: exit_tx,
            input: input.clone(),
        });

        Ok(SpawnedProcess {
            pid: Some(4242),
            stdin: Box::pin(input),
            stdout: Box::pin(stdout_rx.into_async_read()),
            stderr: Box::pin(stderr_rx.into_async_read()),
            exit: Box::pin(async move { exit_rx.await.unwrap_or(None) }),
        })
    }
}

/// A server directory containing a jar.
pub fn server_dir() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("server.jar"), b"jar").unwrap();
    dir
}

pub async fn wait_for_status(supervisor: &Supervisor, status: ServerStatus) -> bool {
    let mut rx = supervisor.subscribe_status();
    tokio::time::timeout(WAIT, rx.wait_for(|s| *s == status))
        .await
        .map(|r| r.is_ok())
        .unwrap_or(false)
}
