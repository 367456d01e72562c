use crate::config::ServerConfig;
use crate::error::{Error, Result};
use async_process::{Command, Stdio};
use async_trait::async_trait;
use futures::future::BoxFuture;
use futures::io::{AsyncRead, AsyncWrite};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use uuid::Uuid;

/// Identifies one run of the server process.
///
/// Output and exit signals carry the id of the run that produced them, so
/// late signals from a previous run are never applied to the current one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(Uuid);

impl ProcessId {
    pub(crate) fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ProcessId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything needed to spawn the server process.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    /// Executable
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub working_dir: PathBuf,
    /// Extra environment variables
    pub env: HashMap<String, String>,
}

impl LaunchSpec {
    /// Builds the java command line for `dir` from the launch settings.
    pub fn java(config: &ServerConfig, dir: &Path) -> Self {
        Self {
            program: config.java.clone(),
            args: config.launch_args(),
            working_dir: dir.to_path_buf(),
            env: config.env.clone(),
        }
    }
}

pub type ProcessInput = Pin<Box<dyn AsyncWrite + Send>>;
pub type ProcessOutput = Pin<Box<dyn AsyncRead + Send>>;

/// A live child process, split into its pipes and an exit future.
pub struct SpawnedProcess {
    /// OS process id, when known
    pub pid: Option<u32>,
    /// Standard input
    pub stdin: ProcessInput,
    /// Standard output
    pub stdout: ProcessOutput,
    /// Standard error
    pub stderr: ProcessOutput,
    /// Resolves with the exit code once the process has exited
    pub exit: BoxFuture<'static, Option<i32>>,
}

impl fmt::Debug for SpawnedProcess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnedProcess")
            .field("pid", &self.pid)
            .finish_non_exhaustive()
    }
}

/// Spawns server processes.
///
/// The supervisor only talks to the process through this trait, so tests can
/// substitute scripted output for a real JVM.
#[async_trait]
pub trait Launcher: Send + Sync {
    async fn launch(&self, spec: &LaunchSpec) -> Result<SpawnedProcess>;
}

/// Launches real OS processes with piped stdio.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessLauncher;

#[async_trait]
impl Launcher for ProcessLauncher {
    #[tracing::instrument(skip(self, spec), fields(program = %spec.program, dir = %spec.working_dir.display()))]
    async fn launch(&self, spec: &LaunchSpec) -> Result<SpawnedProcess> {
        let mut command = Command::new(&spec.program);
        command.args(&spec.args).current_dir(&spec.working_dir);

        // Set environment variables
        for (key, value) in &spec.env {
            command.env(key, value);
        }

        // Configure stdio
        command
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = command
            .spawn()
            .map_err(|e| Error::Process(format!("Failed to start process: {}", e)))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            Error::Process("Failed to get stdin pipe from child process".to_string())
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            Error::Process("Failed to get stdout pipe from child process".to_string())
        })?;
        let stderr = child.stderr.take().ok_or_else(|| {
            Error::Process("Failed to get stderr pipe from child process".to_string())
        })?;

        let pid = child.id();
        tracing::info!(pid, "Server process spawned");

        let exit = Box::pin(async move {
            match child.status().await {
                Ok(status) => status.code(),
                Err(e) => {
                    tracing::warn!(error = %e, pid, "Failed to wait for server process");
                    None
                }
            }
        });

        Ok(SpawnedProcess {
            pid: Some(pid),
            stdin: Box::pin(stdin),
            stdout: Box::pin(stdout),
            stderr: Box::pin(stderr),
            exit,
        })
    }
}
