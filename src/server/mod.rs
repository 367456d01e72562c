/// Server management module for mineserve.
///
/// This module owns the game server process: launching it from the managed
/// directory, pumping its output through the classifier, tracking the status
/// and the set of connected players, and writing console commands to it.
/// All public operations are instrumented with `tracing` spans.
///
/// # Components
///
/// * `supervisor` - The [`Supervisor`] facade holding at most one process
/// * `state` - The pure status/membership state machine ([`RunState`])
/// * `process` - The [`Launcher`] seam and the OS-process implementation
/// * `lines` - Reassembly of output chunks into complete lines
/// * `details` - Installer metadata stored next to the server
///
/// # Examples
///
/// Driving the state machine without a process:
///
/// ```
/// use mineserve::classifier::{LogClassifier, OutputStream};
/// use mineserve::server::{RunState, ServerStatus};
///
/// let classifier = LogClassifier::default();
/// let mut state = RunState::new();
/// state.begin_start();
/// state.apply(&classifier.classify("[Server thread/INFO]: Alice joined the game", OutputStream::Stdout));
/// state.apply(&classifier.classify(r#"Done (3.2s)! For help, type "help""#, OutputStream::Stdout));
///
/// assert_eq!(state.status(), ServerStatus::Online);
/// assert_eq!(state.players().names(), vec!["Alice"]);
/// ```
mod details;
mod lines;
mod process;
mod state;
mod supervisor;

pub use details::{DETAILS_FILE, ServerDetails, read_details};
pub use lines::LineBuffer;
pub use process::{
    LaunchSpec, Launcher, ProcessId, ProcessInput, ProcessLauncher, ProcessOutput, SpawnedProcess,
};
pub use state::{PlayerSet, RunState, ServerStatus};
pub use supervisor::{ResetReport, Supervisor};
