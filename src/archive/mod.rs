//! Compressed snapshots of the managed server directory.
//!
//! [`ArchiveCoordinator`] writes zip archives of the managed directory into
//! its reserved archive subdirectory, on demand or on a recurring timer.
//! Progress and results go out as `backup-log` notifications.

mod coordinator;
mod timer;

pub use coordinator::{
    AUTO_REASON, ArchiveCoordinator, ArchiveReport, DEFAULT_REASON, MAX_AUTO_INTERVAL,
};
