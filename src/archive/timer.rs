use super::coordinator::{AUTO_REASON, Shared};
use std::sync::Weak;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Background task archiving on a fixed interval.
///
/// Holds only a weak reference to the coordinator, so dropping the last
/// coordinator handle ends the loop at its next tick.
pub(super) struct AutoArchiveTimer {
    interval: Duration,
    task: JoinHandle<()>,
}

impl AutoArchiveTimer {
    /// Spawns the timer on `runtime`. The first archive happens one interval
    /// from now.
    pub(super) fn start(runtime: &Handle, shared: Weak<Shared>, interval: Duration) -> Self {
        let task = runtime.spawn(async move {
            let now = Instant::now();
            let first = now.checked_add(interval).unwrap_or(now);
            let mut ticker = time::interval_at(first, interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                let Some(shared) = shared.upgrade() else {
                    tracing::debug!("Archive coordinator dropped, stopping timer");
                    break;
                };

                tracing::debug!("Automatic archive tick");
                match tokio::task::spawn_blocking(move || shared.create_archive(AUTO_REASON)).await {
                    Ok(Ok(report)) => {
                        tracing::debug!(file = %report.file_name, "Automatic archive finished");
                    }
                    // Already reported on the notification channel
                    Ok(Err(e)) => tracing::debug!(error = %e, "Automatic archive failed"),
                    Err(e) => tracing::error!(error = %e, "Automatic archive task panicked"),
                }
            }
        });

        Self { interval, task }
    }

    pub(super) fn interval(&self) -> Duration {
        self.interval
    }

    /// Cancels the timer. An archive already in progress runs to completion.
    pub(super) fn stop(self) {
        self.task.abort();
    }
}

impl Drop for AutoArchiveTimer {
    fn drop(&mut self) {
        self.task.abort();
    }
}
