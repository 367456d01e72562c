use super::timer::AutoArchiveTimer;
use crate::error::{Error, Result};
use crate::notify::{LogLine, Notification, NotificationSink};
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::runtime::Handle;
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Reason used when the caller gives none.
pub const DEFAULT_REASON: &str = "backup";
/// Reason used by the recurring timer.
pub const AUTO_REASON: &str = "auto";
/// Longest interval the recurring archive accepts; longer ones are clamped.
pub const MAX_AUTO_INTERVAL: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// Outcome of one archive run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArchiveReport {
    /// File name inside the archive directory
    pub file_name: String,
    /// Full path of the archive
    pub path: PathBuf,
    /// Files written to the archive
    pub archived: usize,
    /// Entries that could not be read
    pub skipped: usize,
}

pub(super) struct Shared {
    dir_name: String,
    sink: Arc<dyn NotificationSink>,
    root: Mutex<Option<PathBuf>>,
    timer: Mutex<Option<AutoArchiveTimer>>,
    runtime: Mutex<Option<Handle>>,
}

/// Produces compressed snapshots of the managed directory.
///
/// Archives land in a reserved subdirectory of the managed directory, which
/// is itself never archived. Runs are synchronous and may take a while on a
/// large world; call them from a blocking context.
///
/// # Examples
///
/// ```no_run
/// use mineserve::archive::ArchiveCoordinator;
/// use mineserve::notify::TracingSink;
/// use std::sync::Arc;
///
/// let archives = ArchiveCoordinator::new("backups", Arc::new(TracingSink));
/// archives.bind("/srv/minecraft").unwrap();
/// let report = archives.create_archive(Some("before-update")).unwrap();
/// println!("{} files in {}", report.archived, report.file_name);
/// ```
#[derive(Clone)]
pub struct ArchiveCoordinator {
    shared: Arc<Shared>,
}

impl ArchiveCoordinator {
    /// Creates an unbound coordinator.
    ///
    /// When called inside a tokio runtime, that runtime hosts the recurring
    /// archive timer regardless of where it is later configured from.
    pub fn new(dir_name: impl Into<String>, sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            shared: Arc::new(Shared {
                dir_name: dir_name.into(),
                sink,
                root: Mutex::new(None),
                timer: Mutex::new(None),
                runtime: Mutex::new(Handle::try_current().ok()),
            }),
        }
    }

    /// Runs the recurring archive timer on `runtime` from now on.
    pub fn set_runtime(&self, runtime: Handle) {
        *lock(&self.shared.runtime) = Some(runtime);
    }

    /// Name of the reserved archive subdirectory.
    pub fn dir_name(&self) -> &str {
        &self.shared.dir_name
    }

    /// Binds the managed directory and creates its archive subdirectory.
    /// An empty path unbinds it.
    pub fn bind(&self, root: impl AsRef<Path>) -> Result<Option<PathBuf>> {
        let root = root.as_ref();
        if root.as_os_str().is_empty() {
            *lock(&self.shared.root) = None;
            return Ok(None);
        }
        if !root.is_dir() {
            return self
                .shared
                .fail(Error::DirectoryNotFound(root.to_path_buf()));
        }
        let root = std::path::absolute(root)?;
        let archive_dir = root.join(&self.shared.dir_name);
        std::fs::create_dir_all(&archive_dir).or_else(|e| {
            self.shared.fail(Error::Archive(format!(
                "Failed to create {}: {}",
                archive_dir.display(),
                e
            )))
        })?;
        tracing::debug!(dir = %archive_dir.display(), "Archive directory ready");
        *lock(&self.shared.root) = Some(root.clone());
        Ok(Some(root))
    }

    /// Archive subdirectory of the bound managed directory.
    pub fn archive_dir(&self) -> Option<PathBuf> {
        lock(&self.shared.root)
            .as_ref()
            .map(|root| root.join(&self.shared.dir_name))
    }

    /// Archives the managed directory now.
    ///
    /// The file is named `<reason>-<UTC timestamp>.zip`. Entries that cannot
    /// be read are skipped and counted; only failures to produce the archive
    /// file itself are errors.
    pub fn create_archive(&self, reason: Option<&str>) -> Result<ArchiveReport> {
        self.shared.create_archive(reason.unwrap_or(DEFAULT_REASON))
    }

    /// Enables or disables the recurring archive. An interval of zero
    /// minutes or less disables it, as does `enabled == false`. Intervals
    /// above [`MAX_AUTO_INTERVAL`] are clamped to it.
    pub fn configure_auto_archive(&self, enabled: bool, interval_minutes: i64) {
        let interval = (enabled && interval_minutes > 0).then(|| {
            u64::try_from(interval_minutes)
                .ok()
                .and_then(|minutes| minutes.checked_mul(60))
                .map_or(MAX_AUTO_INTERVAL, Duration::from_secs)
        });
        self.set_auto_archive_interval(interval);
    }

    /// Replaces the recurring archive timer; `None` stops it.
    ///
    /// The timer runs on the runtime the coordinator was created in, or the
    /// caller's runtime when there is none. Without either, nothing is
    /// scheduled and a backup-log error is sent.
    pub fn set_auto_archive_interval(&self, interval: Option<Duration>) {
        let mut timer = lock(&self.shared.timer);
        if let Some(previous) = timer.take() {
            previous.stop();
        }

        match interval.filter(|i| !i.is_zero()) {
            Some(interval) => {
                if interval > MAX_AUTO_INTERVAL {
                    tracing::warn!(
                        requested_secs = interval.as_secs(),
                        "Automatic archive interval clamped"
                    );
                }
                let interval = interval.min(MAX_AUTO_INTERVAL);
                let runtime = lock(&self.shared.runtime)
                    .clone()
                    .or_else(|| Handle::try_current().ok());
                let Some(runtime) = runtime else {
                    tracing::error!("No tokio runtime for the automatic archive timer");
                    self.shared.notify(LogLine::error(
                        "Automatic backups could not be scheduled",
                    ));
                    return;
                };
                *timer = Some(AutoArchiveTimer::start(
                    &runtime,
                    Arc::downgrade(&self.shared),
                    interval,
                ));
                tracing::info!(interval_secs = interval.as_secs(), "Automatic archives enabled");
                self.shared.notify(LogLine::info(format!(
                    "Automatic backups enabled every {}",
                    describe_interval(interval)
                )));
            }
            None => {
                tracing::info!("Automatic archives disabled");
                self.shared
                    .notify(LogLine::info("Automatic backups disabled"));
            }
        }
    }

    /// Interval of the running timer, if any.
    pub fn auto_archive_interval(&self) -> Option<Duration> {
        lock(&self.shared.timer).as_ref().map(|t| t.interval())
    }
}

impl std::fmt::Debug for ArchiveCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveCoordinator")
            .field("dir_name", &self.shared.dir_name)
            .field("archive_dir", &self.archive_dir())
            .field("auto_interval", &self.auto_archive_interval())
            .finish()
    }
}

impl Shared {
    fn notify(&self, line: LogLine) {
        self.sink.notify(Notification::BackupLog(line));
    }

    fn fail<T>(&self, error: Error) -> Result<T> {
        tracing::warn!(error = %error, "Archive operation failed");
        self.notify(LogLine::error(format!("Backup failed: {}", error)));
        Err(error)
    }

    pub(super) fn create_archive(&self, reason: &str) -> Result<ArchiveReport> {
        let Some(root) = lock(&self.root).clone() else {
            return self.fail(Error::DirectoryUnbound);
        };
        let archive_dir = root.join(&self.dir_name);
        if let Err(e) = std::fs::create_dir_all(&archive_dir) {
            return self.fail(Error::Archive(format!(
                "Failed to create {}: {}",
                archive_dir.display(),
                e
            )));
        }

        let stamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%SZ");
        let base = format!("{}-{}", sanitize_reason(reason), stamp);
        let (path, file) = match create_unique(&archive_dir, &base) {
            Ok(created) => created,
            Err(e) => {
                return self.fail(Error::Archive(format!("Failed to create archive file: {}", e)));
            }
        };
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::info!(file = %file_name, "Creating archive");
        self.notify(LogLine::info(format!("Creating backup {}...", file_name)));

        let mut writer = ArchiveWriter {
            zip: ZipWriter::new(file),
            root: &root,
            skip: &self.dir_name,
            archived: 0,
            skipped: 0,
        };
        let walked = writer.add_children(&root, "");
        let ArchiveWriter {
            zip,
            archived,
            skipped,
            ..
        } = writer;
        let written = walked.and_then(|()| {
            zip.finish()
                .map(|_| ())
                .map_err(|e| Error::Archive(format!("Failed to finish archive: {}", e)))
        });

        if let Err(e) = written {
            let _ = std::fs::remove_file(&path);
            return self.fail(e);
        }
        if !path.is_file() {
            return self.fail(Error::Archive(format!(
                "{} is missing after writing",
                path.display()
            )));
        }

        tracing::info!(file = %file_name, archived, skipped, "Archive created");
        self.notify(LogLine::success(format!(
            "Backup created: {} ({} files, {} skipped)",
            file_name, archived, skipped
        )));
        Ok(ArchiveReport {
            file_name,
            path,
            archived,
            skipped,
        })
    }
}

struct ArchiveWriter<'a> {
    zip: ZipWriter<File>,
    root: &'a Path,
    skip: &'a str,
    archived: usize,
    skipped: usize,
}

impl ArchiveWriter<'_> {
    /// Adds every entry below `dir`, whose name inside the archive is `prefix`.
    fn add_children(&mut self, dir: &Path, prefix: &str) -> Result<()> {
        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(e) if prefix.is_empty() => {
                return Err(Error::Archive(format!(
                    "Failed to read {}: {}",
                    dir.display(),
                    e
                )));
            }
            Err(e) => {
                tracing::warn!(dir = %dir.display(), error = %e, "Skipping unreadable directory");
                self.skipped += 1;
                return Ok(());
            }
        };

        let mut entries = entries
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!(error = %e, "Skipping unreadable entry");
                    self.skipped += 1;
                    None
                }
            })
            .collect::<Vec<_>>();
        entries.sort_by_key(|e| e.file_name());

        for entry in entries {
            let name = entry.file_name().to_string_lossy().into_owned();
            if prefix.is_empty() && dir == self.root && name == self.skip {
                continue;
            }
            let entry_name = format!("{}{}", prefix, name);
            let path = entry.path();

            match entry.file_type() {
                Ok(kind) if kind.is_dir() => {
                    self.zip
                        .add_directory(format!("{}/", entry_name), options(0))
                        .map_err(|e| Error::Archive(format!("Failed to add {}: {}", entry_name, e)))?;
                    self.add_children(&path, &format!("{}/", entry_name))?;
                }
                Ok(kind) if kind.is_file() => self.add_file(&path, &entry_name)?,
                Ok(_) => {
                    tracing::debug!(path = %path.display(), "Skipping special file");
                    self.skipped += 1;
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "Skipping entry");
                    self.skipped += 1;
                }
            }
        }
        Ok(())
    }

    fn add_file(&mut self, path: &Path, entry_name: &str) -> Result<()> {
        let opened = File::open(path).and_then(|file| Ok((file.metadata()?.len(), file)));
        let (size, mut file) = match opened {
            Ok(opened) => opened,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                self.skipped += 1;
                return Ok(());
            }
        };
        self.zip
            .start_file(entry_name, options(size))
            .map_err(|e| Error::Archive(format!("Failed to add {}: {}", entry_name, e)))?;

        if let Err(e) = std::io::copy(&mut file, &mut self.zip) {
            // A file locked or truncated mid-read must not leave a partial entry
            tracing::warn!(path = %path.display(), error = %e, "Skipping file that failed mid-copy");
            self.zip
                .abort_file()
                .map_err(|e| Error::Archive(format!("Failed to drop {}: {}", entry_name, e)))?;
            self.skipped += 1;
            return Ok(());
        }
        self.archived += 1;
        Ok(())
    }
}

fn options(size: u64) -> SimpleFileOptions {
    SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Deflated)
        .large_file(size > u32::MAX as u64)
}

/// Creates `<base>.zip`, or `<base>-N.zip` if that name is taken.
fn create_unique(dir: &Path, base: &str) -> std::io::Result<(PathBuf, File)> {
    let mut attempt = 0usize;
    loop {
        let name = if attempt == 0 {
            format!("{}.zip", base)
        } else {
            format!("{}-{}.zip", base, attempt)
        };
        let path = dir.join(name);
        match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => return Ok((path, file)),
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists && attempt < 1000 => {
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

fn sanitize_reason(reason: &str) -> String {
    let cleaned: String = reason
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('-');
    if cleaned.is_empty() {
        DEFAULT_REASON.to_string()
    } else {
        cleaned.to_string()
    }
}

fn describe_interval(interval: Duration) -> String {
    let secs = interval.as_secs();
    if secs >= 60 && secs % 60 == 0 {
        let minutes = secs / 60;
        format!("{} minute{}", minutes, if minutes == 1 { "" } else { "s" })
    } else {
        format!("{:?}", interval)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
