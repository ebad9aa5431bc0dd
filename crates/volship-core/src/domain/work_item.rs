//! Work items and the files a run produces for them.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, TimeZone};

/// strftime pattern shared by archive names, log names and the run directory.
pub const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// The single codec of the run: gzip-compressed tar.
pub const ARCHIVE_EXTENSION: &str = "tar.gz";

/// Fixed name of the externally fetched backup inside the run directory.
pub const EXTERNAL_BACKUP_FILE_NAME: &str = "external-backup.bin";

/// One directory discovered under a root path.
///
/// `display_name` is the directory's base name. It becomes the top-level entry
/// inside the archive and the prefix of the archive file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source_path: PathBuf,
    pub display_name: String,
}

impl WorkItem {
    /// Build a work item from a directory path.
    ///
    /// Returns `None` for paths without a final component (`/`, `..`).
    pub fn from_dir(source_path: impl Into<PathBuf>) -> Option<Self> {
        let source_path = source_path.into();
        let display_name = source_path.file_name()?.to_string_lossy().into_owned();
        Some(Self {
            source_path,
            display_name,
        })
    }
}

impl fmt::Display for WorkItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source_path.display())
    }
}

/// A finished archive on local disk, waiting for delivery and deletion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveArtifact {
    path: PathBuf,
}

impl ArchiveArtifact {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// `{display_name}-{YYYYMMDD_HHMMSS}.tar.gz`
pub fn archive_file_name<Tz>(display_name: &str, at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!(
        "{}-{}.{}",
        display_name,
        at.format(TIMESTAMP_FORMAT),
        ARCHIVE_EXTENSION
    )
}

/// `{YYYYMMDD_HHMMSS}.txt`
pub fn log_file_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    format!("{}.txt", at.format(TIMESTAMP_FORMAT))
}

/// Name of the per-run directory below the temp root.
pub fn run_dir_name<Tz>(at: &DateTime<Tz>) -> String
where
    Tz: TimeZone,
    Tz::Offset: fmt::Display,
{
    at.format(TIMESTAMP_FORMAT).to_string()
}
