//! Errors - エラー型と分類
//!
//! Only `ConfigError` is fatal, and only before a run starts. Every other
//! error here is recovered inside the run: logged, recorded in the report,
//! never propagated out of the orchestrator.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Missing or malformed configuration. Aborts before any side effect.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("required environment variable {0} is not set")]
    Missing(&'static str),

    #[error("invalid value [{value}] for {var}: {reason}")]
    Invalid {
        var: &'static str,
        value: String,
        reason: String,
    },
}

/// A root path could not be listed. Only that root is skipped.
#[derive(Debug, Error)]
#[error("cannot access path [{}]: {source}", .root.display())]
pub struct ScanWarning {
    pub root: PathBuf,
    #[source]
    pub source: io::Error,
}

/// Archiving one folder failed. The item is neither delivered nor deleted.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("source [{}] has no base name to root the archive at", .0.display())]
    InvalidSource(PathBuf),

    #[error("cannot compress [{}] to [{}]: {source}", .source_dir.display(), .destination.display())]
    Io {
        source_dir: PathBuf,
        destination: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("archive task aborted: {0}")]
    Join(String),
}

/// Sending a message or file to the destination failed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("cannot open [{}] for upload: {source}", .path.display())]
    OpenFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("rejected by destination (status {status}): {description}")]
    Rejected { status: u16, description: String },
}

/// A temporary artifact could not be deleted. The file leaks.
#[derive(Debug, Error)]
#[error("error while deleting [{}]: {source}", .path.display())]
pub struct CleanupError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

/// The external backup call failed or produced no usable blob.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("unexpected HTTP status {0}")]
    Status(u16),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out")]
    Timeout,

    #[error("cannot write [{}]: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_error_names_both_paths() {
        let err = BuildError::Io {
            source_dir: PathBuf::from("/data/a"),
            destination: PathBuf::from("/tmp/run/a.tar.gz"),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        };
        let msg = err.to_string();
        assert!(msg.contains("[/data/a]"));
        assert!(msg.contains("[/tmp/run/a.tar.gz]"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn config_error_mentions_variable() {
        assert_eq!(
            ConfigError::Missing("BOT_TOKEN").to_string(),
            "required environment variable BOT_TOKEN is not set"
        );
    }
}
