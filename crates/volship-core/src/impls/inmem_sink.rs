//! In-memory sink and backup source (dry runs and tests)
//!
//! `RecordingSink` keeps every message and file it is handed instead of
//! sending them anywhere. It can be told to fail on purpose so the
//! orchestrator's failure paths can be exercised without a network.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use log::info;

use crate::domain::{DeliveryError, FetchError};
use crate::ports::{BackupSource, DeliverySink};

/// Which calls a `RecordingSink` should fail.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FailurePlan {
    #[default]
    Never,
    /// Fail the file uploads with these zero-based indices.
    Files(Vec<usize>),
    /// Fail every file upload and every message.
    Everything,
}

/// A file handed to the sink. `contents` is filled only with `keeping_contents`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentFile {
    pub path: PathBuf,
    pub contents: Vec<u8>,
    pub delivered: bool,
}

#[derive(Debug, Default)]
struct Recorded {
    messages: Vec<String>,
    files: Vec<SentFile>,
}

#[derive(Debug, Default)]
pub struct RecordingSink {
    plan: FailurePlan,
    keep_contents: bool,
    recorded: Mutex<Recorded>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(plan: FailurePlan) -> Self {
        Self {
            plan,
            ..Self::default()
        }
    }

    /// Also keep the bytes of every file (tests inspect archives this way).
    pub fn keeping_contents(mut self) -> Self {
        self.keep_contents = true;
        self
    }

    /// Messages accepted or attempted, in order.
    pub fn messages(&self) -> Vec<String> {
        self.lock().messages.clone()
    }

    /// Files attempted, in order.
    pub fn files(&self) -> Vec<SentFile> {
        self.lock().files.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Recorded> {
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn file_should_fail(&self, index: usize) -> bool {
        match &self.plan {
            FailurePlan::Never => false,
            FailurePlan::Files(indices) => indices.contains(&index),
            FailurePlan::Everything => true,
        }
    }
}

#[async_trait]
impl DeliverySink for RecordingSink {
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError> {
        self.lock().messages.push(text.to_string());
        if self.plan == FailurePlan::Everything {
            return Err(DeliveryError::Transport("injected failure".to_string()));
        }
        info!("[dry-run] message: {text}");
        Ok(())
    }

    async fn send_file(&self, path: &Path) -> Result<(), DeliveryError> {
        let open_error = |source| DeliveryError::OpenFile {
            path: path.to_path_buf(),
            source,
        };
        let len = tokio::fs::metadata(path).await.map_err(open_error)?.len();
        let contents = if self.keep_contents {
            tokio::fs::read(path).await.map_err(open_error)?
        } else {
            Vec::new()
        };

        let mut recorded = self.lock();
        let index = recorded.files.len();
        let delivered = !self.file_should_fail(index);
        info!("[dry-run] file: [{}] ({} bytes)", path.display(), len);
        recorded.files.push(SentFile {
            path: path.to_path_buf(),
            contents,
            delivered,
        });

        if delivered {
            Ok(())
        } else {
            Err(DeliveryError::Rejected {
                status: 400,
                description: "injected failure".to_string(),
            })
        }
    }
}

/// Backup source with a canned answer.
#[derive(Debug, Clone)]
pub enum StaticBackupSource {
    /// Write these bytes to the destination.
    Blob(Vec<u8>),
    /// Answer with this HTTP status and write nothing.
    Status(u16),
}

#[async_trait]
impl BackupSource for StaticBackupSource {
    async fn fetch(&self, destination: &Path) -> Result<(), FetchError> {
        match self {
            StaticBackupSource::Blob(bytes) => tokio::fs::write(destination, bytes)
                .await
                .map_err(|source| FetchError::Write {
                    path: destination.to_path_buf(),
                    source,
                }),
            StaticBackupSource::Status(code) => Err(FetchError::Status(*code)),
        }
    }
}
