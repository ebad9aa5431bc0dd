//! Orchestrator - 1回のバックアップ実行
//!
//! # フロー
//! 1. Starting: 開始メッセージ
//! 2. 実行ディレクトリ作成（失敗時はカレントディレクトリ）
//! 3. Scanning: ルート配下のディレクトリ列挙
//! 4. PerItem: 圧縮 → 送信 → 削除（1件ずつ、失敗は次の件に持ち越さない）
//! 5. LoggingOut: 実行ログの送信
//! 6. FetchingExternal: 外部バックアップの取得と送信
//! 7. Completed: 完了メッセージ
//!
//! The per-item loop is a bulkhead: every error is logged and recorded in the
//! `RunReport`, and nothing escapes `run`.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Local};
use log::{debug, error, info, warn};

use super::archive::build_archive;
use super::run_log::RunLog;
use super::scanner::scan;
use crate::config::RunSettings;
use crate::domain::{
    BuildError, CleanupError, CleanupStatus, EXTERNAL_BACKUP_FILE_NAME, ExternalOutcome,
    ItemOutcome, ItemStatus, RunReport, WorkItem, archive_file_name, log_file_name, run_dir_name,
};
use crate::ports::{BackupSource, Clock, DeliverySink};

const ANNOUNCE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct Orchestrator {
    settings: RunSettings,
    sink: Arc<dyn DeliverySink>,
    backup_source: Option<Arc<dyn BackupSource>>,
    clock: Arc<dyn Clock>,
    run_log: RunLog,
}

/// A failed upload, and whether the fallback notice made it.
struct UndeliveredFile {
    reason: String,
    notice_sent: bool,
}

impl Orchestrator {
    pub fn new(
        settings: RunSettings,
        sink: Arc<dyn DeliverySink>,
        clock: Arc<dyn Clock>,
        run_log: RunLog,
    ) -> Self {
        Self {
            settings,
            sink,
            backup_source: None,
            clock,
            run_log,
        }
    }

    /// Enable the external backup step.
    pub fn with_backup_source(mut self, source: Arc<dyn BackupSource>) -> Self {
        self.backup_source = Some(source);
        self
    }

    /// Execute one run to completion.
    pub async fn run(&self) -> RunReport {
        let started = self.clock.now();
        let mut report = RunReport::new(PathBuf::new());

        debug!("Run state: {}", report.state);
        report.announced = self.announce_start(&started).await;

        report.run_dir = ensure_run_dir(&self.settings.temp_root, &started, working_dir);
        let log_path = report.run_dir.join(log_file_name(&started));
        if let Err(e) = self.run_log.attach(&log_path) {
            warn!("Cannot create log file [{}]: {}", log_path.display(), e);
        }

        advance(&mut report);
        let mut work = scan(self.settings.root_paths.clone());

        advance(&mut report);
        for item in work.by_ref() {
            let outcome = self.process_item(item, &report.run_dir).await;
            report.items.push(outcome);
        }
        report.scan_warnings = work.into_warnings();

        advance(&mut report);
        report.log_delivered = self.deliver_log().await;

        advance(&mut report);
        (report.external, report.external_cleanup) = self.fetch_external(&report.run_dir).await;

        advance(&mut report);
        let summary = report.summary();
        info!("Completed! {}", summary.replace('\n', " "));
        if let Err(e) = self.sink.send_message(&summary).await {
            error!("Cannot send completion message: {e}");
        }
        report
    }

    async fn announce_start(&self, started: &DateTime<Local>) -> bool {
        let text = format!(
            "{} {}",
            self.settings.start_message_prefix(),
            started.format(ANNOUNCE_TIME_FORMAT)
        );
        match self.sink.send_message(&text).await {
            Ok(()) => true,
            Err(e) => {
                warn!("Cannot send start message: {e}");
                false
            }
        }
    }

    async fn process_item(&self, item: WorkItem, run_dir: &Path) -> ItemOutcome {
        debug!("Processing: [{item}]");
        let archive_path = run_dir.join(archive_file_name(&item.display_name, &self.clock.now()));

        let built = {
            let source = item.source_path.clone();
            let destination = archive_path.clone();
            tokio::task::spawn_blocking(move || build_archive(&source, &destination))
                .await
                .unwrap_or_else(|e| Err(BuildError::Join(e.to_string())))
        };

        let artifact = match built {
            Ok(artifact) => artifact,
            Err(e) => {
                error!("{e}");
                return ItemOutcome {
                    item,
                    archive_path,
                    status: ItemStatus::BuildFailed(e.to_string()),
                    cleanup: CleanupStatus::NotNeeded,
                };
            }
        };
        info!("Successfully compressed: [{}]", artifact.path().display());

        let status = match self.deliver_file(artifact.path()).await {
            Ok(()) => ItemStatus::Delivered,
            Err(undelivered) => ItemStatus::DeliveryFailed {
                reason: undelivered.reason,
                notice_sent: undelivered.notice_sent,
            },
        };

        let cleanup = remove_artifact(artifact.path()).await;

        ItemOutcome {
            item,
            archive_path,
            status,
            cleanup,
        }
    }

    /// Upload `path`; on failure tell the destination about it instead.
    async fn deliver_file(&self, path: &Path) -> Result<(), UndeliveredFile> {
        let err = match self.sink.send_file(path).await {
            Ok(()) => {
                debug!("Document: [{}] was sent successfully", path.display());
                return Ok(());
            }
            Err(e) => e,
        };
        error!("Cannot send document [{}]: {}", path.display(), err);

        let notice = format!("Cannot send file [{}]: {}", path.display(), err);
        let notice_sent = match self.sink.send_message(&notice).await {
            Ok(()) => true,
            Err(e) => {
                error!("Cannot send failure notice for [{}]: {}", path.display(), e);
                false
            }
        };
        Err(UndeliveredFile {
            reason: err.to_string(),
            notice_sent,
        })
    }

    async fn deliver_log(&self) -> bool {
        let Some(path) = self.run_log.path() else {
            warn!("No log file to deliver");
            return false;
        };
        if let Err(e) = self.run_log.flush() {
            warn!("Cannot flush log file [{}]: {}", path.display(), e);
        }

        self.run_log.suspend();
        let delivered = self.sink.send_file(&path).await;
        if let Err(e) = self.run_log.resume() {
            warn!("Cannot write log file [{}]: {}", path.display(), e);
        }

        match delivered {
            Ok(()) => {
                debug!("Log file: [{}] was sent successfully", path.display());
                true
            }
            Err(e) => {
                error!("Cannot send log file [{}]: {}", path.display(), e);
                false
            }
        }
    }

    async fn fetch_external(&self, run_dir: &Path) -> (ExternalOutcome, CleanupStatus) {
        let Some(source) = self.backup_source.as_ref() else {
            debug!("External backup is not configured, skipping");
            return (ExternalOutcome::Disabled, CleanupStatus::NotNeeded);
        };

        let destination = run_dir.join(EXTERNAL_BACKUP_FILE_NAME);
        if let Err(e) = source.fetch(&destination).await {
            error!("External backup failed: {e}");
            if let Err(notice_err) = self
                .sink
                .send_message(&format!("External backup failed: {e}"))
                .await
            {
                error!("Cannot send external backup failure notice: {notice_err}");
            }
            return (ExternalOutcome::FetchFailed(e.to_string()), CleanupStatus::NotNeeded);
        }
        info!("External backup saved: [{}]", destination.display());

        let outcome = match self.deliver_file(&destination).await {
            Ok(()) => ExternalOutcome::Delivered,
            Err(undelivered) => ExternalOutcome::DeliveryFailed(undelivered.reason),
        };
        (outcome, remove_artifact(&destination).await)
    }
}

fn advance(report: &mut RunReport) {
    if let Some(next) = report.state.next() {
        debug!("Run state: {next}");
        report.state = next;
    }
}

fn working_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

/// Create `{temp_root}/{timestamp}`; on failure use `fallback()` instead.
pub(crate) fn ensure_run_dir(
    temp_root: &Path,
    started: &DateTime<Local>,
    fallback: impl FnOnce() -> PathBuf,
) -> PathBuf {
    let dir = temp_root.join(run_dir_name(started));
    if dir.is_dir() {
        warn!(
            "Folder: [{}] already exists, this could cause some troubles",
            dir.display()
        );
        return dir;
    }

    info!("Creating: [{}] folder", dir.display());
    match std::fs::create_dir_all(&dir) {
        Ok(()) => dir,
        Err(e) => {
            let fallback = fallback();
            error!(
                "Cannot create [{}]: {}, falling back to [{}]",
                dir.display(),
                e,
                fallback.display()
            );
            fallback
        }
    }
}

async fn remove_artifact(path: &Path) -> CleanupStatus {
    match tokio::fs::remove_file(path).await {
        Ok(()) => {
            debug!("File: [{}] was deleted successfully", path.display());
            CleanupStatus::Removed
        }
        Err(source) => {
            let err = CleanupError {
                path: path.to_path_buf(),
                source,
            };
            error!("{err}");
            CleanupStatus::Failed(err.to_string())
        }
    }
}
