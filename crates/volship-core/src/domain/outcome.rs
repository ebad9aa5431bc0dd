//! Outcome model: what happened to each item and to the run as a whole.
//!
//! The orchestrator never returns an error. Instead every recovered failure
//! lands in a `RunReport`, which is what the completion announcement
//! summarises and what callers can inspect afterwards.

use std::path::PathBuf;

use super::errors::ScanWarning;
use super::state::RunState;
use super::work_item::WorkItem;

/// Failed folders named in the completion text before it is cut short.
/// Bot API messages are capped at 4096 characters.
pub const SUMMARY_ITEM_LIMIT: usize = 20;

/// Result of the build + deliver part of one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Archive built and sent.
    Delivered,

    /// Archive could not be built. Nothing was sent.
    BuildFailed(String),

    /// Archive built but the upload failed.
    /// `notice_sent` tells whether the fallback text notice got through.
    DeliveryFailed { reason: String, notice_sent: bool },
}

/// Result of removing the item's local archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CleanupStatus {
    Removed,
    Failed(String),
    /// No archive was created, so there was nothing to remove.
    NotNeeded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemOutcome {
    pub item: WorkItem,
    pub archive_path: PathBuf,
    pub status: ItemStatus,
    pub cleanup: CleanupStatus,
}

impl ItemOutcome {
    pub fn is_failure(&self) -> bool {
        !matches!(self.status, ItemStatus::Delivered)
            || matches!(self.cleanup, CleanupStatus::Failed(_))
    }
}

/// Result of the external backup step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExternalOutcome {
    /// No fetcher configured.
    Disabled,
    Delivered,
    FetchFailed(String),
    DeliveryFailed(String),
}

impl ExternalOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ExternalOutcome::FetchFailed(_) | ExternalOutcome::DeliveryFailed(_)
        )
    }
}

/// Everything a run did, in order.
#[derive(Debug)]
pub struct RunReport {
    pub run_dir: PathBuf,
    pub announced: bool,
    /// Roots that could not be listed. They are not failures: the default
    /// root list names several layouts and a host usually has only one.
    pub scan_warnings: Vec<ScanWarning>,
    pub items: Vec<ItemOutcome>,
    pub log_delivered: bool,
    pub external: ExternalOutcome,
    /// Removal of the fetched blob. `NotNeeded` when nothing was fetched.
    pub external_cleanup: CleanupStatus,
    pub state: RunState,
}

impl RunReport {
    pub fn new(run_dir: PathBuf) -> Self {
        Self {
            run_dir,
            announced: false,
            scan_warnings: Vec::new(),
            items: Vec::new(),
            log_delivered: false,
            external: ExternalOutcome::Disabled,
            external_cleanup: CleanupStatus::NotNeeded,
            state: RunState::Starting,
        }
    }

    pub fn delivered_count(&self) -> usize {
        self.items
            .iter()
            .filter(|o| o.status == ItemStatus::Delivered)
            .count()
    }

    pub fn failed_items(&self) -> impl Iterator<Item = &ItemOutcome> {
        self.items.iter().filter(|o| o.is_failure())
    }

    pub fn external_failed(&self) -> bool {
        self.external.is_failure() || matches!(self.external_cleanup, CleanupStatus::Failed(_))
    }

    /// Number of failures worth telling the operator about.
    pub fn failure_count(&self) -> usize {
        self.failed_items().count() + usize::from(self.external_failed())
    }

    /// Text of the completion announcement.
    pub fn summary(&self) -> String {
        let failures = self.failure_count();
        if failures == 0 {
            return format!(
                "Backup completed: {} folder(s) delivered",
                self.delivered_count()
            );
        }

        let mut text = format!(
            "Backup completed with {} failure(s): {} of {} folder(s) delivered",
            failures,
            self.delivered_count(),
            self.items.len()
        );
        let failed: Vec<_> = self.failed_items().collect();
        for outcome in failed.iter().take(SUMMARY_ITEM_LIMIT) {
            text.push_str(&format!("\n- {}", outcome.item.display_name));
        }
        if failed.len() > SUMMARY_ITEM_LIMIT {
            let more = failed.len() - SUMMARY_ITEM_LIMIT;
            text.push_str(&format!("\n... and {more} more"));
        }
        if self.external_failed() {
            text.push_str("\n- external backup");
        }
        text
    }
}
