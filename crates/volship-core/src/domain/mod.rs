//! Domain model (work items, run state, outcomes, errors).

pub mod errors;
pub mod outcome;
pub mod state;
pub mod work_item;

pub use self::errors::{
    BuildError, CleanupError, ConfigError, DeliveryError, FetchError, ScanWarning,
};
pub use self::outcome::{CleanupStatus, ExternalOutcome, ItemOutcome, ItemStatus, RunReport};
pub use self::state::RunState;
pub use self::work_item::{
    ARCHIVE_EXTENSION, ArchiveArtifact, EXTERNAL_BACKUP_FILE_NAME, TIMESTAMP_FORMAT, WorkItem,
    archive_file_name, log_file_name, run_dir_name,
};
