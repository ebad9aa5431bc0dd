//! BackupSource port - 外部システムのバックアップ取得
//!
//! Independent of the scan/archive pipeline. The orchestrator hands it a
//! destination path inside the run directory and delivers whatever lands
//! there.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::FetchError;

#[async_trait]
pub trait BackupSource: Send + Sync {
    /// Materialize the external backup at `destination`.
    ///
    /// On error no file is left at `destination`.
    async fn fetch(&self, destination: &Path) -> Result<(), FetchError>;
}
