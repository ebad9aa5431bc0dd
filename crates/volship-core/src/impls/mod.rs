//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **TelegramSink**: Bot API への配送（本番用）
//! - **HttpBackupFetcher**: 外部バックアップ API の呼び出し（本番用）
//! - **RecordingSink / StaticBackupSource**: dry-run とテスト用

pub mod http_backup;
pub mod inmem_sink;
pub mod telegram;

#[cfg(test)]
pub(crate) mod test_http;

pub use self::http_backup::HttpBackupFetcher;
pub use self::inmem_sink::{FailurePlan, RecordingSink, SentFile, StaticBackupSource};
pub use self::telegram::TelegramSink;
