//! DeliverySink port - 配送先の抽象化
//!
//! A single preconfigured destination that accepts text messages and files.
//! Archives, the run log, the external backup and every notice go through it.

use std::path::Path;

use async_trait::async_trait;

use crate::domain::DeliveryError;

/// DeliverySink は1つの宛先へメッセージとファイルを送る
///
/// # 設計原則
/// - リトライしない（呼び出し側が失敗の扱いを決める）
/// - ローカルファイルを変更しない（読むだけ）
/// - すべての呼び出しに期限がある（期限切れは `DeliveryError::Timeout`）
#[async_trait]
pub trait DeliverySink: Send + Sync {
    /// Send a text notification.
    async fn send_message(&self, text: &str) -> Result<(), DeliveryError>;

    /// Send the file at `path` as a single document.
    async fn send_file(&self, path: &Path) -> Result<(), DeliveryError>;
}
