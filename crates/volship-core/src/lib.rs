//! volship-core
//!
//! Core building blocks for the volship backup agent: discover volume
//! directories, archive each one, deliver the archives to a chat, and keep
//! every per-folder failure contained.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（work item, run state, outcome, errors）
//! - **ports**: 抽象化レイヤー（DeliverySink, BackupSource, Clock）
//! - **impls**: 実装（TelegramSink, HttpBackupFetcher, RecordingSink）
//! - **app**: アプリケーションロジック（scanner, archive, orchestrator）
//! - **config**: 環境変数からの設定

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{Orchestrator, RunLog};
pub use config::Config;
pub use domain::RunReport;
