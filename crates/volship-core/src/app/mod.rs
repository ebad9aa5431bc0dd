//! App - アプリケーション層
//!
//! ports を組み合わせて1回のバックアップ実行を組み立てます。
//!
//! # 主要コンポーネント
//! - **scanner**: ルート配下のディレクトリ列挙
//! - **archive**: ディレクトリ → tar.gz
//! - **run_log**: 実行ログ（stderr + ファイル）
//! - **Orchestrator**: 実行全体の順序と失敗の隔離

pub mod archive;
pub mod orchestrator;
pub mod run_log;
pub mod scanner;

pub use self::archive::build_archive;
pub use self::orchestrator::Orchestrator;
pub use self::run_log::{RunLog, RunLogWriter};
pub use self::scanner::{VolumeScan, scan};
