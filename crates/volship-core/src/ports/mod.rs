//! Ports - 抽象化レイヤー
//!
//! 外部システム（配送先チャット、外部バックアップ API、時計）への
//! インターフェースを trait として定義します。
//! 本番用の実装は `impls` に、テスト用の実装も同じく `impls` に置きます。

pub mod backup_source;
pub mod clock;
pub mod delivery_sink;

pub use self::backup_source::BackupSource;
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::delivery_sink::DeliverySink;
