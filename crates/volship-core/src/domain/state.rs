//! State - 実行の状態
//!
//! # 状態遷移
//! Starting → Scanning → PerItem → LoggingOut → FetchingExternal → Completed
//!
//! No transition is skipped and none aborts the run. Configuration failures
//! happen before `Starting` and never produce a state at all.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Starting,
    Scanning,
    PerItem,
    LoggingOut,
    FetchingExternal,
    Completed,
}

impl RunState {
    /// The state that follows this one. `Completed` is terminal.
    pub fn next(self) -> Option<RunState> {
        match self {
            RunState::Starting => Some(RunState::Scanning),
            RunState::Scanning => Some(RunState::PerItem),
            RunState::PerItem => Some(RunState::LoggingOut),
            RunState::LoggingOut => Some(RunState::FetchingExternal),
            RunState::FetchingExternal => Some(RunState::Completed),
            RunState::Completed => None,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RunState::Starting => "starting",
            RunState::Scanning => "scanning",
            RunState::PerItem => "per-item",
            RunState::LoggingOut => "logging-out",
            RunState::FetchingExternal => "fetching-external",
            RunState::Completed => "completed",
        };
        f.write_str(s)
    }
}
