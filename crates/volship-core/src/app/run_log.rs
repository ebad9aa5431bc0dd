//! RunLog - 実行ログのファイル出力
//!
//! The logger writes every formatted record through a `RunLogWriter`, which
//! mirrors it to stderr and to the run's log file. The file only exists once
//! the run directory does, so records written before `attach` are buffered
//! and flushed into the file when it is attached. While the file itself is
//! being uploaded, appends are held back the same way so the upload sees a
//! fixed length.

use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Default)]
struct State {
    pending: Vec<u8>,
    file: Option<(PathBuf, File)>,
    suspended: bool,
}

impl State {
    fn append(&mut self, buf: &[u8]) -> io::Result<()> {
        match self.file.as_mut() {
            Some((_, file)) if !self.suspended => file.write_all(buf),
            _ => {
                self.pending.extend_from_slice(buf);
                Ok(())
            }
        }
    }
}

/// Shared handle to the run log. Cloning shares the same file.
#[derive(Clone, Default)]
pub struct RunLog {
    state: Arc<Mutex<State>>,
}

impl RunLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer for the logger backend.
    pub fn writer(&self) -> RunLogWriter {
        RunLogWriter {
            state: self.state.clone(),
        }
    }

    /// Create the log file at `path` and flush everything buffered so far.
    pub fn attach(&self, path: &Path) -> io::Result<()> {
        let mut file = File::create(path)?;
        let mut state = lock(&self.state);
        file.write_all(&state.pending)?;
        state.pending.clear();
        state.file = Some((path.to_path_buf(), file));
        Ok(())
    }

    /// Path of the attached log file, if any.
    pub fn path(&self) -> Option<PathBuf> {
        lock(&self.state).file.as_ref().map(|(p, _)| p.clone())
    }

    pub fn flush(&self) -> io::Result<()> {
        match lock(&self.state).file.as_mut() {
            Some((_, file)) => file.flush(),
            None => Ok(()),
        }
    }

    /// Hold new records in memory until `resume`.
    pub fn suspend(&self) {
        lock(&self.state).suspended = true;
    }

    /// Write held records to the file and go back to appending directly.
    pub fn resume(&self) -> io::Result<()> {
        let mut state = lock(&self.state);
        state.suspended = false;
        let pending = std::mem::take(&mut state.pending);
        state.append(&pending)
    }
}

// A poisoned lock only means another writer panicked mid-line.
fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct RunLogWriter {
    state: Arc<Mutex<State>>,
}

impl Write for RunLogWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        // stderr going away must not stop the run.
        let _ = io::stderr().write_all(buf);
        lock(&self.state).append(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        let _ = io::stderr().flush();
        match lock(&self.state).file.as_mut() {
            Some((_, file)) => file.flush(),
            None => Ok(()),
        }
    }
}
