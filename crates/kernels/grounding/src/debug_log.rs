//! Debug log - append-only diagnostic output
//!
//! The debug log is an injected capability, never ambient state: whoever
//! builds the grounding engine or the simulator hands it an
//! `Arc<dyn DebugLog>`. It is write-only; nothing in the engine reads it back.
//!
//! # Implementations
//!
//! - `FileDebugLog` - one file per (domain, instance), `debug_<domain>_<instance>.txt`
//! - `NullDebugLog` - discards everything (the default)
//!
//! Every line has the form `<ISO-8601 timestamp>: <message>`. Write failures
//! are reported through `tracing` and otherwise ignored.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use tracing::{trace, warn};

use crate::config::DebugLogConfig;
use crate::error::Result;

/// Sink for diagnostic messages.
pub trait DebugLog: Send + Sync {
    /// Append one message.
    fn write(&self, message: &str);

    /// Whether messages are recorded at all.
    ///
    /// Callers use this to skip formatting expensive messages.
    fn is_enabled(&self) -> bool {
        true
    }

    /// Flush buffered output.
    fn flush(&self) {}
}

/// Debug log that discards all messages.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDebugLog;

impl DebugLog for NullDebugLog {
    fn write(&self, _message: &str) {}

    fn is_enabled(&self) -> bool {
        false
    }
}

/// Append-only debug log file.
pub struct FileDebugLog {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl FileDebugLog {
    /// Create (or truncate) `debug_<domain>_<instance>.txt` inside `dir`.
    pub fn create(dir: &Path, domain: &str, instance: &str) -> Result<Self> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("debug_{}_{}.txt", domain, instance));
        let file = File::create(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl DebugLog for FileDebugLog {
    fn write(&self, message: &str) {
        trace!(target: "rddl_grounding::debug_log", "{}", message);
        let timestamp = chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.6f%:z");
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        // one line per message
        let line = message.replace('\n', " ");
        if let Err(e) = writeln!(writer, "{}: {}", timestamp, line) {
            warn!(path = %self.path.display(), error = %e, "debug log write failed");
        }
    }

    fn flush(&self) {
        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writer.flush() {
            warn!(path = %self.path.display(), error = %e, "debug log flush failed");
        }
    }
}

impl Drop for FileDebugLog {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open the debug log described by `config`, or a [`NullDebugLog`].
pub fn open_debug_log(
    config: Option<&DebugLogConfig>,
    domain: &str,
    instance: &str,
) -> Result<Arc<dyn DebugLog>> {
    match config {
        Some(cfg) => Ok(Arc::new(FileDebugLog::create(&cfg.dir, domain, instance)?)),
        None => Ok(Arc::new(NullDebugLog)),
    }
}
