//! Activity log - append-only record of session events
//!
//! One line per event:
//!
//! ```text
//! 2026-10-19 12:00:03 UTC [3f2a9c1e] Message sent {"thread":"t-1","chars":42}
//! ```
//!
//! Every write is fail-open: a log that cannot be written never disturbs
//! the session.

use cadence_core::fail_open::fail_open_sync;
use cadence_core::DiagnosticSink;
use chrono::Utc;
use serde_json::Value;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub struct ActivityLogger {
    output_path: PathBuf,
    session_tag: String,
    // Serializes appends so lines from concurrent tasks never interleave
    write_lock: Mutex<()>,
}

impl ActivityLogger {
    /// Create a logger appending to `output_path`
    ///
    /// `session_id` is shortened to its first 8 characters in each line.
    pub fn new(output_path: impl Into<PathBuf>, session_id: &str) -> Self {
        Self {
            output_path: output_path.into(),
            session_tag: session_id.chars().take(8).collect(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.output_path
    }

    /// Write the header line that opens a session
    pub fn log_session_start(&self, base_url: &str) {
        self.record(
            "Session opened",
            Some(serde_json::json!({ "base_url": base_url })),
        );
    }

    fn format_line(&self, message: &str, context: Option<&Value>) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        match context {
            Some(ctx) => format!(
                "{} [{}] {} {}\n",
                timestamp, self.session_tag, message, ctx
            ),
            None => format!("{} [{}] {}\n", timestamp, self.session_tag, message),
        }
    }

    fn append(&self, line: &str) -> cadence_core::Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(parent) = self.output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.output_path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }
}

impl DiagnosticSink for ActivityLogger {
    fn record(&self, message: &str, context: Option<Value>) {
        let line = self.format_line(message, context.as_ref());
        fail_open_sync("activity_logger::record", || self.append(&line));
    }
}
