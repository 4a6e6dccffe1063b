//! JSONL file writer for execution audit records.
//!
//! Each finished [`Execution`] and each chain outcome is serialized as a
//! single JSON line with a `type` field and `timestamp`, appended to the file
//! via a buffered writer.

use conductor_application::ExecutionSink;
use conductor_domain::{ChainOutcome, Execution};
use serde_json::{Map, Value, json};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL audit sink that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlExecutionSink {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlExecutionSink {
    /// Open (or create) the audit file at the given path for appending.
    ///
    /// Creates parent directories if they don't exist.
    /// Returns `None` if the file cannot be opened.
    pub fn new(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create audit log directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open audit log file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the audit file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_record(&self, record_type: &str, payload: Value) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        let mut map = match payload {
            Value::Object(map) => map,
            other => {
                let mut map = Map::new();
                map.insert("data".to_string(), other);
                map
            }
        };
        map.insert("type".to_string(), Value::String(record_type.to_string()));
        map.insert("timestamp".to_string(), Value::String(timestamp));

        let Ok(line) = serde_json::to_string(&Value::Object(map)) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            // Append-only; flush every record so a crash loses at most one line
            let _ = writer.flush();
        }
    }
}

fn chain_payload(chain_id: &str, outcome: &ChainOutcome) -> Value {
    match outcome {
        Ok(synthesis) => json!({
            "chain_id": chain_id,
            "status": "completed",
            "aggregate_confidence": synthesis.aggregate_confidence,
            "completed": synthesis.completed,
            "failed": synthesis.failed,
            "total_duration_ms": synthesis.total_duration_ms,
            "steps": synthesis.steps,
        }),
        Err(failure) => json!({
            "chain_id": chain_id,
            "status": "failed",
            "failed_at": failure.failed_at,
            "position": failure.position,
            "error_kind": failure.root_kind(),
            "error_message": failure.error.root().to_string(),
            "total_duration_ms": failure.total_duration_ms,
            "steps": failure.steps,
        }),
    }
}

impl ExecutionSink for JsonlExecutionSink {
    fn record_execution(&self, execution: &Execution) {
        match serde_json::to_value(execution) {
            Ok(payload) => self.write_record("execution", payload),
            Err(e) => warn!(tool = %execution.tool_id, "Could not serialize execution: {}", e),
        }
    }

    fn record_chain(&self, chain_id: &str, outcome: &ChainOutcome) {
        self.write_record("chain", chain_payload(chain_id, outcome));
    }
}

impl Drop for JsonlExecutionSink {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}
