//! Best-effort activity and routing telemetry.
//!
//! Everything here is fire-and-forget: a sink that cannot be written logs a
//! `warn!` and the pipeline moves on. Records land under a base directory as
//! date-stamped JSONL (activity), an append-only routing log, and
//! latest-wins metadata JSON files.

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use chrono::Utc;
use serde::Serialize;
use serde_json::json;
use tracing::warn;

const ROUTING_LOG: &str = "routing-decisions.jsonl";

pub struct Telemetry {
    base_dir: PathBuf,
}

impl Telemetry {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    /// Default sink location under the system temp dir.
    pub fn at_default_path() -> Self {
        Self::new(std::env::temp_dir().join("prompt-gates"))
    }

    /// Append a free-form activity event to today's dated log.
    pub fn record_activity(&self, event: &str, detail: &serde_json::Value) {
        let file = format!("activity-{}.jsonl", Utc::now().format("%Y-%m-%d"));
        let record = json!({
            "ts": Utc::now().to_rfc3339(),
            "event": event,
            "detail": detail,
        });
        self.append_jsonl(&file, &record);
    }

    /// Append one routing decision to the cumulative routing log.
    pub fn record_routing(&self, record: &impl Serialize) {
        match serde_json::to_value(record) {
            Ok(mut value) => {
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("ts".to_string(), json!(Utc::now().to_rfc3339()));
                }
                self.append_jsonl(ROUTING_LOG, &value);
            }
            Err(e) => warn!("Failed to serialize routing record: {e}"),
        }
    }

    /// Overwrite `metadata/<name>.json` with the latest value.
    pub fn write_metadata(&self, name: &str, value: &serde_json::Value) {
        let dir = self.base_dir.join("metadata");
        if let Err(e) = fs::create_dir_all(&dir) {
            warn!("Failed to create metadata dir: {e}");
            return;
        }
        let path = dir.join(format!("{name}.json"));
        let body = match serde_json::to_string_pretty(value) {
            Ok(b) => b,
            Err(e) => {
                warn!("Failed to serialize metadata '{name}': {e}");
                return;
            }
        };
        if let Err(e) = fs::write(&path, body) {
            warn!("Failed to write {}: {e}", path.display());
        }
    }

    fn append_jsonl(&self, file: &str, value: &serde_json::Value) {
        if let Err(e) = fs::create_dir_all(&self.base_dir) {
            warn!("Failed to create telemetry dir: {e}");
            return;
        }
        let path = self.base_dir.join(file);
        let result = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .and_then(|mut f| writeln!(f, "{value}"));
        if let Err(e) = result {
            warn!("Failed to append telemetry to {}: {e}", path.display());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn activity_appends_one_json_line_per_event() {
        let dir = TempDir::new().unwrap();
        let sink = Telemetry::new(dir.path());
        sink.record_activity("route", &json!({"agent": "coder"}));
        sink.record_activity("route", &json!({"agent": "tester"}));

        let file = format!("activity-{}.jsonl", Utc::now().format("%Y-%m-%d"));
        let content = fs::read_to_string(dir.path().join(file)).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        for line in lines {
            let v: serde_json::Value = serde_json::from_str(line).unwrap();
            assert_eq!(v["event"], "route");
            assert!(v["ts"].is_string());
        }
    }

    #[test]
    fn routing_records_carry_a_timestamp() {
        #[derive(Serialize)]
        struct Rec {
            agent: String,
        }
        let dir = TempDir::new().unwrap();
        let sink = Telemetry::new(dir.path());
        sink.record_routing(&Rec {
            agent: "debugger".to_string(),
        });

        let content = fs::read_to_string(dir.path().join(ROUTING_LOG)).unwrap();
        let v: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(v["agent"], "debugger");
        assert!(v["ts"].is_string());
    }

    #[test]
    fn metadata_is_latest_wins() {
        let dir = TempDir::new().unwrap();
        let sink = Telemetry::new(dir.path());
        sink.write_metadata("budget", &json!({"remaining": 90}));
        sink.write_metadata("budget", &json!({"remaining": 89}));

        let content = fs::read_to_string(dir.path().join("metadata/budget.json")).unwrap();
        let v: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(v["remaining"], 89);
    }

    #[test]
    fn unwritable_base_dir_is_swallowed() {
        let sink = Telemetry::new("/proc/definitely-not-writable/prompt-gates");
        sink.record_activity("route", &json!({}));
        sink.write_metadata("x", &json!({}));
    }
}
