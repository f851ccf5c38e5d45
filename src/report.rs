//! Run report files
//!
//! Each render run can leave an output-contract-shaped JSON record behind
//! for an external orchestrator's audit trail. A process-wide sequence
//! counter disambiguates reports written in the same millisecond.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::error::DotsmithError;

pub const REPORT_PREFIX: &str = "dotsmith_run_";

static REPORT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Write `payload` pretty-printed to `<dir>/dotsmith_run_<epoch-ms>_<seq>.json`.
pub fn write_report(dir: &Path, payload: &Value) -> Result<PathBuf, DotsmithError> {
    fs::create_dir_all(dir)?;
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis())
        .unwrap_or(0);
    let seq = REPORT_SEQ.fetch_add(1, Ordering::Relaxed);
    let path = dir.join(format!("{REPORT_PREFIX}{stamp}_{seq:04}.json"));
    fs::write(&path, serde_json::to_string_pretty(payload)?)?;
    tracing::debug!(path = %path.display(), "run report written");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn report_is_written_and_parseable() {
        let dir = tempfile::tempdir().unwrap();
        let payload = json!({"status": "success", "dot_source": "digraph G {\n}\n"});
        let path = write_report(dir.path(), &payload).unwrap();

        assert!(path.is_file());
        let name = path.file_name().unwrap().to_string_lossy();
        assert!(name.starts_with(REPORT_PREFIX));
        assert!(name.ends_with(".json"));

        let read_back: Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(read_back, payload);
    }

    #[test]
    fn sequential_reports_get_distinct_names() {
        let dir = tempfile::tempdir().unwrap();
        let payload = json!({"status": "success", "dot_source": ""});
        let first = write_report(dir.path(), &payload).unwrap();
        let second = write_report(dir.path(), &payload).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn missing_directory_is_created() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("audit").join("graphs");
        let payload = json!({"status": "failure", "dot_source": ""});
        let path = write_report(&nested, &payload).unwrap();
        assert!(path.starts_with(&nested));
    }
}
