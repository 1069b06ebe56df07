//! End-of-session report written next to the bot's config.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Summary of one `gfl-bot run` session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionReport {
    /// RFC 3339 start time.
    pub started_at: String,
    /// RFC 3339 end time.
    pub ended_at: String,
    pub elapsed_secs: u64,
    pub map: String,
    pub target: u32,
    pub runs_completed: u32,
    pub failure_budget: i32,
    /// T-Doll names in detection order.
    pub acquired: Vec<String>,
    /// Final failure reason; `None` when the target was reached.
    pub stop: Option<String>,
}

impl SessionReport {
    pub fn elapsed(&self) -> Duration {
        Duration::from_secs(self.elapsed_secs)
    }
}

pub fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Render a duration as `HH:MM:SS`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

/// Atomically write the report as pretty JSON (temp file + rename).
pub fn write_report(path: &Path, report: &SessionReport) -> Result<()> {
    debug!(path = %path.display(), runs = report.runs_completed, "writing session report");
    let mut buf = serde_json::to_string_pretty(report)?;
    buf.push('\n');
    write_atomic(path, &buf)
}

pub fn load_report(path: &Path) -> Result<SessionReport> {
    let contents =
        fs::read_to_string(path).with_context(|| format!("read report {}", path.display()))?;
    serde_json::from_str(&contents).with_context(|| format!("parse report {}", path.display()))
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("json.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp report {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace report {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn report() -> SessionReport {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        SessionReport {
            started_at: timestamp(start),
            ended_at: timestamp(start + chrono::Duration::seconds(3725)),
            elapsed_secs: 3725,
            map: "0-2".to_string(),
            target: 3,
            runs_completed: 3,
            failure_budget: 5,
            acquired: vec!["M4A1".to_string()],
            stop: None,
        }
    }

    #[test]
    fn formats_elapsed_as_clock() {
        assert_eq!(format_elapsed(Duration::from_secs(0)), "00:00:00");
        assert_eq!(format_elapsed(Duration::from_secs(3725)), "01:02:05");
        assert_eq!(format_elapsed(Duration::from_secs(100 * 3600)), "100:00:00");
    }

    #[test]
    fn report_is_written_atomically_and_reloads() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("reports/session_report.json");
        let report = report();

        write_report(&path, &report).expect("write");
        assert!(!path.with_extension("json.tmp").exists());
        assert_eq!(load_report(&path).expect("load"), report);

        let raw = fs::read_to_string(&path).expect("read");
        assert!(raw.contains("\"started_at\": \"2024-03-01T10:00:00Z\""));
        assert!(raw.ends_with("}\n"));
    }
}
