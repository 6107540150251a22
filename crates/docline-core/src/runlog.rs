//! Run records: one audit entry per export execution

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Success,
    Failed,
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Success => "SUCCESS",
            Self::Failed => "FAILED",
        })
    }
}

/// Static identity of the export job, copied into every record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobInfo {
    pub job_name: String,
    pub job_id: u32,
    /// Executable command recorded for operators
    pub command: String,
    /// Logical table the batches belong to; also the batch file prefix
    pub table_name: String,
}

impl Default for JobInfo {
    fn default() -> Self {
        Self {
            job_name: "docline_export".to_string(),
            job_id: 0,
            command: "docline export".to_string(),
            table_name: "documents".to_string(),
        }
    }
}

/// Terminal summary of one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub job_name: String,
    pub job_id: u32,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub status: RunStatus,
    pub command: String,
    pub error_desc: Option<String>,
    pub error_log_file: Option<String>,
    pub batch_id: String,
    pub table_name: String,
    pub record_count: Option<u64>,
}

/// Record opened at run start; consumed by [`PendingRun::finish`] so it can
/// only be finalized once.
#[derive(Debug)]
pub struct PendingRun {
    job: JobInfo,
    start_ts: DateTime<Utc>,
    batch_id: String,
}

impl PendingRun {
    /// Start a run; the batch id is the start time as `%Y%m%d%H%M%S`
    pub fn start(job: JobInfo, start_ts: DateTime<Utc>) -> Self {
        let batch_id = start_ts.format("%Y%m%d%H%M%S").to_string();
        Self {
            job,
            start_ts,
            batch_id,
        }
    }

    pub fn batch_id(&self) -> &str {
        &self.batch_id
    }

    pub fn start_ts(&self) -> DateTime<Utc> {
        self.start_ts
    }

    pub fn finish(
        self,
        status: RunStatus,
        end_ts: DateTime<Utc>,
        error_desc: Option<String>,
        record_count: Option<u64>,
    ) -> RunRecord {
        RunRecord {
            job_name: self.job.job_name,
            job_id: self.job.job_id,
            start_ts: self.start_ts,
            end_ts,
            status,
            command: self.job.command,
            error_desc,
            error_log_file: None,
            batch_id: self.batch_id,
            table_name: self.job.table_name,
            record_count,
        }
    }
}

/// Store that receives exactly one record per run.
pub trait RunLog {
    fn record_run(&self, record: &RunRecord) -> Result<()>;
}

/// Appends records as JSON lines to a local file.
#[derive(Debug, Clone)]
pub struct JsonlRunLog {
    path: PathBuf,
}

impl JsonlRunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all records; a missing file means no runs yet
    pub fn load(path: &Path) -> Result<Vec<RunRecord>> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read run log: {}", path.display()))?;
        content
            .lines()
            .enumerate()
            .filter(|(_, line)| !line.trim().is_empty())
            .map(|(idx, line)| {
                serde_json::from_str(line)
                    .with_context(|| format!("{}:{}: invalid run record", path.display(), idx + 1))
            })
            .collect()
    }
}

impl RunLog for JsonlRunLog {
    fn record_run(&self, record: &RunRecord) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .with_context(|| format!("cannot create {}", parent.display()))?;
        }
        let line = serde_json::to_string(record).context("failed to serialize run record")?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("cannot open run log {}", self.path.display()))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to append to {}", self.path.display()))?;
        log::debug!("Recorded {} run in {}", record.status, self.path.display());
        Ok(())
    }
}

/// Only logs the record; used when no run log file is wanted.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogRunLog;

impl RunLog for LogRunLog {
    fn record_run(&self, record: &RunRecord) -> Result<()> {
        log::info!(
            "Run {} ({}): {} records, status {}",
            record.batch_id,
            record.job_name,
            record.record_count.unwrap_or(0),
            record.status
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(status: RunStatus) -> RunRecord {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 15).unwrap();
        PendingRun::start(JobInfo::default(), start).finish(
            status,
            start + chrono::Duration::seconds(5),
            None,
            Some(42),
        )
    }

    #[test]
    fn batch_id_from_start_time() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 30, 15).unwrap();
        let pending = PendingRun::start(JobInfo::default(), start);
        assert_eq!(pending.batch_id(), "20240501103015");
        assert_eq!(pending.start_ts(), start);
    }

    #[test]
    fn status_serializes_uppercase() {
        let json = serde_json::to_string(&record(RunStatus::Failed)).unwrap();
        assert!(json.contains(r#""status":"FAILED""#));
        assert_eq!(RunStatus::Success.to_string(), "SUCCESS");
    }

    #[test]
    fn jsonl_appends_and_loads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs/runs.jsonl");
        let log = JsonlRunLog::new(&path);
        log.record_run(&record(RunStatus::Success)).unwrap();
        log.record_run(&record(RunStatus::Failed)).unwrap();

        let records = JsonlRunLog::load(&path).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].status, RunStatus::Success);
        assert_eq!(records[1].status, RunStatus::Failed);
        assert_eq!(records[1].record_count, Some(42));
    }

    #[test]
    fn load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlRunLog::load(&dir.path().join("none.jsonl")).unwrap().is_empty());
    }

    #[test]
    fn load_reports_bad_line() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs.jsonl");
        std::fs::write(&path, "not json\n").unwrap();
        let err = JsonlRunLog::load(&path).unwrap_err();
        assert!(format!("{err:#}").contains("runs.jsonl:1"));
    }

    #[test]
    fn job_info_parses_with_defaults() {
        let job: JobInfo = serde_json::from_str(r#"{"job_id": 8}"#).unwrap();
        assert_eq!(job.job_id, 8);
        assert_eq!(job.table_name, "documents");
    }
}
