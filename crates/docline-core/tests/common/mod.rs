#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::io;
use std::path::PathBuf;
use std::time::Duration;

use docline_core::path::Document;
use docline_core::{
    BackendError, Batch, BatchSink, Cursor, ExportOptions, Page, RetryPolicy, RunLog, RunRecord,
    SearchBackend,
};
use serde_json::{Value, json};

/// Claim-shaped document. Timestamps repeat in pairs so the tie-breaker matters.
pub fn claim(i: u64) -> Document {
    let lines: Vec<Value> = (0..=(i % 3)).map(|l| json!({"amt": i * 10 + l})).collect();
    let value = json!({
        "claimRequestId": i,
        "auditProcessedDateTimeUtc": format!("2024-01-01T00:{:02}:00Z", i / 2),
        "claimId": format!("C{i}"),
        "lines": lines,
    });
    match value {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn claims(n: u64) -> Vec<Document> {
    (0..n).map(claim).collect()
}

fn sort_key(sort_value: &Value, tiebreak: &Value) -> (String, u64) {
    (
        sort_value.as_str().unwrap_or_default().to_string(),
        tiebreak.as_u64().unwrap_or_default(),
    )
}

fn doc_key(doc: &Document) -> (String, u64) {
    sort_key(&doc["auditProcessedDateTimeUtc"], &doc["claimRequestId"])
}

/// In-memory backend honoring `search_after` semantics over pre-sorted docs.
pub struct FakeBackend {
    docs: Vec<Document>,
    page_size: usize,
    count_override: Option<u64>,
    ignore_cursor: bool,
    /// Errors returned by upcoming search calls before real results resume
    search_failures: RefCell<VecDeque<BackendError>>,
    count_failures: RefCell<VecDeque<BackendError>>,
    pub searches: RefCell<Vec<Option<Cursor>>>,
    pub counts: Cell<u32>,
}

impl FakeBackend {
    pub fn new(docs: Vec<Document>, page_size: usize) -> Self {
        Self {
            docs,
            page_size,
            count_override: None,
            ignore_cursor: false,
            search_failures: RefCell::new(VecDeque::new()),
            count_failures: RefCell::new(VecDeque::new()),
            searches: RefCell::new(Vec::new()),
            counts: Cell::new(0),
        }
    }

    /// Report `n` matches regardless of how many documents exist
    pub fn with_count(mut self, n: u64) -> Self {
        self.count_override = Some(n);
        self
    }

    /// Always serve the first page, whatever the cursor
    pub fn ignoring_cursor(mut self) -> Self {
        self.ignore_cursor = true;
        self
    }

    pub fn fail_search(self, err: BackendError) -> Self {
        self.search_failures.borrow_mut().push_back(err);
        self
    }

    pub fn fail_count(self, err: BackendError) -> Self {
        self.count_failures.borrow_mut().push_back(err);
        self
    }

    pub fn search_calls(&self) -> usize {
        self.searches.borrow().len()
    }
}

impl SearchBackend for FakeBackend {
    fn count(&self) -> Result<u64, BackendError> {
        self.counts.set(self.counts.get() + 1);
        if let Some(err) = self.count_failures.borrow_mut().pop_front() {
            return Err(err);
        }
        Ok(self.count_override.unwrap_or(self.docs.len() as u64))
    }

    fn search(&self, after: Option<&Cursor>) -> Result<Page, BackendError> {
        self.searches.borrow_mut().push(after.cloned());
        if let Some(err) = self.search_failures.borrow_mut().pop_front() {
            return Err(err);
        }
        let start = match after {
            Some(c) if !self.ignore_cursor => {
                let after_key = sort_key(&c.sort_value, &c.tiebreak);
                self.docs
                    .iter()
                    .position(|d| doc_key(d) > after_key)
                    .unwrap_or(self.docs.len())
            }
            _ => 0,
        };
        let documents = self
            .docs
            .iter()
            .skip(start)
            .take(self.page_size)
            .cloned()
            .collect();
        Ok(Page::new(documents))
    }
}

/// Sink keeping every written batch in memory.
#[derive(Default)]
pub struct MemorySink {
    pub written: Vec<(String, Batch)>,
    pub attempts: usize,
    /// Errors returned by upcoming writes
    pub failures: VecDeque<io::Error>,
}

impl MemorySink {
    pub fn failing(errors: impl IntoIterator<Item = io::Error>) -> Self {
        Self {
            failures: errors.into_iter().collect(),
            ..Self::default()
        }
    }

    pub fn total_rows(&self) -> usize {
        self.written.iter().map(|(_, b)| b.num_rows()).sum()
    }
}

impl BatchSink for MemorySink {
    fn write(&mut self, name: &str, batch: &Batch) -> io::Result<PathBuf> {
        self.attempts += 1;
        if let Some(err) = self.failures.pop_front() {
            return Err(err);
        }
        self.written.push((name.to_string(), batch.clone()));
        Ok(PathBuf::from(format!("mem/{name}")))
    }
}

#[derive(Default)]
pub struct RecordingRunLog {
    pub records: RefCell<Vec<RunRecord>>,
}

impl RunLog for RecordingRunLog {
    fn record_run(&self, record: &RunRecord) -> anyhow::Result<()> {
        self.records.borrow_mut().push(record.clone());
        Ok(())
    }
}

/// Retries without sleeping
pub fn fast_options(max_retries: u32) -> ExportOptions {
    ExportOptions {
        retry: RetryPolicy {
            max_retries,
            base_delay: Duration::ZERO,
        },
        ..ExportOptions::default()
    }
}

pub fn unavailable() -> BackendError {
    BackendError::Http {
        status: Some(503),
        message: "service unavailable".into(),
    }
}

pub fn bad_request() -> BackendError {
    BackendError::Http {
        status: Some(400),
        message: "parse exception".into(),
    }
}
