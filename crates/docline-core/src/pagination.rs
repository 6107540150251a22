//! Pagination engine: page through the search backend, one batch per page.
//!
//! ```text
//! Init → Fetching → (Emitting → Fetching)* → Done | Failed
//! ```
//!
//! Requests are strictly sequential: each page's cursor comes from the
//! previous page's last document. The cursor only advances after the page's
//! batch is written (or deliberately skipped), so retrying a search or a write
//! never duplicates or loses a batch.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use indicatif::ProgressBar;

use crate::cursor::{Cursor, CursorFields};
use crate::error::{BackendError, ExportError};
use crate::path::Document;
use crate::progress::fmt_num;
use crate::retry::{RetryPolicy, retry_with_backoff};
use crate::runlog::{JobInfo, PendingRun, RunLog, RunRecord, RunStatus};
use crate::shutdown::shutdown_flag;
use crate::sink::BatchSink;
use crate::transcode::Transcoder;

/// One page of search hits, in the backend's sort order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Page {
    pub documents: Vec<Document>,
    /// Sort values the backend reported for the last hit, used as the
    /// cursor when the last document lacks the cursor fields
    pub last_sort: Option<Cursor>,
}

impl Page {
    pub fn new(documents: Vec<Document>) -> Self {
        Self {
            documents,
            last_sort: None,
        }
    }
}

/// Search backend capability.
///
/// The base filter is part of the backend's configuration; the engine only
/// supplies the resume point.
pub trait SearchBackend {
    /// Total number of documents matching the base filter
    fn count(&self) -> Result<u64, BackendError>;

    /// Next page strictly after `after` (`None` = first page)
    fn search(&self, after: Option<&Cursor>) -> Result<Page, BackendError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Fetching,
    Emitting,
    Done,
    Failed,
}

/// Knobs of the fetch loop.
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    pub cursor_fields: CursorFields,
    /// Budget per count/search request and per batch write
    pub retry: RetryPolicy,
    /// Stop after this many pages (the run still succeeds)
    pub page_limit: Option<usize>,
}

#[derive(Debug, Default)]
struct Counters {
    expected: u64,
    fetched: u64,
    pages: usize,
    written: usize,
    skipped: usize,
    files: Vec<PathBuf>,
}

/// Summary of a successful run
#[derive(Debug)]
pub struct RunSummary {
    pub state: RunState,
    pub record: RunRecord,
    pub expected: u64,
    pub fetched: u64,
    pub pages: usize,
    pub batches_written: usize,
    pub batches_skipped: usize,
    pub files: Vec<PathBuf>,
    pub elapsed: Duration,
}

impl RunSummary {
    pub fn log(&self) {
        log::info!("=== Export Summary ===");
        log::info!(
            "Documents: {} of {} expected",
            fmt_num(self.fetched),
            fmt_num(self.expected)
        );
        log::info!(
            "Pages: {} ({} batches written, {} skipped)",
            self.pages,
            self.batches_written,
            self.batches_skipped
        );
        log::info!("Batch id: {}", self.record.batch_id);
        log::info!("Time: {:.1}s", self.elapsed.as_secs_f64());
        if self.fetched > 0 && !self.elapsed.is_zero() {
            let docs_per_sec = self.fetched as f64 / self.elapsed.as_secs_f64();
            log::info!("Throughput: {docs_per_sec:.0} docs/sec");
        }
    }
}

/// Drives one export run against a backend, a sink and a run log.
pub struct Exporter<'a> {
    backend: &'a dyn SearchBackend,
    sink: &'a mut dyn BatchSink,
    run_log: &'a dyn RunLog,
    transcoder: Transcoder,
    job: JobInfo,
    options: ExportOptions,
    cancel: &'static AtomicBool,
    progress: ProgressBar,
    state: RunState,
}

impl<'a> Exporter<'a> {
    pub fn new(
        backend: &'a dyn SearchBackend,
        sink: &'a mut dyn BatchSink,
        run_log: &'a dyn RunLog,
    ) -> Self {
        Self {
            backend,
            sink,
            run_log,
            transcoder: Transcoder::default(),
            job: JobInfo::default(),
            options: ExportOptions::default(),
            cancel: shutdown_flag(),
            progress: ProgressBar::hidden(),
            state: RunState::Init,
        }
    }

    pub fn transcoder(mut self, transcoder: Transcoder) -> Self {
        self.transcoder = transcoder;
        self
    }

    pub fn job(mut self, job: JobInfo) -> Self {
        self.job = job;
        self
    }

    pub fn options(mut self, options: ExportOptions) -> Self {
        self.options = options;
        self
    }

    /// Flag checked between pages (defaults to the global shutdown flag)
    pub fn cancel_on(mut self, flag: &'static AtomicBool) -> Self {
        self.cancel = flag;
        self
    }

    pub fn progress(mut self, pb: ProgressBar) -> Self {
        self.progress = pb;
        self
    }

    fn enter(&mut self, state: RunState) {
        log::debug!("Export state {:?} -> {:?}", self.state, state);
        self.state = state;
    }

    /// Run to completion and record exactly one [`RunRecord`].
    ///
    /// On failure the FAILED record carries the documents emitted so far, and
    /// the error is returned after it has been recorded.
    pub fn run(mut self) -> Result<RunSummary, ExportError> {
        let started = Instant::now();
        let pending = PendingRun::start(self.job.clone(), Utc::now());
        log::info!(
            "Starting export {} of {} (batch {})",
            self.job.job_name,
            self.job.table_name,
            pending.batch_id()
        );

        let mut counters = Counters::default();
        let outcome = self.drive(pending.batch_id().to_string(), &mut counters);
        let end_ts = Utc::now();

        match outcome {
            Ok(()) => {
                self.enter(RunState::Done);
                self.progress.finish_and_clear();
                let record =
                    pending.finish(RunStatus::Success, end_ts, None, Some(counters.fetched));
                self.run_log
                    .record_run(&record)
                    .map_err(|e| ExportError::RunLog(format!("{e:#}")))?;
                let summary = RunSummary {
                    state: self.state,
                    record,
                    expected: counters.expected,
                    fetched: counters.fetched,
                    pages: counters.pages,
                    batches_written: counters.written,
                    batches_skipped: counters.skipped,
                    files: counters.files,
                    elapsed: started.elapsed(),
                };
                summary.log();
                Ok(summary)
            }
            Err(err) => {
                self.enter(RunState::Failed);
                self.progress.abandon();
                log::error!(
                    "Export failed after {} documents: {err}",
                    fmt_num(counters.fetched)
                );
                let record = pending.finish(
                    RunStatus::Failed,
                    end_ts,
                    Some(err.to_string()),
                    Some(counters.fetched),
                );
                if let Err(e) = self.run_log.record_run(&record) {
                    log::error!("Failed to record failed run: {e:#}");
                }
                Err(err)
            }
        }
    }

    fn drive(&mut self, batch_id: String, c: &mut Counters) -> Result<(), ExportError> {
        let backend = self.backend;
        let retry = self.options.retry;

        c.expected = retry_with_backoff("count", &retry, || backend.count())?;
        log::info!("Total documents to fetch: {}", fmt_num(c.expected));
        self.progress.set_length(c.expected);

        let mut cursor: Option<Cursor> = None;
        while c.fetched < c.expected {
            if let Some(limit) = self.options.page_limit.filter(|&l| c.pages >= l) {
                log::info!("Page limit of {limit} reached, stopping");
                break;
            }
            if self.cancel.load(Ordering::Relaxed) {
                return Err(ExportError::Cancelled { fetched: c.fetched });
            }

            self.enter(RunState::Fetching);
            let page_no = c.pages + 1;
            let label = format!("search page {page_no}");
            let page = retry_with_backoff(&label, &retry, || backend.search(cursor.as_ref()))?;
            let Some(last) = page.documents.last() else {
                log::info!(
                    "Empty page after {} of {} documents, stopping",
                    fmt_num(c.fetched),
                    fmt_num(c.expected)
                );
                break;
            };
            c.pages = page_no;
            self.progress.set_message(format!("page {page_no}"));

            self.enter(RunState::Emitting);
            let next = match Cursor::from_document(last, &self.options.cursor_fields) {
                Ok(next) => next,
                Err(field) => match &page.last_sort {
                    Some(sort) => {
                        log::debug!(
                            "Page {page_no}: '{field}' missing from last document, \
                             resuming from backend sort values {sort}"
                        );
                        sort.clone()
                    }
                    None => {
                        return Err(ExportError::CursorField {
                            page: page_no,
                            field,
                        });
                    }
                },
            };
            if cursor.as_ref() == Some(&next) {
                return Err(ExportError::CursorStall {
                    page: page_no,
                    cursor: next,
                });
            }

            let batch = self.transcoder.to_batch(&page.documents);
            if batch.is_empty() {
                log::warn!(
                    "Page {page_no}: {} documents produced no columns, skipping batch",
                    page.documents.len()
                );
                c.skipped += 1;
            } else {
                let name = format!(
                    "{}_{batch_id}_{page_no:05}_{}",
                    self.job.table_name,
                    next.file_label()
                );
                let sink = &mut *self.sink;
                let location = retry_with_backoff(&name, &retry, || sink.write(&name, &batch))
                    .map_err(|source| ExportError::SinkWrite {
                        name: name.clone(),
                        source,
                    })?;
                log::info!(
                    "Batch {}/{} saved as {} with {} columns",
                    fmt_num(c.fetched + page.documents.len() as u64),
                    fmt_num(c.expected),
                    location.display(),
                    batch.num_columns()
                );
                c.written += 1;
                c.files.push(location);
            }

            c.fetched += page.documents.len() as u64;
            self.progress.set_position(c.fetched);
            cursor = Some(next);
        }
        Ok(())
    }
}
