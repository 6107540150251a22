//! Docline Core - flatten paginated JSON search results into tabular batches
//!
//! This crate provides the backend-independent parts of an export: the path
//! codec that maps nested documents to flat columns and back, the transcoder
//! that turns a page of documents into a rectangular batch, and the
//! pagination engine that drives a search backend into a batch sink.

pub mod batch;
pub mod cursor;
pub mod error;
pub mod http;
pub mod logging;
pub mod pagination;
pub mod path;
pub mod progress;
pub mod retry;
pub mod runlog;
pub mod shutdown;
pub mod sink;
pub mod transcode;

// Re-exports for convenience
pub use batch::Batch;
pub use cursor::{Cursor, CursorFields};
pub use error::{BackendError, ExportError};
pub use http::{HttpConfig, SHARED_RUNTIME, http_client, http_config, set_http_config};
pub use logging::{IndicatifLogger, init_logging};
pub use pagination::{ExportOptions, Exporter, Page, RunState, RunSummary, SearchBackend};
pub use path::{Ambiguity, DEFAULT_MAX_DEPTH, Document, SEPARATOR};
pub use progress::{ProgressContext, SharedProgress};
pub use retry::{RetryPolicy, retry_with_backoff};
pub use runlog::{JobInfo, JsonlRunLog, LogRunLog, RunLog, RunRecord, RunStatus};
pub use shutdown::{install_signal_handlers, is_shutdown_requested, shutdown_flag};
pub use sink::{BatchSink, OutputFormat, ParquetSink, TsvSink, make_sink, prepare_output_dir};
pub use transcode::{Resolution, Transcoder};
