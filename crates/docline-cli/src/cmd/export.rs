//! Export subcommand - page through Elasticsearch into batch files

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use docline_core::progress::fmt_num;
use docline_core::{
    ExportOptions, Exporter, JsonlRunLog, LogRunLog, OutputFormat, Resolution, RetryPolicy,
    RunLog, SharedProgress, Transcoder, http_config, make_sink, prepare_output_dir,
};
use docline_elastic::ElasticBackend;

use super::print_summary;
use crate::config::Config;

#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Output directory
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Index name or pattern
    #[arg(short, long)]
    pub index: Option<String>,

    /// Elasticsearch base URL
    #[arg(long)]
    pub url: Option<String>,

    /// JSON file with the base request body (query)
    #[arg(short, long)]
    pub query: Option<PathBuf>,

    /// Documents per page
    #[arg(short = 's', long)]
    pub page_size: Option<usize>,

    /// Batch file format
    #[arg(short, long, value_enum)]
    pub format: Option<FormatArg>,

    /// Nesting depth after which subtrees become one JSON column
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// How column names are mapped back to document values
    #[arg(long, value_enum)]
    pub resolution: Option<ResolutionArg>,

    /// Stop after this many pages
    #[arg(short = 'l', long)]
    pub page_limit: Option<usize>,

    /// Zstd compression level for parquet (1-22)
    #[arg(short, long)]
    pub zstd_level: Option<i32>,

    /// Log the run record instead of appending it to the run log file
    #[arg(long)]
    pub no_run_log: bool,
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum FormatArg {
    Tsv,
    Parquet,
}

impl From<FormatArg> for OutputFormat {
    fn from(f: FormatArg) -> Self {
        match f {
            FormatArg::Tsv => OutputFormat::Tsv,
            FormatArg::Parquet => OutputFormat::Parquet,
        }
    }
}

#[derive(Clone, Copy, ValueEnum, Debug)]
pub enum ResolutionArg {
    KeyTable,
    Heuristic,
}

impl From<ResolutionArg> for Resolution {
    fn from(r: ResolutionArg) -> Self {
        match r {
            ResolutionArg::KeyTable => Resolution::KeyTable,
            ResolutionArg::Heuristic => Resolution::Heuristic,
        }
    }
}

pub fn run(args: ExportArgs, config: &Config, progress: &SharedProgress) -> Result<()> {
    let output_dir = args.output.unwrap_or_else(|| config.output.dir.clone());
    let format = args.format.map_or(config.output.format, OutputFormat::from);
    let zstd_level = args.zstd_level.unwrap_or(config.output.compression_level);
    let resolution = args
        .resolution
        .map_or(config.export.resolution, Resolution::from);
    let max_depth = args.max_depth.unwrap_or(config.export.max_depth);

    let mut elastic = config.elastic.clone();
    if let Some(url) = args.url {
        elastic.url = url;
    }
    if let Some(index) = args.index {
        elastic.index = index;
    }
    if let Some(query) = args.query {
        elastic.query_file = Some(query);
    }
    if let Some(page_size) = args.page_size {
        elastic.page_size = page_size;
    }

    let job = config.export.job.clone();
    let cursor_fields = config.export.cursor.clone();
    let backend = ElasticBackend::new(&elastic, cursor_fields.clone())
        .context("Invalid [elastic] configuration")?;

    prepare_output_dir(&output_dir)
        .with_context(|| format!("Cannot prepare output directory {}", output_dir.display()))?;
    let mut sink = make_sink(format, &output_dir, zstd_level);

    let run_log: Box<dyn RunLog> = if args.no_run_log || !config.run_log.enabled {
        Box::new(LogRunLog)
    } else {
        Box::new(JsonlRunLog::new(&config.run_log.path))
    };

    let options = ExportOptions {
        cursor_fields,
        retry: RetryPolicy {
            max_retries: http_config().max_retries,
            ..RetryPolicy::default()
        },
        page_limit: args.page_limit.or(config.export.page_limit),
    };

    log::info!("Exporting {} from {}", elastic.index, elastic.url);
    log::info!("  Output: {} ({format})", output_dir.display());
    log::info!(
        "  Page size: {}, max depth: {max_depth}, resolution: {resolution}",
        elastic.page_size
    );

    let summary = Exporter::new(&backend, &mut *sink, run_log.as_ref())
        .transcoder(Transcoder::new(max_depth, resolution))
        .job(job)
        .options(options)
        .progress(progress.document_bar(&config.export.job.table_name))
        .run()?;

    print_summary(
        "Export",
        &[
            ("Batch id", summary.record.batch_id.clone()),
            (
                "Documents",
                format!(
                    "{} of {} expected",
                    fmt_num(summary.fetched),
                    fmt_num(summary.expected)
                ),
            ),
            (
                "Batches",
                format!(
                    "{} written, {} skipped over {} pages",
                    summary.batches_written, summary.batches_skipped, summary.pages
                ),
            ),
            ("Output", output_dir.display().to_string()),
            ("Time", format!("{:.1}s", summary.elapsed.as_secs_f64())),
        ],
    );

    Ok(())
}
