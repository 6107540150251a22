//! docline - export paginated Elasticsearch results as flat batch files
//!
//! Pages through an index with `search_after`, flattens every page of nested
//! JSON documents into a rectangular batch, and writes one TSV or Parquet file
//! per page, recording one run record per execution.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

mod cmd;
mod config;

use config::Config;

#[derive(Parser)]
#[command(name = "docline")]
#[command(about = "Export paginated Elasticsearch results as flat batch files")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(long, global = true)]
    debug: bool,

    /// Config file path (default: ./docline.toml or ~/.config/docline/config.toml)
    #[arg(short, long, global = true)]
    config: Option<std::path::PathBuf>,

    /// Connect timeout in seconds
    #[arg(long, global = true)]
    connect_timeout: Option<u64>,

    /// Whole-request timeout in seconds
    #[arg(long, global = true)]
    request_timeout: Option<u64>,

    /// Maximum retry attempts for transient failures
    #[arg(long, global = true)]
    max_retries: Option<u32>,
}

#[derive(Subcommand)]
enum Command {
    /// Export all matching documents, one batch file per page
    Export(cmd::export::ExportArgs),
    /// List recorded runs
    Runs(cmd::runs::RunsArgs),
    /// Show current configuration
    Config,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Progress context (TTY auto-detect)
    let progress = Arc::new(docline_core::ProgressContext::new());

    // Logging:
    //   TTY:     quiet (warn) unless --debug; the progress bar shows activity
    //   non-TTY: info unless --debug; logs are the only progress indicator
    let is_tty = progress.is_tty();
    let multi = if is_tty { Some(progress.multi()) } else { None };
    let quiet = is_tty && !cli.debug;
    docline_core::init_logging(quiet, cli.debug, multi);

    let config = if let Some(path) = cli.config {
        Config::from_file(&path)?
    } else {
        Config::load()?
    };

    // Apply HTTP settings (config file defaults, CLI overrides)
    let mut http_config = config.http.to_http_config();
    if let Some(secs) = cli.connect_timeout {
        http_config.connect_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = cli.request_timeout {
        http_config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(n) = cli.max_retries {
        http_config.max_retries = n;
    }
    docline_core::set_http_config(http_config);

    match cli.command {
        Command::Export(args) => {
            docline_core::install_signal_handlers()
                .context("Failed to install signal handlers")?;
            cmd::export::run(args, &config, &progress)
        }
        Command::Runs(args) => cmd::runs::run(args, &config),
        Command::Config => {
            print_config(&config, &http_config);
            Ok(())
        }
    }
}

fn print_config(config: &Config, http: &docline_core::HttpConfig) {
    let elastic = &config.elastic;
    let export = &config.export;
    let auth = if elastic.api_key.is_some() {
        "api key"
    } else if elastic.username.is_some() {
        "basic"
    } else {
        "none"
    };
    let query = match (&elastic.query_file, &elastic.query) {
        (Some(path), _) => path.display().to_string(),
        (None, Some(_)) => "inline".to_string(),
        (None, None) => "match_all".to_string(),
    };

    cmd::print_summary(
        "Setting",
        &[
            ("Output directory", config.output.dir.display().to_string()),
            ("Output format", config.output.format.to_string()),
            ("Compression level", config.output.compression_level.to_string()),
            ("Elasticsearch URL", elastic.url.clone()),
            ("Index", elastic.index.clone()),
            ("Auth", auth.to_string()),
            ("Base query", query),
            ("Page size", elastic.page_size.to_string()),
            (
                "Cursor",
                format!("{}, {}", export.cursor.order_field, export.cursor.unique_field),
            ),
            (
                "Job",
                format!("{} (id {})", export.job.job_name, export.job.job_id),
            ),
            ("Table", export.job.table_name.clone()),
            ("Max depth", export.max_depth.to_string()),
            ("Resolution", export.resolution.to_string()),
            (
                "Page limit",
                export
                    .page_limit
                    .map_or("none".to_string(), |n| n.to_string()),
            ),
            (
                "Run log",
                if config.run_log.enabled {
                    config.run_log.path.display().to_string()
                } else {
                    "disabled".to_string()
                },
            ),
            ("Connect timeout", format!("{}s", http.connect_timeout.as_secs())),
            ("Request timeout", format!("{}s", http.request_timeout.as_secs())),
            ("Max retries", http.max_retries.to_string()),
        ],
    );
}
