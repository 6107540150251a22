//! Runs subcommand - list recorded export runs

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, Table, modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL};
use docline_core::{JsonlRunLog, RunRecord, RunStatus};

use crate::config::Config;

#[derive(Args, Debug)]
pub struct RunsArgs {
    /// Run log file (default: [run_log].path from config)
    #[arg(long)]
    pub run_log: Option<PathBuf>,

    /// Show at most this many runs, newest first
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

pub fn run(args: RunsArgs, config: &Config) -> Result<()> {
    let path = args.run_log.unwrap_or_else(|| config.run_log.path.clone());
    let records = JsonlRunLog::load(&path)?;
    if records.is_empty() {
        eprintln!("No runs recorded in {}", path.display());
        return Ok(());
    }

    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(
            ["Batch", "Job", "Status", "Started (UTC)", "Duration", "Records", "Error"]
                .map(|h| Cell::new(h).fg(Color::Cyan)),
        );
    for record in newest_first(&records, args.limit) {
        table.add_row(vec![
            Cell::new(&record.batch_id),
            Cell::new(&record.job_name),
            status_cell(record.status),
            Cell::new(record.start_ts.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(format!("{}s", (record.end_ts - record.start_ts).num_seconds())),
            Cell::new(record.record_count.map_or("-".to_string(), |n| n.to_string())),
            Cell::new(truncate(record.error_desc.as_deref().unwrap_or(""), 60)),
        ]);
    }
    eprintln!("\n{table}");
    eprintln!(
        "{} of {} runs from {}",
        records.len().min(args.limit),
        records.len(),
        path.display()
    );
    Ok(())
}

fn status_cell(status: RunStatus) -> Cell {
    let color = match status {
        RunStatus::Success => Color::Green,
        RunStatus::Failed => Color::Red,
    };
    Cell::new(status).fg(color)
}

fn newest_first(records: &[RunRecord], limit: usize) -> impl Iterator<Item = &RunRecord> {
    records.iter().rev().take(limit)
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}
