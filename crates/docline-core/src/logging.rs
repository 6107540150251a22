//! Logging setup.
//!
//! `env_logger` decides what is enabled (`RUST_LOG` wins over the CLI flags).
//! On a TTY lines are printed through `indicatif` so they never tear the
//! progress bar; otherwise each line is `timestamp - LEVEL - message` in UTC.

use std::io::Write;

use indicatif::MultiProgress;
use log::{Level, Log, Metadata, Record};

const RESET: &str = "\x1b[0m";

fn label(level: Level) -> &'static str {
    match level {
        Level::Error => "ERROR",
        Level::Warn => "WARN",
        Level::Info => "INFO",
        Level::Debug => "DEBUG",
        Level::Trace => "TRACE",
    }
}

fn color(level: Level) -> &'static str {
    match level {
        Level::Error => "\x1b[31m",
        Level::Warn => "\x1b[33m",
        Level::Info => "\x1b[32m",
        Level::Debug => "\x1b[36m",
        Level::Trace => "\x1b[35m",
    }
}

/// Colored TTY line; debug and trace lines also name their module.
fn tty_line(record: &Record) -> String {
    let level = record.level();
    let tag = format!("{}{:<5}{RESET}", color(level), label(level));
    if level >= Level::Debug {
        format!("[{tag}] {}: {}", record.target(), record.args())
    } else {
        format!("[{tag}] {}", record.args())
    }
}

/// `log` backend that filters with env_logger and prints through
/// `MultiProgress::suspend`.
pub struct IndicatifLogger {
    filter: env_logger::Logger,
    bars: MultiProgress,
}

impl IndicatifLogger {
    pub fn new(filter: env_logger::Logger, bars: MultiProgress) -> Self {
        Self { filter, bars }
    }
}

impl Log for IndicatifLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        self.filter.enabled(metadata)
    }

    fn log(&self, record: &Record) {
        if !self.filter.matches(record) {
            return;
        }
        let line = tty_line(record);
        self.bars.suspend(|| eprintln!("{line}"));
    }

    fn flush(&self) {}
}

fn default_level(quiet: bool, debug: bool) -> &'static str {
    match (quiet, debug) {
        (_, true) => "debug",
        (true, false) => "warn",
        (false, false) => "info",
    }
}

/// Install the global logger; a second call is a no-op.
///
/// `quiet` drops to warnings, `debug` raises to debug. Pass `multi` when a
/// progress bar is on screen.
pub fn init_logging(quiet: bool, debug: bool, multi: Option<&MultiProgress>) {
    let env = env_logger::Env::default().default_filter_or(default_level(quiet, debug));
    let mut builder = env_logger::Builder::from_env(env);

    match multi {
        Some(bars) => {
            let filter = builder.build();
            let max_level = filter.filter();
            let logger = IndicatifLogger::new(filter, bars.clone());
            if log::set_boxed_logger(Box::new(logger)).is_ok() {
                log::set_max_level(max_level);
            }
        }
        None => {
            let _ = builder
                .format(|buf, record| {
                    let ts = chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.3f");
                    writeln!(buf, "{ts} - {} - {}", label(record.level()), record.args())
                })
                .try_init();
        }
    }
}
