//! Export progress on stderr.
//!
//! On a TTY a single bar counts fetched documents against the expected total
//! and shows the current page. Elsewhere the bar is hidden and the per-batch
//! log lines are the only progress report.

use std::io::IsTerminal;
use std::sync::Arc;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Widest bar prefix before the name is cut
const PREFIX_WIDTH: usize = 16;

fn document_style() -> ProgressStyle {
    ProgressStyle::with_template(
        "{prefix:<16.dim} {bar:30.green/dim} {human_pos:>9}/{human_len:9} {eta:>4} {wide_msg:.dim}",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("--")
}

/// Owns the `MultiProgress` shared by the bar and the log bridge.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Detects whether stderr is a terminal.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Documents-fetched bar labelled with `name`; hidden outside a TTY.
    ///
    /// The length starts at zero and is set once the expected count is known.
    pub fn document_bar(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new(0));
        pb.set_style(document_style());
        pb.set_prefix(name.chars().take(PREFIX_WIDTH).collect::<String>());
        pb
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// For the log bridge, so log lines do not tear the bar
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

pub type SharedProgress = Arc<ProgressContext>;

/// `1234567` as `1,234,567`
pub fn fmt_num(n: u64) -> String {
    let digits = n.to_string();
    let head = digits.len() % 3;
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (i + 3 - head) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_groups_thousands() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(999), "999");
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(45_000), "45,000");
        assert_eq!(fmt_num(123_456), "123,456");
        assert_eq!(fmt_num(1_234_567_890), "1,234,567,890");
    }

    #[test]
    fn hidden_bar_outside_tty() {
        let ctx = ProgressContext::with_tty(false);
        assert!(!ctx.is_tty());
        assert!(ctx.document_bar("rta_claim_headers").is_hidden());
    }

    #[test]
    fn long_names_are_cut_on_char_boundaries() {
        let ctx = ProgressContext::with_tty(true);
        let pb = ctx.document_bar("ausgewählte_ansprüche_2024");
        assert_eq!(pb.prefix().chars().count(), PREFIX_WIDTH);
    }
}
