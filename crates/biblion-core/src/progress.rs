//! Progress reporting for TTY and non-TTY environments.
//!
//! TTY mode: one spinner line per population job.
//! Non-TTY mode: hidden bars; jobs report through the log instead.

use std::io::IsTerminal;
use std::sync::Arc;
use std::time::Duration;

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};

/// Rows between spinner message refreshes
pub const REFRESH_EVERY: u64 = 10_000;

fn job_style() -> ProgressStyle {
    ProgressStyle::with_template("{spinner:.green} {prefix:<24.cyan.bold} {wide_msg} {elapsed:>5.dim}")
        .unwrap_or_else(|_| ProgressStyle::default_spinner())
}

/// Central progress context shared by concurrently running jobs.
pub struct ProgressContext {
    multi: MultiProgress,
    is_tty: bool,
}

impl ProgressContext {
    /// Create new context, detecting TTY automatically.
    pub fn new() -> Self {
        Self::with_tty(std::io::stderr().is_terminal())
    }

    /// Create a context that never draws (tests, piped output).
    pub fn hidden() -> Self {
        Self::with_tty(false)
    }

    fn with_tty(is_tty: bool) -> Self {
        Self {
            multi: MultiProgress::new(),
            is_tty,
        }
    }

    /// Spinner line for one population job, named after its destination.
    ///
    /// Update with [`report_rows`] and close with `finish_with_message`.
    pub fn job_line(&self, name: &str) -> ProgressBar {
        if !self.is_tty {
            return ProgressBar::hidden();
        }
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(job_style());
        pb.set_prefix(job_prefix(name).to_string());
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    /// Print a line above managed progress bars.
    pub fn println(&self, msg: impl AsRef<str>) {
        if self.is_tty {
            let _ = self.multi.println(msg);
        } else {
            eprintln!("{}", msg.as_ref());
        }
    }

    pub fn is_tty(&self) -> bool {
        self.is_tty
    }

    /// Get reference to `MultiProgress` for the log bridge.
    pub fn multi(&self) -> &MultiProgress {
        &self.multi
    }
}

impl Default for ProgressContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe wrapper for `ProgressContext`.
pub type SharedProgress = Arc<ProgressContext>;

/// Job name cut to 24 characters for the progress prefix.
fn job_prefix(name: &str) -> &str {
    match name.char_indices().nth(24) {
        Some((at, _)) => &name[..at],
        None => name,
    }
}

/// Refresh a job line's row counters every [`REFRESH_EVERY`] rows.
pub fn report_rows(pb: &ProgressBar, read: u64, written: u64) {
    if read % REFRESH_EVERY == 0 {
        pb.set_message(format!("{} read, {} written", fmt_num(read), fmt_num(written)));
    }
}

/// Format number with thousand separators.
pub fn fmt_num(n: u64) -> String {
    let s = n.to_string();
    let mut out = String::with_capacity(s.len() + s.len() / 3);
    for (i, c) in s.chars().enumerate() {
        if i > 0 && (s.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fmt_num_small() {
        assert_eq!(fmt_num(0), "0");
        assert_eq!(fmt_num(12), "12");
        assert_eq!(fmt_num(999), "999");
    }

    #[test]
    fn fmt_num_thousands() {
        assert_eq!(fmt_num(1_000), "1,000");
        assert_eq!(fmt_num(123_456), "123,456");
        assert_eq!(fmt_num(1_234_567), "1,234,567");
    }

    #[test]
    fn job_prefix_cuts_on_char_boundary() {
        assert_eq!(job_prefix("works"), "works");
        let name = "é".repeat(30);
        assert_eq!(job_prefix(&name).chars().count(), 24);
        assert_eq!(job_prefix(&"a".repeat(24)).len(), 24);
    }

    #[test]
    fn hidden_context_gives_hidden_lines() {
        let ctx = ProgressContext::hidden();
        assert!(!ctx.is_tty());
        assert!(ctx.job_line("works").is_hidden());
    }
}
