//! Terminal output for CLI commands

use chainfuzz::{CampaignReport, WorkerOutcome};
use console::{style, Term};

/// Writes status lines to stderr, honouring quiet mode
#[derive(Debug)]
pub struct Reporter {
    term: Term,
    /// Whether to use colors
    pub use_color: bool,
    /// Quiet mode
    pub quiet: bool,
}

impl Reporter {
    /// Create a reporter writing to stderr
    #[must_use]
    pub fn new(use_color: bool, quiet: bool) -> Self {
        Self {
            term: Term::stderr(),
            use_color,
            quiet,
        }
    }

    fn line(&self, prefix: console::StyledObject<&str>, plain: &str, message: &str) {
        let prefix = if self.use_color {
            prefix.to_string()
        } else {
            plain.to_string()
        };
        let _ = self.term.write_line(&format!("{prefix} {message}"));
    }

    /// Print a success message
    pub fn success(&self, message: &str) {
        if !self.quiet {
            self.line(style("✓").green().bold(), "PASS", message);
        }
    }

    /// Print a failure message; shown even in quiet mode
    pub fn failure(&self, message: &str) {
        self.line(style("✗").red().bold(), "FAIL", message);
    }

    /// Print a warning message
    pub fn warning(&self, message: &str) {
        if !self.quiet {
            self.line(style("⚠").yellow().bold(), "WARN", message);
        }
    }

    /// Print an info message
    pub fn info(&self, message: &str) {
        if !self.quiet {
            self.line(style("ℹ").blue().bold(), "INFO", message);
        }
    }

    /// Print the per-worker results of a campaign
    pub fn campaign(&self, report: &CampaignReport) {
        for worker in &report.workers {
            match &worker.outcome {
                WorkerOutcome::Passed => {
                    self.success(&format!("process #{} (seed {})", worker.index, worker.seed));
                }
                WorkerOutcome::Failed { envelope, attached } => {
                    let note = if *attached { ", debugger attached" } else { "" };
                    self.failure(&format!(
                        "process #{} (seed {}): {envelope}{note}",
                        worker.index, worker.seed
                    ));
                }
            }
        }
        for path in &report.coverage_files {
            self.info(&format!("coverage written to {}", path.display()));
        }
        let _ = self.term.write_line(&campaign_summary(report));
    }
}

/// One-line verdict of a campaign
#[must_use]
pub fn campaign_summary(report: &CampaignReport) -> String {
    let failed = report.failures().count();
    let total = report.workers.len();
    let status = if failed > 0 { "FAILED" } else { "PASSED" };
    format!("{status}: {} of {total} processes passed, {failed} failed", total - failed)
}
