//! Live status line of a running campaign.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::time::Duration;

/// Spinner showing how many workers are still running
#[derive(Debug)]
pub struct CampaignProgress {
    bar: ProgressBar,
    show_coverage: bool,
}

/// Status text for `remaining` running workers and coverage summary lines
#[must_use]
pub fn status_text(remaining: usize, coverage_lines: &[String]) -> String {
    let mut text = format!("Fuzzing, {remaining} processes remaining");
    for line in coverage_lines {
        text.push('\n');
        text.push_str(line);
    }
    text
}

impl CampaignProgress {
    /// Start the spinner; a passive campaign draws nothing
    #[must_use]
    pub fn start(remaining: usize, passive: bool, show_coverage: bool) -> Self {
        let bar = if passive {
            ProgressBar::hidden()
        } else {
            let bar = ProgressBar::with_draw_target(None, ProgressDrawTarget::stderr());
            bar.set_style(
                ProgressStyle::default_spinner()
                    .template("{spinner:.green} {msg}")
                    .unwrap_or_else(|_| ProgressStyle::default_spinner()),
            );
            bar.enable_steady_tick(Duration::from_millis(100));
            bar
        };
        bar.set_message(status_text(remaining, &[]));
        Self {
            bar,
            show_coverage: show_coverage && !passive,
        }
    }

    /// Refresh the status line
    pub fn update(&self, remaining: usize, coverage_lines: &[String]) {
        let lines = if self.show_coverage { coverage_lines } else { &[] };
        self.bar.set_message(status_text(remaining, lines));
    }

    /// Print a line above the spinner
    pub fn println(&self, text: impl AsRef<str>) {
        if self.bar.is_hidden() {
            eprintln!("{}", text.as_ref());
        } else {
            self.bar.println(text);
        }
    }

    /// Run `f` with the spinner cleared from the terminal
    pub fn suspend<R>(&self, f: impl FnOnce() -> R) -> R {
        self.bar.suspend(f)
    }

    /// Stop the spinner, leaving "Finished"
    pub fn finish(&self) {
        self.bar.finish_with_message("Finished");
    }

    /// Current status text
    #[must_use]
    pub fn message(&self) -> String {
        self.bar.message()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text() {
        assert_eq!(status_text(3, &[]), "Fuzzing, 3 processes remaining");
        let lines = vec!["transfer: 10".to_string(), "mint: 2".to_string()];
        assert_eq!(
            status_text(1, &lines),
            "Fuzzing, 1 processes remaining\ntransfer: 10\nmint: 2"
        );
    }

    #[test]
    fn test_passive_hides_coverage() {
        let progress = CampaignProgress::start(2, true, true);
        progress.update(1, &["transfer: 10".to_string()]);
        assert_eq!(progress.message(), "Fuzzing, 1 processes remaining");
        progress.finish();
        assert_eq!(progress.message(), "Finished");
    }

    #[test]
    fn test_verbose_coverage_lines() {
        let progress = CampaignProgress::start(2, false, true);
        progress.update(2, &["transfer: 10".to_string()]);
        assert!(progress.message().ends_with("transfer: 10"));
        progress.finish();
    }
}
