//! Terminal rendering of worker failures.

use crate::protocol::{EnvelopeOrigin, ExceptionEnvelope};
use console::style;
use std::fmt::Write as _;

/// Render a failure of worker `index` the way a traceback reads:
/// frames outermost first, then the error, then the closing line.
#[must_use]
pub fn render_failure(index: usize, envelope: &ExceptionEnvelope) -> String {
    let mut out = String::new();
    let header = match envelope.origin {
        EnvelopeOrigin::TestBody => "Traceback (most recent call last):",
        EnvelopeOrigin::Harness => "Worker setup failed:",
    };
    let _ = writeln!(out, "{}", style(header).bold());
    for frame in &envelope.frames {
        let _ = writeln!(
            out,
            "  {} {}:{}",
            style(&frame.function).cyan(),
            frame.file,
            frame.line
        );
        for (name, value) in &frame.locals {
            let _ = writeln!(out, "      {} = {value}", style(name).dim());
        }
    }
    let _ = writeln!(
        out,
        "{}: {}",
        style(&envelope.kind).red().bold(),
        envelope.message
    );
    let _ = write!(
        out,
        "{}",
        style(format!("Process #{index} failed with an exception above.")).red()
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::FuzzError;

    fn plain(text: &str) -> String {
        console::strip_ansi_codes(text).into_owned()
    }

    #[test]
    fn test_render_ends_with_process_line() {
        let envelope = ExceptionEnvelope::from_harness_error("demo::fuzz", &FuzzError::configuration("bad"));
        let text = plain(&render_failure(3, &envelope));
        assert!(text.starts_with("Worker setup failed:"));
        assert!(text.ends_with("Process #3 failed with an exception above."));
        assert!(text.contains("ConfigurationError: "));
    }

    #[test]
    fn test_render_lists_frames_and_locals() {
        let envelope = ExceptionEnvelope::from_test_error(
            "demo::fuzz",
            &std::io::Error::new(std::io::ErrorKind::Other, "balance mismatch"),
            vec![("balance".into(), "7".into())],
        );
        let text = plain(&render_failure(0, &envelope));
        assert!(text.contains("demo::fuzz <unknown>:0"));
        assert!(text.contains("balance = 7"));
        assert!(text.contains("error: balance mismatch"));
    }
}
