//! Exception envelopes.
//!
//! A worker never ships a live error object across the process boundary.
//! It builds an [`ExceptionEnvelope`] explicitly: a kind, a message and
//! structured frames, ordered outermost first so the failing frame is last.

use crate::result::FuzzError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Schema version of [`ExceptionEnvelope`]
pub const ENVELOPE_VERSION: u16 = 1;

/// Where the failure came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EnvelopeOrigin {
    /// Raised by the user's test body
    TestBody,
    /// Raised by the worker harness before the test body ran
    Harness,
}

/// One frame of a failure trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackFrame {
    /// Source file
    pub file: String,
    /// Line number (0 when unknown)
    pub line: u32,
    /// Function path
    pub function: String,
    /// Named values captured for this frame
    pub locals: Vec<(String, String)>,
}

impl StackFrame {
    /// Create a frame without locals
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
            locals: Vec::new(),
        }
    }
}

impl fmt::Display for StackFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}:{})", self.function, self.file, self.line)
    }
}

/// Panic details captured by the worker's panic hook
#[derive(Debug, Clone, Default)]
pub struct CapturedPanic {
    /// Panic payload rendered as text
    pub message: String,
    /// `file:line` of the panic site
    pub location: Option<(String, u32)>,
    /// `std::backtrace::Backtrace` rendered with `{}`
    pub backtrace: String,
}

/// Serializable description of a worker failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExceptionEnvelope {
    /// Schema version
    pub version: u16,
    /// Failure kind, e.g. `panic` or `ConfigurationError`
    pub kind: String,
    /// Human-readable message
    pub message: String,
    /// Origin of the failure
    pub origin: EnvelopeOrigin,
    /// Frames, outermost first
    pub frames: Vec<StackFrame>,
}

impl ExceptionEnvelope {
    /// Envelope for a panic raised in the test body
    #[must_use]
    pub fn from_panic(test: &str, panic: CapturedPanic, locals: Vec<(String, String)>) -> Self {
        let mut frames = parse_backtrace(&panic.backtrace);
        if let Some((file, line)) = panic.location {
            let known = frames
                .last()
                .is_some_and(|frame| frame.file == file && frame.line == line);
            if !known {
                frames.push(StackFrame::new(file, line, test));
            }
        }
        Self::assemble("panic", panic.message, EnvelopeOrigin::TestBody, frames, test, locals)
    }

    /// Envelope for an error returned from the test body
    #[must_use]
    pub fn from_test_error(
        test: &str,
        error: &(dyn std::error::Error + 'static),
        locals: Vec<(String, String)>,
    ) -> Self {
        let mut message = error.to_string();
        let mut source = error.source();
        while let Some(cause) = source {
            message.push_str(&format!("\n  caused by: {cause}"));
            source = cause.source();
        }
        Self::assemble("error", message, EnvelopeOrigin::TestBody, Vec::new(), test, locals)
    }

    /// Envelope for a harness failure (bad parameters, unreachable node, ...)
    #[must_use]
    pub fn from_harness_error(test: &str, error: &FuzzError) -> Self {
        Self::assemble(
            error.kind(),
            error.to_string(),
            EnvelopeOrigin::Harness,
            Vec::new(),
            test,
            Vec::new(),
        )
    }

    fn assemble(
        kind: &str,
        message: String,
        origin: EnvelopeOrigin,
        mut frames: Vec<StackFrame>,
        test: &str,
        locals: Vec<(String, String)>,
    ) -> Self {
        if frames.is_empty() {
            frames.push(StackFrame::new("<unknown>", 0, test));
        }
        if let Some(last) = frames.last_mut() {
            last.locals = locals;
        }
        Self {
            version: ENVELOPE_VERSION,
            kind: kind.to_string(),
            message,
            origin,
            frames,
        }
    }

    /// The frame where the failure was raised
    #[must_use]
    pub fn innermost(&self) -> Option<&StackFrame> {
        self.frames.last()
    }

    /// Whether a debugger may be offered for this failure
    #[must_use]
    pub fn is_debuggable(&self) -> bool {
        self.origin == EnvelopeOrigin::TestBody
    }
}

impl fmt::Display for ExceptionEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

const HIDDEN_PREFIXES: &[&str] = &[
    "std::",
    "core::",
    "alloc::",
    "backtrace::",
    "rust_begin_unwind",
    "rust_panic",
    "__rust",
    "__libc",
    "_start",
    "__scrt",
    "chainfuzz::worker::",
];

fn is_hidden(function: &str) -> bool {
    HIDDEN_PREFIXES.iter().any(|p| function.starts_with(p))
        || function.starts_with('<') && function.contains(" as core::")
}

fn strip_hash(function: &str) -> &str {
    match function.rsplit_once("::h") {
        Some((head, hash)) if hash.len() == 16 && hash.chars().all(|c| c.is_ascii_hexdigit()) => head,
        _ => function,
    }
}

/// Parse a rendered `std::backtrace::Backtrace` into frames, outermost first.
///
/// Runtime and harness frames are dropped.
#[must_use]
pub fn parse_backtrace(text: &str) -> Vec<StackFrame> {
    let mut frames: Vec<StackFrame> = Vec::new();
    let mut current: Option<StackFrame> = None;

    for line in text.lines() {
        let trimmed = line.trim();
        if let Some(location) = trimmed.strip_prefix("at ") {
            if let Some(frame) = current.as_mut() {
                let mut parts = location.rsplitn(3, ':');
                let _column = parts.next();
                let line_no = parts.next().and_then(|l| l.parse().ok());
                if let (Some(line_no), Some(file)) = (line_no, parts.next()) {
                    frame.file = file.to_string();
                    frame.line = line_no;
                }
            }
            continue;
        }
        if let Some((index, function)) = trimmed.split_once(": ") {
            if !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()) {
                frames.extend(current.take());
                current = Some(StackFrame::new("<unknown>", 0, strip_hash(function)));
            }
        }
    }
    frames.extend(current);

    frames.retain(|frame| !is_hidden(&frame.function));
    frames.reverse();
    frames
}
