//! Attach-debugger decision.

use crate::protocol::ExceptionEnvelope;
use std::collections::VecDeque;
use std::io::{self, BufRead, Write};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};
use tracing::warn;

/// Prompt shown when a worker fails
pub const ATTACH_PROMPT: &str = "Would you like to attach the debugger? [y/n] ";

const LIVENESS_INTERVAL: Duration = Duration::from_millis(100);

/// How a prompt ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptOutcome {
    /// The user answered
    Answer(bool),
    /// The worker died while the prompt was open
    Abandoned,
    /// Nobody answered in time
    TimedOut,
}

/// Asks whether to attach a debugger to a failed worker
pub trait DecisionPrompt {
    /// Decide for worker `index`.
    ///
    /// `worker_alive` is polled while waiting; the prompt is abandoned once
    /// it returns `false`.
    fn decide(
        &mut self,
        index: usize,
        envelope: &ExceptionEnvelope,
        worker_alive: &mut dyn FnMut() -> bool,
    ) -> PromptOutcome;
}

/// Reads stdin lines on demand from a helper thread.
///
/// A line is only requested while a prompt is open. If a prompt is given up
/// while a read is pending, the next line typed is consumed by that read
/// and discarded.
struct LineReader {
    requests: Sender<()>,
    lines: Receiver<Option<String>>,
    pending: bool,
}

impl LineReader {
    fn spawn() -> io::Result<Self> {
        let (requests, request_rx) = mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::channel();
        thread::Builder::new()
            .name("chainfuzz-stdin".into())
            .spawn(move || {
                for () in request_rx {
                    let mut line = String::new();
                    let read = io::stdin().lock().read_line(&mut line);
                    let line = match read {
                        Ok(0) | Err(_) => None,
                        Ok(_) => Some(line),
                    };
                    if line_tx.send(line).is_err() {
                        return;
                    }
                }
            })?;
        Ok(Self {
            requests,
            lines,
            pending: false,
        })
    }

    fn next_line(&mut self, wait: Duration) -> Result<Option<String>, RecvTimeoutError> {
        if !self.pending {
            self.requests
                .send(())
                .map_err(|_| RecvTimeoutError::Disconnected)?;
            self.pending = true;
        }
        let line = self.lines.recv_timeout(wait)?;
        self.pending = false;
        Ok(line)
    }

    fn discard_stale(&mut self) {
        if self.pending {
            if let Ok(_stale) = self.lines.try_recv() {
                self.pending = false;
            }
        }
    }
}

/// Interactive yes/no prompt on the terminal
pub struct TerminalPrompt {
    timeout: Option<Duration>,
    reader: Option<LineReader>,
}

impl std::fmt::Debug for TerminalPrompt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TerminalPrompt")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl TerminalPrompt {
    /// Prompt without a timeout
    #[must_use]
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            reader: None,
        }
    }
}

/// Interpret one answer line; anything but `y`/`n` asks again
#[must_use]
pub fn parse_answer(line: &str) -> Option<bool> {
    match line.trim() {
        "y" => Some(true),
        "n" => Some(false),
        _ => None,
    }
}

impl DecisionPrompt for TerminalPrompt {
    fn decide(
        &mut self,
        index: usize,
        _envelope: &ExceptionEnvelope,
        worker_alive: &mut dyn FnMut() -> bool,
    ) -> PromptOutcome {
        if self.reader.is_none() {
            match LineReader::spawn() {
                Ok(reader) => self.reader = Some(reader),
                Err(e) => {
                    warn!(worker = index, error = %e, "cannot read terminal input; detaching");
                    return PromptOutcome::Answer(false);
                }
            }
        }
        let Some(reader) = self.reader.as_mut() else {
            return PromptOutcome::Answer(false);
        };
        reader.discard_stale();

        let deadline = self.timeout.map(|timeout| Instant::now() + timeout);
        let mut stderr = io::stderr();
        let _ = write!(stderr, "{ATTACH_PROMPT}");
        let _ = stderr.flush();

        loop {
            if !worker_alive() {
                let _ = writeln!(stderr);
                return PromptOutcome::Abandoned;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                let _ = writeln!(stderr);
                return PromptOutcome::TimedOut;
            }
            match reader.next_line(LIVENESS_INTERVAL) {
                Ok(Some(line)) => match parse_answer(&line) {
                    Some(answer) => return PromptOutcome::Answer(answer),
                    None => {
                        let _ = write!(stderr, "{ATTACH_PROMPT}");
                        let _ = stderr.flush();
                    }
                },
                // End of input: nobody can answer
                Ok(None) | Err(RecvTimeoutError::Disconnected) => {
                    return PromptOutcome::Answer(false)
                }
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }
}

/// Prompt answering from a script, for tests and unattended runs
#[derive(Debug, Clone, Default)]
pub struct ScriptedPrompt {
    answers: VecDeque<PromptOutcome>,
    asked: Vec<usize>,
}

impl ScriptedPrompt {
    /// Answer with `answers` in order, then with "no"
    #[must_use]
    pub fn new(answers: impl IntoIterator<Item = PromptOutcome>) -> Self {
        Self {
            answers: answers.into_iter().collect(),
            asked: Vec::new(),
        }
    }

    /// Workers that were prompted for, in order
    #[must_use]
    pub fn asked(&self) -> &[usize] {
        &self.asked
    }
}

impl DecisionPrompt for ScriptedPrompt {
    fn decide(
        &mut self,
        index: usize,
        _envelope: &ExceptionEnvelope,
        worker_alive: &mut dyn FnMut() -> bool,
    ) -> PromptOutcome {
        self.asked.push(index);
        if !worker_alive() {
            return PromptOutcome::Abandoned;
        }
        self.answers
            .pop_front()
            .unwrap_or(PromptOutcome::Answer(false))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::result::FuzzError;

    fn envelope() -> ExceptionEnvelope {
        ExceptionEnvelope::from_harness_error("demo::fuzz", &FuzzError::configuration("x"))
    }

    #[test]
    fn test_parse_answer() {
        assert_eq!(parse_answer("y\n"), Some(true));
        assert_eq!(parse_answer(" n "), Some(false));
        assert_eq!(parse_answer("yes"), None);
        assert_eq!(parse_answer(""), None);
        assert_eq!(parse_answer("Y"), None);
    }

    #[test]
    fn test_scripted_answers_in_order() {
        let mut prompt = ScriptedPrompt::new([PromptOutcome::Answer(true)]);
        let env = envelope();
        assert_eq!(prompt.decide(1, &env, &mut || true), PromptOutcome::Answer(true));
        assert_eq!(prompt.decide(3, &env, &mut || true), PromptOutcome::Answer(false));
        assert_eq!(prompt.asked(), &[1, 3]);
    }

    #[test]
    fn test_scripted_abandons_dead_worker() {
        let mut prompt = ScriptedPrompt::default();
        assert_eq!(
            prompt.decide(0, &envelope(), &mut || false),
            PromptOutcome::Abandoned
        );
    }

    #[test]
    fn test_terminal_prompt_abandons_dead_worker() {
        let mut prompt = TerminalPrompt::new(None);
        assert_eq!(
            prompt.decide(0, &envelope(), &mut || false),
            PromptOutcome::Abandoned
        );
    }
}
