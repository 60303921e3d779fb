//! Post-mortem inspector for a failed test.
//!
//! Runs inside the worker once the orchestrator decided to attach. It reads
//! commands from the controlling terminal and walks the frames of the
//! failure, showing the values the test watched.

use crate::protocol::{ExceptionEnvelope, StackFrame};
use std::fs::{File, OpenOptions};
use std::io::{self, BufRead, BufReader, Write};

const HELP: &str = "\
Commands:
  where, bt          show all frames
  frame N, f N       select frame N
  up / down          move towards the caller / the failure
  locals, l          show watched values of the selected frame
  print NAME, p NAME show one watched value
  help, h            this text
  continue, c, quit, q
                     leave the debugger";

/// Interactive session over one failure
#[derive(Debug)]
pub struct DebugSession<'a> {
    envelope: &'a ExceptionEnvelope,
    selected: usize,
}

impl<'a> DebugSession<'a> {
    /// Start at the failing frame
    #[must_use]
    pub fn new(envelope: &'a ExceptionEnvelope) -> Self {
        Self {
            envelope,
            selected: envelope.frames.len().saturating_sub(1),
        }
    }

    /// Index of the selected frame
    #[must_use]
    pub fn selected(&self) -> usize {
        self.selected
    }

    fn frame(&self) -> Option<&StackFrame> {
        self.envelope.frames.get(self.selected)
    }

    /// Run on the controlling terminal, falling back to stdin/stderr
    pub fn run_on_terminal(&mut self) -> io::Result<()> {
        let tty_in = File::open("/dev/tty");
        let tty_out = OpenOptions::new().write(true).open("/dev/tty");
        match (tty_in, tty_out) {
            (Ok(input), Ok(mut output)) => self.run(&mut BufReader::new(input), &mut output),
            _ => self.run(&mut io::stdin().lock(), &mut io::stderr()),
        }
    }

    /// Command loop; returns when the user leaves or input ends
    pub fn run<R: BufRead, W: Write>(&mut self, input: &mut R, output: &mut W) -> io::Result<()> {
        writeln!(output, "{}", self.envelope)?;
        self.show_frame(output)?;
        let mut line = String::new();
        loop {
            write!(output, "(chainfuzz) ")?;
            output.flush()?;
            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(output)?;
                return Ok(());
            }
            let mut words = line.split_whitespace();
            let command = words.next().unwrap_or_default();
            let argument = words.next();
            match command {
                "" => {}
                "where" | "bt" => self.show_stack(output)?,
                "frame" | "f" => match argument.and_then(|n| n.parse::<usize>().ok()) {
                    Some(n) if n < self.envelope.frames.len() => {
                        self.selected = n;
                        self.show_frame(output)?;
                    }
                    _ => writeln!(output, "*** No such frame")?,
                },
                "up" | "u" => {
                    if self.selected == 0 {
                        writeln!(output, "*** Oldest frame")?;
                    } else {
                        self.selected -= 1;
                        self.show_frame(output)?;
                    }
                }
                "down" | "d" => {
                    if self.selected + 1 >= self.envelope.frames.len() {
                        writeln!(output, "*** Newest frame")?;
                    } else {
                        self.selected += 1;
                        self.show_frame(output)?;
                    }
                }
                "locals" | "l" => self.show_locals(output)?,
                "print" | "p" => match argument {
                    Some(name) => self.show_value(output, name)?,
                    None => writeln!(output, "*** Usage: print NAME")?,
                },
                "help" | "h" => writeln!(output, "{HELP}")?,
                "continue" | "c" | "quit" | "q" => return Ok(()),
                other => writeln!(output, "*** Unknown command '{other}', try 'help'")?,
            }
        }
    }

    fn show_stack<W: Write>(&self, output: &mut W) -> io::Result<()> {
        for (i, frame) in self.envelope.frames.iter().enumerate() {
            let marker = if i == self.selected { '>' } else { ' ' };
            writeln!(output, "{marker} #{i} {frame}")?;
        }
        Ok(())
    }

    fn show_frame<W: Write>(&self, output: &mut W) -> io::Result<()> {
        match self.frame() {
            Some(frame) => writeln!(output, "> #{} {frame}", self.selected),
            None => writeln!(output, "*** No frames"),
        }
    }

    fn show_locals<W: Write>(&self, output: &mut W) -> io::Result<()> {
        match self.frame() {
            Some(frame) if !frame.locals.is_empty() => {
                for (name, value) in &frame.locals {
                    writeln!(output, "{name} = {value}")?;
                }
                Ok(())
            }
            _ => writeln!(output, "(no watched values)"),
        }
    }

    fn show_value<W: Write>(&self, output: &mut W, name: &str) -> io::Result<()> {
        let value = self
            .frame()
            .and_then(|frame| frame.locals.iter().find(|(n, _)| n == name));
        match value {
            Some((_, value)) => writeln!(output, "{value}"),
            None => writeln!(output, "*** Name '{name}' is not defined"),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::protocol::CapturedPanic;
    use std::io::Cursor;

    fn envelope() -> ExceptionEnvelope {
        let backtrace = "   0: token_fuzz::fuzz_transfers
             at ./tests/fuzz.rs:17:5
   1: token_fuzz::check_supply
             at ./tests/fuzz.rs:41:9
";
        ExceptionEnvelope::from_panic(
            "token_fuzz::fuzz_transfers",
            CapturedPanic {
                message: "invariant broken".into(),
                location: Some(("./tests/fuzz.rs".into(), 17)),
                backtrace: backtrace.into(),
            },
            vec![("supply".into(), "1000".into())],
        )
    }

    fn session(commands: &str) -> (usize, String) {
        let envelope = envelope();
        let mut session = DebugSession::new(&envelope);
        let mut output = Vec::new();
        session
            .run(&mut Cursor::new(commands.as_bytes()), &mut output)
            .unwrap();
        (session.selected(), String::from_utf8(output).unwrap())
    }

    #[test]
    fn test_starts_at_failing_frame() {
        let (selected, output) = session("q\n");
        assert_eq!(selected, 1);
        assert!(output.contains("panic: invariant broken"));
        assert!(output.contains("> #1 token_fuzz::fuzz_transfers (./tests/fuzz.rs:17)"));
    }

    #[test]
    fn test_locals_and_print() {
        let (_, output) = session("locals\np supply\np missing\nc\n");
        assert!(output.contains("supply = 1000"));
        assert!(output.contains("(chainfuzz) 1000\n"));
        assert!(output.contains("Name 'missing' is not defined"));
    }

    #[test]
    fn test_navigation() {
        let (selected, output) = session("up\nup\ndown\ndown\nframe 0\nframe 9\n");
        assert_eq!(selected, 0);
        assert!(output.contains("Oldest frame"));
        assert!(output.contains("Newest frame"));
        assert!(output.contains("No such frame"));
    }

    #[test]
    fn test_where_marks_selection() {
        let (_, output) = session("bt\n");
        assert!(output.contains("  #0 token_fuzz::check_supply"));
        assert!(output.contains("> #1 token_fuzz::fuzz_transfers"));
    }

    #[test]
    fn test_eof_ends_session() {
        let (_, output) = session("");
        assert!(output.ends_with("(chainfuzz) \n"));
    }

    #[test]
    fn test_unknown_command() {
        let (_, output) = session("step\nquit\n");
        assert!(output.contains("Unknown command 'step'"));
    }
}
