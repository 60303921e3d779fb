//! Per-worker log destination.
//!
//! A worker writes its diagnostics and test output to its own log file.
//! In tee mode the output is duplicated to the terminal as well. The scope
//! installs a thread-default `tracing` subscriber writing to the same sink;
//! everything acquired is released in reverse order when the scope closes.

use crate::result::FuzzResult;
use crate::test_fn::FuzzTest;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::subscriber::DefaultGuard;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// Extension of worker log files
pub const LOG_EXTENSION: &str = "ansi";

/// How the worker's output reaches its log
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMode {
    /// Log file and terminal
    Tee,
    /// Log file only
    Redirect,
}

/// `<module>.<test>_<index>.ansi`, made safe for any filesystem
#[must_use]
pub fn log_file_name(test: &FuzzTest, index: usize) -> String {
    let raw = format!(
        "{}.{}_{index}.{LOG_EXTENSION}",
        test.module.replace("::", "."),
        test.name
    );
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-') {
                c
            } else {
                '_'
            }
        })
        .collect();
    cleaned.trim_start_matches('.').to_string()
}

/// Cloneable writer over the worker's log destination
#[derive(Debug, Clone)]
pub struct LogSink {
    file: Arc<Mutex<File>>,
    mode: LogMode,
}

impl LogSink {
    /// Open `path` for appending
    pub fn open(path: &Path, mode: LogMode) -> FuzzResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Arc::new(Mutex::new(file)),
            mode,
        })
    }

    /// Output mode
    #[must_use]
    pub fn mode(&self) -> LogMode {
        self.mode
    }
}

impl Write for LogSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(buf)?;
        if self.mode == LogMode::Tee {
            io::stdout().lock().write_all(buf)?;
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        if self.mode == LogMode::Tee {
            io::stdout().flush()?;
        }
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogSink {
    type Writer = LogSink;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

enum Held {
    Subscriber(DefaultGuard),
    Sink(LogSink),
}

/// Scoped log destination; dropping it releases everything it acquired
pub struct LogScope {
    path: PathBuf,
    sink: LogSink,
    held: Vec<Held>,
}

impl std::fmt::Debug for LogScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogScope")
            .field("path", &self.path)
            .field("mode", &self.sink.mode)
            .finish_non_exhaustive()
    }
}

impl LogScope {
    /// Open the log file and route this thread's diagnostics into it
    pub fn open(path: &Path, mode: LogMode) -> FuzzResult<Self> {
        let sink = LogSink::open(path, mode)?;
        let mut held = vec![Held::Sink(sink.clone())];

        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        let subscriber = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(sink.clone())
            .with_ansi(true)
            .with_target(false)
            .finish();
        held.push(Held::Subscriber(tracing::subscriber::set_default(subscriber)));

        Ok(Self {
            path: path.to_path_buf(),
            sink,
            held,
        })
    }

    /// Path of the log file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writer for test output
    #[must_use]
    pub fn sink(&self) -> LogSink {
        self.sink.clone()
    }

    /// Release the scope now
    pub fn close(self) {}
}

impl Drop for LogScope {
    fn drop(&mut self) {
        while let Some(held) = self.held.pop() {
            match held {
                Held::Subscriber(guard) => drop(guard),
                Held::Sink(mut sink) => {
                    let _ = sink.flush();
                }
            }
        }
    }
}
