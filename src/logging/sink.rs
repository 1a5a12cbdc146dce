// SPDX-License-Identifier: Apache-2.0 OR MIT
// Output sinks receiving formatted log lines from the consumer

use super::entry::LogEntry;
use super::error::SinkError;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Output sink for log entries
///
/// Sinks are shared between the logger and the code that registered them and
/// may be called while other threads hold the registry read lock, so both
/// methods take `&self`. Write failures are the sink's own business; the
/// consumer neither retries nor reports them.
pub trait LogSink: Send + Sync {
    /// Write one formatted line (already newline-terminated)
    fn sink_log(&self, formatted: &str, entry: &LogEntry);

    /// Flush any buffered output
    fn flush(&self);
}

/// Which standard stream a [`ConsoleSink`] writes to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleTarget {
    Stdout,
    Stderr,
}

/// Console sink, the stand-in for a debugger output window
#[derive(Debug)]
pub struct ConsoleSink {
    target: ConsoleTarget,
}

impl ConsoleSink {
    pub fn new(target: ConsoleTarget) -> Self {
        Self { target }
    }

    pub fn stdout() -> Self {
        Self::new(ConsoleTarget::Stdout)
    }

    pub fn stderr() -> Self {
        Self::new(ConsoleTarget::Stderr)
    }

    pub fn target(&self) -> ConsoleTarget {
        self.target
    }
}

impl LogSink for ConsoleSink {
    fn sink_log(&self, formatted: &str, _entry: &LogEntry) {
        let _ = match self.target {
            ConsoleTarget::Stdout => std::io::stdout().lock().write_all(formatted.as_bytes()),
            ConsoleTarget::Stderr => std::io::stderr().lock().write_all(formatted.as_bytes()),
        };
    }

    fn flush(&self) {
        let _ = match self.target {
            ConsoleTarget::Stdout => std::io::stdout().flush(),
            ConsoleTarget::Stderr => std::io::stderr().flush(),
        };
    }
}

/// How [`FileSink::open_file`] treats an existing file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FileMode {
    /// Start from an empty file
    #[default]
    Truncate,
    /// Keep existing content and write after it
    Append,
}

struct OpenFile {
    path: PathBuf,
    writer: BufWriter<File>,
}

/// Buffered file sink
///
/// Lines are buffered in memory and reach the disk on `flush`, when the
/// buffer fills up, or when the file is closed. A sink without an open
/// file silently discards lines.
#[derive(Default)]
pub struct FileSink {
    file: Mutex<Option<OpenFile>>,
}

impl FileSink {
    /// Create a sink with no file attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a sink and open `path` right away
    pub fn create(path: impl AsRef<Path>, mode: FileMode) -> Result<Self, SinkError> {
        let sink = Self::new();
        sink.open_file(path, mode)?;
        Ok(sink)
    }

    /// Open `path`, closing any file opened before
    pub fn open_file(&self, path: impl AsRef<Path>, mode: FileMode) -> Result<(), SinkError> {
        let path = path.as_ref();
        let mut options = OpenOptions::new();
        options.create(true);
        match mode {
            FileMode::Truncate => options.write(true).truncate(true),
            FileMode::Append => options.append(true),
        };

        let file = options.open(path).map_err(|source| SinkError::Open {
            path: path.to_path_buf(),
            source,
        })?;

        let previous = self.lock().replace(OpenFile {
            path: path.to_path_buf(),
            writer: BufWriter::new(file),
        });
        if let Some(mut previous) = previous {
            previous.writer.flush()?;
        }
        Ok(())
    }

    /// Flush and close the current file (no-op when none is open)
    pub fn close_file(&self) -> Result<(), SinkError> {
        if let Some(mut open) = self.lock().take() {
            open.writer.flush()?;
        }
        Ok(())
    }

    pub fn is_open(&self) -> bool {
        self.lock().is_some()
    }

    /// Path of the open file, if any
    pub fn path(&self) -> Option<PathBuf> {
        self.lock().as_ref().map(|open| open.path.clone())
    }

    fn lock(&self) -> MutexGuard<'_, Option<OpenFile>> {
        // A panic mid-write leaves at worst a partial line behind
        self.file.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl LogSink for FileSink {
    fn sink_log(&self, formatted: &str, _entry: &LogEntry) {
        if let Some(open) = self.lock().as_mut() {
            let _ = open.writer.write_all(formatted.as_bytes());
        }
    }

    fn flush(&self) {
        if let Some(open) = self.lock().as_mut() {
            let _ = open.writer.flush();
        }
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        let _ = self.close_file();
    }
}

impl std::fmt::Debug for FileSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileSink").field("path", &self.path()).finish()
    }
}
