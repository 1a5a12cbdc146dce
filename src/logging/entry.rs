// SPDX-License-Identifier: Apache-2.0 OR MIT
// Fixed-size log entry and final line formatting

use super::{Category, FlushMode, Severity};
use chrono::{DateTime, Utc};
use std::fmt::{self, Write as _};

/// Size of the message buffer carried by every entry
///
/// One byte is kept back as a terminator, so at most
/// `LOG_MESSAGE_CAPACITY - 1` bytes of message text are stored.
pub const LOG_MESSAGE_CAPACITY: usize = 4096;

/// Room for the header in front of the message on a formatted line
const LINE_HEADER_CAPACITY: usize = 128;

/// Buffer size that fits any formatted line without truncating the message
pub const FORMATTED_LINE_CAPACITY: usize = LOG_MESSAGE_CAPACITY + LINE_HEADER_CAPACITY;

/// What the consumer should do with an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// Format and hand to every sink
    Message,
    /// Flush every sink once all earlier entries are dispatched
    Flush(FlushMode),
}

/// Log entry - a plain value moved through the queue by copy
///
/// The message lives inline in a fixed buffer so that producing an entry
/// never allocates; longer messages are cut at the last whole UTF-8
/// character that fits.
#[derive(Clone)]
pub struct LogEntry {
    /// Dispatch sequence number, stamped by the consumer
    pub frame: u64,
    pub timestamp: DateTime<Utc>,
    pub thread_id: u32,
    pub kind: EntryKind,
    pub severity: Severity,
    pub category: Category,
    message_len: u16,
    message: [u8; LOG_MESSAGE_CAPACITY],
}

impl LogEntry {
    /// Create a message entry from plain text
    pub fn new(severity: Severity, category: Category, message: &str) -> Self {
        let mut entry = Self::blank(EntryKind::Message, severity, category);
        entry.set_message(format_args!("{}", message));
        entry
    }

    /// Create a message entry by rendering `args` into the inline buffer
    pub fn with_args(severity: Severity, category: Category, args: fmt::Arguments<'_>) -> Self {
        let mut entry = Self::blank(EntryKind::Message, severity, category);
        entry.set_message(args);
        entry
    }

    /// Create a flush marker
    pub fn flush(mode: FlushMode) -> Self {
        Self::blank(EntryKind::Flush(mode), Severity::Info, Category::Core)
    }

    fn blank(kind: EntryKind, severity: Severity, category: Category) -> Self {
        Self {
            frame: 0,
            timestamp: Utc::now(),
            thread_id: current_thread_id(),
            kind,
            severity,
            category,
            message_len: 0,
            message: [0; LOG_MESSAGE_CAPACITY],
        }
    }

    fn set_message(&mut self, args: fmt::Arguments<'_>) {
        let mut writer = TruncatingWriter::new(&mut self.message[..LOG_MESSAGE_CAPACITY - 1]);
        // Err only signals truncation; the text that fit is kept
        let _ = writer.write_fmt(args);
        let len = writer.len();
        self.message[len] = 0;
        self.message_len = len as u16;
    }

    /// Get message as string slice
    pub fn get_message(&self) -> &str {
        std::str::from_utf8(&self.message[..self.message_len as usize]).unwrap_or("")
    }

    /// Length of the stored message in bytes
    pub fn message_len(&self) -> usize {
        self.message_len as usize
    }

    pub fn is_flush(&self) -> bool {
        matches!(self.kind, EntryKind::Flush(_))
    }
}

impl fmt::Debug for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogEntry")
            .field("frame", &self.frame)
            .field("kind", &self.kind)
            .field("severity", &self.severity)
            .field("category", &self.category)
            .field("thread_id", &self.thread_id)
            .field("message", &self.get_message())
            .finish()
    }
}

/// Render the final text line for `entry` into `buffer`
///
/// Layout: `2024-05-01 12:00:00.123 [frame] [tid] [LEVEL  ] [Category] message`
/// followed by a newline. The line is truncated to fit `buffer` but always
/// ends with the newline when the buffer is non-empty.
pub fn format_log_message<'a>(buffer: &'a mut [u8], entry: &LogEntry) -> &'a str {
    let Some(body_capacity) = buffer.len().checked_sub(1) else {
        return "";
    };

    let mut writer = TruncatingWriter::new(&mut buffer[..body_capacity]);
    let _ = write!(
        writer,
        "{} [{:>6}] [{}] [{:<7}] [{}] {}",
        entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f"),
        entry.frame,
        entry.thread_id,
        entry.severity,
        entry.category,
        entry.get_message()
    );
    let len = writer.len();

    buffer[len] = b'\n';
    std::str::from_utf8(&buffer[..=len]).unwrap_or("")
}

/// `fmt::Write` over a fixed byte slice that drops whatever does not fit
///
/// Text is only ever cut on a character boundary so the written prefix
/// stays valid UTF-8. Reports `fmt::Error` once truncation happened, which
/// stops the formatter early.
struct TruncatingWriter<'a> {
    buffer: &'a mut [u8],
    len: usize,
}

impl<'a> TruncatingWriter<'a> {
    fn new(buffer: &'a mut [u8]) -> Self {
        Self { buffer, len: 0 }
    }

    fn len(&self) -> usize {
        self.len
    }
}

impl fmt::Write for TruncatingWriter<'_> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let room = self.buffer.len() - self.len;
        let take = floor_char_boundary(s, room);

        self.buffer[self.len..self.len + take].copy_from_slice(&s.as_bytes()[..take]);
        self.len += take;

        if take < s.len() {
            Err(fmt::Error)
        } else {
            Ok(())
        }
    }
}

/// Largest char boundary of `s` that is `<= index`
fn floor_char_boundary(s: &str, index: usize) -> usize {
    if index >= s.len() {
        return s.len();
    }
    let mut boundary = index;
    while !s.is_char_boundary(boundary) {
        boundary -= 1;
    }
    boundary
}

/// Get current thread ID (truncated to u32)
fn current_thread_id() -> u32 {
    #[cfg(target_os = "linux")]
    {
        // SAFETY: gettid has no preconditions and cannot fail
        unsafe { libc::gettid() as u32 }
    }
    #[cfg(not(target_os = "linux"))]
    {
        use std::hash::{Hash, Hasher};
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        std::thread::current().id().hash(&mut hasher);
        hasher.finish() as u32
    }
}
