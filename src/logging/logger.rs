// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logger: filtering, queueing and sink fan-out

use super::drain::DrainThread;
use super::entry::{format_log_message, EntryKind, LogEntry, FORMATTED_LINE_CAPACITY};
use super::queue::{LogQueue, LOG_QUEUE_CAPACITY};
use super::sink::LogSink;
use super::{Category, CategoryMask, Severity, ALL_CATEGORIES};
use crate::sync::RwSpinLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{fence, AtomicBool, AtomicU64, AtomicU8, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

/// Maximum number of sinks registered at once
pub const SINK_CAPACITY: usize = 8;

type SinkTable = [Option<Arc<dyn LogSink>>; SINK_CAPACITY];

/// Who drains the queue, and whether a flush request waits for completion
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlushMode {
    /// As a logger mode: producers drain the queue themselves right after
    /// enqueueing. As a flush request: the caller waits until its flush
    /// marker has been dispatched.
    Sync = 0,
    /// As a logger mode: a background drain thread consumes the queue.
    /// As a flush request: the marker is queued and the caller moves on.
    Async = 1,
}

impl FlushMode {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => FlushMode::Sync,
            _ => FlushMode::Async,
        }
    }
}

const STATE_UNINITIALIZED: u8 = 0;
const STATE_RUNNING: u8 = 1;
const STATE_STOPPING: u8 = 2;
const STATE_SHUT_DOWN: u8 = 3;

/// Address of a thread-local, unique among live threads and never 0
fn thread_token() -> usize {
    thread_local! {
        static TOKEN: u8 = const { 0 };
    }
    TOKEN.with(|token| token as *const u8 as usize)
}

/// Counts a producer as in flight until dropped
struct ProducerGuard<'a> {
    in_flight: &'a AtomicUsize,
}

impl<'a> ProducerGuard<'a> {
    fn enter(in_flight: &'a AtomicUsize) -> Self {
        in_flight.fetch_add(1, Ordering::Relaxed);
        // Pairs with the fence in `deinit`: either this producer sees the
        // filter closed or deinit sees it in flight
        fence(Ordering::SeqCst);
        Self { in_flight }
    }
}

impl Drop for ProducerGuard<'_> {
    fn drop(&mut self) {
        self.in_flight.fetch_sub(1, Ordering::Release);
    }
}

/// Marks the current thread as dispatching until dropped
struct DispatchGuard<'a> {
    dispatching: &'a AtomicUsize,
}

impl<'a> DispatchGuard<'a> {
    fn enter(dispatching: &'a AtomicUsize) -> Self {
        dispatching.store(thread_token(), Ordering::Relaxed);
        Self { dispatching }
    }
}

impl Drop for DispatchGuard<'_> {
    fn drop(&mut self) {
        self.dispatching.store(0, Ordering::Relaxed);
    }
}

/// Engine logger
///
/// Lifecycle: `new` -> `init(mode)` -> (`enable`/`disable` any number of
/// times) -> `deinit`. After `deinit` the instance stays shut down; a second
/// `init` is ignored. Logging outside the running state is filtered out, not
/// an error.
///
/// Any number of threads may produce. Exactly one thread consumes at a time:
/// the drain thread in [`FlushMode::Async`], or whichever producer holds the
/// consumer lock in [`FlushMode::Sync`].
///
/// A sink may log into the logger that is calling it. Such entries are
/// queued without waiting (the consumer cannot make room for itself) and
/// are dropped if the queue is full.
pub struct Logger {
    state: AtomicU8,
    enabled: AtomicBool,
    mode: AtomicU8,
    level: AtomicU8,
    category_mask: AtomicU64,
    sinks: RwSpinLock<SinkTable>,
    queue: LogQueue<LogEntry>,
    /// Entries dispatched so far; the next entry's frame number
    frame: AtomicU64,
    epoch: Instant,
    last_activity_ns: AtomicU64,
    /// Producers between the filter check and the end of their enqueue
    in_flight: AtomicUsize,
    /// Token of the thread currently inside a sink call, 0 when none
    dispatching: AtomicUsize,
    /// Serializes inline draining in sync mode
    consumer: Mutex<()>,
    /// Drain thread in async mode; also serializes init/deinit
    drain: Mutex<Option<DrainThread>>,
}

impl Logger {
    pub fn new() -> Self {
        Self::with_capacity(LOG_QUEUE_CAPACITY)
    }

    /// Create a logger whose queue holds `capacity` entries
    ///
    /// # Panics
    /// Panics if capacity is not a power of 2
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            state: AtomicU8::new(STATE_UNINITIALIZED),
            enabled: AtomicBool::new(false),
            mode: AtomicU8::new(FlushMode::Async as u8),
            level: AtomicU8::new(Severity::default() as u8),
            category_mask: AtomicU64::new(ALL_CATEGORIES),
            sinks: RwSpinLock::new(SinkTable::default()),
            queue: LogQueue::new(capacity),
            frame: AtomicU64::new(0),
            epoch: Instant::now(),
            last_activity_ns: AtomicU64::new(0),
            in_flight: AtomicUsize::new(0),
            dispatching: AtomicUsize::new(0),
            consumer: Mutex::new(()),
            drain: Mutex::new(None),
        }
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Start accepting messages
    ///
    /// In async mode this spawns the drain thread; if the thread cannot be
    /// spawned the logger falls back to sync mode. Returns false when the
    /// logger was already initialized or has been shut down.
    pub fn init(self: &Arc<Self>, mode: FlushMode) -> bool {
        let mut drain = self.drain.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state.load(Ordering::Acquire) != STATE_UNINITIALIZED {
            return false;
        }

        let mut effective = mode;
        if mode == FlushMode::Async {
            match DrainThread::start(Arc::clone(self)) {
                Ok(thread) => *drain = Some(thread),
                Err(_) => effective = FlushMode::Sync,
            }
        }

        self.mode.store(effective as u8, Ordering::Release);
        self.enabled.store(true, Ordering::Release);
        self.state.store(STATE_RUNNING, Ordering::Release);
        true
    }

    /// Flush, stop accepting messages and stop the drain thread
    ///
    /// Returns once every entry queued before the call, and every entry of a
    /// producer that got past the filter before it closed, has been
    /// dispatched. Sinks stay registered; unregister them afterwards if
    /// needed.
    pub fn deinit(&self) {
        let mut drain = self.drain.lock().unwrap_or_else(PoisonError::into_inner);
        if self.state.load(Ordering::Acquire) != STATE_RUNNING {
            return;
        }

        self.state.store(STATE_STOPPING, Ordering::Relaxed);
        self.enabled.store(false, Ordering::Relaxed);
        // Pairs with the fence in ProducerGuard::enter
        fence(Ordering::SeqCst);

        // Late producers may be blocked on a full queue; keep consuming
        // until the last one is through
        let start = Instant::now();
        while self.in_flight.load(Ordering::Acquire) != 0 {
            if drain.is_none() {
                self.drain_inline();
            }
            self.queue.wait(start);
        }

        self.queue_entry(LogEntry::flush(FlushMode::Async));
        match drain.take() {
            // Joins after the thread has drained everything queued so far
            Some(thread) => thread.stop(),
            None => self.drain_inline(),
        }

        self.state.store(STATE_SHUT_DOWN, Ordering::Release);
    }

    /// Resume accepting messages (no-op unless initialized)
    pub fn enable(&self) {
        if self.is_initialized() {
            self.enabled.store(true, Ordering::Release);
        }
    }

    /// Stop accepting messages without tearing anything down
    pub fn disable(&self) {
        if self.is_initialized() {
            self.enabled.store(false, Ordering::Release);
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    pub fn is_initialized(&self) -> bool {
        self.state.load(Ordering::Acquire) == STATE_RUNNING
    }

    /// Mode the logger is running in (async until initialized otherwise)
    pub fn mode(&self) -> FlushMode {
        FlushMode::from_u8(self.mode.load(Ordering::Acquire))
    }

    // ------------------------------------------------------------------
    // Filtering
    // ------------------------------------------------------------------

    /// Would a message at `level` in `category` be accepted right now?
    ///
    /// Lock-free; called on every log statement. A message racing a filter
    /// change may land on either side of it.
    #[inline]
    pub fn can_log(&self, level: Severity, category: Category) -> bool {
        self.enabled.load(Ordering::Relaxed)
            && level.as_u8() <= self.level.load(Ordering::Relaxed)
            && self.category_mask.load(Ordering::Relaxed) & category.bit() != 0
    }

    /// Set the severity threshold (messages at or above it in severity pass)
    pub fn set_level(&self, level: Severity) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> Severity {
        Severity::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or_default()
    }

    /// Go back to the default threshold
    pub fn restore_level(&self) {
        self.set_level(Severity::default());
    }

    /// Enable or disable one category
    pub fn toggle_category(&self, category: Category, enable: bool) {
        if enable {
            self.category_mask
                .fetch_or(category.bit(), Ordering::Relaxed);
        } else {
            self.category_mask
                .fetch_and(!category.bit(), Ordering::Relaxed);
        }
    }

    pub fn set_category_mask(&self, mask: CategoryMask) {
        self.category_mask.store(mask, Ordering::Relaxed);
    }

    pub fn category_mask(&self) -> CategoryMask {
        self.category_mask.load(Ordering::Relaxed)
    }

    // ------------------------------------------------------------------
    // Producing
    // ------------------------------------------------------------------

    /// Format and queue a message if it passes the filter
    ///
    /// Formatting goes into the entry's fixed buffer; overlong text is
    /// truncated. Blocks while the queue is full.
    pub fn push_message(&self, level: Severity, category: Category, args: fmt::Arguments<'_>) {
        let _producer = ProducerGuard::enter(&self.in_flight);
        if !self.can_log(level, category) {
            return;
        }

        self.queue_entry(LogEntry::with_args(level, category, args));
        if self.mode() == FlushMode::Sync {
            self.drain_inline();
        }
    }

    /// Log `text` one line at a time; empty lines are skipped
    pub fn log_message(&self, level: Severity, text: &str, category: Category) {
        if !self.can_log(level, category) {
            return;
        }

        for line in text.lines().filter(|line| !line.is_empty()) {
            self.push_message(level, category, format_args!("{}", line));
        }
    }

    /// Queue a flush marker behind everything queued so far
    ///
    /// Sinks are flushed once every earlier entry has been dispatched. With
    /// [`FlushMode::Sync`] the call returns only after that has happened.
    /// Flush requests are not subject to level or category filtering.
    pub fn push_flush(&self, mode: FlushMode) {
        let queued = {
            let _producer = ProducerGuard::enter(&self.in_flight);
            if self.state.load(Ordering::Relaxed) != STATE_RUNNING {
                return;
            }
            self.queue_entry(LogEntry::flush(mode))
        };
        let Some(position) = queued else {
            return;
        };

        match self.mode() {
            FlushMode::Sync => self.drain_inline(),
            // From inside a sink this would wait on its own dispatch
            FlushMode::Async if mode == FlushMode::Sync && !self.is_dispatching_thread() => {
                self.wait_dispatched(position)
            }
            FlushMode::Async => {}
        }
    }

    fn queue_entry(&self, entry: LogEntry) -> Option<u64> {
        if self.is_dispatching_thread() {
            // Nobody else will make room while this thread is the consumer
            return self.queue.try_enqueue(entry).ok();
        }

        if self.mode() == FlushMode::Async {
            return Some(self.queue.enqueue(entry));
        }

        // Sync mode has no drain thread: make room ourselves
        let mut entry = entry;
        loop {
            match self.queue.try_enqueue(entry) {
                Ok(position) => return Some(position),
                Err(rejected) => {
                    entry = rejected;
                    self.drain_inline();
                }
            }
        }
    }

    fn wait_dispatched(&self, position: u64) {
        let start = Instant::now();
        while self.frame.load(Ordering::Acquire) <= position {
            // Deinit drains before it returns; stop waiting once it has
            if !self.is_initialized() {
                break;
            }
            self.queue.wait(start);
        }
    }

    // ------------------------------------------------------------------
    // Sinks
    // ------------------------------------------------------------------

    /// Add a sink to the first free slot
    ///
    /// Returns false when all slots are taken or the sink is already
    /// registered.
    pub fn register_sink(&self, sink: Arc<dyn LogSink>) -> bool {
        let mut sinks = self.sinks.write();
        if sinks.iter().flatten().any(|s| Arc::ptr_eq(s, &sink)) {
            return false;
        }
        match sinks.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(sink);
                true
            }
            None => false,
        }
    }

    /// Remove a sink; later sinks move down so the table stays packed
    ///
    /// Once this returns, no dispatch will call the removed sink.
    pub fn unregister_sink(&self, sink: &Arc<dyn LogSink>) -> bool {
        let mut sinks = self.sinks.write();
        let Some(index) = sinks
            .iter()
            .position(|slot| slot.as_ref().is_some_and(|s| Arc::ptr_eq(s, sink)))
        else {
            return false;
        };

        sinks[index..].rotate_left(1);
        sinks[SINK_CAPACITY - 1] = None;
        true
    }

    pub fn sink_count(&self) -> usize {
        self.sinks.read().iter().flatten().count()
    }

    // ------------------------------------------------------------------
    // Consuming
    // ------------------------------------------------------------------

    /// Dispatch the next queued entry, or wait briefly if there is none
    ///
    /// Only the consumer may call this: the drain thread in async mode.
    /// Returns true when an entry was dispatched.
    pub fn consume_next_log(&self) -> bool {
        if self.try_consume_next_log() {
            return true;
        }

        let idle_since = self.epoch
            + Duration::from_nanos(self.last_activity_ns.load(Ordering::Relaxed));
        self.queue.wait(idle_since);
        false
    }

    pub(crate) fn try_consume_next_log(&self) -> bool {
        let Some(mut entry) = self.queue.try_dequeue() else {
            return false;
        };

        let frame = self.frame.load(Ordering::Relaxed);
        entry.frame = frame;

        let dispatching = DispatchGuard::enter(&self.dispatching);
        match entry.kind {
            EntryKind::Message => {
                let mut line = [0u8; FORMATTED_LINE_CAPACITY];
                let text = format_log_message(&mut line, &entry);
                self.sink_log(text, &entry);
            }
            EntryKind::Flush(_) => self.flush_sinks(),
        }
        drop(dispatching);

        self.frame.store(frame + 1, Ordering::Release);
        self.last_activity_ns
            .store(self.epoch.elapsed().as_nanos() as u64, Ordering::Relaxed);
        true
    }

    /// Number of entries dispatched so far
    pub fn frame(&self) -> u64 {
        self.frame.load(Ordering::Acquire)
    }

    /// Entries waiting to be dispatched
    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// How many producers found the queue full
    pub fn stalls(&self) -> u64 {
        self.queue.stalls()
    }

    /// Is the calling thread inside a sink call of this logger?
    fn is_dispatching_thread(&self) -> bool {
        self.dispatching.load(Ordering::Relaxed) == thread_token()
    }

    fn drain_inline(&self) {
        // Re-entered from a sink: the loop further up this thread's stack
        // picks the new entry up
        if self.is_dispatching_thread() {
            return;
        }

        let _consumer = self.consumer.lock().unwrap_or_else(PoisonError::into_inner);
        while self.try_consume_next_log() {}
    }

    fn sink_log(&self, formatted: &str, entry: &LogEntry) {
        let sinks = self.sinks.read();
        for sink in sinks.iter().map_while(Option::as_ref) {
            sink.sink_log(formatted, entry);
        }
    }

    fn flush_sinks(&self) {
        let sinks = self.sinks.read();
        for sink in sinks.iter().map_while(Option::as_ref) {
            sink.flush();
        }
    }
}

impl Default for Logger {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        // Only reachable without a drain thread (it holds an Arc to us)
        self.deinit();
    }
}

impl fmt::Debug for Logger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Logger")
            .field("initialized", &self.is_initialized())
            .field("enabled", &self.is_enabled())
            .field("mode", &self.mode())
            .field("level", &self.level())
            .field("category_mask", &format_args!("{:#x}", self.category_mask()))
            .field("sinks", &self.sink_count())
            .field("pending", &self.pending())
            .field("frame", &self.frame())
            .finish()
    }
}
