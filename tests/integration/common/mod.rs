// SPDX-License-Identifier: Apache-2.0 OR MIT
// Integration test utilities
//
// Sinks that record what the consumer dispatched so tests can check
// ordering, completeness and flush placement.

use engine_log::logging::{EntryKind, FlushMode, LogEntry, LogSink, Logger};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

/// Event seen by a [`CaptureSink`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Line { frame: u64, message: String },
    Flush,
}

/// Sink recording every line and flush in dispatch order
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<Event>>,
    formatted: Mutex<Vec<String>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Event> {
        self.events.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                Event::Line { message, .. } => Some(message),
                Event::Flush => None,
            })
            .collect()
    }

    pub fn formatted(&self) -> Vec<String> {
        self.formatted.lock().unwrap().clone()
    }

    pub fn flush_count(&self) -> usize {
        self.events()
            .iter()
            .filter(|event| **event == Event::Flush)
            .count()
    }
}

impl LogSink for CaptureSink {
    fn sink_log(&self, formatted: &str, entry: &LogEntry) {
        assert_eq!(entry.kind, EntryKind::Message);
        self.formatted.lock().unwrap().push(formatted.to_string());
        self.events.lock().unwrap().push(Event::Line {
            frame: entry.frame,
            message: entry.get_message().to_string(),
        });
    }

    fn flush(&self) {
        self.events.lock().unwrap().push(Event::Flush);
    }
}

/// Sink that holds the consumer until the gate is opened
pub struct GatedSink {
    open: AtomicBool,
    seen: AtomicUsize,
}

impl GatedSink {
    pub fn closed() -> Arc<Self> {
        Arc::new(Self {
            open: AtomicBool::new(false),
            seen: AtomicUsize::new(0),
        })
    }

    pub fn open(&self) {
        self.open.store(true, Ordering::Release);
    }

    pub fn seen(&self) -> usize {
        self.seen.load(Ordering::Acquire)
    }
}

impl LogSink for GatedSink {
    fn sink_log(&self, _formatted: &str, _entry: &LogEntry) {
        while !self.open.load(Ordering::Acquire) {
            thread::sleep(Duration::from_millis(1));
        }
        self.seen.fetch_add(1, Ordering::AcqRel);
    }

    fn flush(&self) {}
}

/// Logger initialized in `mode` with `sinks` registered
pub fn logger_with(mode: FlushMode, capacity: usize, sinks: &[Arc<dyn LogSink>]) -> Arc<Logger> {
    let logger = Arc::new(Logger::with_capacity(capacity));
    for sink in sinks {
        assert!(logger.register_sink(Arc::clone(sink)));
    }
    assert!(logger.init(mode));
    logger
}

/// Poll `condition` until it holds or five seconds pass
pub fn wait_for(mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        thread::sleep(Duration::from_millis(1));
    }
    condition()
}
