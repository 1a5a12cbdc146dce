// SPDX-License-Identifier: Apache-2.0 OR MIT
// Asynchronous engine logging
//
// Producers format messages into fixed-size entries and push them onto a
// bounded queue. A single consumer (the drain thread, or the producer itself
// in sync mode) stamps each entry with a frame number, renders the final
// line once and hands it to every registered sink.

mod bridge;
mod category;
mod drain;
mod entry;
mod error;
mod global;
mod logger;
#[macro_use]
mod macros;
mod queue;
mod severity;
mod sink;

// Public exports
pub use bridge::{install_log_bridge, LogBridge};
pub use category::{Category, CategoryMask, ALL_CATEGORIES};
pub use drain::{DrainThread, DRAIN_THREAD_NAME, DRAIN_THREAD_STACK_SIZE};
pub use entry::{
    format_log_message, EntryKind, LogEntry, FORMATTED_LINE_CAPACITY, LOG_MESSAGE_CAPACITY,
};
pub use error::SinkError;
pub use global::{
    can_log, deinit_log, global, init_log, log_flush, log_message, log_msg, register_sink,
    unregister_sink,
};
pub use logger::{FlushMode, Logger, SINK_CAPACITY};
pub use queue::{LogQueue, LOG_QUEUE_CAPACITY};
pub use severity::Severity;
pub use sink::{ConsoleSink, ConsoleTarget, FileMode, FileSink, LogSink};
