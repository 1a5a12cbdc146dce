// SPDX-License-Identifier: Apache-2.0 OR MIT
// Process-wide logger and the free functions the macros call into

use super::logger::{FlushMode, Logger};
use super::sink::LogSink;
use super::{Category, Severity};
use std::fmt;
use std::sync::{Arc, OnceLock};

static GLOBAL_LOGGER: OnceLock<Arc<Logger>> = OnceLock::new();

/// The process-wide logger, created on first use
///
/// It stays uninitialized (and drops everything) until [`init_log`].
pub fn global() -> &'static Arc<Logger> {
    GLOBAL_LOGGER.get_or_init(|| Arc::new(Logger::new()))
}

/// Initialize the global logger; false if it already was
pub fn init_log(mode: FlushMode) -> bool {
    global().init(mode)
}

/// Flush and shut the global logger down
pub fn deinit_log() {
    global().deinit();
}

#[inline]
pub fn can_log(level: Severity, category: Category) -> bool {
    global().can_log(level, category)
}

/// Queue a formatted message on the global logger
pub fn log_msg(level: Severity, category: Category, args: fmt::Arguments<'_>) {
    global().push_message(level, category, args);
}

/// Queue `text` line by line on the global logger
pub fn log_message(level: Severity, text: &str, category: Category) {
    global().log_message(level, text, category);
}

pub fn log_flush(mode: FlushMode) {
    global().push_flush(mode);
}

pub fn register_sink(sink: Arc<dyn LogSink>) -> bool {
    global().register_sink(sink)
}

pub fn unregister_sink(sink: &Arc<dyn LogSink>) -> bool {
    global().unregister_sink(sink)
}
