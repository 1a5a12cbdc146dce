// SPDX-License-Identifier: Apache-2.0 OR MIT
// Logging macros for convenient logging
//
// Each macro checks the filter before evaluating its format arguments, so a
// filtered-out statement costs three relaxed loads.

/// Log to an explicit logger at the given severity
///
/// # Examples
/// ```ignore
/// log_to!(logger, Severity::Info, Category::Core, "loaded {} assets", count);
/// ```
#[macro_export]
macro_rules! log_to {
    ($logger:expr, $level:expr, $category:expr, $($arg:tt)+) => {{
        let logger = &$logger;
        let level = $level;
        let category = $category;
        if logger.can_log(level, category) {
            logger.push_message(level, category, format_args!($($arg)+));
        }
    }};
}

/// Log to the global logger at the given severity
#[macro_export]
macro_rules! log_at {
    ($level:expr, $category:expr, $($arg:tt)+) => {{
        let level = $level;
        let category = $category;
        if $crate::logging::can_log(level, category) {
            $crate::logging::log_msg(level, category, format_args!($($arg)+));
        }
    }};
}

/// Log a message with fatal severity
///
/// # Examples
/// ```ignore
/// log_fatal!(Category::Core, "Device lost: {}", reason);
/// ```
#[macro_export]
macro_rules! log_fatal {
    ($category:expr, $($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Fatal, $category, $($arg)+)
    };
}

/// Log a message with error severity
#[macro_export]
macro_rules! log_error {
    ($category:expr, $($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Error, $category, $($arg)+)
    };
}

/// Log a message with warning severity
#[macro_export]
macro_rules! log_warning {
    ($category:expr, $($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Warning, $category, $($arg)+)
    };
}

/// Log a message with info severity
///
/// # Examples
/// ```ignore
/// log_info!(Category::Game, "Level {} loaded", name);
/// ```
#[macro_export]
macro_rules! log_info {
    ($category:expr, $($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Info, $category, $($arg)+)
    };
}

/// Log a message with debug severity
#[macro_export]
macro_rules! log_debug {
    ($category:expr, $($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Debug, $category, $($arg)+)
    };
}

/// Log a message with trace severity
#[macro_export]
macro_rules! log_trace {
    ($category:expr, $($arg:tt)+) => {
        $crate::log_at!($crate::logging::Severity::Trace, $category, $($arg)+)
    };
}

/// Request a flush of every sink on the global logger
///
/// Without an argument the flush is asynchronous.
#[macro_export]
macro_rules! log_flush {
    () => {
        $crate::logging::log_flush($crate::logging::FlushMode::Async)
    };
    ($mode:expr) => {
        $crate::logging::log_flush($mode)
    };
}
