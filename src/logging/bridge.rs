// SPDX-License-Identifier: Apache-2.0 OR MIT
// Route records from the `log` facade into the engine logger

use super::logger::{FlushMode, Logger};
use super::{Category, Severity};
use std::sync::Arc;

impl From<log::Level> for Severity {
    fn from(level: log::Level) -> Self {
        match level {
            log::Level::Error => Severity::Error,
            log::Level::Warn => Severity::Warning,
            log::Level::Info => Severity::Info,
            log::Level::Debug => Severity::Debug,
            log::Level::Trace => Severity::Trace,
        }
    }
}

/// `log::Log` implementation forwarding to a [`Logger`]
///
/// A record whose target names a category (`"core"`, `"game"`) is logged
/// under it; anything else goes to the bridge's default category.
pub struct LogBridge {
    logger: Arc<Logger>,
    category: Category,
}

impl LogBridge {
    pub fn new(logger: Arc<Logger>, category: Category) -> Self {
        Self { logger, category }
    }

    fn category_for(&self, target: &str) -> Category {
        Category::from_name(target).unwrap_or(self.category)
    }
}

impl log::Log for LogBridge {
    fn enabled(&self, metadata: &log::Metadata) -> bool {
        self.logger
            .can_log(metadata.level().into(), self.category_for(metadata.target()))
    }

    fn log(&self, record: &log::Record) {
        let level = record.level().into();
        let category = self.category_for(record.target());
        if self.logger.can_log(level, category) {
            self.logger.push_message(level, category, *record.args());
        }
    }

    fn flush(&self) {
        self.logger.push_flush(FlushMode::Sync);
    }
}

/// Install a [`LogBridge`] as the process-wide `log` logger
///
/// Fails if another `log` logger was installed first.
pub fn install_log_bridge(
    logger: Arc<Logger>,
    category: Category,
) -> Result<(), log::SetLoggerError> {
    log::set_boxed_logger(Box::new(LogBridge::new(logger, category)))?;
    log::set_max_level(log::LevelFilter::Trace);
    Ok(())
}
