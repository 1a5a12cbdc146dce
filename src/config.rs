// SPDX-License-Identifier: Apache-2.0 OR MIT
//! Logging configuration file types and parsing.
//!
//! JSON5 configuration format supporting:
//! - Sync or async draining
//! - Severity threshold and enabled categories
//! - Console and file sinks
//! - Comments and trailing commas

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::logging::{
    Category, CategoryMask, ConsoleSink, ConsoleTarget, FileMode, FileSink, FlushMode, LogSink,
    Logger, Severity, ALL_CATEGORIES,
};

/// Logger configuration (JSON5 file format)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LogConfig {
    /// Who drains the queue
    #[serde(default = "default_mode")]
    pub mode: FlushMode,

    /// Severity threshold
    #[serde(default)]
    pub level: Severity,

    /// Enabled categories; all of them when omitted
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<Category>>,

    /// Console output stream
    #[serde(default)]
    pub console: ConsoleOutput,

    /// Optional log file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileConfig>,
}

/// Console sink selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ConsoleOutput {
    Stdout,
    #[default]
    Stderr,
    None,
}

/// File sink settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FileConfig {
    pub path: PathBuf,

    /// Append to an existing file instead of truncating it
    #[serde(default)]
    pub append: bool,
}

fn default_mode() -> FlushMode {
    FlushMode::Async
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            level: Severity::default(),
            categories: None,
            console: ConsoleOutput::default(),
            file: None,
        }
    }
}

impl LogConfig {
    /// Load configuration from a JSON5 file
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::IoError(path.to_path_buf(), e.to_string()))?;
        Self::parse(&content)
    }

    /// Parse configuration from a JSON5 string
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        json5::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// Serialize configuration to JSON5 string (with pretty formatting)
    pub fn to_json5(&self) -> String {
        // JSON is valid JSON5; json5 has no pretty printer
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(categories) = &self.categories {
            for (idx, category) in categories.iter().enumerate() {
                if categories[..idx].contains(category) {
                    return Err(ConfigError::DuplicateCategory(*category));
                }
            }
        }

        if let Some(file) = &self.file {
            if file.path.as_os_str().is_empty() {
                return Err(ConfigError::EmptyFilePath);
            }
        }

        Ok(())
    }

    /// Category mask equivalent to `categories`
    pub fn category_mask(&self) -> CategoryMask {
        match &self.categories {
            Some(categories) => categories.iter().fold(0, |mask, c| mask | c.bit()),
            None => ALL_CATEGORIES,
        }
    }

    /// Configure `logger`, register the configured sinks and initialize it
    ///
    /// Returns the registered sinks so the caller can unregister them later.
    /// On error nothing stays registered and the filter is left as it was.
    pub fn apply(&self, logger: &Arc<Logger>) -> Result<Vec<Arc<dyn LogSink>>, ConfigError> {
        self.validate()?;

        let mut sinks: Vec<Arc<dyn LogSink>> = Vec::new();
        match self.console {
            ConsoleOutput::Stdout => sinks.push(Arc::new(ConsoleSink::new(ConsoleTarget::Stdout))),
            ConsoleOutput::Stderr => sinks.push(Arc::new(ConsoleSink::new(ConsoleTarget::Stderr))),
            ConsoleOutput::None => {}
        }
        if let Some(file) = &self.file {
            let mode = if file.append {
                FileMode::Append
            } else {
                FileMode::Truncate
            };
            let sink = FileSink::create(&file.path, mode).map_err(|e| ConfigError::SinkOpen {
                path: file.path.clone(),
                reason: e.to_string(),
            })?;
            sinks.push(Arc::new(sink));
        }

        // The filter must be in place before init opens the logger, and
        // is put back if anything below fails
        let previous = (logger.level(), logger.category_mask());
        logger.set_level(self.level);
        logger.set_category_mask(self.category_mask());

        let mut registered = Vec::with_capacity(sinks.len());
        for sink in sinks {
            if !logger.register_sink(Arc::clone(&sink)) {
                roll_back(logger, &registered, previous);
                return Err(ConfigError::SinkTableFull);
            }
            registered.push(sink);
        }

        if !logger.init(self.mode) {
            roll_back(logger, &registered, previous);
            return Err(ConfigError::AlreadyInitialized);
        }

        Ok(registered)
    }
}

/// Undo a partial `apply`
fn roll_back(
    logger: &Logger,
    registered: &[Arc<dyn LogSink>],
    (level, mask): (Severity, CategoryMask),
) {
    for sink in registered {
        logger.unregister_sink(sink);
    }
    logger.set_level(level);
    logger.set_category_mask(mask);
}

/// Configuration errors
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    IoError(PathBuf, String),
    ParseError(String),
    DuplicateCategory(Category),
    EmptyFilePath,
    SinkOpen { path: PathBuf, reason: String },
    SinkTableFull,
    AlreadyInitialized,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(path, msg) => {
                write!(
                    f,
                    "failed to read config file '{}': {}",
                    path.display(),
                    msg
                )
            }
            ConfigError::ParseError(msg) => write!(f, "failed to parse config: {}", msg),
            ConfigError::DuplicateCategory(category) => {
                write!(f, "category '{}' listed more than once", category)
            }
            ConfigError::EmptyFilePath => write!(f, "log file path cannot be empty"),
            // reason already names the path
            ConfigError::SinkOpen { reason, .. } => write!(f, "{}", reason),
            ConfigError::SinkTableFull => write!(f, "no free sink slot left"),
            ConfigError::AlreadyInitialized => write!(f, "logger is already initialized"),
        }
    }
}

impl std::error::Error for ConfigError {}
