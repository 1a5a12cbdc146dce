// SPDX-License-Identifier: Apache-2.0 OR MIT
// Lines reach a log file through the drain thread

use crate::common::logger_with;
use engine_log::logging::{Category, FileMode, FileSink, FlushMode, LogSink, Severity};
use std::sync::Arc;
use tempfile::TempDir;

#[test]
fn test_file_sink_receives_formatted_lines() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.log");
    let file: Arc<dyn LogSink> = Arc::new(FileSink::create(&path, FileMode::Truncate).unwrap());
    let logger = logger_with(FlushMode::Async, 128, &[Arc::clone(&file)]);

    logger.push_message(Severity::Info, Category::Core, format_args!("boot"));
    logger.log_message(Severity::Warning, "two\nlines", Category::Game);
    logger.push_flush(FlushMode::Sync);

    // Visible on disk once the sync flush returns
    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3, "{contents}");
    assert!(lines[0].ends_with("[INFO   ] [Core] boot"));
    assert!(lines[1].ends_with("[WARNING] [Game] two"));
    assert!(lines[2].ends_with("[WARNING] [Game] lines"));

    logger.deinit();
    assert!(logger.unregister_sink(&file));
}

#[test]
fn test_append_mode_keeps_previous_run() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("engine.log");

    for run in 0..2 {
        let file: Arc<dyn LogSink> = Arc::new(FileSink::create(&path, FileMode::Append).unwrap());
        let logger = logger_with(FlushMode::Sync, 8, &[file]);
        logger.push_message(Severity::Info, Category::Core, format_args!("run {run}"));
        logger.deinit();
    }

    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.lines().count(), 2);
    assert!(contents.contains("run 0"));
    assert!(contents.contains("run 1"));
}
