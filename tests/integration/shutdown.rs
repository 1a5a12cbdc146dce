// SPDX-License-Identifier: Apache-2.0 OR MIT
// Deinit drains what was queued and ignores what comes after

use crate::common::{logger_with, wait_for, CaptureSink, Event, GatedSink};
use engine_log::logging::{Category, FlushMode, LogSink, Logger, Severity};
use std::sync::Arc;
use std::thread;

#[test]
fn test_deinit_drains_pending_entries() {
    let sink = CaptureSink::new();
    let logger = logger_with(FlushMode::Async, 128, &[sink.clone() as Arc<dyn LogSink>]);

    for i in 0..100 {
        logger.push_message(Severity::Info, Category::Core, format_args!("{i}"));
    }
    logger.deinit();

    assert_eq!(sink.messages().len(), 100);
    assert_eq!(sink.events().last(), Some(&Event::Flush));
    assert_eq!(logger.pending(), 0);
}

#[test]
fn test_messages_after_deinit_are_dropped() {
    let sink = CaptureSink::new();
    let logger = logger_with(FlushMode::Async, 8, &[sink.clone() as Arc<dyn LogSink>]);
    logger.deinit();

    logger.push_message(Severity::Fatal, Category::Core, format_args!("late"));
    logger.push_flush(FlushMode::Sync);
    logger.enable();

    assert!(!logger.is_enabled());
    assert!(!logger.init(FlushMode::Async));
    assert!(sink.messages().is_empty());
    assert_eq!(logger.pending(), 0);
}

#[test]
fn test_disable_pauses_without_teardown() {
    let sink = CaptureSink::new();
    let logger = logger_with(FlushMode::Sync, 8, &[sink.clone() as Arc<dyn LogSink>]);

    logger.disable();
    logger.push_message(Severity::Fatal, Category::Core, format_args!("paused"));
    logger.enable();
    logger.push_message(Severity::Fatal, Category::Core, format_args!("resumed"));
    logger.deinit();

    assert_eq!(sink.messages(), vec!["resumed"]);
}

#[test]
fn test_deinit_without_init_is_noop() {
    let logger = Logger::new();
    logger.deinit();
    assert!(!logger.is_initialized());

    // Still usable afterwards since it never ran
    let logger = Arc::new(logger);
    assert!(logger.init(FlushMode::Sync));
    logger.deinit();
}

#[test]
fn test_deinit_releases_producers_blocked_on_full_queue() {
    let gate = GatedSink::closed();
    let logger = logger_with(FlushMode::Async, 2, &[gate.clone() as Arc<dyn LogSink>]);

    let producers: Vec<_> = (0..16)
        .map(|p| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..1000 {
                    logger.push_message(Severity::Info, Category::Core, format_args!("{p}:{i}"));
                }
            })
        })
        .collect();

    // Consumer held in the gate, queue full, producers waiting in enqueue
    assert!(wait_for(|| logger.stalls() > 0));

    let shutdown = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || logger.deinit())
    };
    assert!(wait_for(|| !logger.is_enabled()));
    gate.open();

    assert!(
        wait_for(|| producers.iter().all(|producer| producer.is_finished())),
        "producers left blocked after deinit"
    );
    for producer in producers {
        producer.join().unwrap();
    }
    shutdown.join().unwrap();

    assert!(!logger.is_initialized());
    assert_eq!(logger.pending(), 0);
    // Every accepted line plus the shutdown flush went through
    assert_eq!(gate.seen() as u64 + 1, logger.frame());
}
