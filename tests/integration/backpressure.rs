// SPDX-License-Identifier: Apache-2.0 OR MIT
// A slow consumer stalls producers instead of dropping entries

use crate::common::{logger_with, wait_for, CaptureSink, GatedSink};
use engine_log::logging::{Category, FlushMode, LogSink, Severity};
use std::sync::Arc;
use std::thread;

#[test]
fn test_burst_larger_than_queue_is_not_lost() {
    let gate = GatedSink::closed();
    let capture = CaptureSink::new();
    let logger = logger_with(
        FlushMode::Async,
        4,
        &[
            gate.clone() as Arc<dyn LogSink>,
            capture.clone() as Arc<dyn LogSink>,
        ],
    );

    let producer = {
        let logger = Arc::clone(&logger);
        thread::spawn(move || {
            for i in 0..32 {
                logger.push_message(Severity::Info, Category::Core, format_args!("{i}"));
            }
        })
    };

    // The consumer holds one entry inside the gated sink; four more fill the
    // queue and the producer has to wait
    assert!(wait_for(|| logger.stalls() > 0));
    assert!(!producer.is_finished());
    assert_eq!(gate.seen(), 0);

    gate.open();
    producer.join().unwrap();
    logger.push_flush(FlushMode::Sync);

    assert_eq!(gate.seen(), 32);
    let expected: Vec<String> = (0..32).map(|i| i.to_string()).collect();
    assert_eq!(capture.messages(), expected);
    logger.deinit();
}

#[test]
fn test_sync_mode_drains_when_full() {
    let capture = CaptureSink::new();
    let logger = logger_with(FlushMode::Sync, 2, &[capture.clone() as Arc<dyn LogSink>]);

    for i in 0..100 {
        logger.push_message(Severity::Info, Category::Core, format_args!("{i}"));
    }

    assert_eq!(capture.messages().len(), 100);
    assert_eq!(logger.pending(), 0);
    logger.deinit();
}
