// SPDX-License-Identifier: Apache-2.0 OR MIT
// Dispatch order across producers and flush markers

use crate::common::{logger_with, CaptureSink, Event};
use engine_log::logging::{Category, FlushMode, LogSink, Severity};
use std::collections::HashMap;
use std::sync::Arc;
use std::thread;

const PRODUCERS: usize = 8;
const PER_PRODUCER: usize = 500;

fn run_producers(mode: FlushMode) {
    let sink = CaptureSink::new();
    let logger = logger_with(mode, 16, &[sink.clone() as Arc<dyn LogSink>]);

    let handles: Vec<_> = (0..PRODUCERS)
        .map(|p| {
            let logger = Arc::clone(&logger);
            thread::spawn(move || {
                for i in 0..PER_PRODUCER {
                    logger.push_message(Severity::Info, Category::Game, format_args!("{p}:{i}"));
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    logger.deinit();

    let mut next: HashMap<usize, usize> = HashMap::new();
    let mut expected_frame = 0;
    for event in sink.events() {
        match event {
            Event::Line { frame, message } => {
                assert_eq!(frame, expected_frame, "frames must be consecutive");
                let (p, i) = message.split_once(':').unwrap();
                let (p, i): (usize, usize) = (p.parse().unwrap(), i.parse().unwrap());
                let slot = next.entry(p).or_default();
                assert_eq!(i, *slot, "producer {p} out of order");
                *slot += 1;
            }
            Event::Flush => {}
        }
        expected_frame += 1;
    }

    assert_eq!(next.len(), PRODUCERS);
    assert!(next.values().all(|&n| n == PER_PRODUCER));
    assert_eq!(logger.frame(), (PRODUCERS * PER_PRODUCER + 1) as u64);
}

#[test]
fn test_async_producers_keep_per_thread_order() {
    run_producers(FlushMode::Async);
}

#[test]
fn test_sync_producers_keep_per_thread_order() {
    run_producers(FlushMode::Sync);
}

#[test]
fn test_flush_lands_after_earlier_messages() {
    let sink = CaptureSink::new();
    let logger = logger_with(FlushMode::Async, 128, &[sink.clone() as Arc<dyn LogSink>]);

    logger.push_message(Severity::Info, Category::Core, format_args!("A"));
    logger.push_message(Severity::Info, Category::Core, format_args!("B"));
    logger.push_flush(FlushMode::Sync);
    logger.push_message(Severity::Info, Category::Core, format_args!("C"));
    logger.deinit();

    let events = sink.events();
    assert_eq!(
        events,
        vec![
            Event::Line {
                frame: 0,
                message: "A".into()
            },
            Event::Line {
                frame: 1,
                message: "B".into()
            },
            Event::Flush,
            Event::Line {
                frame: 3,
                message: "C".into()
            },
            Event::Flush,
        ]
    );
}

#[test]
fn test_formatted_line_carries_frame_and_level() {
    let sink = CaptureSink::new();
    let logger = logger_with(FlushMode::Sync, 8, &[sink.clone() as Arc<dyn LogSink>]);

    logger.push_message(Severity::Warning, Category::Game, format_args!("low fuel"));
    logger.log_message(Severity::Error, "first\n\nsecond", Category::Core);

    let lines = sink.formatted();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("[     0]"));
    assert!(lines[0].ends_with("[WARNING] [Game] low fuel\n"), "{}", lines[0]);
    assert!(lines[1].contains("[     1]"));
    assert!(lines[1].ends_with("[ERROR  ] [Core] first\n"));
    assert!(lines[2].ends_with("[ERROR  ] [Core] second\n"));
    logger.deinit();
}
