// SPDX-License-Identifier: Apache-2.0 OR MIT
// Background thread that drains the log queue in async mode

use super::logger::Logger;
use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

/// Name given to the drain thread
pub const DRAIN_THREAD_NAME: &str = "log-drain";

/// Stack size of the drain thread; dispatch formats into a stack buffer
pub const DRAIN_THREAD_STACK_SIZE: usize = 128 * 1024;

/// Handle to the running drain thread
///
/// The thread consumes entries until stopped, then drains whatever is
/// still queued before it exits.
pub struct DrainThread {
    running: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl DrainThread {
    pub fn start(logger: Arc<Logger>) -> io::Result<Self> {
        let running = Arc::new(AtomicBool::new(true));
        let flag = Arc::clone(&running);

        let handle = thread::Builder::new()
            .name(DRAIN_THREAD_NAME.to_string())
            .stack_size(DRAIN_THREAD_STACK_SIZE)
            .spawn(move || Self::run(&logger, &flag))?;

        Ok(Self {
            running,
            handle: Some(handle),
        })
    }

    fn run(logger: &Logger, running: &AtomicBool) {
        while running.load(Ordering::Acquire) {
            logger.consume_next_log();
        }

        // Everything queued before the stop request still goes out
        while logger.try_consume_next_log() {}
    }

    /// Get a handle to signal the thread to stop
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Signal the thread to stop and wait for it to finish draining
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for DrainThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}
