// SPDX-License-Identifier: Apache-2.0 OR MIT
// Bounded multi-producer queue carrying log entries to the drain thread
//
// Every slot carries a turn counter. A producer claims position `p` by
// advancing the enqueue counter, writes its value and only then stores
// `p + 1` into the slot's turn (Release). The consumer at position `p` waits
// for turn `p + 1` (Acquire), moves the value out and hands the slot to the
// next lap by storing `p + capacity`. A slot is therefore owned by exactly
// one side at a time and a half-written value is never observed.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Default number of in-flight entries
pub const LOG_QUEUE_CAPACITY: usize = 128;

/// Idle time during which a waiter only spins
const WAIT_SPIN_WINDOW: Duration = Duration::from_millis(1);
/// Idle time during which a waiter yields its timeslice
const WAIT_YIELD_WINDOW: Duration = Duration::from_millis(10);
/// Nap taken once the queue has been idle longer than the yield window
const WAIT_SLEEP: Duration = Duration::from_millis(1);

/// Cache-aligned wrapper to prevent false sharing
#[repr(align(64))]
struct CacheAligned<T>(T);

struct Slot<T> {
    turn: AtomicU64,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// Fixed-capacity FIFO between any number of producers and one consumer
///
/// Producers never overwrite an entry that has not been consumed: when the
/// queue is full `try_enqueue` hands the value back and `enqueue` waits.
pub struct LogQueue<T> {
    slots: Box<[Slot<T>]>,
    mask: u64,
    enqueue_pos: CacheAligned<AtomicU64>,
    dequeue_pos: CacheAligned<AtomicU64>,
    stalls: AtomicU64,
}

// SAFETY: LogQueue is Sync because:
// - producers claim distinct positions through the enqueue counter CAS
// - the consumer claims positions through the dequeue counter CAS
// - the turn counter hands each slot between the two sides with
//   Release/Acquire, so a value is accessed by one thread at a time
unsafe impl<T: Send> Send for LogQueue<T> {}
unsafe impl<T: Send> Sync for LogQueue<T> {}

impl<T> LogQueue<T> {
    /// Create a new queue
    ///
    /// # Panics
    /// Panics if capacity is not a power of 2
    pub fn new(capacity: usize) -> Self {
        assert!(capacity.is_power_of_two(), "Capacity must be power of 2");

        let slots: Vec<Slot<T>> = (0..capacity as u64)
            .map(|turn| Slot {
                turn: AtomicU64::new(turn),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect();

        Self {
            slots: slots.into_boxed_slice(),
            mask: capacity as u64 - 1,
            enqueue_pos: CacheAligned(AtomicU64::new(0)),
            dequeue_pos: CacheAligned(AtomicU64::new(0)),
            stalls: AtomicU64::new(0),
        }
    }

    /// Append `value` without blocking
    ///
    /// Returns the position the value was stored at, or the value itself
    /// when the slot it would go to has not been drained yet.
    pub fn try_enqueue(&self, value: T) -> Result<u64, T> {
        let mut pos = self.enqueue_pos.0.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[(pos & self.mask) as usize];
            let turn = slot.turn.load(Ordering::Acquire);

            match turn.wrapping_sub(pos) as i64 {
                0 => match self.enqueue_pos.0.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: winning the CAS for a slot whose turn equals
                        // `pos` gives this producer exclusive access to it
                        unsafe { (*slot.value.get()).write(value) };
                        slot.turn.store(pos + 1, Ordering::Release);
                        return Ok(pos);
                    }
                    Err(current) => pos = current,
                },
                // Slot still holds the entry from the previous lap
                diff if diff < 0 => return Err(value),
                // Another producer claimed this position; catch up
                _ => pos = self.enqueue_pos.0.load(Ordering::Relaxed),
            }
        }
    }

    /// Append `value`, waiting while the queue is full
    ///
    /// Never drops the value: a burst larger than the capacity stalls the
    /// producer until the consumer frees a slot.
    pub fn enqueue(&self, value: T) -> u64 {
        let mut value = match self.try_enqueue(value) {
            Ok(pos) => return pos,
            Err(value) => value,
        };

        self.stalls.fetch_add(1, Ordering::Relaxed);
        let stalled_at = Instant::now();
        loop {
            self.wait(stalled_at);
            match self.try_enqueue(value) {
                Ok(pos) => return pos,
                Err(rejected) => value = rejected,
            }
        }
    }

    /// Take the oldest published value, if any
    pub fn try_dequeue(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.0.load(Ordering::Relaxed);
        loop {
            let slot = &self.slots[(pos & self.mask) as usize];
            let turn = slot.turn.load(Ordering::Acquire);

            match turn.wrapping_sub(pos + 1) as i64 {
                0 => match self.dequeue_pos.0.compare_exchange_weak(
                    pos,
                    pos + 1,
                    Ordering::Relaxed,
                    Ordering::Relaxed,
                ) {
                    Ok(_) => {
                        // SAFETY: turn == pos + 1 means the producer finished
                        // writing, and the CAS makes this the only reader
                        let value = unsafe { (*slot.value.get()).assume_init_read() };
                        slot.turn
                            .store(pos + self.slots.len() as u64, Ordering::Release);
                        return Some(value);
                    }
                    Err(current) => pos = current,
                },
                // Not yet published (empty, or a producer is mid-write)
                diff if diff < 0 => return None,
                _ => pos = self.dequeue_pos.0.load(Ordering::Relaxed),
            }
        }
    }

    /// Park the caller briefly while the queue is empty (consumer) or full
    /// (producer)
    ///
    /// Polling, not signalled: spins during the first millisecond since
    /// `last_activity`, yields until ten milliseconds have passed, then
    /// sleeps a millisecond per call.
    pub fn wait(&self, last_activity: Instant) {
        let idle = last_activity.elapsed();
        if idle < WAIT_SPIN_WINDOW {
            std::hint::spin_loop();
        } else if idle < WAIT_YIELD_WINDOW {
            std::thread::yield_now();
        } else {
            std::thread::sleep(WAIT_SLEEP);
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Get number of entries currently in the queue
    pub fn len(&self) -> usize {
        let enqueued = self.enqueue_pos.0.load(Ordering::Relaxed);
        let dequeued = self.dequeue_pos.0.load(Ordering::Relaxed);
        (enqueued.saturating_sub(dequeued) as usize).min(self.capacity())
    }

    /// Check if queue is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of `enqueue` calls that found the queue full (backpressure metric)
    pub fn stalls(&self) -> u64 {
        self.stalls.load(Ordering::Relaxed)
    }

    /// Total number of values ever dequeued
    pub fn dequeued(&self) -> u64 {
        self.dequeue_pos.0.load(Ordering::Acquire)
    }
}

impl<T> Drop for LogQueue<T> {
    fn drop(&mut self) {
        while self.try_dequeue().is_some() {}
    }
}
