// SPDX-License-Identifier: Apache-2.0 OR MIT
// Byte-sized reader/writer spin lock with spin -> yield -> sleep back-off
//
// Meant for very short critical sections that are rarely contended (the sink
// registry: an array scan plus a pointer write). Writers are not preferred
// over readers, so a steady stream of readers can starve a writer.

use std::cell::UnsafeCell;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicI8, Ordering};
use std::time::Duration;

const UNLOCKED: i8 = 0;
const WRITE_LOCKED: i8 = -1;

/// Consecutive failed attempts between two cooperative yields
const SPINS_PER_YIELD: u32 = 512;
/// Yields before the waiter falls asleep instead
const YIELDS_PER_SLEEP: u32 = 32;
const SPINS_PER_SLEEP: u32 = SPINS_PER_YIELD * YIELDS_PER_SLEEP;
const SLEEP_DURATION: Duration = Duration::from_millis(1);

/// Adaptive back-off for busy-wait loops
///
/// Every call to [`Backoff::snooze`] counts one failed attempt. Most calls
/// just issue a spin hint; every 512th call yields the timeslice and after
/// 512 * 32 failures the thread sleeps for a millisecond and the count
/// starts over.
#[derive(Debug, Default)]
pub struct Backoff {
    spins: u32,
}

impl Backoff {
    pub const fn new() -> Self {
        Self { spins: 0 }
    }

    /// Record a failed attempt and back off accordingly
    pub fn snooze(&mut self) {
        self.spins += 1;

        if self.spins >= SPINS_PER_SLEEP {
            std::thread::sleep(SLEEP_DURATION);
            self.spins = 0;
        } else if self.spins % SPINS_PER_YIELD == 0 {
            std::thread::yield_now();
        } else {
            std::hint::spin_loop();
        }
    }

    /// Failed attempts since the last sleep
    pub fn spins(&self) -> u32 {
        self.spins
    }

    pub fn reset(&mut self) {
        self.spins = 0;
    }
}

/// Raw reader/writer spin lock without associated data
///
/// State is a single signed byte: `0` is unlocked, `-1` is held exclusively
/// and `N > 0` means `N` shared holders. At most `i8::MAX` shared holders are
/// admitted at once; further readers spin until one leaves.
///
/// `unlock` and `unlock_shared` do not check ownership. Releasing a lock the
/// caller does not hold corrupts the state for every other user, so prefer
/// [`RwSpinLock`] and its guards wherever data is being protected.
pub struct RawRwSpinLock {
    state: AtomicI8,
}

impl RawRwSpinLock {
    pub const fn new() -> Self {
        Self {
            state: AtomicI8::new(UNLOCKED),
        }
    }

    /// Acquire the lock exclusively, spinning until every holder has left
    pub fn lock(&self) {
        let mut backoff = Backoff::new();
        loop {
            // Test before test-and-set keeps the cache line shared while waiting
            if self.state.load(Ordering::Relaxed) == UNLOCKED
                && self
                    .state
                    .compare_exchange_weak(
                        UNLOCKED,
                        WRITE_LOCKED,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return;
            }
            backoff.snooze();
        }
    }

    /// Acquire a shared hold, spinning while a writer owns the lock
    pub fn lock_shared(&self) {
        let mut backoff = Backoff::new();
        loop {
            let current = self.state.load(Ordering::Relaxed);
            if Self::admits_reader(current)
                && self
                    .state
                    .compare_exchange_weak(
                        current,
                        current + 1,
                        Ordering::Acquire,
                        Ordering::Relaxed,
                    )
                    .is_ok()
            {
                return;
            }
            backoff.snooze();
        }
    }

    /// Single attempt at an exclusive hold
    pub fn try_lock(&self) -> bool {
        self.state
            .compare_exchange(UNLOCKED, WRITE_LOCKED, Ordering::Acquire, Ordering::Relaxed)
            .is_ok()
    }

    /// Single attempt at a shared hold
    ///
    /// May fail while no writer is present if another reader changed the
    /// count between the load and the exchange.
    pub fn try_lock_shared(&self) -> bool {
        let current = self.state.load(Ordering::Relaxed);
        Self::admits_reader(current)
            && self
                .state
                .compare_exchange(current, current + 1, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
    }

    /// Release an exclusive hold
    pub fn unlock(&self) {
        self.state.store(UNLOCKED, Ordering::Release);
    }

    /// Release one shared hold
    pub fn unlock_shared(&self) {
        self.state.fetch_sub(1, Ordering::Release);
    }

    pub fn is_locked(&self) -> bool {
        self.state.load(Ordering::Relaxed) != UNLOCKED
    }

    pub fn is_locked_exclusive(&self) -> bool {
        self.state.load(Ordering::Relaxed) == WRITE_LOCKED
    }

    /// Current number of shared holders (0 when unlocked or write-locked)
    pub fn reader_count(&self) -> u8 {
        self.state.load(Ordering::Relaxed).max(0) as u8
    }

    #[inline]
    fn admits_reader(state: i8) -> bool {
        state != WRITE_LOCKED && state < i8::MAX
    }
}

impl Default for RawRwSpinLock {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for RawRwSpinLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawRwSpinLock")
            .field("state", &self.state.load(Ordering::Relaxed))
            .finish()
    }
}

/// Reader/writer spin lock owning the data it protects
pub struct RwSpinLock<T> {
    raw: RawRwSpinLock,
    data: UnsafeCell<T>,
}

// SAFETY: access to `data` is mediated by `raw`:
// - a write guard exists only while the state is WRITE_LOCKED (unique access)
// - read guards exist only while the state counts them (shared access)
unsafe impl<T: Send> Send for RwSpinLock<T> {}
unsafe impl<T: Send + Sync> Sync for RwSpinLock<T> {}

impl<T> RwSpinLock<T> {
    pub const fn new(value: T) -> Self {
        Self {
            raw: RawRwSpinLock::new(),
            data: UnsafeCell::new(value),
        }
    }

    /// Shared access; spins while a writer holds the lock
    pub fn read(&self) -> RwSpinReadGuard<'_, T> {
        self.raw.lock_shared();
        RwSpinReadGuard { lock: self }
    }

    /// Exclusive access; spins until readers and writers are gone
    pub fn write(&self) -> RwSpinWriteGuard<'_, T> {
        self.raw.lock();
        RwSpinWriteGuard { lock: self }
    }

    pub fn try_read(&self) -> Option<RwSpinReadGuard<'_, T>> {
        self.raw
            .try_lock_shared()
            .then(|| RwSpinReadGuard { lock: self })
    }

    pub fn try_write(&self) -> Option<RwSpinWriteGuard<'_, T>> {
        self.raw
            .try_lock()
            .then(|| RwSpinWriteGuard { lock: self })
    }

    pub fn is_locked(&self) -> bool {
        self.raw.is_locked()
    }

    pub fn get_mut(&mut self) -> &mut T {
        self.data.get_mut()
    }

    pub fn into_inner(self) -> T {
        self.data.into_inner()
    }
}

impl<T: Default> Default for RwSpinLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: fmt::Debug> fmt::Debug for RwSpinLock<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.try_read() {
            Some(guard) => f.debug_struct("RwSpinLock").field("data", &*guard).finish(),
            None => f.debug_struct("RwSpinLock").field("data", &"<locked>").finish(),
        }
    }
}

/// Shared hold on a [`RwSpinLock`], released on drop
pub struct RwSpinReadGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinReadGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: shared hold prevents any writer from existing
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> Drop for RwSpinReadGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.unlock_shared();
    }
}

/// Exclusive hold on a [`RwSpinLock`], released on drop
pub struct RwSpinWriteGuard<'a, T> {
    lock: &'a RwSpinLock<T>,
}

impl<T> Deref for RwSpinWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        // SAFETY: exclusive hold
        unsafe { &*self.lock.data.get() }
    }
}

impl<T> DerefMut for RwSpinWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        // SAFETY: exclusive hold
        unsafe { &mut *self.lock.data.get() }
    }
}

impl<T> Drop for RwSpinWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.lock.raw.unlock();
    }
}
