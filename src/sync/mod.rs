// SPDX-License-Identifier: Apache-2.0 OR MIT
// Low-level synchronization primitives shared by engine subsystems

mod rw_spin_lock;

pub use rw_spin_lock::{Backoff, RawRwSpinLock, RwSpinLock, RwSpinReadGuard, RwSpinWriteGuard};
