// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! The process-wide counter the target spins on.
//!
//! The counter carries a visibility guarantee rather than an atomicity one:
//! every write is a release store and every observer read is an acquire load,
//! so a sampling thread always sees a value no older than the most recent
//! write ordered before its read. The hot-path increment is a plain
//! load-then-store, which is only lossless while there is a single writer.

use std::sync::atomic::{AtomicU64, Ordering};

/// The counter incremented by the target's main loop.
///
/// Lives for the whole process and is never reset.
pub static COUNTER: SharedCounter = SharedCounter::new();

/// An unsigned 64-bit counter whose writes are promptly visible to other threads.
#[derive(Debug, Default)]
pub struct SharedCounter {
    value: AtomicU64,
}

impl SharedCounter {
    /// Creates a counter starting at zero.
    pub const fn new() -> Self {
        Self::with_value(0)
    }

    /// Creates a counter starting at `value`.
    pub const fn with_value(value: u64) -> Self {
        Self {
            value: AtomicU64::new(value),
        }
    }

    /// Reads the counter, adds one, and writes it back, returning the new value.
    ///
    /// This is not an atomic read-modify-write. Two concurrent writers can
    /// lose updates; use [`SharedCounter::fetch_increment`] for that case.
    /// Overflow wraps silently.
    #[inline]
    pub fn increment(&self) -> u64 {
        let next = self.value.load(Ordering::Relaxed).wrapping_add(1);
        self.value.store(next, Ordering::Release);
        next
    }

    /// Atomically adds one and returns the previous value. Safe with any
    /// number of writers. Overflow wraps silently.
    #[inline]
    pub fn fetch_increment(&self) -> u64 {
        self.value.fetch_add(1, Ordering::AcqRel)
    }

    /// Returns the most recently published value.
    #[inline]
    pub fn load(&self) -> u64 {
        self.value.load(Ordering::Acquire)
    }

    /// Overwrites the value. Only meant for setting up observers in tests
    /// and harnesses; the target itself never calls it.
    #[inline]
    pub fn store(&self, value: u64) {
        self.value.store(value, Ordering::Release);
    }
}
