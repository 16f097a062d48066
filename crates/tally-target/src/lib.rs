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

//! # Tally Target
//!
//! A deliberately simple workload for profilers to attach to: print one
//! greeting line, then spin forever incrementing a shared counter. The loop
//! never sleeps or yields and so keeps one core fully busy.

#![warn(missing_docs)]

pub mod instrumentation;

use std::io::{self, Write};

use tally_core::counter::SharedCounter;

pub use instrumentation::{start_instrumentation, Instrumentation};

/// The only line the target ever writes to standard output.
pub const GREETING: &str = "Starting ...";

/// Writes the greeting line to `out` and flushes it.
pub fn print_greetings<W: Write>(out: &mut W) -> io::Result<()> {
    writeln!(out, "{GREETING}")?;
    out.flush()
}

/// Increments `counter` forever. There is no exit path; the process ends
/// only when it is killed.
pub fn spin(counter: &SharedCounter) -> ! {
    loop {
        counter.increment();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};

    #[test]
    fn greeting_is_a_single_line() {
        let mut out = Vec::new();
        print_greetings(&mut out).unwrap();
        assert_eq!(out, b"Starting ...\n");
    }

    #[test]
    fn spin_keeps_incrementing() {
        static SPUN: SharedCounter = SharedCounter::new();

        // The thread is never joined; it dies with the test process.
        thread::spawn(|| spin(&SPUN));

        let deadline = Instant::now() + Duration::from_secs(5);
        let first = loop {
            let value = SPUN.load();
            if value > 0 {
                break value;
            }
            assert!(Instant::now() < deadline, "spin never incremented");
            thread::yield_now();
        };

        let second = loop {
            let value = SPUN.load();
            if value > first {
                break value;
            }
            assert!(Instant::now() < deadline, "spin stopped incrementing");
            thread::yield_now();
        };
        assert!(second > first);
    }
}
