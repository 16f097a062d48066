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

//! Shared Counter Resource Monitor
//!
//! Observes a [`SharedCounter`] with acquire reads and keeps a rolling summary
//! of what it has seen. The monitor never writes to the counter, so the
//! target's single-writer invariant holds while it runs.

use std::borrow::Cow;
use std::sync::{Mutex, PoisonError};

use tally_core::counter::SharedCounter;
use tally_core::telemetry::monitoring::{
    CounterReport, CounterSample, MonitoredResourceType, ResourceMonitor, ResourceUsageReport,
};
use tally_core::utils::timer::Stopwatch;

/// A backwards step smaller than this is treated as a regression, anything
/// larger as the counter having wrapped past `u64::MAX`.
const WRAP_THRESHOLD: u64 = u64::MAX / 2;

#[derive(Debug, Default)]
struct CounterState {
    report: Option<CounterReport>,
    last_sample: Option<CounterSample>,
}

/// Monitor that samples a shared counter.
#[derive(Debug)]
pub struct CounterMonitor {
    id: String,
    counter: &'static SharedCounter,
    started: Stopwatch,
    state: Mutex<CounterState>,
}

impl CounterMonitor {
    /// Creates a monitor observing `counter`. No sample is taken until the
    /// first `update`.
    pub fn new(id: impl Into<String>, counter: &'static SharedCounter) -> Self {
        Self {
            id: id.into(),
            counter,
            started: Stopwatch::new(),
            state: Mutex::new(CounterState::default()),
        }
    }

    /// Returns the latest rolling summary, if any sample has been taken.
    pub fn get_counter_report(&self) -> Option<CounterReport> {
        self.lock_state().report
    }

    /// Returns the latest raw sample, if any.
    pub fn last_sample(&self) -> Option<CounterSample> {
        self.lock_state().last_sample
    }

    /// Takes one sample and folds it into the report.
    pub fn sample(&self) -> CounterSample {
        let value = self.counter.load();
        let elapsed = self.started.elapsed();

        let mut state = self.lock_state();
        let previous_sample = state.last_sample;
        let mut report = state.report.unwrap_or_default();

        let sequence = report.sample_count + 1;
        let sample = CounterSample {
            sequence,
            value,
            elapsed,
        };

        match previous_sample {
            Some(previous) => {
                let delta = value.wrapping_sub(previous.value);
                if value < previous.value {
                    if delta < WRAP_THRESHOLD {
                        report.wraps += 1;
                        log::debug!("[{}] counter wrapped: {} -> {}", self.id, previous.value, value);
                    } else {
                        report.regressions += 1;
                        log::warn!(
                            "[{}] counter went backwards: {} -> {}",
                            self.id,
                            previous.value,
                            value
                        );
                    }
                }
                report.previous_value = previous.value;
                report.delta = delta;
            }
            None => {
                report.previous_value = value;
                report.delta = 0;
            }
        }

        report.current_value = value;
        report.peak_value = report.peak_value.max(value);
        report.sample_count = sequence;

        state.report = Some(report);
        state.last_sample = Some(sample);
        sample
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, CounterState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl ResourceMonitor for CounterMonitor {
    fn monitor_id(&self) -> Cow<'static, str> {
        Cow::Owned(self.id.clone())
    }

    fn resource_type(&self) -> MonitoredResourceType {
        MonitoredResourceType::Counter
    }

    fn get_usage_report(&self) -> ResourceUsageReport {
        let peak = self.lock_state().report.map(|r| r.peak_value);
        ResourceUsageReport {
            current_value: self.counter.load(),
            peak_value: peak,
            capacity: Some(u64::MAX),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn update(&self) {
        self.sample();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;

    fn leaked_counter(value: u64) -> &'static SharedCounter {
        Box::leak(Box::new(SharedCounter::with_value(value)))
    }

    #[test]
    fn counter_monitor_creation() {
        let monitor = CounterMonitor::new("TestCounter", leaked_counter(0));
        assert_eq!(monitor.monitor_id(), "TestCounter");
        assert_eq!(monitor.resource_type(), MonitoredResourceType::Counter);
        assert!(monitor.get_counter_report().is_none());
        assert!(monitor.last_sample().is_none());
    }

    #[test]
    fn samples_track_delta_and_peak() {
        let counter = leaked_counter(10);
        let monitor = CounterMonitor::new("TestCounter", counter);

        let first = monitor.sample();
        assert_eq!(first.sequence, 1);
        assert_eq!(first.value, 10);

        counter.store(25);
        monitor.update();

        let report = monitor.get_counter_report().unwrap();
        assert_eq!(report.current_value, 25);
        assert_eq!(report.previous_value, 10);
        assert_eq!(report.delta, 15);
        assert_eq!(report.peak_value, 25);
        assert_eq!(report.sample_count, 2);
        assert!(report.is_monotonic());
        assert_eq!(monitor.last_sample().unwrap().sequence, 2);
    }

    #[test]
    fn wraparound_is_not_a_regression() {
        let counter = leaked_counter(u64::MAX - 1);
        let monitor = CounterMonitor::new("TestCounter", counter);
        monitor.sample();

        counter.increment();
        counter.increment();
        counter.increment();
        monitor.sample();

        let report = monitor.get_counter_report().unwrap();
        assert_eq!(report.current_value, 1);
        assert_eq!(report.delta, 3);
        assert_eq!(report.wraps, 1);
        assert!(report.is_monotonic());
    }

    #[test]
    fn backwards_step_is_a_regression() {
        let counter = leaked_counter(1_000);
        let monitor = CounterMonitor::new("TestCounter", counter);
        monitor.sample();

        counter.store(999);
        monitor.sample();

        let report = monitor.get_counter_report().unwrap();
        assert_eq!(report.regressions, 1);
        assert_eq!(report.wraps, 0);
        assert!(!report.is_monotonic());
    }

    #[test]
    fn usage_report_reflects_live_value() {
        let counter = leaked_counter(7);
        let monitor = CounterMonitor::new("TestCounter", counter);
        assert_eq!(monitor.get_usage_report().peak_value, None);

        monitor.update();
        counter.increment();

        let usage = monitor.get_usage_report();
        assert_eq!(usage.current_value, 8);
        assert_eq!(usage.peak_value, Some(7));
        assert_eq!(usage.capacity, Some(u64::MAX));
    }

    #[test]
    fn concurrent_writer_is_observed_monotonically() {
        let counter = leaked_counter(0);
        let monitor = Arc::new(CounterMonitor::new("TestCounter", counter));
        let done = Arc::new(AtomicBool::new(false));

        let writer = {
            let done = done.clone();
            thread::spawn(move || {
                for _ in 0..500_000 {
                    counter.increment();
                }
                done.store(true, Ordering::Release);
            })
        };

        while !done.load(Ordering::Acquire) {
            monitor.update();
        }
        writer.join().expect("writer thread panicked");
        monitor.update();

        let report = monitor.get_counter_report().unwrap();
        assert!(report.is_monotonic());
        assert_eq!(report.wraps, 0);
        assert_eq!(report.current_value, 500_000);
        assert_eq!(report.peak_value, 500_000);
    }
}
