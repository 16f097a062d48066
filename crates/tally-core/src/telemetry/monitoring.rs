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

//! Provides traits and data structures for active resource monitoring.
//!
//! A monitor actively polls something (the shared counter, the host CPU) to
//! get a snapshot of its state. Nothing here ever writes to what it observes.

use std::borrow::Cow;
use std::fmt::Debug;
use std::time::Duration;

/// The core trait for a resource monitor.
///
/// A `ResourceMonitor` is a stateful object, typically living in the `tally-infra`
/// crate, that knows how to query a specific resource. The `tally-telemetry`
/// service holds a collection of these and periodically calls `update`.
pub trait ResourceMonitor: Send + Sync + Debug + 'static {
    /// Returns a unique, human-readable identifier for this monitor instance.
    fn monitor_id(&self) -> Cow<'static, str>;

    /// Returns the general type of resource being monitored.
    fn resource_type(&self) -> MonitoredResourceType;

    /// Returns a snapshot of the current usage data for the monitored resource.
    fn get_usage_report(&self) -> ResourceUsageReport;

    /// Allows downcasting to a concrete `ResourceMonitor` type.
    fn as_any(&self) -> &dyn std::any::Any;

    /// Triggers the monitor to update its internal state by polling the resource.
    /// This default implementation does nothing, for monitors that update passively.
    fn update(&self) {
        // Default: no-op
    }
}

/// An enumeration of the types of resources that can be monitored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MonitoredResourceType {
    /// A shared, monotonically increasing counter.
    Counter,
    /// Host CPU load.
    Cpu,
}

/// A generic, unified snapshot of a monitored value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResourceUsageReport {
    /// The value observed by the latest poll.
    pub current_value: u64,
    /// The highest value ever observed, if tracked.
    pub peak_value: Option<u64>,
    /// The upper bound of the value, if known.
    pub capacity: Option<u64>,
}

/// A single observation of the shared counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterSample {
    /// One-based index of this sample within its monitor.
    pub sequence: u64,
    /// The counter value read.
    pub value: u64,
    /// Time since the monitor was created.
    pub elapsed: Duration,
}

/// The rolling summary a counter monitor keeps across samples.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CounterReport {
    /// The value read by the latest sample.
    pub current_value: u64,
    /// The value read by the sample before it.
    pub previous_value: u64,
    /// `current_value - previous_value`, wrapping.
    pub delta: u64,
    /// The highest value observed.
    pub peak_value: u64,
    /// How many times the counter was seen to wrap past `u64::MAX`.
    pub wraps: u64,
    /// How many samples went backwards without a plausible wrap.
    pub regressions: u64,
    /// Total number of samples taken.
    pub sample_count: u64,
}

/// A snapshot of host CPU load.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CpuReport {
    /// Global CPU load in `[0, 1]`.
    pub load: f32,
    /// Total number of samples taken.
    pub sample_count: u64,
}

impl CounterReport {
    /// Returns `true` if no sample has ever gone backwards (wraps excluded).
    pub fn is_monotonic(&self) -> bool {
        self.regressions == 0
    }
}

impl CounterSample {
    /// Returns the increment rate between `previous` and this sample, using
    /// the wrapping difference of the two values.
    pub fn rate_since(&self, previous: &CounterSample) -> f64 {
        let secs = self.elapsed.saturating_sub(previous.elapsed).as_secs_f64();
        if secs > 0.0 {
            self.value.wrapping_sub(previous.value) as f64 / secs
        } else {
            0.0
        }
    }
}

impl CpuReport {
    /// Returns the load as a percentage.
    pub fn load_percent(&self) -> f32 {
        self.load * 100.0
    }

    /// Returns the load in permille, clamped to `[0, 1000]`.
    pub fn load_permille(&self) -> u64 {
        (self.load.clamp(0.0, 1.0) * 1000.0).round() as u64
    }
}
