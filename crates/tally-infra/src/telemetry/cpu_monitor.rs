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

//! Host CPU load monitor backed by `sysinfo`.
//!
//! The target's loop never yields, so with the sampler running this shows one
//! core's worth of load on top of whatever else the host is doing.

use std::borrow::Cow;
use std::sync::{Mutex, PoisonError};

use sysinfo::System;
use tally_core::telemetry::monitoring::{
    CpuReport, MonitoredResourceType, ResourceMonitor, ResourceUsageReport,
};

/// Monitor reporting global CPU load.
pub struct CpuMonitor {
    id: String,
    system: Mutex<System>,
    last_report: Mutex<Option<CpuReport>>,
}

impl CpuMonitor {
    /// Creates a new CPU monitor and primes its first measurement.
    pub fn new(id: impl Into<String>) -> Self {
        let mut system = System::new();
        // CPU usage is computed as a difference, so the first refresh only
        // establishes a baseline.
        system.refresh_cpu_all();
        Self {
            id: id.into(),
            system: Mutex::new(system),
            last_report: Mutex::new(None),
        }
    }

    /// Returns the latest CPU report, if `update` has run.
    pub fn get_cpu_report(&self) -> Option<CpuReport> {
        *self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn refresh(&self) {
        let load = {
            let mut system = self.system.lock().unwrap_or_else(PoisonError::into_inner);
            system.refresh_cpu_all();
            system.global_cpu_usage() / 100.0
        };

        let mut last_report = self
            .last_report
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let sample_count = last_report.map_or(0, |r| r.sample_count) + 1;
        *last_report = Some(CpuReport { load, sample_count });
        log::trace!("[{}] cpu load {:.1}%", self.id, load * 100.0);
    }
}

impl std::fmt::Debug for CpuMonitor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CpuMonitor")
            .field("id", &self.id)
            .field("last_report", &self.get_cpu_report())
            .finish()
    }
}

impl ResourceMonitor for CpuMonitor {
    fn monitor_id(&self) -> Cow<'static, str> {
        Cow::Owned(self.id.clone())
    }

    fn resource_type(&self) -> MonitoredResourceType {
        MonitoredResourceType::Cpu
    }

    fn get_usage_report(&self) -> ResourceUsageReport {
        ResourceUsageReport {
            current_value: self.get_cpu_report().map_or(0, |r| r.load_permille()),
            peak_value: None,
            capacity: Some(1000),
        }
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn update(&self) {
        self.refresh();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_monitor_creation() {
        let monitor = CpuMonitor::new("TestCpu");
        assert_eq!(monitor.monitor_id(), "TestCpu");
        assert_eq!(monitor.resource_type(), MonitoredResourceType::Cpu);
        assert!(monitor.get_cpu_report().is_none());
    }

    #[test]
    fn update_produces_bounded_report() {
        let monitor = CpuMonitor::new("TestCpu");
        monitor.update();
        monitor.update();

        let report = monitor.get_cpu_report().unwrap();
        assert_eq!(report.sample_count, 2);
        assert!(report.load >= 0.0);

        let usage = monitor.get_usage_report();
        assert!(usage.current_value <= 1000);
        assert_eq!(usage.capacity, Some(1000));
    }
}
