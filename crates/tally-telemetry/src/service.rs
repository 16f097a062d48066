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

//! Service that owns the resource monitors and updates them together.

use crate::monitoring::registry::MonitorRegistry;

/// Owns the monitor registry the sampling thread drives.
#[derive(Debug, Default)]
pub struct TelemetryService {
    monitors: MonitorRegistry,
}

impl TelemetryService {
    /// Creates a new telemetry service with no monitors.
    pub fn new() -> Self {
        Self {
            monitors: MonitorRegistry::new(),
        }
    }

    /// Updates all registered resource monitors.
    pub fn update_monitors(&mut self) {
        log::trace!("Updating all resource monitors...");
        self.monitors.update_all();
    }

    /// Returns a reference to the monitor registry.
    pub fn monitor_registry(&self) -> &MonitorRegistry {
        &self.monitors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tally_core::counter::SharedCounter;
    use tally_infra::CounterMonitor;

    static OBSERVED: SharedCounter = SharedCounter::new();

    #[test]
    fn new_service_has_no_monitors() {
        assert!(TelemetryService::new().monitor_registry().is_empty());
    }

    #[test]
    fn update_monitors_samples_every_monitor() {
        let mut service = TelemetryService::new();
        let first = Arc::new(CounterMonitor::new("first", &OBSERVED));
        let second = Arc::new(CounterMonitor::new("second", &OBSERVED));
        service.monitor_registry().register(first.clone());
        service.monitor_registry().register(second.clone());
        assert!(first.get_counter_report().is_none());

        service.update_monitors();
        service.update_monitors();
        assert_eq!(first.get_counter_report().unwrap().sample_count, 2);
        assert_eq!(second.get_counter_report().unwrap().sample_count, 2);
    }
}
