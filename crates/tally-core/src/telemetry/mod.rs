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

//! Provides the foundational traits and data structures for observing the target.
//!
//! This module defines the abstract "what" of telemetry. `tally-infra` provides
//! the concrete monitors, and `tally-telemetry` the service and sampling thread
//! that drive them.

pub mod monitoring;

pub use self::monitoring::{
    CounterReport, CounterSample, CpuReport, MonitoredResourceType, ResourceMonitor,
    ResourceUsageReport,
};
