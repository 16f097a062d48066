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

//! # Tally Telemetry
//!
//! Drives the monitors from `tally-infra`: a registry to hold them, a service to
//! update them on an interval, and a background thread that samples the shared
//! counter and hands each observation to a channel.

#![warn(missing_docs)]

pub mod monitoring;
pub mod sampler;
pub mod service;

pub use monitoring::registry::MonitorRegistry;
pub use sampler::SamplingThread;
pub use service::TelemetryService;
