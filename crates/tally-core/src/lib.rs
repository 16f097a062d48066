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

//! # Tally Core
//!
//! Foundational crate containing the shared counter, telemetry contracts,
//! and configuration types that the rest of the workspace builds on.

#![warn(missing_docs)]

pub mod config;
pub mod counter;
pub mod event;
pub mod telemetry;
pub mod utils;

pub use config::{ConfigError, SamplerConfig, TargetConfig};
pub use counter::{SharedCounter, COUNTER};
pub use utils::timer::Stopwatch;
