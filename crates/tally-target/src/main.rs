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

// Tally target
// Prints a greeting, then spins forever on the shared counter.

use std::io;

use anyhow::{Context, Result};
use tally_core::{TargetConfig, COUNTER};
use tally_target::{print_greetings, spin, start_instrumentation};

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    // Command-line arguments are ignored.
    let config = TargetConfig::from_env().context("failed to load target configuration")?;

    Builder::from_env(Env::default().default_filter_or(config.log_filter.as_str())).init();

    // A lost greeting is not fatal; the target keeps spinning regardless of stdout.
    if let Err(e) = print_greetings(&mut io::stdout().lock()) {
        log::warn!("failed to write greeting: {e}");
    }

    let _instrumentation = start_instrumentation(&config.sampler, &COUNTER)?;
    spin(&COUNTER)
}
