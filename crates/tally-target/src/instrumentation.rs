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

//! Optional observer for the spinning counter.
//!
//! Off unless the configuration enables the sampler. When on, a sampling
//! thread polls the counter (and optionally host CPU load) and a consumer
//! thread logs every sample to standard error. Standard output is never
//! touched.

use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{Context, Result};
use tally_core::config::SamplerConfig;
use tally_core::counter::SharedCounter;
use tally_core::event::EventBus;
use tally_core::telemetry::{CounterSample, CpuReport};
use tally_infra::{CounterMonitor, CpuMonitor};
use tally_telemetry::{SamplingThread, TelemetryService};

const CONSUMER_THREAD_NAME: &str = "tally-sample-log";

/// Running instrumentation. Dropping it stops both threads.
#[derive(Debug)]
pub struct Instrumentation {
    sampler: Option<SamplingThread>,
    consumer: Option<JoinHandle<()>>,
    counter_monitor: Arc<CounterMonitor>,
}

impl Instrumentation {
    /// Returns the monitor observing the counter.
    pub fn counter_monitor(&self) -> &Arc<CounterMonitor> {
        &self.counter_monitor
    }

    /// Stops the sampler, then waits for the consumer to drain what is left.
    pub fn shutdown(mut self) {
        self.stop();
    }

    fn stop(&mut self) {
        // The consumer exits once the sampler drops its sender.
        if let Some(sampler) = self.sampler.take() {
            sampler.stop_and_join();
        }
        if let Some(consumer) = self.consumer.take() {
            if consumer.join().is_err() {
                log::error!("Sample consumer thread panicked.");
            }
        }
    }
}

impl Drop for Instrumentation {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Starts the sampler and its log consumer if `config` enables them.
///
/// Returns `Ok(None)` when sampling is disabled.
pub fn start_instrumentation(
    config: &SamplerConfig,
    counter: &'static SharedCounter,
) -> Result<Option<Instrumentation>> {
    if !config.enabled {
        log::debug!("Sampler disabled.");
        return Ok(None);
    }

    let interval = config.interval();
    let service = TelemetryService::new();

    let counter_monitor = Arc::new(CounterMonitor::new("counter", counter));
    service.monitor_registry().register(counter_monitor.clone());

    let cpu_monitor = if config.monitor_cpu {
        let monitor = Arc::new(CpuMonitor::new("cpu"));
        service.monitor_registry().register(monitor.clone());
        Some(monitor)
    } else {
        None
    };

    let (sender, receiver) = EventBus::<CounterSample>::new().into_parts();

    let consumer = thread::Builder::new()
        .name(CONSUMER_THREAD_NAME.to_string())
        .spawn(move || {
            let mut previous = None;
            for sample in receiver.iter() {
                let cpu = cpu_monitor.as_deref().and_then(CpuMonitor::get_cpu_report);
                log::info!("{}", describe_sample(&sample, previous.as_ref(), cpu));
                previous = Some(sample);
            }
        })
        .context("failed to spawn sample consumer thread")?;

    let sampler = SamplingThread::start(service, counter_monitor.clone(), interval, sender)
        .context("failed to spawn sampling thread")?;

    log::info!("Sampling counter every {:?}.", interval);

    Ok(Some(Instrumentation {
        sampler: Some(sampler),
        consumer: Some(consumer),
        counter_monitor,
    }))
}

/// Formats one sample line. The rate is measured against `previous`, the
/// sample logged before it, never against whatever the monitor holds now.
fn describe_sample(
    sample: &CounterSample,
    previous: Option<&CounterSample>,
    cpu: Option<CpuReport>,
) -> String {
    let rate = previous.map_or(0.0, |previous| sample.rate_since(previous));
    let mut line = format!(
        "counter sample #{} value={} elapsed_ms={} rate={:.0}/s",
        sample.sequence,
        sample.value,
        sample.elapsed.as_millis(),
        rate
    );
    if let Some(cpu) = cpu {
        line.push_str(&format!(" cpu={:.1}%", cpu.load_percent()));
    }
    line
}
