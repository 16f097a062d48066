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

//! Background thread that samples the shared counter on an interval.
//!
//! The thread sleeps on a condition variable between samples so that
//! [`SamplingThread::stop_and_join`] and
//! [`SamplingThread::set_sampling_interval`] take effect immediately instead
//! of after the current interval runs out.

use std::io;
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tally_core::config::MIN_SAMPLE_INTERVAL_MS;
use tally_core::telemetry::CounterSample;
use tally_infra::CounterMonitor;

use crate::service::TelemetryService;

/// Name given to the sampling thread.
pub const SAMPLER_THREAD_NAME: &str = "tally-sampler";

#[derive(Debug)]
struct SamplerControl {
    interval: Duration,
    should_stop: bool,
}

#[derive(Debug)]
struct SamplerShared {
    control: Mutex<SamplerControl>,
    wakeup: Condvar,
}

impl SamplerShared {
    fn lock(&self) -> MutexGuard<'_, SamplerControl> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Blocks until the interval has passed (`true`) or a stop was requested
    /// (`false`). Interval changes made while waiting apply to this wait.
    fn wait_sampling_interval(&self) -> bool {
        let started = Instant::now();
        let mut control = self.lock();
        loop {
            if control.should_stop {
                return false;
            }
            let deadline = started + control.interval;
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            control = self
                .wakeup
                .wait_timeout(control, deadline - now)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

/// Handle to the running sampling thread. Dropping it stops the thread.
#[derive(Debug)]
pub struct SamplingThread {
    shared: Arc<SamplerShared>,
    handle: Option<JoinHandle<()>>,
}

impl SamplingThread {
    /// Starts the sampling thread.
    ///
    /// Every `interval` the thread updates every monitor in `service`, then
    /// publishes the latest sample of `counter_monitor` on `sender`. The
    /// monitor is expected to be registered with the service.
    pub fn start(
        mut service: TelemetryService,
        counter_monitor: Arc<CounterMonitor>,
        interval: Duration,
        sender: flume::Sender<CounterSample>,
    ) -> io::Result<Self> {
        let shared = Arc::new(SamplerShared {
            control: Mutex::new(SamplerControl {
                interval: clamp_interval(interval),
                should_stop: false,
            }),
            wakeup: Condvar::new(),
        });

        let thread_shared = shared.clone();
        let handle = thread::Builder::new()
            .name(SAMPLER_THREAD_NAME.to_string())
            .spawn(move || {
                log::debug!("Sampling thread started.");
                let mut receiver_gone = false;
                while thread_shared.wait_sampling_interval() {
                    service.update_monitors();
                    let Some(sample) = counter_monitor.last_sample() else {
                        continue;
                    };
                    if sender.send(sample).is_err() && !receiver_gone {
                        log::error!("Failed to deliver counter sample: receiver disconnected.");
                        receiver_gone = true;
                    }
                }
                log::debug!("Sampling thread stopped.");
            })?;

        Ok(Self {
            shared,
            handle: Some(handle),
        })
    }

    /// Sets the interval between samples, clamped to at least one millisecond.
    pub fn set_sampling_interval(&self, interval: Duration) {
        self.shared.lock().interval = clamp_interval(interval);
        self.shared.wakeup.notify_all();
    }

    /// Returns the current interval between samples.
    pub fn sampling_interval(&self) -> Duration {
        self.shared.lock().interval
    }

    /// Asks the sampling thread to stop and blocks until it has.
    pub fn stop_and_join(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.shared.lock().should_stop = true;
        self.shared.wakeup.notify_all();

        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("Sampling thread panicked.");
            }
        }
    }
}

impl Drop for SamplingThread {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn clamp_interval(interval: Duration) -> Duration {
    interval.max(Duration::from_millis(MIN_SAMPLE_INTERVAL_MS))
}
