//! Periodic Background Tasks
//!
//! Every background sweep in this crate (cache cleanup, cooldown cleanup, memory
//! monitoring, bounded eviction) is a [`PeriodicTask`]: a Tokio task ticking on a
//! fixed interval until it is cancelled or its tick closure asks to stop.
//!
//! Ticks never overlap. The first tick fires one full period after spawning.
//! Once [`PeriodicTask::stop`] returns no new tick begins; a tick that is already
//! running on another worker is allowed to finish.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::error::{Error, Result};

/// Handle to a spawned periodic task
///
/// Dropping the handle cancels the task.
#[derive(Debug)]
pub struct PeriodicTask {
    name: &'static str,
    period: Duration,
    cancel: CancellationToken,
    handle: Option<JoinHandle<()>>,
}

impl PeriodicTask {
    /// Spawn `tick` on the current Tokio runtime, once every `period`.
    ///
    /// The closure returns [`ControlFlow::Break`] to end the task, typically when
    /// the component it sweeps has been dropped.
    pub fn spawn<F>(name: &'static str, period: Duration, mut tick: F) -> Result<Self>
    where
        F: FnMut() -> ControlFlow<()> + Send + 'static,
    {
        if period.is_zero() {
            return Err(Error::invalid_config(name, "interval must be greater than zero"));
        }
        let runtime = Handle::try_current().map_err(|_| Error::RuntimeUnavailable { task: name })?;

        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = runtime.spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        if token.is_cancelled() {
                            break;
                        }
                        if tick().is_break() {
                            debug!("Periodic task '{}' finished", name);
                            break;
                        }
                    }
                }
            }
        });

        info!("Started periodic task '{}' every {:?}", name, period);

        Ok(Self {
            name,
            period,
            cancel,
            handle: Some(handle),
        })
    }

    /// Task name
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Tick period
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Check whether the task loop has exited
    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Cancel the task
    pub fn stop(mut self) {
        self.shutdown();
        info!("Stopped periodic task '{}'", self.name);
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for PeriodicTask {
    fn drop(&mut self) {
        self.shutdown();
    }
}

// =============================================================================
// Tests
// =============================================================================
