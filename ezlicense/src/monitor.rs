//! Background expiration checks for a verified license.
//!
//! Verification checks expiry once. Applications that keep running need to
//! notice when the license lapses later, so the monitor re-asks the time
//! source on an interval. Each failed check (expired, or the clock could not
//! be read) bumps a counter and each successful check clears it. When the
//! counter reaches the configured threshold the callback runs once and the
//! monitor stops for good.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info, warn};

use crate::data::LicenseData;
use crate::error::{LicenseError, LicenseResult};
use crate::time::TimeSource;

/// Called once when a monitored license is found expired.
pub type ExpireCallback = Arc<dyn Fn(&LicenseData) + Send + Sync>;

/// Configuration for the expiration monitor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitorConfig {
    /// Seconds between checks. Zero is treated as one.
    pub check_interval_secs: u64,
    /// Failed checks in a row before the callback fires. Zero is treated as one.
    pub allowed_failures: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            check_interval_secs: 60,
            allowed_failures: 1,
        }
    }
}

impl MonitorConfig {
    /// Returns the effective interval between checks.
    #[must_use]
    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs.max(1))
    }

    /// Returns the effective failure threshold.
    #[must_use]
    pub fn threshold(&self) -> u32 {
        self.allowed_failures.max(1)
    }
}

/// How a monitor stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorOutcome {
    /// The failure threshold was reached and the callback ran.
    Fired,
    /// The owner stopped the monitor before the threshold was reached.
    Cancelled,
}

#[derive(Default)]
struct Shared {
    cancelled: AtomicBool,
    wake: Notify,
}

impl Shared {
    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// The periodic re-check loop.
pub struct ExpirationMonitor {
    data: LicenseData,
    expires: i64,
    time_source: Arc<dyn TimeSource>,
    interval: Duration,
    threshold: u32,
    on_expire: ExpireCallback,
    shared: Arc<Shared>,
}

impl ExpirationMonitor {
    /// Spawns a monitor for `data` on the current Tokio runtime.
    ///
    /// The first check happens one interval after spawning.
    ///
    /// # Errors
    ///
    /// Returns `NotMonitorable` if the license never expires and
    /// `MonitorUnavailable` if called outside a Tokio runtime.
    pub fn spawn(
        data: LicenseData,
        time_source: Arc<dyn TimeSource>,
        config: &MonitorConfig,
        on_expire: ExpireCallback,
    ) -> LicenseResult<MonitorHandle> {
        let expires = data.expires.instant().ok_or(LicenseError::NotMonitorable)?;
        let runtime = Handle::try_current()
            .map_err(|e| LicenseError::MonitorUnavailable(e.to_string()))?;
        let shared = Arc::new(Shared::default());
        let monitor = Self {
            data,
            expires,
            time_source,
            interval: config.check_interval(),
            threshold: config.threshold(),
            on_expire,
            shared: Arc::clone(&shared),
        };

        debug!(
            expires,
            interval_secs = monitor.interval.as_secs(),
            threshold = monitor.threshold,
            "starting expiration monitor"
        );
        let task = runtime.spawn(monitor.run());
        Ok(MonitorHandle {
            shared,
            task: Some(task),
        })
    }

    async fn run(self) -> MonitorOutcome {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0u32;

        loop {
            tokio::select! {
                biased;
                () = self.shared.wake.notified() => {}
                _ = ticker.tick() => {}
            }
            if self.shared.is_cancelled() {
                debug!(expires = self.expires, "expiration monitor cancelled");
                return MonitorOutcome::Cancelled;
            }

            match self.time_source.has_passed(self.expires).await {
                Ok(false) => failures = 0,
                Ok(true) => {
                    failures += 1;
                    debug!(expires = self.expires, failures, "license reported expired");
                }
                Err(e) => {
                    failures += 1;
                    warn!(error = %e, failures, "expiration check failed");
                }
            }

            if failures >= self.threshold {
                // Cancellation may have landed while the check was in flight.
                if self.shared.is_cancelled() {
                    debug!(expires = self.expires, "expiration monitor cancelled");
                    return MonitorOutcome::Cancelled;
                }
                info!(expires = self.expires, failures, "license expired, running callback");
                (self.on_expire)(&self.data);
                return MonitorOutcome::Fired;
            }
        }
    }
}

/// Owner's handle on a running monitor. Dropping it cancels the monitor.
pub struct MonitorHandle {
    shared: Arc<Shared>,
    task: Option<JoinHandle<MonitorOutcome>>,
}

impl MonitorHandle {
    /// Asks the monitor to stop.
    ///
    /// A check already in flight is allowed to finish, but no further check
    /// is scheduled and the callback will not run.
    pub fn cancel(&self) {
        self.shared.cancelled.store(true, Ordering::SeqCst);
        self.shared.wake.notify_one();
    }

    /// Returns true once [`cancel`](Self::cancel) has been called.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.is_cancelled()
    }

    /// Returns true if the monitor task has stopped.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Waits for the monitor to stop and reports why.
    ///
    /// A callback that panicked is reported as `Cancelled`.
    pub async fn wait(mut self) -> MonitorOutcome {
        let Some(task) = self.task.take() else {
            return MonitorOutcome::Cancelled;
        };
        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(error = %e, "expiration monitor task failed");
                MonitorOutcome::Cancelled
            }
        }
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for MonitorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MonitorHandle")
            .field("cancelled", &self.is_cancelled())
            .field("finished", &self.is_finished())
            .finish()
    }
}
