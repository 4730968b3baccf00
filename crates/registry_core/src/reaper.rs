//! Background removal of abandoned instances.
//!
//! Session hosts that crash never call `unregister`. The reaper periodically
//! asks the activity index for instances whose last activity is older than
//! the stale threshold and unregisters each of them. Keep-alive pings push an
//! instance's activity forward and keep it out of the sweep.

use crate::error::RegistryError;
use crate::registry::InstanceRegistry;
use crate::utils::current_timestamp;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct ReaperConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Instances idle for longer than this are removed
    pub stale_threshold: Duration,
}

impl Default for ReaperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(3600),
        }
    }
}

/// Outcome of a single sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub scanned: usize,
    pub reaped: usize,
    pub failed: usize,
}

pub struct Reaper {
    registry: Arc<InstanceRegistry>,
    config: ReaperConfig,
}

impl Reaper {
    pub fn new(registry: Arc<InstanceRegistry>, config: ReaperConfig) -> Self {
        Self { registry, config }
    }

    /// Removes every instance idle since before `now - stale_threshold`.
    ///
    /// An instance that disappears between the index query and its removal
    /// counts as neither reaped nor failed.
    ///
    /// # Arguments
    ///
    /// * `now` - Reference time in epoch seconds
    pub async fn sweep(&self, now: i64) -> Result<SweepReport, RegistryError> {
        let threshold = self.config.stale_threshold.as_secs() as i64;
        let stale = self.registry.find_stale(now - threshold).await?;

        let mut report = SweepReport {
            scanned: stale.len(),
            ..SweepReport::default()
        };

        for id in stale {
            match self.registry.unregister(&id).await {
                Ok(()) => report.reaped += 1,
                Err(e) if e.is_not_found() => {}
                Err(e) => {
                    warn!("⚠️ Failed to reap stale instance {}: {}", id, e);
                    report.failed += 1;
                }
            }
        }

        if report.reaped > 0 || report.failed > 0 {
            info!(
                "🧹 Reaper sweep: {} stale, {} removed, {} failed",
                report.scanned, report.reaped, report.failed
            );
        } else {
            debug!("Reaper sweep: {} stale, 0 removed", report.scanned);
        }
        Ok(report)
    }

    /// Sweeps on every interval tick until `shutdown` is cancelled.
    pub async fn run(self, shutdown: CancellationToken) {
        let mut ticker = tokio::time::interval(self.config.interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        info!(
            "Reaper started (interval {:?}, threshold {:?})",
            self.config.interval, self.config.stale_threshold
        );

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Reaper received shutdown signal");
                    break;
                }
                _ = ticker.tick() => {
                    if let Err(e) = self.sweep(current_timestamp()).await {
                        warn!("⚠️ Reaper sweep failed: {}", e);
                    }
                }
            }
        }

        info!("Reaper stopped");
    }

    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
