use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval, MissedTickBehavior};
use tracing::info;

use crate::config::Config;
use crate::db::StoreConnector;
use crate::pipeline::run_cycle;
use crate::render::PageRenderer;
use crate::shutdown::Cancel;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScheduleStats {
    pub cycles: u64,
    pub failures: u64,
}

/// Runs cycles back to back on a fixed period until cancelled.
pub struct Scheduler {
    cfg: Config,
    period: Duration,
    renderer: Arc<dyn PageRenderer>,
    store: Option<Arc<dyn StoreConnector>>,
    cancel: Cancel,
}

impl Scheduler {
    pub fn new(
        cfg: Config,
        period: Duration,
        renderer: Arc<dyn PageRenderer>,
        store: Option<Arc<dyn StoreConnector>>,
        cancel: Cancel,
    ) -> Self {
        Self { cfg, period, renderer, store, cancel }
    }

    pub async fn run(self) -> ScheduleStats {
        let mut ticker = interval(self.period);
        // A cycle that outlasts the period delays the next one; cycles never overlap.
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut stats = ScheduleStats::default();
        info!(period_secs = self.period.as_secs(), "scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.cancel.cancelled() => break,
            }
            if self.cancel.is_cancelled() {
                break;
            }

            let report = run_cycle(
                &self.cfg,
                self.renderer.as_ref(),
                self.store.as_deref(),
                &self.cancel,
            )
            .await;
            stats.cycles += 1;
            if !report.is_success() {
                stats.failures += 1;
            }
        }

        info!(cycles = stats.cycles, failures = stats.failures, "scheduler stopped");
        stats
    }
}
