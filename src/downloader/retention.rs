//! Retention sweep for abandoned terminal jobs
//!
//! Post-delivery cleanup removes a job once its result is fetched, but a
//! client that never fetches (or never subscribes) would otherwise leak
//! the record forever. The sweep evicts `Completed`/`Failed` jobs whose
//! terminal transition is older than the configured retention. Running
//! jobs are never evicted.

use super::jobs::JobRegistry;
use std::sync::Arc;
use std::time::Duration;

/// Spawn the periodic retention sweep task
pub(crate) fn spawn_sweeper(
    registry: Arc<JobRegistry>,
    retention: Duration,
    sweep_interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweep_interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            interval.tick().await;
            sweep_once(&registry, retention);
        }
    })
}

/// Evict every terminal job that finished more than `retention` ago
pub(crate) fn sweep_once(registry: &JobRegistry, retention: Duration) {
    let Ok(retention) = chrono::Duration::from_std(retention) else {
        return;
    };
    let cutoff = chrono::Utc::now() - retention;

    let stale = registry.terminal_jobs_finished_before(cutoff);
    if stale.is_empty() {
        return;
    }

    for id in stale {
        if registry.remove(id).is_some() {
            tracing::debug!(job_id = %id, "evicted stale terminal job");
        }
    }
}
