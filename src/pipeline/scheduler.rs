use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{info, warn};

use crate::pipeline::orchestrator::SyncOrchestrator;

/// Run a sync every `interval_seconds` until the process exits. Failed runs are
/// logged and the next run proceeds on schedule. Without an interval this returns
/// immediately.
pub async fn loop_sync(orchestrator: Arc<SyncOrchestrator>, interval_seconds: Option<u64>) -> Result<()> {
    let Some(interval_seconds) = interval_seconds.filter(|secs| *secs > 0) else {
        info!("scheduled sync disabled");
        return Ok(());
    };

    let mut ticker = tokio::time::interval(Duration::from_secs(interval_seconds));
    // no burst of catch-up runs after a slow sync
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        info!("scheduled sync cycle start, interval {} seconds", interval_seconds);
        if let Err(err) = orchestrator.run_sync().await {
            warn!("scheduled sync failed, next attempt in {} seconds: {}", interval_seconds, err);
        }
    }
}
