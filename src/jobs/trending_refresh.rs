//! Trending refresh background job
//!
//! Freshness decays whether or not new engagement arrives, so cached
//! trending scores go stale on their own. This loop sweeps every live
//! clip on an interval; a failed pass is logged and the next interval
//! tries again.

use std::time::{Duration, Instant};
use tokio::time::sleep;

use crate::services::TrendingService;

pub async fn start_trending_refresher(trending: TrendingService, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs);

    tracing::info!(
        interval_secs = interval_secs,
        "Starting trending refresh background job"
    );

    loop {
        sleep(interval).await;

        let cycle_start = Instant::now();

        match trending.recompute_all().await {
            Ok(updated) => {
                tracing::info!(
                    updated = updated,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Trending refresh cycle completed"
                );
            }
            Err(e) => {
                tracing::error!(
                    error = %e,
                    duration_ms = cycle_start.elapsed().as_millis() as u64,
                    "Trending refresh cycle failed"
                );
            }
        }
    }
}
