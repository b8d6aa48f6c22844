//! Moderation auto-escalation sweep
//!
//! Roughly hourly: bump the priority of open items that have sat in the
//! queue past the escalation window. The bump is capped, so repeated
//! sweeps over the same stale item converge instead of growing without
//! bound.

use std::time::Duration;
use tokio::time::sleep;

use crate::services::ModerationQueue;

pub async fn start_escalation_sweeper(queue: ModerationQueue, interval_secs: u64) {
    let interval = Duration::from_secs(interval_secs);

    tracing::info!(
        interval_secs = interval_secs,
        "Starting moderation escalation sweeper"
    );

    loop {
        sleep(interval).await;

        match queue.auto_escalate().await {
            Ok(escalated) => {
                if escalated > 0 {
                    tracing::info!(escalated = escalated, "Escalation sweep bumped stale items");
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "Escalation sweep failed");
            }
        }
    }
}
