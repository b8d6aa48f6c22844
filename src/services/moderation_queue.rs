//! Moderation queue workflow
//!
//! A small state machine over flagged/reported items:
//! `pending → in_review → {resolved, actioned}`, with the two end
//! states terminal. Every assignment and transition appends to the
//! audit trail; unlike the scoring paths, mutations here reject bad
//! input loudly so the audit history stays trustworthy.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::warn;
use uuid::Uuid;

use crate::config::ModerationConfig;
use crate::db::moderation::BreakdownColumn;
use crate::db::ModerationRepo;
use crate::error::{AppError, Result};
use crate::models::{ModerationItem, ModerationSource, ModerationState, ModerationStats};
use crate::services::notifier::{Notifier, NotifierEvent};

/// Open items at or above this priority count as high-risk in the
/// statistics rollup.
const HIGH_RISK_PRIORITY: i32 = 70;

#[derive(Clone)]
pub struct ModerationQueue {
    repo: ModerationRepo,
    notifier: Notifier,
    config: ModerationConfig,
}

impl ModerationQueue {
    pub fn new(pool: PgPool, notifier: Notifier, config: ModerationConfig) -> Self {
        Self {
            repo: ModerationRepo::new(pool),
            notifier,
            config,
        }
    }

    /// Intake a new flag or report into the queue.
    pub async fn create(
        &self,
        target_kind: &str,
        target_id: Uuid,
        source: &str,
        priority: i32,
    ) -> Result<ModerationItem> {
        if !matches!(target_kind, "clip" | "profile") {
            return Err(AppError::BadRequest(format!(
                "Unknown moderation target kind: {target_kind}"
            )));
        }
        let source = ModerationSource::parse(source)
            .ok_or_else(|| AppError::BadRequest(format!("Unknown moderation source: {source}")))?;

        let priority = priority.clamp(0, self.config.priority_cap);
        let item = self
            .repo
            .create(target_kind, target_id, source.as_str(), priority)
            .await?;

        self.log_history(item.id, "created", None, Some(&item.state), None)
            .await;

        Ok(item)
    }

    /// Assign an item to an admin for review. The admin reference must
    /// exist; assigning into the void is rejected, not upserted.
    pub async fn assign(&self, item_id: Uuid, admin_id: Uuid) -> Result<ModerationItem> {
        if !self.repo.admin_exists(admin_id).await? {
            return Err(AppError::BadRequest(format!(
                "Admin {admin_id} does not exist"
            )));
        }

        let item = self
            .repo
            .set_assignment(item_id, admin_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Moderation item {item_id} not found")))?;

        self.log_history(
            item.id,
            "assigned",
            Some(&item.state),
            Some(&item.state),
            Some(admin_id),
        )
        .await;

        self.notify(&item, "assigned");

        tracing::info!(
            item_id = %item_id,
            admin_id = %admin_id,
            "Moderation item assigned"
        );

        Ok(item)
    }

    /// Move an item to a new workflow state. An unknown state string is
    /// rejected outright, never coerced; terminal items stay terminal.
    /// Entering a terminal state stamps the review fields.
    pub async fn transition(
        &self,
        item_id: Uuid,
        new_state: &str,
        admin_id: Uuid,
        notes: Option<&str>,
    ) -> Result<ModerationItem> {
        let target = ModerationState::parse(new_state)
            .ok_or_else(|| AppError::InvalidState(new_state.to_string()))?;

        if !self.repo.admin_exists(admin_id).await? {
            return Err(AppError::BadRequest(format!(
                "Admin {admin_id} does not exist"
            )));
        }

        let current_item = self
            .repo
            .get(item_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Moderation item {item_id} not found")))?;

        let current = ModerationState::parse(&current_item.state)
            .ok_or_else(|| AppError::Internal(format!("Corrupt state: {}", current_item.state)))?;

        if current.is_terminal() && target != current {
            return Err(AppError::InvalidState(format!(
                "Item {item_id} is {current}; terminal states only reopen via explicit admin action"
            )));
        }

        let item = self
            .repo
            .set_state(item_id, target.as_str(), admin_id, notes, target.is_terminal())
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Moderation item {item_id} not found")))?;

        self.log_history(
            item.id,
            "state_change",
            Some(current.as_str()),
            Some(target.as_str()),
            Some(admin_id),
        )
        .await;

        self.notify(&item, "state_change");

        tracing::info!(
            item_id = %item_id,
            admin_id = %admin_id,
            from = %current,
            to = %target,
            "Moderation item transitioned"
        );

        Ok(item)
    }

    /// Raise priority on every open item older than the escalation
    /// window, capped. Window-based rather than once-per-item: a sweep
    /// running hourly will escalate a stale item again next pass, and
    /// the cap bounds the growth. Returns how many items were bumped.
    pub async fn auto_escalate(&self) -> Result<u64> {
        let ids = self
            .repo
            .escalate_stale(
                self.config.escalation_after_hours,
                self.config.escalation_step,
                self.config.priority_cap,
            )
            .await?;

        for item_id in &ids {
            self.log_history(*item_id, "escalated", None, None, None).await;
        }

        tracing::info!(escalated = ids.len(), "Auto-escalation sweep completed");

        Ok(ids.len() as u64)
    }

    /// Read-only queue statistics for a window.
    pub async fn statistics(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ModerationStats> {
        if from >= to {
            return Err(AppError::BadRequest(
                "Statistics window start must precede its end".to_string(),
            ));
        }

        let reviewed_in_window = self.repo.count_reviewed(from, to).await?;
        let avg_review_hours = self.repo.avg_review_hours(from, to).await?;
        let high_risk_pending = self.repo.count_high_risk_pending(HIGH_RISK_PRIORITY).await?;
        let older_than_24h = self
            .repo
            .count_older_than(self.config.escalation_after_hours)
            .await?;
        let by_source = self.repo.counts_by(BreakdownColumn::Source, from, to).await?;
        let by_kind = self
            .repo
            .counts_by(BreakdownColumn::TargetKind, from, to)
            .await?;
        let by_state = self.repo.counts_by(BreakdownColumn::State, from, to).await?;

        Ok(ModerationStats {
            reviewed_in_window,
            avg_review_hours,
            high_risk_pending,
            older_than_24h,
            by_source,
            by_kind,
            by_state,
        })
    }

    /// History writes ride along with the primary operation; a failed
    /// append is logged but does not unwind work already committed.
    async fn log_history(
        &self,
        item_id: Uuid,
        action: &str,
        before: Option<&str>,
        after: Option<&str>,
        actor: Option<Uuid>,
    ) {
        if let Err(e) = self
            .repo
            .append_history(item_id, action, before, after, actor)
            .await
        {
            warn!(item_id = %item_id, action = action, error = %e, "History append failed");
        }
    }

    fn notify(&self, item: &ModerationItem, action: &str) {
        self.notifier.dispatch(NotifierEvent::ModerationUpdated {
            item_id: item.id,
            action: action.to_string(),
            state: item.state.clone(),
        });
    }
}
