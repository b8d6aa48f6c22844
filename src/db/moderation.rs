//! Database operations for the moderation queue and its audit trail

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::{BucketCount, ModerationHistoryEntry, ModerationItem};

const ITEM_COLUMNS: &str = r#"
    id, target_kind, target_id, source, priority, state, assigned_to,
    notes, reviewed_at, reviewed_by, created_at
"#;

#[derive(Clone)]
pub struct ModerationRepo {
    pool: PgPool,
}

impl ModerationRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        target_kind: &str,
        target_id: Uuid,
        source: &str,
        priority: i32,
    ) -> Result<ModerationItem> {
        let item = sqlx::query_as::<_, ModerationItem>(&format!(
            r#"
            INSERT INTO moderation_items (target_kind, target_id, source, priority, state)
            VALUES ($1, $2, $3, $4, 'pending')
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(target_kind)
        .bind(target_id)
        .bind(source)
        .bind(priority)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(
            item_id = %item.id,
            source = %source,
            target_kind = %target_kind,
            "Moderation item created"
        );

        Ok(item)
    }

    pub async fn get(&self, item_id: Uuid) -> Result<Option<ModerationItem>> {
        let item = sqlx::query_as::<_, ModerationItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM moderation_items WHERE id = $1"
        ))
        .bind(item_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    pub async fn admin_exists(&self, admin_id: Uuid) -> Result<bool> {
        let exists =
            sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM admins WHERE id = $1)")
                .bind(admin_id)
                .fetch_one(&self.pool)
                .await?;

        Ok(exists)
    }

    pub async fn set_assignment(
        &self,
        item_id: Uuid,
        admin_id: Uuid,
    ) -> Result<Option<ModerationItem>> {
        let item = sqlx::query_as::<_, ModerationItem>(&format!(
            r#"
            UPDATE moderation_items
            SET assigned_to = $2
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(admin_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    pub async fn set_state(
        &self,
        item_id: Uuid,
        new_state: &str,
        admin_id: Uuid,
        notes: Option<&str>,
        terminal: bool,
    ) -> Result<Option<ModerationItem>> {
        let item = sqlx::query_as::<_, ModerationItem>(&format!(
            r#"
            UPDATE moderation_items
            SET state = $2,
                notes = COALESCE($4, notes),
                reviewed_at = CASE WHEN $5 THEN NOW() ELSE reviewed_at END,
                reviewed_by = CASE WHEN $5 THEN $3 ELSE reviewed_by END
            WHERE id = $1
            RETURNING {ITEM_COLUMNS}
            "#
        ))
        .bind(item_id)
        .bind(new_state)
        .bind(admin_id)
        .bind(notes)
        .bind(terminal)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    /// Append one audit row. Rows are never mutated afterwards.
    pub async fn append_history(
        &self,
        item_id: Uuid,
        action: &str,
        before_state: Option<&str>,
        after_state: Option<&str>,
        actor_id: Option<Uuid>,
    ) -> Result<ModerationHistoryEntry> {
        let entry = sqlx::query_as::<_, ModerationHistoryEntry>(
            r#"
            INSERT INTO moderation_history (item_id, action, before_state, after_state, actor_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, item_id, action, before_state, after_state, actor_id, created_at
            "#,
        )
        .bind(item_id)
        .bind(action)
        .bind(before_state)
        .bind(after_state)
        .bind(actor_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Bump priority on every open item older than the cutoff, capped.
    /// Returns the ids touched so the caller can log them.
    pub async fn escalate_stale(
        &self,
        older_than_hours: i64,
        step: i32,
        cap: i32,
    ) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            r#"
            UPDATE moderation_items
            SET priority = LEAST(priority + $2, $3)
            WHERE state IN ('pending', 'in_review')
              AND created_at < NOW() - ($1 * INTERVAL '1 hour')
              AND priority < $3
            RETURNING id
            "#,
        )
        .bind(older_than_hours)
        .bind(step)
        .bind(cap)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    pub async fn count_reviewed(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM moderation_items
            WHERE reviewed_at IS NOT NULL AND reviewed_at >= $1 AND reviewed_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn avg_review_hours(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Option<f64>> {
        let hours = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(EXTRACT(EPOCH FROM (reviewed_at - created_at)) / 3600.0)::FLOAT8
            FROM moderation_items
            WHERE reviewed_at IS NOT NULL AND reviewed_at >= $1 AND reviewed_at < $2
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await?;

        Ok(hours)
    }

    pub async fn count_high_risk_pending(&self, priority_floor: i32) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM moderation_items
            WHERE state IN ('pending', 'in_review') AND priority >= $1
            "#,
        )
        .bind(priority_floor)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_older_than(&self, hours: i64) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM moderation_items
            WHERE state IN ('pending', 'in_review')
              AND created_at < NOW() - ($1 * INTERVAL '1 hour')
            "#,
        )
        .bind(hours)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn counts_by(
        &self,
        column: BreakdownColumn,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<BucketCount>> {
        let sql = format!(
            r#"
            SELECT {col} AS bucket, COUNT(*) AS count
            FROM moderation_items
            WHERE created_at >= $1 AND created_at < $2
            GROUP BY {col}
            ORDER BY count DESC
            "#,
            col = column.as_str()
        );

        let buckets = sqlx::query_as::<_, BucketCount>(&sql)
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await?;

        Ok(buckets)
    }
}

/// Columns the statistics endpoint may group by. Closed set so the
/// identifier is never interpolated from caller input.
#[derive(Debug, Clone, Copy)]
pub enum BreakdownColumn {
    Source,
    TargetKind,
    State,
}

impl BreakdownColumn {
    fn as_str(&self) -> &'static str {
        match self {
            BreakdownColumn::Source => "source",
            BreakdownColumn::TargetKind => "target_kind",
            BreakdownColumn::State => "state",
        }
    }
}
