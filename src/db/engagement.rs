//! Database operations for raw engagement facts: listens and the viewer
//! affinity signals (follows, subscriptions, completion history).

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;

#[derive(Clone)]
pub struct EngagementRepo {
    pool: PgPool,
}

impl EngagementRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_listen(
        &self,
        clip_id: Uuid,
        profile_id: Option<Uuid>,
        completion_pct: Option<f64>,
    ) -> Result<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO listen_events (clip_id, profile_id, completion_pct)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(clip_id)
        .bind(profile_id)
        .bind(completion_pct)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    /// Average completion across listens that recorded one, in [0, 1].
    /// `None` when nothing was recorded; the caller picks the default.
    pub async fn completion_rate(&self, clip_id: Uuid) -> Result<Option<f64>> {
        let avg_pct = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(completion_pct)
            FROM listen_events
            WHERE clip_id = $1 AND completion_pct IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(clip_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(avg_pct.map(|pct| pct / 100.0))
    }

    /// Same aggregate, inside the recompute transaction so the score is
    /// computed from the locked row's point-in-time inputs.
    pub async fn completion_rate_in_tx(
        tx: &mut Transaction<'_, Postgres>,
        clip_id: Uuid,
    ) -> Result<Option<f64>> {
        let avg_pct = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(completion_pct)
            FROM listen_events
            WHERE clip_id = $1 AND completion_pct IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(clip_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok(avg_pct.map(|pct| pct / 100.0))
    }

    pub async fn follows_topic(&self, profile_id: Uuid, topic_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM topic_follows WHERE profile_id = $1 AND topic_id = $2)",
        )
        .bind(profile_id)
        .bind(topic_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    pub async fn follows_creator(&self, follower_id: Uuid, creator_id: Uuid) -> Result<bool> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM creator_follows WHERE follower_id = $1 AND creator_id = $2)",
        )
        .bind(follower_id)
        .bind(creator_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// The viewer's average completion percentage (0..100) on one clip.
    pub async fn own_completion_pct(
        &self,
        profile_id: Uuid,
        clip_id: Uuid,
    ) -> Result<Option<f64>> {
        let pct = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(completion_pct)
            FROM listen_events
            WHERE profile_id = $1 AND clip_id = $2
              AND completion_pct IS NOT NULL AND deleted_at IS NULL
            "#,
        )
        .bind(profile_id)
        .bind(clip_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(pct)
    }

    /// The viewer's average completion percentage (0..100) on a creator's
    /// *other* clips within the recent window.
    pub async fn creator_completion_pct(
        &self,
        profile_id: Uuid,
        creator_id: Uuid,
        exclude_clip: Uuid,
        window_days: i64,
    ) -> Result<Option<f64>> {
        let pct = sqlx::query_scalar::<_, Option<f64>>(
            r#"
            SELECT AVG(le.completion_pct)
            FROM listen_events le
            JOIN clips c ON c.id = le.clip_id
            WHERE le.profile_id = $1
              AND c.profile_id = $2
              AND c.id <> $3
              AND le.completion_pct IS NOT NULL
              AND le.deleted_at IS NULL
              AND le.created_at >= NOW() - ($4 * INTERVAL '1 day')
            "#,
        )
        .bind(profile_id)
        .bind(creator_id)
        .bind(exclude_clip)
        .bind(window_days)
        .fetch_one(&self.pool)
        .await?;

        Ok(pct)
    }
}
