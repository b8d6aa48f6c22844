//! Database operations for clips and their cached trending scores

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Clip;

const CLIP_COLUMNS: &str = r#"
    id, profile_id, topic_id, parent_clip_id, status, listens_count,
    reaction_counts, reply_count, remix_count, is_sensitive, moderation_risk,
    trending_score, score_computed_at, created_at, deleted_at
"#;

#[derive(Clone)]
pub struct ClipsRepo {
    pool: PgPool,
}

impl ClipsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, clip_id: Uuid) -> Result<Option<Clip>> {
        let clip = sqlx::query_as::<_, Clip>(&format!(
            "SELECT {CLIP_COLUMNS} FROM clips WHERE id = $1"
        ))
        .bind(clip_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(clip)
    }

    /// Fetch a clip inside a transaction, locking the row so two
    /// overlapping recomputes of the same clip cannot interleave.
    pub async fn get_for_update(
        tx: &mut Transaction<'_, Postgres>,
        clip_id: Uuid,
    ) -> Result<Option<Clip>> {
        let clip = sqlx::query_as::<_, Clip>(&format!(
            "SELECT {CLIP_COLUMNS} FROM clips WHERE id = $1 FOR UPDATE"
        ))
        .bind(clip_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(clip)
    }

    pub async fn store_score(
        tx: &mut Transaction<'_, Postgres>,
        clip_id: Uuid,
        score: f64,
    ) -> Result<()> {
        sqlx::query("UPDATE clips SET trending_score = $2, score_computed_at = NOW() WHERE id = $1")
            .bind(clip_id)
            .bind(score)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    /// Ids of every live clip, for the batch refresh.
    pub async fn live_clip_ids(&self) -> Result<Vec<Uuid>> {
        let ids = sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM clips WHERE status = 'live' AND deleted_at IS NULL",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    /// Candidate pool for the feed: live clips either created within the
    /// recency window or already above the trending threshold. The cap
    /// bounds scoring cost; recall loss past it is accepted.
    pub async fn feed_candidates(
        &self,
        window_hours: i64,
        trending_threshold: f64,
        pool_size: i64,
    ) -> Result<Vec<Clip>> {
        let clips = sqlx::query_as::<_, Clip>(&format!(
            r#"
            SELECT {CLIP_COLUMNS}
            FROM clips
            WHERE status = 'live'
              AND deleted_at IS NULL
              AND (created_at >= NOW() - ($1 * INTERVAL '1 hour')
                   OR trending_score >= $2)
            ORDER BY trending_score DESC, created_at DESC
            LIMIT $3
            "#
        ))
        .bind(window_hours)
        .bind(trending_threshold)
        .bind(pool_size)
        .fetch_all(&self.pool)
        .await?;

        Ok(clips)
    }

    /// Live clips ordered purely by trending score (the anonymous/global view).
    pub async fn top_trending(&self, limit: i64) -> Result<Vec<Clip>> {
        let clips = sqlx::query_as::<_, Clip>(&format!(
            r#"
            SELECT {CLIP_COLUMNS}
            FROM clips
            WHERE status = 'live' AND deleted_at IS NULL
            ORDER BY trending_score DESC, created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(clips)
    }

    pub async fn bump_listens(&self, clip_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE clips SET listens_count = listens_count + 1 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(clip_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Increment one emoji bucket inside the JSONB reaction map. A bucket
    /// holding a non-numeric value restarts at 1 instead of erroring.
    pub async fn bump_reaction(&self, clip_id: Uuid, emoji: &str) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE clips
            SET reaction_counts = jsonb_set(
                reaction_counts,
                ARRAY[$2],
                ((CASE WHEN jsonb_typeof(reaction_counts -> $2) = 'number'
                       THEN (reaction_counts ->> $2)::NUMERIC::INTEGER
                       ELSE 0 END) + 1)::TEXT::JSONB,
                true
            )
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(clip_id)
        .bind(emoji)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn bump_replies(&self, clip_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE clips SET reply_count = reply_count + 1 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(clip_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn bump_remixes(&self, clip_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE clips SET remix_count = remix_count + 1 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(clip_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_status(&self, clip_id: Uuid, status: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE clips SET status = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(clip_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Parent pointer for the remix chain walk.
    pub async fn parent_of(&self, clip_id: Uuid) -> Result<Option<Uuid>> {
        let parent = sqlx::query_scalar::<_, Option<Uuid>>(
            "SELECT parent_clip_id FROM clips WHERE id = $1",
        )
        .bind(clip_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(parent.flatten())
    }

    /// Refresh per-topic trending as the average score of its live clips.
    /// Feeds the spotlight topic boost; run as part of the batch refresh.
    pub async fn refresh_topic_trending(&self) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE topics t
            SET trending_score = COALESCE(agg.avg_score, 0)
            FROM (
                SELECT topic_id, AVG(trending_score) AS avg_score
                FROM clips
                WHERE status = 'live' AND deleted_at IS NULL AND topic_id IS NOT NULL
                GROUP BY topic_id
            ) agg
            WHERE agg.topic_id = t.id
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }
}
