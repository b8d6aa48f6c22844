//! Database operations for community questions and their spotlight scores

use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::error::Result;
use crate::models::Question;

const QUESTION_COLUMNS: &str = r#"
    id, topic_id, author_id, parent_id, body, upvote_count, reply_count,
    answered, spotlight_score, last_reply_at, created_at, deleted_at
"#;

#[derive(Clone)]
pub struct QuestionsRepo {
    pool: PgPool,
}

impl QuestionsRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get(&self, question_id: Uuid) -> Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1"
        ))
        .bind(question_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(question)
    }

    pub async fn get_for_update(
        tx: &mut Transaction<'_, Postgres>,
        question_id: Uuid,
    ) -> Result<Option<Question>> {
        let question = sqlx::query_as::<_, Question>(&format!(
            "SELECT {QUESTION_COLUMNS} FROM questions WHERE id = $1 FOR UPDATE"
        ))
        .bind(question_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(question)
    }

    pub async fn store_score(
        tx: &mut Transaction<'_, Postgres>,
        question_id: Uuid,
        score: f64,
    ) -> Result<()> {
        sqlx::query("UPDATE questions SET spotlight_score = $2 WHERE id = $1")
            .bind(question_id)
            .bind(score)
            .execute(&mut **tx)
            .await?;

        Ok(())
    }

    pub async fn bump_upvotes(&self, question_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE questions SET upvote_count = upvote_count + 1 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(question_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn bump_replies(&self, question_id: Uuid) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE questions
            SET reply_count = reply_count + 1, last_reply_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(question_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn set_answered(&self, question_id: Uuid, answered: bool) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE questions SET answered = $2 WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(question_id)
        .bind(answered)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Top spotlight candidates: positive score, top-level, not deleted,
    /// parent topic still active. Ties break toward the newest question.
    pub async fn spotlight_candidates(
        &self,
        limit: i64,
        exclude: Option<Uuid>,
    ) -> Result<Vec<Question>> {
        let questions = sqlx::query_as::<_, Question>(&format!(
            r#"
            SELECT {QUESTION_COLUMNS}
            FROM questions q
            WHERE q.spotlight_score > 0
              AND q.parent_id IS NULL
              AND q.deleted_at IS NULL
              AND ($2::UUID IS NULL OR q.id <> $2)
              AND EXISTS(SELECT 1 FROM topics t WHERE t.id = q.topic_id AND t.is_active)
            ORDER BY q.spotlight_score DESC, q.created_at DESC
            LIMIT $1
            "#
        ))
        .bind(limit)
        .bind(exclude)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }

    /// Trending score of the question's parent topic; 0 when absent.
    pub async fn topic_trending(
        tx: &mut Transaction<'_, Postgres>,
        topic_id: Uuid,
    ) -> Result<f64> {
        let score = sqlx::query_scalar::<_, Option<f64>>(
            "SELECT trending_score FROM topics WHERE id = $1",
        )
        .bind(topic_id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(score.flatten().unwrap_or(0.0))
    }
}
