//! Spotlight question scoring and selection
//!
//! Community questions earn an engagement-and-recency score:
//!
//! `(upvotes·5 + replies·10) × recency × answer_factor + topic_boost + activity_bonus`
//!
//! Unanswered questions get a 1.5x lift: the spotlight drives
//! engagement toward open questions, not settled ones. The
//! score is recomputed synchronously on every mutation that touches an
//! input, so a read never observes a stale value.

use chrono::{DateTime, Datelike, Utc};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::SpotlightConfig;
use crate::db::QuestionsRepo;
use crate::error::Result;
use crate::models::Question;
use crate::services::notifier::{Notifier, NotifierEvent};

const UPVOTE_WEIGHT: f64 = 5.0;
const REPLY_WEIGHT: f64 = 10.0;
const UNANSWERED_LIFT: f64 = 1.5;
const TOPIC_BOOST_WEIGHT: f64 = 0.1;
const DAILY_CACHE_KEY: &str = "murmur:spotlight:daily";

#[derive(Debug, Clone, Copy)]
pub struct SpotlightInputs {
    pub upvotes: i64,
    pub replies: i64,
    pub answered: bool,
    pub hours_old: f64,
    pub topic_trending: f64,
    /// Hours since the most recent reply; `None` when there is none.
    pub last_reply_age_hours: Option<f64>,
}

impl SpotlightInputs {
    pub fn from_question(question: &Question, topic_trending: f64, now: DateTime<Utc>) -> Self {
        let hours_old = (now - question.created_at).num_seconds().max(0) as f64 / 3600.0;
        let last_reply_age_hours = question
            .last_reply_at
            .map(|at| (now - at).num_seconds().max(0) as f64 / 3600.0);

        Self {
            upvotes: question.upvote_count.max(0) as i64,
            replies: question.reply_count.max(0) as i64,
            answered: question.answered,
            hours_old,
            topic_trending,
            last_reply_age_hours,
        }
    }
}

/// Logarithmic recency decay. The 0.1 floor on the denominator keeps
/// very fresh questions from dividing by a vanishing value.
pub fn recency_factor(hours_old: f64) -> f64 {
    1.0 / ((hours_old.max(1.0) + 1.0).ln() + 1.0).max(0.1)
}

/// Flat bonus for threads with recent replies, independent of volume.
pub fn activity_bonus(last_reply_age_hours: Option<f64>) -> f64 {
    match last_reply_age_hours {
        Some(age) if age <= 24.0 => 20.0,
        Some(age) if age <= 48.0 => 10.0,
        _ => 0.0,
    }
}

pub fn compute_spotlight_score(inputs: &SpotlightInputs) -> f64 {
    let engagement = inputs.upvotes as f64 * UPVOTE_WEIGHT + inputs.replies as f64 * REPLY_WEIGHT;
    let answer_factor = if inputs.answered { 1.0 } else { UNANSWERED_LIFT };

    engagement * recency_factor(inputs.hours_old) * answer_factor
        + TOPIC_BOOST_WEIGHT * inputs.topic_trending.max(0.0)
        + activity_bonus(inputs.last_reply_age_hours)
}

#[derive(Clone)]
pub struct SpotlightService {
    pool: PgPool,
    questions: QuestionsRepo,
    redis: Option<ConnectionManager>,
    notifier: Notifier,
    config: SpotlightConfig,
}

impl SpotlightService {
    pub fn new(
        pool: PgPool,
        redis: Option<ConnectionManager>,
        notifier: Notifier,
        config: SpotlightConfig,
    ) -> Self {
        Self {
            questions: QuestionsRepo::new(pool.clone()),
            pool,
            redis,
            notifier,
            config,
        }
    }

    /// Recompute and persist one question's score. Called from every
    /// upvote/reply/answer write so the cached score is never stale
    /// relative to the mutation that just happened. A missing question
    /// scores 0 without erroring.
    pub async fn recompute_question(&self, question_id: Uuid) -> Result<f64> {
        let mut tx = self.pool.begin().await?;

        let Some(question) = QuestionsRepo::get_for_update(&mut tx, question_id).await? else {
            tx.rollback().await?;
            debug!(question_id = %question_id, "Recompute requested for unknown question");
            return Ok(0.0);
        };

        let score = if question.deleted_at.is_none() {
            let topic_trending = QuestionsRepo::topic_trending(&mut tx, question.topic_id).await?;
            let inputs = SpotlightInputs::from_question(&question, topic_trending, Utc::now());
            compute_spotlight_score(&inputs)
        } else {
            0.0
        };

        QuestionsRepo::store_score(&mut tx, question_id, score).await?;
        tx.commit().await?;

        debug!(question_id = %question_id, score = score, "Spotlight score recomputed");

        Ok(score)
    }

    /// Stored score for a question; 0 when it does not exist.
    pub async fn score(&self, question_id: Uuid) -> Result<f64> {
        let score = self
            .questions
            .get(question_id)
            .await?
            .map(|q| q.spotlight_score)
            .unwrap_or(0.0);

        Ok(score)
    }

    /// The single highest-scoring eligible question. An empty result is
    /// a normal state for the caller, not an error.
    pub async fn current_spotlight(&self, exclude: Option<Uuid>) -> Result<Option<Question>> {
        let candidates = self.questions.spotlight_candidates(1, exclude).await?;
        Ok(candidates.into_iter().next())
    }

    /// Daily-rotation variant: pick among the top N by a day-of-year
    /// offset so the same question does not win every day. The pool is
    /// small on purpose: rotation stays among the best candidates.
    pub async fn daily_spotlight(&self, exclude: Option<Uuid>) -> Result<Option<Question>> {
        if exclude.is_none() {
            if let Some(cached) = self.cached_daily().await {
                if let Some(question) = self.questions.get(cached).await? {
                    if question.deleted_at.is_none() {
                        debug!(question_id = %cached, "Daily spotlight cache hit");
                        return Ok(Some(question));
                    }
                }
            }
        }

        let candidates = self
            .questions
            .spotlight_candidates(self.config.rotation_pool_size, exclude)
            .await?;

        if candidates.is_empty() {
            return Ok(None);
        }

        let index = Utc::now().ordinal() as usize % candidates.len();
        let selected = candidates[index].clone();

        if exclude.is_none() {
            self.cache_daily(selected.id).await;
            self.notifier.dispatch(NotifierEvent::SpotlightSelected {
                question_id: selected.id,
                topic_id: selected.topic_id,
            });
        }

        Ok(Some(selected))
    }

    async fn cached_daily(&self) -> Option<Uuid> {
        let redis = self.redis.as_ref()?;
        let mut conn = redis.clone();

        match conn.get::<_, Option<String>>(DAILY_CACHE_KEY).await {
            Ok(value) => value.and_then(|v| Uuid::parse_str(&v).ok()),
            Err(e) => {
                warn!(error = %e, "Spotlight cache read failed");
                None
            }
        }
    }

    async fn cache_daily(&self, question_id: Uuid) {
        let Some(redis) = self.redis.as_ref() else {
            return;
        };
        let mut conn = redis.clone();

        if let Err(e) = conn
            .set_ex::<_, _, ()>(
                DAILY_CACHE_KEY,
                question_id.to_string(),
                self.config.cache_ttl_secs,
            )
            .await
        {
            warn!(error = %e, "Spotlight cache write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_inputs() -> SpotlightInputs {
        SpotlightInputs {
            upvotes: 0,
            replies: 0,
            answered: false,
            hours_old: 1.0,
            topic_trending: 0.0,
            last_reply_age_hours: None,
        }
    }

    #[test]
    fn test_zero_engagement_scores_zero() {
        assert_eq!(compute_spotlight_score(&base_inputs()), 0.0);
    }

    #[test]
    fn test_unanswered_outranks_answered() {
        let unanswered = SpotlightInputs {
            upvotes: 10,
            replies: 4,
            ..base_inputs()
        };
        let answered = SpotlightInputs {
            answered: true,
            ..unanswered
        };
        let ratio = compute_spotlight_score(&unanswered) / compute_spotlight_score(&answered);
        assert!((ratio - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_recency_floor() {
        // Sub-hour ages clamp to 1 hour so the decay never blows up
        assert_eq!(recency_factor(0.0), recency_factor(1.0));
        assert!(recency_factor(1.0) > recency_factor(100.0));
        assert!(recency_factor(1_000_000.0) > 0.0);
    }

    #[test]
    fn test_activity_bonus_tiers() {
        assert_eq!(activity_bonus(Some(2.0)), 20.0);
        assert_eq!(activity_bonus(Some(36.0)), 10.0);
        assert_eq!(activity_bonus(Some(72.0)), 0.0);
        assert_eq!(activity_bonus(None), 0.0);
    }

    #[test]
    fn test_topic_boost() {
        let no_boost = SpotlightInputs {
            upvotes: 4,
            ..base_inputs()
        };
        let boosted = SpotlightInputs {
            topic_trending: 500.0,
            ..no_boost
        };
        let diff = compute_spotlight_score(&boosted) - compute_spotlight_score(&no_boost);
        assert!((diff - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_upvote_mutation_changes_score() {
        let before = SpotlightInputs {
            upvotes: 3,
            replies: 1,
            ..base_inputs()
        };
        let after = SpotlightInputs {
            upvotes: 4,
            ..before
        };
        assert!(compute_spotlight_score(&after) > compute_spotlight_score(&before));
    }
}
