//! Trending score computation
//!
//! The global, viewer-independent popularity signal. Three bounded
//! factors multiply together, then scale by 1000 for storage:
//!
//! - engagement: `min(1, ln(1 + 2r + 0.5l + 3p + 4x) / ln(100))`,
//!   logarithmic so viral clips cannot crowd out everything else
//! - freshness:  `exp(-hours / decay_hours)` with a 12 h default decay
//! - quality:    completion-rate credit, sensitive-content penalty,
//!   moderation-risk penalty
//!
//! Non-live clips score exactly 0. The score is a pure function of the
//! stored counters and the clock at recompute time, so two recomputes
//! within one pass yield identical values.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::RankingConfig;
use crate::db::{ClipsRepo, EngagementRepo};
use crate::error::Result;
use crate::models::Clip;
use crate::services::engagement::sum_reaction_counts;

const REACTION_WEIGHT: f64 = 2.0;
const LISTEN_WEIGHT: f64 = 0.5;
const REPLY_WEIGHT: f64 = 3.0;
const REMIX_WEIGHT: f64 = 4.0;
const ENGAGEMENT_SATURATION: f64 = 100.0;
const SCORE_SCALE: f64 = 1000.0;

/// Everything the formula needs, detached from storage so it can be
/// computed (and tested) without a database.
#[derive(Debug, Clone, Copy)]
pub struct TrendingInputs {
    pub reactions: i64,
    pub listens: i64,
    pub replies: i64,
    pub remixes: i64,
    /// Average listen completion in [0, 1]; 0.5 is the neutral midpoint
    /// used when no listen recorded a completion percentage.
    pub completion_rate: f64,
    pub is_sensitive: bool,
    pub moderation_risk: Option<f64>,
    pub hours_old: f64,
}

impl TrendingInputs {
    pub fn from_clip(clip: &Clip, completion_rate: f64, now: DateTime<Utc>) -> Self {
        let hours_old = (now - clip.created_at).num_seconds().max(0) as f64 / 3600.0;
        Self {
            reactions: sum_reaction_counts(&clip.reaction_counts),
            listens: clip.listens_count.max(0) as i64,
            replies: clip.reply_count.max(0) as i64,
            remixes: clip.remix_count.max(0) as i64,
            completion_rate,
            is_sensitive: clip.is_sensitive,
            moderation_risk: clip.moderation_risk,
            hours_old,
        }
    }
}

/// Weighted-log engagement factor in [0, 1].
pub fn engagement_factor(inputs: &TrendingInputs) -> f64 {
    let weighted = REACTION_WEIGHT * inputs.reactions.max(0) as f64
        + LISTEN_WEIGHT * inputs.listens.max(0) as f64
        + REPLY_WEIGHT * inputs.replies.max(0) as f64
        + REMIX_WEIGHT * inputs.remixes.max(0) as f64;

    ((1.0 + weighted).ln() / ENGAGEMENT_SATURATION.ln()).min(1.0)
}

/// Exponential freshness decay in (0, 1].
pub fn freshness_factor(hours_old: f64, decay_hours: f64) -> f64 {
    (-hours_old.max(0.0) / decay_hours).exp()
}

/// Quality factor in [0, 1]: completion credit with a floor at 0.5 so a
/// 0%-completion clip keeps half credit, then the sensitivity and
/// moderation-risk penalties.
pub fn quality_factor(inputs: &TrendingInputs, config: &RankingConfig) -> f64 {
    let mut quality = 0.5 + 0.5 * inputs.completion_rate.clamp(0.0, 1.0);

    if inputs.is_sensitive {
        quality *= config.sensitive_penalty;
    }

    match inputs.moderation_risk {
        Some(risk) if risk > 0.0 => {
            quality *= 1.0 - config.risk_penalty * risk.min(1.0);
        }
        _ => {}
    }

    quality
}

pub fn compute_trending_score(inputs: &TrendingInputs, config: &RankingConfig) -> f64 {
    engagement_factor(inputs)
        * freshness_factor(inputs.hours_old, config.freshness_decay_hours)
        * quality_factor(inputs, config)
        * SCORE_SCALE
}

/// Recomputes and persists cached trending scores.
#[derive(Clone)]
pub struct TrendingService {
    pool: PgPool,
    clips: ClipsRepo,
    config: RankingConfig,
}

impl TrendingService {
    pub fn new(pool: PgPool, config: RankingConfig) -> Self {
        Self {
            clips: ClipsRepo::new(pool.clone()),
            pool,
            config,
        }
    }

    /// Recompute one clip's score from its current counters and persist
    /// it. The row is locked for the duration so overlapping recomputes
    /// of the same clip serialize instead of interleaving. A missing
    /// clip scores 0; in a ranking pipeline that is routine, not an error.
    pub async fn recompute_clip(&self, clip_id: Uuid) -> Result<f64> {
        let mut tx = self.pool.begin().await?;

        let Some(clip) = ClipsRepo::get_for_update(&mut tx, clip_id).await? else {
            tx.rollback().await?;
            debug!(clip_id = %clip_id, "Recompute requested for unknown clip");
            return Ok(0.0);
        };

        let score = if clip.is_live() {
            let completion = EngagementRepo::completion_rate_in_tx(&mut tx, clip_id)
                .await?
                .unwrap_or(0.5);
            let inputs = TrendingInputs::from_clip(&clip, completion, Utc::now());
            compute_trending_score(&inputs, &self.config)
        } else {
            0.0
        };

        ClipsRepo::store_score(&mut tx, clip_id, score).await?;
        tx.commit().await?;

        debug!(clip_id = %clip_id, score = score, "Trending score recomputed");

        Ok(score)
    }

    /// Batch refresh over every live clip: freshness decays even without
    /// new engagement. One failed clip is logged and skipped, never
    /// aborting the pass. Returns the number of clips updated.
    pub async fn recompute_all(&self) -> Result<u64> {
        let ids = self.clips.live_clip_ids().await?;
        let mut updated = 0u64;

        for clip_id in ids {
            match self.recompute_clip(clip_id).await {
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!(clip_id = %clip_id, error = %e, "Skipping clip in trending refresh");
                }
            }
        }

        // Topic trending feeds the spotlight boost; refresh it off the
        // clip scores just written.
        if let Err(e) = self.clips.refresh_topic_trending().await {
            warn!(error = %e, "Topic trending refresh failed");
        }

        tracing::info!(updated = updated, "Trending refresh pass completed");

        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RankingConfig {
        RankingConfig::default()
    }

    fn base_inputs() -> TrendingInputs {
        TrendingInputs {
            reactions: 0,
            listens: 0,
            replies: 0,
            remixes: 0,
            completion_rate: 0.5,
            is_sensitive: false,
            moderation_risk: None,
            hours_old: 0.0,
        }
    }

    #[test]
    fn test_zero_engagement_scores_near_zero() {
        let inputs = base_inputs();
        assert_eq!(engagement_factor(&inputs), 0.0);
        assert_eq!(compute_trending_score(&inputs, &test_config()), 0.0);
    }

    #[test]
    fn test_worked_example() {
        // 10 reactions, 5 listens, 2 replies, 100% completion, 1 hour old
        let inputs = TrendingInputs {
            reactions: 10,
            listens: 5,
            replies: 2,
            remixes: 0,
            completion_rate: 1.0,
            is_sensitive: false,
            moderation_risk: None,
            hours_old: 1.0,
        };

        let engagement = engagement_factor(&inputs);
        assert!((engagement - (29.5f64.ln() / 100f64.ln())).abs() < 1e-9);

        let score = compute_trending_score(&inputs, &test_config());
        assert!((score - 676.0).abs() < 5.0, "expected ~676, got {score}");
    }

    #[test]
    fn test_engagement_factor_bounded_for_viral_counts() {
        let inputs = TrendingInputs {
            reactions: 10_000_000,
            listens: 50_000_000,
            replies: 2_000_000,
            remixes: 1_000_000,
            ..base_inputs()
        };
        let factor = engagement_factor(&inputs);
        assert!(factor.is_finite());
        assert_eq!(factor, 1.0);
    }

    #[test]
    fn test_freshness_bounded() {
        assert_eq!(freshness_factor(0.0, 12.0), 1.0);
        assert!(freshness_factor(24.0, 12.0) > 0.0);
        assert!(freshness_factor(24.0, 12.0) < freshness_factor(1.0, 12.0));
        // Negative ages clamp rather than amplify
        assert_eq!(freshness_factor(-5.0, 12.0), 1.0);
    }

    #[test]
    fn test_monotonic_in_each_counter() {
        let config = test_config();
        let base = TrendingInputs {
            reactions: 5,
            listens: 20,
            replies: 2,
            remixes: 1,
            hours_old: 3.0,
            ..base_inputs()
        };
        let base_score = compute_trending_score(&base, &config);

        for bumped in [
            TrendingInputs { reactions: 6, ..base },
            TrendingInputs { listens: 21, ..base },
            TrendingInputs { replies: 3, ..base },
            TrendingInputs { remixes: 2, ..base },
        ] {
            assert!(compute_trending_score(&bumped, &config) >= base_score);
        }
    }

    #[test]
    fn test_older_scores_strictly_lower() {
        let config = test_config();
        let newer = TrendingInputs {
            reactions: 10,
            hours_old: 1.0,
            ..base_inputs()
        };
        let older = TrendingInputs {
            hours_old: 10.0,
            ..newer
        };
        assert!(
            compute_trending_score(&older, &config) < compute_trending_score(&newer, &config)
        );
    }

    #[test]
    fn test_quality_penalties() {
        let config = test_config();
        let clean = TrendingInputs {
            completion_rate: 1.0,
            ..base_inputs()
        };
        assert_eq!(quality_factor(&clean, &config), 1.0);

        let zero_completion = TrendingInputs {
            completion_rate: 0.0,
            ..clean
        };
        assert_eq!(quality_factor(&zero_completion, &config), 0.5);

        let sensitive = TrendingInputs {
            is_sensitive: true,
            ..clean
        };
        assert!((quality_factor(&sensitive, &config) - 0.85).abs() < 1e-9);

        let risky = TrendingInputs {
            moderation_risk: Some(0.5),
            ..clean
        };
        assert!((quality_factor(&risky, &config) - 0.85).abs() < 1e-9);

        // Risk above 1.0 clamps before the penalty applies
        let very_risky = TrendingInputs {
            moderation_risk: Some(7.0),
            ..clean
        };
        assert!((quality_factor(&very_risky, &config) - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_idempotent_for_fixed_inputs() {
        let config = test_config();
        let inputs = TrendingInputs {
            reactions: 42,
            listens: 100,
            replies: 7,
            remixes: 3,
            hours_old: 6.5,
            ..base_inputs()
        };
        let a = compute_trending_score(&inputs, &config);
        let b = compute_trending_score(&inputs, &config);
        assert_eq!(a.to_bits(), b.to_bits());
    }
}
