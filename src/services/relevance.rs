//! Personalized relevance scoring
//!
//! Layers per-viewer affinity bonuses on top of the trending base. The
//! bonuses are additive, not multiplicative: any subset of signals may
//! apply, and a missing affinity must not zero the whole score. The
//! result is a ranking key, not a probability; sums above 1.0 are fine.

use sqlx::PgPool;
use uuid::Uuid;

use crate::config::RankingConfig;
use crate::db::{ClipsRepo, EngagementRepo};
use crate::error::Result;
use crate::models::Clip;

/// Affinity signals for one (viewer, clip) pair, loaded at scoring time.
/// Nothing here is persisted between calls.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewerAffinity {
    pub follows_topic: bool,
    pub follows_creator: bool,
    /// Viewer's completion percentage (0..100) on this exact clip.
    pub own_completion_pct: Option<f64>,
    /// Viewer's average completion percentage (0..100) on the creator's
    /// other clips in the recent window.
    pub creator_completion_pct: Option<f64>,
}

/// Weighted additive relevance. `affinity` is `None` for anonymous
/// viewers, whose score is exactly the weighted trending base so it
/// stays comparable across items.
pub fn relevance_score(
    trending_score: f64,
    affinity: Option<&ViewerAffinity>,
    config: &RankingConfig,
) -> f64 {
    let base = (trending_score / 1000.0).clamp(0.0, 1.0);
    let mut score = config.trending_weight * base;

    let Some(affinity) = affinity else {
        return score;
    };

    if affinity.follows_topic {
        score += config.topic_follow_bonus;
    }

    if affinity.follows_creator {
        score += config.creator_follow_bonus;
    }

    if let Some(pct) = affinity.own_completion_pct {
        if pct > config.completion_threshold_pct {
            score += config.own_completion_bonus * (pct / 100.0);
        }
    }

    if let Some(pct) = affinity.creator_completion_pct {
        if pct > config.completion_threshold_pct {
            score += config.similar_creator_bonus * (pct / 100.0);
        }
    }

    score
}

#[derive(Clone)]
pub struct RelevanceService {
    clips: ClipsRepo,
    engagement: EngagementRepo,
    config: RankingConfig,
}

impl RelevanceService {
    pub fn new(pool: PgPool, config: RankingConfig) -> Self {
        Self {
            clips: ClipsRepo::new(pool.clone()),
            engagement: EngagementRepo::new(pool),
            config,
        }
    }

    /// Relevance of one clip for an optional viewer. A missing or
    /// non-live clip scores 0; a viewer with no history simply collects
    /// no bonuses. Neither case is an error.
    pub async fn relevance(&self, clip_id: Uuid, viewer: Option<Uuid>) -> Result<f64> {
        let Some(clip) = self.clips.get(clip_id).await? else {
            return Ok(0.0);
        };

        if !clip.is_live() {
            return Ok(0.0);
        }

        let affinity = match viewer {
            Some(profile_id) => Some(self.load_affinity(&clip, profile_id).await?),
            None => None,
        };

        Ok(relevance_score(
            clip.trending_score,
            affinity.as_ref(),
            &self.config,
        ))
    }

    /// Query the viewer's follow/subscription/history signals for a clip.
    pub async fn load_affinity(&self, clip: &Clip, viewer: Uuid) -> Result<ViewerAffinity> {
        let follows_topic = match clip.topic_id {
            Some(topic_id) => self.engagement.follows_topic(viewer, topic_id).await?,
            None => false,
        };

        let follows_creator = self
            .engagement
            .follows_creator(viewer, clip.profile_id)
            .await?;

        let own_completion_pct = self.engagement.own_completion_pct(viewer, clip.id).await?;

        let creator_completion_pct = self
            .engagement
            .creator_completion_pct(
                viewer,
                clip.profile_id,
                clip.id,
                self.config.history_window_days,
            )
            .await?;

        Ok(ViewerAffinity {
            follows_topic,
            follows_creator,
            own_completion_pct,
            creator_completion_pct,
        })
    }

    /// Score a clip already in hand (feed path: candidates are loaded in
    /// bulk, then scored one by one).
    pub fn score_loaded(&self, clip: &Clip, affinity: Option<&ViewerAffinity>) -> f64 {
        relevance_score(clip.trending_score, affinity, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> RankingConfig {
        RankingConfig::default()
    }

    #[test]
    fn test_anonymous_floor_exact() {
        let config = config();
        for trending in [0.0, 250.0, 676.0, 1000.0, 5000.0] {
            let expected = 0.4 * (trending / 1000.0f64).min(1.0);
            assert_eq!(relevance_score(trending, None, &config), expected);
        }
    }

    #[test]
    fn test_no_history_equals_anonymous() {
        let config = config();
        let empty = ViewerAffinity::default();
        assert_eq!(
            relevance_score(500.0, Some(&empty), &config),
            relevance_score(500.0, None, &config)
        );
    }

    #[test]
    fn test_affinity_additivity() {
        let config = config();
        let neither = relevance_score(500.0, Some(&ViewerAffinity::default()), &config);
        let both = relevance_score(
            500.0,
            Some(&ViewerAffinity {
                follows_topic: true,
                follows_creator: true,
                ..Default::default()
            }),
            &config,
        );
        assert!((both - neither - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_own_completion_threshold() {
        let config = config();
        let below = ViewerAffinity {
            own_completion_pct: Some(70.0),
            ..Default::default()
        };
        let above = ViewerAffinity {
            own_completion_pct: Some(90.0),
            ..Default::default()
        };

        // 70% does not exceed the threshold; 90% earns 0.2 * 0.9
        assert_eq!(
            relevance_score(0.0, Some(&below), &config),
            relevance_score(0.0, None, &config)
        );
        assert!((relevance_score(0.0, Some(&above), &config) - 0.18).abs() < 1e-9);
    }

    #[test]
    fn test_similar_creator_bonus() {
        let config = config();
        let affinity = ViewerAffinity {
            creator_completion_pct: Some(80.0),
            ..Default::default()
        };
        assert!((relevance_score(0.0, Some(&affinity), &config) - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_total_may_exceed_one() {
        let config = config();
        let all = ViewerAffinity {
            follows_topic: true,
            follows_creator: true,
            own_completion_pct: Some(100.0),
            creator_completion_pct: Some(100.0),
        };
        let score = relevance_score(2000.0, Some(&all), &config);
        assert!(score > 1.0);
        assert!((score - (0.4 + 0.3 + 0.2 + 0.2 + 0.1)).abs() < 1e-9);
    }

    #[test]
    fn test_base_clamped_to_unit_range() {
        let config = config();
        // Scores far past the scale still clamp the base term to 1.0
        assert_eq!(relevance_score(1_000_000.0, None, &config), 0.4);
        // Negative cached scores clamp to 0
        assert_eq!(relevance_score(-42.0, None, &config), 0.0);
    }
}
