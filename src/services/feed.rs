//! Feed assembly: candidate generation, scoring, filtering, pagination
//!
//! The candidate pre-filter (recent OR already trending) trades a small
//! amount of recall for bounded computation; the pool is capped at
//! 3 × (limit + offset) to give the post-filter headroom. If filtering
//! undershoots the requested page size the feed returns fewer rows
//! rather than running a second query round.

use sqlx::PgPool;
use tracing::debug;
use uuid::Uuid;

use crate::config::{FeedConfig, RankingConfig};
use crate::db::ClipsRepo;
use crate::error::Result;
use crate::models::{Clip, FeedEntry};
use crate::services::relevance::RelevanceService;

const POOL_MULTIPLIER: i64 = 3;

#[derive(Clone)]
pub struct FeedService {
    clips: ClipsRepo,
    relevance: RelevanceService,
    config: FeedConfig,
}

impl FeedService {
    pub fn new(pool: PgPool, ranking: RankingConfig, config: FeedConfig) -> Self {
        Self {
            clips: ClipsRepo::new(pool.clone()),
            relevance: RelevanceService::new(pool, ranking),
            config,
        }
    }

    /// Ranked feed page for an optional viewer. Limit and offset are
    /// clamped rather than rejected; that holds for this endpoint only,
    /// not as a general policy.
    pub async fn feed(
        &self,
        viewer: Option<Uuid>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FeedEntry>> {
        let limit = limit.clamp(1, self.config.max_limit);
        let offset = offset.max(0);
        let pool_size = POOL_MULTIPLIER * (limit + offset);

        let candidates = self
            .clips
            .feed_candidates(
                self.config.candidate_window_hours,
                self.config.trending_threshold,
                pool_size,
            )
            .await?;

        let candidate_count = candidates.len();
        let mut scored: Vec<(Clip, f64)> = Vec::with_capacity(candidate_count);

        for clip in candidates {
            let affinity = match viewer {
                Some(profile_id) => Some(self.relevance.load_affinity(&clip, profile_id).await?),
                None => None,
            };

            let score = self.relevance.score_loaded(&clip, affinity.as_ref());
            if score > 0.0 {
                scored.push((clip, score));
            }
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.0.created_at.cmp(&a.0.created_at))
        });

        let page: Vec<FeedEntry> = scored
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .map(|(clip, score)| FeedEntry {
                clip_id: clip.id,
                score,
                created_at: clip.created_at,
            })
            .collect();

        debug!(
            candidates = candidate_count,
            returned = page.len(),
            anonymous = viewer.is_none(),
            "Feed assembled"
        );

        Ok(page)
    }

    /// Global trending view: live clips by cached score, no
    /// personalization.
    pub async fn trending(&self, limit: i64) -> Result<Vec<FeedEntry>> {
        let limit = limit.clamp(1, self.config.max_limit);
        let clips = self.clips.top_trending(limit).await?;

        Ok(clips
            .into_iter()
            .map(|clip| FeedEntry {
                clip_id: clip.id,
                score: clip.trending_score,
                created_at: clip.created_at,
            })
            .collect())
    }
}
