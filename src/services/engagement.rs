//! Engagement aggregation: reduces raw interaction facts for one clip
//! to the scalar counts the scorers consume.

use sqlx::PgPool;
use uuid::Uuid;

use crate::db::{ClipsRepo, EngagementRepo};
use crate::error::Result;
use crate::models::EngagementSummary;

/// Sum every emoji bucket in a reaction-count map. Non-object maps,
/// non-numeric buckets, and negative values all count as zero.
pub fn sum_reaction_counts(counts: &serde_json::Value) -> i64 {
    match counts.as_object() {
        Some(map) => map
            .values()
            .map(|v| v.as_i64().unwrap_or(0).max(0))
            .sum(),
        None => 0,
    }
}

/// Read-only reducer over a clip's interaction facts.
#[derive(Clone)]
pub struct EngagementAggregator {
    clips: ClipsRepo,
    engagement: EngagementRepo,
}

impl EngagementAggregator {
    pub fn new(pool: PgPool) -> Self {
        Self {
            clips: ClipsRepo::new(pool.clone()),
            engagement: EngagementRepo::new(pool),
        }
    }

    /// Aggregate one clip. A clip with no engagement (or no clip at all)
    /// reduces to the all-zero summary; absence is routine here.
    pub async fn summarize(&self, clip_id: Uuid) -> Result<EngagementSummary> {
        let Some(clip) = self.clips.get(clip_id).await? else {
            return Ok(EngagementSummary::default());
        };

        let completion_rate = self.engagement.completion_rate(clip_id).await?;

        Ok(EngagementSummary {
            listens: clip.listens_count as i64,
            reaction_total: sum_reaction_counts(&clip.reaction_counts),
            reply_count: clip.reply_count as i64,
            remix_count: clip.remix_count as i64,
            completion_rate,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sum_reactions() {
        let counts = json!({"🔥": 10, "❤️": 5, "😂": 3});
        assert_eq!(sum_reaction_counts(&counts), 18);
    }

    #[test]
    fn test_sum_reactions_empty() {
        assert_eq!(sum_reaction_counts(&json!({})), 0);
    }

    #[test]
    fn test_sum_reactions_malformed_values() {
        // Strings, floats, nulls, and negatives must not error or inflate
        let counts = json!({"🔥": "lots", "❤️": 2, "😂": null, "👏": -4, "🎧": 1.5});
        assert_eq!(sum_reaction_counts(&counts), 2);
    }

    #[test]
    fn test_sum_reactions_not_an_object() {
        assert_eq!(sum_reaction_counts(&json!([1, 2, 3])), 0);
        assert_eq!(sum_reaction_counts(&json!("nope")), 0);
        assert_eq!(sum_reaction_counts(&json!(null)), 0);
    }
}
