use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Clip lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipStatus {
    Draft,
    Processing,
    Live,
    Removed,
}

impl ClipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ClipStatus::Draft => "draft",
            ClipStatus::Processing => "processing",
            ClipStatus::Live => "live",
            ClipStatus::Removed => "removed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(ClipStatus::Draft),
            "processing" => Some(ClipStatus::Processing),
            "live" => Some(ClipStatus::Live),
            "removed" => Some(ClipStatus::Removed),
            _ => None,
        }
    }
}

impl std::fmt::Display for ClipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Moderation workflow state. `resolved` and `actioned` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModerationState {
    Pending,
    InReview,
    Resolved,
    Actioned,
}

impl ModerationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationState::Pending => "pending",
            ModerationState::InReview => "in_review",
            ModerationState::Resolved => "resolved",
            ModerationState::Actioned => "actioned",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(ModerationState::Pending),
            "in_review" => Some(ModerationState::InReview),
            "resolved" => Some(ModerationState::Resolved),
            "actioned" => Some(ModerationState::Actioned),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ModerationState::Resolved | ModerationState::Actioned)
    }
}

impl std::fmt::Display for ModerationState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a moderation item came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModerationSource {
    Ai,
    User,
    Manual,
}

impl ModerationSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ModerationSource::Ai => "ai",
            ModerationSource::User => "user",
            ModerationSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ai" => Some(ModerationSource::Ai),
            "user" => Some(ModerationSource::User),
            "manual" => Some(ModerationSource::Manual),
            _ => None,
        }
    }
}

/// A published audio clip with its cached engagement counters.
///
/// `trending_score` is derived state: a pure function of the counters,
/// age, and quality flags at the time of the last recompute.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Clip {
    pub id: Uuid,
    pub profile_id: Uuid,
    pub topic_id: Option<Uuid>,
    pub parent_clip_id: Option<Uuid>,
    pub status: String,
    pub listens_count: i32,
    pub reaction_counts: serde_json::Value,
    pub reply_count: i32,
    pub remix_count: i32,
    pub is_sensitive: bool,
    pub moderation_risk: Option<f64>,
    pub trending_score: f64,
    pub score_computed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Clip {
    pub fn is_live(&self) -> bool {
        ClipStatus::parse(&self.status) == Some(ClipStatus::Live) && self.deleted_at.is_none()
    }
}

/// Scalar engagement aggregate for one clip
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EngagementSummary {
    pub listens: i64,
    pub reaction_total: i64,
    pub reply_count: i64,
    pub remix_count: i64,
    /// Average completion across listens that recorded one, in [0, 1].
    /// `None` when no listen recorded a completion percentage.
    pub completion_rate: Option<f64>,
}

impl EngagementSummary {
    pub fn completion_or(&self, default: f64) -> f64 {
        self.completion_rate.unwrap_or(default)
    }
}

/// A community question attached to a topic, eligible for the spotlight
/// when top-level and not deleted. `spotlight_score` is recomputed
/// synchronously on every mutation that touches an input.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Question {
    pub id: Uuid,
    pub topic_id: Uuid,
    pub author_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub body: String,
    pub upvote_count: i32,
    pub reply_count: i32,
    pub answered: bool,
    pub spotlight_score: f64,
    pub last_reply_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

/// A flag or report in the moderation queue
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModerationItem {
    pub id: Uuid,
    pub target_kind: String,
    pub target_id: Uuid,
    pub source: String,
    pub priority: i32,
    pub state: String,
    pub assigned_to: Option<Uuid>,
    pub notes: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,
    pub reviewed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit row for a moderation item
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ModerationHistoryEntry {
    pub id: Uuid,
    pub item_id: Uuid,
    pub action: String,
    pub before_state: Option<String>,
    pub after_state: Option<String>,
    pub actor_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// One ranked feed entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedEntry {
    pub clip_id: Uuid,
    pub score: f64,
    pub created_at: DateTime<Utc>,
}

/// Aggregate moderation-queue statistics for a window
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationStats {
    pub reviewed_in_window: i64,
    pub avg_review_hours: Option<f64>,
    pub high_risk_pending: i64,
    pub older_than_24h: i64,
    pub by_source: Vec<BucketCount>,
    pub by_kind: Vec<BucketCount>,
    pub by_state: Vec<BucketCount>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct BucketCount {
    pub bucket: String,
    pub count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_moderation_state_parse() {
        assert_eq!(
            ModerationState::parse("in_review"),
            Some(ModerationState::InReview)
        );
        assert_eq!(ModerationState::parse("escalated"), None);
        assert_eq!(ModerationState::parse(""), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ModerationState::Resolved.is_terminal());
        assert!(ModerationState::Actioned.is_terminal());
        assert!(!ModerationState::Pending.is_terminal());
        assert!(!ModerationState::InReview.is_terminal());
    }

    #[test]
    fn test_clip_status_roundtrip() {
        for status in [
            ClipStatus::Draft,
            ClipStatus::Processing,
            ClipStatus::Live,
            ClipStatus::Removed,
        ] {
            assert_eq!(ClipStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_completion_default() {
        let summary = EngagementSummary::default();
        assert_eq!(summary.completion_or(0.5), 0.5);
        let with_rate = EngagementSummary {
            completion_rate: Some(0.9),
            ..Default::default()
        };
        assert_eq!(with_rate.completion_or(0.5), 0.9);
    }
}
