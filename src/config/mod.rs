use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub ranking: RankingConfig,
    pub feed: FeedConfig,
    pub spotlight: SpotlightConfig,
    pub moderation: ModerationConfig,
    pub notifier: NotifierConfig,
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub env: String,
    pub port: u16,
    pub service_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub enabled: bool,
}

/// Tunable scoring constants. The anonymous scale and the trending base
/// weight are the same knob seen from two sides; they default to 0.4 but
/// are not a product invariant, so they stay configurable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingConfig {
    pub freshness_decay_hours: f64,
    pub sensitive_penalty: f64,
    pub risk_penalty: f64,
    pub trending_weight: f64,
    pub topic_follow_bonus: f64,
    pub creator_follow_bonus: f64,
    pub own_completion_bonus: f64,
    pub similar_creator_bonus: f64,
    pub completion_threshold_pct: f64,
    pub history_window_days: i64,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            freshness_decay_hours: 12.0,
            sensitive_penalty: 0.85,
            risk_penalty: 0.3,
            trending_weight: 0.4,
            topic_follow_bonus: 0.3,
            creator_follow_bonus: 0.2,
            own_completion_bonus: 0.2,
            similar_creator_bonus: 0.1,
            completion_threshold_pct: 70.0,
            history_window_days: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    pub candidate_window_hours: i64,
    pub trending_threshold: f64,
    pub max_limit: i64,
    pub refresh_interval_secs: u64,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            candidate_window_hours: 72,
            trending_threshold: 50.0,
            max_limit: 100,
            refresh_interval_secs: 900,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpotlightConfig {
    pub rotation_pool_size: i64,
    pub cache_ttl_secs: u64,
}

impl Default for SpotlightConfig {
    fn default() -> Self {
        Self {
            rotation_pool_size: 3,
            cache_ttl_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModerationConfig {
    pub escalation_after_hours: i64,
    pub escalation_step: i32,
    pub priority_cap: i32,
    pub sweep_interval_secs: u64,
}

impl Default for ModerationConfig {
    fn default() -> Self {
        Self {
            escalation_after_hours: 24,
            escalation_step: 10,
            priority_cap: 100,
            sweep_interval_secs: 3600,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifierConfig {
    pub webhook_url: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub upload_max_per_window: u32,
    pub upload_window_secs: u64,
    pub engagement_max_per_window: u32,
    pub engagement_window_secs: u64,
    pub profile_edit_cooldown_secs: u64,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

fn parse_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenv::dotenv().ok();

        Ok(Self {
            app: AppConfig {
                env: env_or("APP_ENV", "development"),
                port: parse_or("APP_PORT", 8090),
                service_name: env_or("SERVICE_NAME", "curation-service"),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
                max_connections: parse_or("DB_MAX_CONNECTIONS", 20),
            },
            redis: RedisConfig {
                url: env_or("REDIS_URL", "redis://127.0.0.1:6379"),
                enabled: parse_or("REDIS_ENABLED", true),
            },
            ranking: RankingConfig {
                freshness_decay_hours: parse_or("RANKING_FRESHNESS_DECAY_HOURS", 12.0),
                sensitive_penalty: parse_or("RANKING_SENSITIVE_PENALTY", 0.85),
                risk_penalty: parse_or("RANKING_RISK_PENALTY", 0.3),
                trending_weight: parse_or("RANKING_TRENDING_WEIGHT", 0.4),
                topic_follow_bonus: parse_or("RANKING_TOPIC_BONUS", 0.3),
                creator_follow_bonus: parse_or("RANKING_CREATOR_BONUS", 0.2),
                own_completion_bonus: parse_or("RANKING_OWN_COMPLETION_BONUS", 0.2),
                similar_creator_bonus: parse_or("RANKING_SIMILAR_CREATOR_BONUS", 0.1),
                completion_threshold_pct: parse_or("RANKING_COMPLETION_THRESHOLD", 70.0),
                history_window_days: parse_or("RANKING_HISTORY_WINDOW_DAYS", 30),
            },
            feed: FeedConfig {
                candidate_window_hours: parse_or("FEED_CANDIDATE_WINDOW_HOURS", 72),
                trending_threshold: parse_or("FEED_TRENDING_THRESHOLD", 50.0),
                max_limit: parse_or("FEED_MAX_LIMIT", 100),
                refresh_interval_secs: parse_or("TRENDING_REFRESH_INTERVAL_SECS", 900),
            },
            spotlight: SpotlightConfig {
                rotation_pool_size: parse_or("SPOTLIGHT_ROTATION_POOL", 3),
                cache_ttl_secs: parse_or("SPOTLIGHT_CACHE_TTL_SECS", 300),
            },
            moderation: ModerationConfig {
                escalation_after_hours: parse_or("MODERATION_ESCALATION_AFTER_HOURS", 24),
                escalation_step: parse_or("MODERATION_ESCALATION_STEP", 10),
                priority_cap: parse_or("MODERATION_PRIORITY_CAP", 100),
                sweep_interval_secs: parse_or("MODERATION_SWEEP_INTERVAL_SECS", 3600),
            },
            notifier: NotifierConfig {
                webhook_url: env_or("NOTIFIER_WEBHOOK_URL", ""),
                enabled: parse_or("NOTIFIER_ENABLED", false),
            },
            rate_limit: RateLimitConfig {
                upload_max_per_window: parse_or("RATE_UPLOAD_MAX", 10),
                upload_window_secs: parse_or("RATE_UPLOAD_WINDOW_SECS", 3600),
                engagement_max_per_window: parse_or("RATE_ENGAGEMENT_MAX", 120),
                engagement_window_secs: parse_or("RATE_ENGAGEMENT_WINDOW_SECS", 60),
                profile_edit_cooldown_secs: parse_or("RATE_PROFILE_EDIT_COOLDOWN_SECS", 300),
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        env::set_var("DATABASE_URL", "postgres://test");
        let config = Config::from_env().unwrap();
        assert_eq!(config.app.port, 8090);
        assert_eq!(config.ranking.trending_weight, 0.4);
        assert_eq!(config.moderation.priority_cap, 100);
        assert_eq!(config.spotlight.rotation_pool_size, 3);
    }
}
