//! Sliding-window and cooldown gating for write-heavy actions
//!
//! Keeps engagement data trustworthy by capping how fast one profile
//! can upload, react, or edit. Counters live in Redis; when Redis is
//! slow or absent the guard fails open with a warning; rate limiting
//! must never become an availability dependency.

use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;
use uuid::Uuid;

use crate::config::RateLimitConfig;
use crate::error::{AppError, Result};

const REDIS_TIMEOUT_MS: u64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardedAction {
    ClipUpload,
    Engagement,
    ProfileEdit,
}

impl GuardedAction {
    fn key_part(&self) -> &'static str {
        match self {
            GuardedAction::ClipUpload => "upload",
            GuardedAction::Engagement => "engage",
            GuardedAction::ProfileEdit => "profile_edit",
        }
    }
}

#[derive(Clone)]
pub struct RateGuard {
    redis: Option<ConnectionManager>,
    config: RateLimitConfig,
}

impl RateGuard {
    pub fn new(redis: Option<ConnectionManager>, config: RateLimitConfig) -> Self {
        Self { redis, config }
    }

    /// Count this action against the profile's window. Returns
    /// `RateLimited` only on a definite over-limit answer; Redis
    /// errors and timeouts allow the action through.
    pub async fn check(&self, action: GuardedAction, profile_id: Uuid) -> Result<()> {
        let Some(redis) = &self.redis else {
            return Ok(());
        };

        let outcome = timeout(
            Duration::from_millis(REDIS_TIMEOUT_MS),
            self.consume(redis, action, profile_id),
        )
        .await;

        match outcome {
            Ok(Ok(true)) => Err(AppError::RateLimited(format!(
                "Too many {} actions, try again later",
                action.key_part()
            ))),
            Ok(Ok(false)) => Ok(()),
            Ok(Err(e)) => {
                warn!(error = %e, "Rate guard Redis error, allowing action");
                Ok(())
            }
            Err(_) => {
                warn!("Rate guard Redis timeout ({REDIS_TIMEOUT_MS}ms), allowing action");
                Ok(())
            }
        }
    }

    /// Returns Ok(true) when the limit is exceeded.
    async fn consume(
        &self,
        redis: &ConnectionManager,
        action: GuardedAction,
        profile_id: Uuid,
    ) -> redis::RedisResult<bool> {
        let mut conn = redis.clone();

        match action {
            GuardedAction::ProfileEdit => {
                // Cooldown: one edit per window, enforced with SET NX
                let key = format!("murmur:cooldown:{}:{}", action.key_part(), profile_id);
                let acquired: bool = redis::cmd("SET")
                    .arg(&key)
                    .arg(1)
                    .arg("NX")
                    .arg("EX")
                    .arg(self.config.profile_edit_cooldown_secs)
                    .query_async(&mut conn)
                    .await
                    .map(|v: Option<String>| v.is_some())?;

                Ok(!acquired)
            }
            _ => {
                let (max, window_secs) = match action {
                    GuardedAction::ClipUpload => (
                        self.config.upload_max_per_window,
                        self.config.upload_window_secs,
                    ),
                    _ => (
                        self.config.engagement_max_per_window,
                        self.config.engagement_window_secs,
                    ),
                };

                let key = format!("murmur:rate:{}:{}", action.key_part(), profile_id);
                let count: u32 = conn.incr(&key, 1).await?;

                if count == 1 {
                    let _: bool = conn.expire(&key, window_secs as i64).await?;
                }

                Ok(count > max)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_fails_open_without_redis() {
        let guard = RateGuard::new(
            None,
            RateLimitConfig {
                upload_max_per_window: 1,
                upload_window_secs: 60,
                engagement_max_per_window: 1,
                engagement_window_secs: 60,
                profile_edit_cooldown_secs: 60,
            },
        );

        for _ in 0..5 {
            assert!(guard
                .check(GuardedAction::Engagement, Uuid::new_v4())
                .await
                .is_ok());
        }
    }
}
