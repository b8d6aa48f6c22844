//! Fire-and-forget notification dispatch
//!
//! Downstream delivery (push, digest email) is someone else's problem;
//! this service posts the event payload to a webhook and moves on. A
//! slow or failing receiver must never block or fail the scoring or
//! moderation operation that produced the event.

use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::NotifierConfig;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum NotifierEvent {
    SpotlightSelected {
        question_id: Uuid,
        topic_id: Uuid,
    },
    ModerationUpdated {
        item_id: Uuid,
        action: String,
        state: String,
    },
}

#[derive(Clone)]
pub struct Notifier {
    client: reqwest::Client,
    config: NotifierConfig,
}

impl Notifier {
    pub fn new(config: NotifierConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Spawn the delivery and return immediately. Failures are logged
    /// and swallowed; the caller has already committed its own work.
    pub fn dispatch(&self, event: NotifierEvent) {
        if !self.config.enabled || self.config.webhook_url.is_empty() {
            debug!(?event, "Notifier disabled, dropping event");
            return;
        }

        let client = self.client.clone();
        let url = self.config.webhook_url.clone();

        tokio::spawn(async move {
            match client.post(&url).json(&event).send().await {
                Ok(response) if !response.status().is_success() => {
                    warn!(
                        status = %response.status(),
                        ?event,
                        "Notification webhook rejected event"
                    );
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, ?event, "Notification dispatch failed");
                }
            }
        });
    }
}
