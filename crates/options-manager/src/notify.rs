//! Trade notifications.

use anyhow::{Context, Result};
use async_trait::async_trait;
use orbfib_core::{NotificationsConfig, Notifier, NotifyChannel};
use serde_json::json;
use std::time::Duration;
use tracing::{info, warn};

/// Logs every notification instead of delivering it.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, channel: NotifyChannel, message: &str) -> Result<()> {
        info!(?channel, message, "Notification");
        Ok(())
    }
}

/// Posts Slack messages to an incoming webhook.
///
/// Email has no transport here: messages to a configured recipient are
/// logged. An unset webhook or recipient skips that channel.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
    slack_webhook: String,
    email_to: String,
    from_email: String,
}

impl WebhookNotifier {
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: &NotificationsConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            slack_webhook: config.slack_webhook.clone(),
            email_to: config.email_to.clone(),
            from_email: config.from_email.clone(),
        })
    }

    async fn post_slack(&self, message: &str) -> Result<()> {
        if self.slack_webhook.is_empty() {
            info!("Slack webhook not configured; skipping notification");
            return Ok(());
        }
        self.client
            .post(&self.slack_webhook)
            .json(&json!({ "text": message }))
            .send()
            .await
            .context("Slack webhook request failed")?
            .error_for_status()
            .context("Slack webhook returned an error status")?;
        Ok(())
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn notify(&self, channel: NotifyChannel, message: &str) -> Result<()> {
        match channel {
            NotifyChannel::Slack => self.post_slack(message).await,
            NotifyChannel::Email => {
                if self.email_to.is_empty() {
                    info!("Email recipient missing; skipping notification");
                } else {
                    info!(to = self.email_to, from = self.from_email, message, "Email");
                }
                Ok(())
            }
        }
    }
}

/// Delivers a notification, logging instead of returning failures.
pub async fn notify_quietly(notifier: &dyn Notifier, channel: NotifyChannel, message: &str) {
    if let Err(e) = notifier.notify(channel, message).await {
        warn!(?channel, error = %e, "Notification failed");
    }
}
