//! Notification dispatch - how the author hears the knock.
//!
//! Delivery is fire-and-forget from the orchestrator's perspective: a failed
//! send is logged and dropped, never retried, and never blocks the next
//! character.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;

use story_rules::{Dimension, WoundArchetype};

use crate::error::NotifyError;

/// At most this many elevated dimensions appear in the summary line.
const SUMMARY_LIMIT: usize = 3;

/// Payload describing one knock.
#[derive(Debug, Clone, Serialize)]
pub struct KnockNotification {
    pub character_name: String,
    pub archetype: WoundArchetype,
    pub accent_color: String,
    pub knock_message: String,
    pub wound: String,
    /// Elevated dimensions at knock time, highest first.
    pub elevated: Vec<(Dimension, u8)>,
    /// e.g. `"fear reached 8/10"`.
    pub trigger_event: String,
    /// Where the author can open the session.
    pub session_url: String,
}

impl KnockNotification {
    /// Compact state summary, e.g. `"fear 8/10 · shame 7/10"`.
    pub fn summary_line(&self) -> String {
        self.elevated
            .iter()
            .take(SUMMARY_LIMIT)
            .map(|(dim, value)| format!("{} {}/10", dim, value))
            .collect::<Vec<_>>()
            .join(" \u{b7} ")
    }
}

/// A channel that can deliver knocks to the author.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, notification: &KnockNotification) -> Result<(), NotifyError>;
}

/// Notifier that surfaces knocks through the log stream.
#[derive(Debug, Default)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn send(&self, notification: &KnockNotification) -> Result<(), NotifyError> {
        tracing::info!(
            character = %notification.character_name,
            trigger = %notification.trigger_event,
            state = %notification.summary_line(),
            knock = %notification.knock_message,
            "knock"
        );
        Ok(())
    }
}

/// Notifier that POSTs the payload as JSON to a configured endpoint.
pub struct WebhookNotifier {
    client: Client,
    url: String,
}

impl WebhookNotifier {
    /// Create a notifier targeting `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, notification: &KnockNotification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| NotifyError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Http(response.status().as_u16()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notification() -> KnockNotification {
        KnockNotification {
            character_name: "Reyna Voss".to_string(),
            archetype: WoundArchetype::Business,
            accent_color: WoundArchetype::Business.accent_color().to_string(),
            knock_message: "I found out what they actually budgeted. Again.".to_string(),
            wound: "An information gap cost someone real money.".to_string(),
            elevated: vec![
                (Dimension::Shame, 8),
                (Dimension::Betrayal, 7),
                (Dimension::Fear, 6),
                (Dimension::Longing, 6),
            ],
            trigger_event: "shame reached 8/10".to_string(),
            session_url: "/sessions".to_string(),
        }
    }

    #[test]
    fn test_summary_line_caps_at_three() {
        let line = notification().summary_line();
        assert_eq!(line, "shame 8/10 \u{b7} betrayal 7/10 \u{b7} fear 6/10");
    }

    #[test]
    fn test_payload_serializes() {
        let json = serde_json::to_value(notification()).unwrap();
        assert_eq!(json["character_name"], "Reyna Voss");
        assert_eq!(json["archetype"], "business");
        assert_eq!(json["accent_color"], "#B8962E");
    }

    #[tokio::test]
    async fn test_tracing_notifier_never_fails() {
        assert!(TracingNotifier.send(&notification()).await.is_ok());
    }
}
