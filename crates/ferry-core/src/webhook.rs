//! Webhook endpoint configuration.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A registered webhook endpoint.
///
/// Configs are keyed by URL; registering the same URL twice replaces the
/// earlier config.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebhookConfig {
    /// Endpoint URL.
    pub url: String,
    /// Extra headers sent with every delivery.
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    /// Event names this endpoint subscribes to. Empty means all events.
    #[serde(default)]
    pub events: Vec<String>,
    /// Shared secret used to HMAC-sign payloads, when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_token: Option<String>,
}

impl WebhookConfig {
    /// A config subscribed to all events with no extra headers.
    #[must_use]
    pub fn for_url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: BTreeMap::new(),
            events: Vec::new(),
            secret_token: None,
        }
    }

    /// Whether this endpoint subscribes to the given event name.
    #[must_use]
    pub fn should_fire(&self, event_name: &str) -> bool {
        if self.events.is_empty() {
            return true;
        }
        self.events.iter().any(|e| e.eq_ignore_ascii_case(event_name))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
