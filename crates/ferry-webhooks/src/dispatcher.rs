//! Webhook delivery with signing and bounded retry.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use tracing::{debug, warn};

use ferry_core::events::{EventPayload, SessionEvent, SessionSummary};
use ferry_core::retry::calculate_backoff_delay;
use ferry_core::{CostState, SessionId, SessionStatus, WebhookConfig};
use ferry_settings::DeliverySettings;

type HmacSha256 = Hmac<Sha256>;

/// Outcome of delivering one payload to one endpoint.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryResult {
    /// Endpoint URL.
    pub url: String,
    /// Whether a 2xx response was received before the attempt cap.
    pub delivered: bool,
    /// Last HTTP status observed, if any response arrived.
    pub status: Option<u16>,
    /// Attempts made (1-based).
    pub attempts: u32,
    /// Last error message on failure.
    pub error: Option<String>,
}

/// Dispatches lifecycle events to registered endpoints.
pub struct WebhookDispatcher {
    client: reqwest::Client,
    settings: DeliverySettings,
}

impl WebhookDispatcher {
    /// Build a dispatcher with the given delivery settings.
    #[must_use]
    pub fn new(settings: DeliverySettings) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_millis(settings.timeout_ms))
            .build()
            .unwrap_or_default();
        Self { client, settings }
    }

    /// Deliver an event to every subscribed config, concurrently.
    ///
    /// Configs whose event set excludes the fired event are skipped.
    /// Delivery failures never propagate — each endpoint's outcome is in
    /// its [`DeliveryResult`].
    pub async fn dispatch(
        &self,
        configs: &[WebhookConfig],
        event: SessionEvent,
        payload: &EventPayload,
    ) -> Vec<DeliveryResult> {
        let targets: Vec<&WebhookConfig> = configs
            .iter()
            .filter(|config| config.should_fire(event.name()))
            .collect();
        if targets.is_empty() {
            return Vec::new();
        }

        let deliveries = targets
            .into_iter()
            .map(|config| self.send_with_retry(config, event, payload));
        futures::future::join_all(deliveries).await
    }

    /// Send a synthetic `webhook.test` event to one endpoint.
    ///
    /// Bypasses the config's event filter — the caller is testing the
    /// endpoint, not the subscription.
    pub async fn test_delivery(&self, config: &WebhookConfig) -> DeliveryResult {
        let summary = SessionSummary {
            session_id: SessionId::from("sess-webhook-test"),
            status: SessionStatus::Created,
            pause_reason: None,
            stage_progress: std::collections::BTreeMap::new(),
            overall_percentage: 0.0,
            cost: CostState::new("none"),
            manual_fixes_pending: 0,
            notes: Vec::new(),
        };
        let payload = EventPayload::new(SessionEvent::Test, summary);
        self.send_with_retry(config, SessionEvent::Test, &payload).await
    }

    async fn send_with_retry(
        &self,
        config: &WebhookConfig,
        event: SessionEvent,
        payload: &EventPayload,
    ) -> DeliveryResult {
        let body = match serde_json::to_vec(payload) {
            Ok(body) => body,
            Err(err) => {
                return DeliveryResult {
                    url: config.url.clone(),
                    delivered: false,
                    status: None,
                    attempts: 0,
                    error: Some(format!("payload serialization failed: {err}")),
                };
            }
        };
        let signature = config
            .secret_token
            .as_deref()
            .and_then(|secret| sign_payload(secret, &body));

        let mut last_status: Option<u16> = None;
        let mut last_error: Option<String> = None;

        for attempt in 1..=self.settings.max_attempts.max(1) {
            if attempt > 1 {
                let delay_ms = calculate_backoff_delay(
                    attempt - 2,
                    self.settings.base_delay_ms,
                    self.settings.base_delay_ms * 16,
                    0.0,
                );
                tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
            }

            let mut request = self
                .client
                .post(&config.url)
                .header("Content-Type", "application/json")
                .header("X-Webhook-Event", event.name())
                .header("X-Webhook-Attempt", attempt.to_string());
            for (key, value) in &config.headers {
                request = request.header(key, value);
            }
            if let Some(signature) = &signature {
                request = request.header("X-Webhook-Signature", signature);
            }

            match request.body(body.clone()).send().await {
                Ok(response) => {
                    let status = response.status();
                    last_status = Some(status.as_u16());
                    if status.is_success() {
                        debug!(url = %config.url, attempt, "webhook delivered");
                        return DeliveryResult {
                            url: config.url.clone(),
                            delivered: true,
                            status: last_status,
                            attempts: attempt,
                            error: None,
                        };
                    }
                    last_error = Some(format!("endpoint returned {status}"));
                    warn!(url = %config.url, attempt, %status, "webhook delivery rejected");
                }
                Err(err) => {
                    last_error = Some(err.to_string());
                    warn!(url = %config.url, attempt, error = %err, "webhook delivery failed");
                }
            }
        }

        warn!(
            url = %config.url,
            attempts = self.settings.max_attempts,
            "webhook delivery exhausted retries"
        );
        DeliveryResult {
            url: config.url.clone(),
            delivered: false,
            status: last_status,
            attempts: self.settings.max_attempts.max(1),
            error: last_error,
        }
    }
}

impl std::fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// HMAC-SHA256 over the serialized payload, hex-encoded.
fn sign_payload(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    let digest = mac.finalize().into_bytes();
    Some(digest.iter().map(|b| format!("{b:02x}")).collect())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
