//! # ferry-webhooks
//!
//! Structured lifecycle event delivery to registered HTTP endpoints.
//!
//! Each registered [`WebhookConfig`] whose event set includes the fired
//! event receives the JSON payload, HMAC-SHA256-signed when the config
//! carries a secret. Non-2xx responses and transport errors retry with
//! exponential backoff up to a fixed attempt cap; exhaustion is logged and
//! reported in the [`DeliveryResult`], never escalated to the session.
//!
//! [`WebhookConfig`]: ferry_core::WebhookConfig

#![deny(unsafe_code)]

mod dispatcher;

pub use dispatcher::{DeliveryResult, WebhookDispatcher};
