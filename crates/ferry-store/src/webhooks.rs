//! Webhook config registry, keyed by URL.

use rusqlite::{params, OptionalExtension};

use ferry_core::WebhookConfig;

use crate::errors::Result;
use crate::Store;

impl Store {
    /// Register (or replace) a webhook config.
    pub fn upsert_webhook(&self, config: &WebhookConfig) -> Result<()> {
        let conn = self.conn()?;
        let now = ferry_core::now_rfc3339();
        let _ = conn.execute(
            "INSERT INTO webhook_configs
                 (url, headers_json, events_json, secret_token, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?5)
             ON CONFLICT(url) DO UPDATE SET
                 headers_json = excluded.headers_json,
                 events_json = excluded.events_json,
                 secret_token = excluded.secret_token,
                 updated_at = excluded.updated_at",
            params![
                config.url,
                serde_json::to_string(&config.headers)?,
                serde_json::to_string(&config.events)?,
                config.secret_token,
                now,
            ],
        )?;
        Ok(())
    }

    /// Look up a webhook config by URL.
    pub fn get_webhook(&self, url: &str) -> Result<Option<WebhookConfig>> {
        let conn = self.conn()?;
        let row = conn
            .query_row(
                "SELECT url, headers_json, events_json, secret_token
                 FROM webhook_configs WHERE url = ?1",
                params![url],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                    ))
                },
            )
            .optional()?;
        row.map(decode_webhook_row).transpose()
    }

    /// List every registered webhook config.
    pub fn list_webhooks(&self) -> Result<Vec<WebhookConfig>> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT url, headers_json, events_json, secret_token
             FROM webhook_configs ORDER BY url",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
            ))
        })?;
        let mut out = Vec::new();
        for row in rows {
            out.push(decode_webhook_row(row?)?);
        }
        Ok(out)
    }

    /// Remove a webhook config. Returns whether anything was deleted.
    pub fn delete_webhook(&self, url: &str) -> Result<bool> {
        let conn = self.conn()?;
        let deleted = conn.execute("DELETE FROM webhook_configs WHERE url = ?1", params![url])?;
        Ok(deleted > 0)
    }
}

fn decode_webhook_row(
    (url, headers_json, events_json, secret_token): (String, String, String, Option<String>),
) -> Result<WebhookConfig> {
    Ok(WebhookConfig {
        url,
        headers: serde_json::from_str(&headers_json)?,
        events: serde_json::from_str(&events_json)?,
        secret_token,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
