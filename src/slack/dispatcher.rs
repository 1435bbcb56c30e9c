use std::fmt;
use std::time::Duration;

use log::{info, warn};
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, StatusCode};
use url::Url;

use crate::config::WebhookConfig;
use crate::error::{NotifierError, Result};

use super::payload::NotificationPayload;

/// Acknowledgment reported when Slack accepted a notification.
pub const ACK: &str = "posted to slack";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ack;

impl fmt::Display for Ack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(ACK)
    }
}

/// Posts notification payloads to a Slack incoming webhook.
///
/// One POST per call, never retried. Only HTTP 200 counts as delivered.
pub struct WebhookDispatcher {
    client: Client,
    url: Url,
    dry_run: bool,
}

impl WebhookDispatcher {
    /// Creates a dispatcher for the configured webhook.
    ///
    /// # Errors
    ///
    /// Returns `Config` if the webhook URL is missing, empty or not an
    /// absolute http(s) URL.
    pub fn new(config: &WebhookConfig) -> Result<Self> {
        let raw = config
            .url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .ok_or_else(|| NotifierError::Config("webhook URL is required".to_string()))?;

        let url = Url::parse(raw)
            .map_err(|e| NotifierError::Config(format!("Invalid webhook URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(NotifierError::Config(format!(
                "Webhook URL must be http or https, got {}",
                url.scheme()
            )));
        }

        let client = Client::builder()
            .user_agent(concat!("pipeline-notify/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| NotifierError::Config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            url,
            dry_run: false,
        })
    }

    /// Print payloads to stdout instead of posting them.
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Sends one payload to the webhook.
    ///
    /// # Errors
    ///
    /// `DeliveryStatus` for any response other than 200, `DeliveryTransport`
    /// when the request could not be completed.
    pub async fn post_notification(&self, payload: &NotificationPayload) -> Result<Ack> {
        let body = serde_json::to_vec(payload)?;

        if self.dry_run {
            println!("{}", serde_json::to_string_pretty(payload)?);
            info!("[DRY-RUN] Would post to {}", self.host());
            return Ok(Ack);
        }

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotifierError::DeliveryTransport(e.to_string()))?;

        let status = response.status();
        if status != StatusCode::OK {
            warn!("Webhook {} answered {}", self.host(), status);
            return Err(NotifierError::DeliveryStatus(status.as_u16()));
        }

        info!("Notification delivered to {}", self.host());
        Ok(Ack)
    }

    /// Webhook host, safe to log (the path carries the secret).
    fn host(&self) -> &str {
        self.url.host_str().unwrap_or("webhook")
    }
}

impl fmt::Debug for WebhookDispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookDispatcher")
            .field("host", &self.host())
            .field("dry_run", &self.dry_run)
            .finish()
    }
}
