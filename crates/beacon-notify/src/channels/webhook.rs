use crate::{ActionChannel, AlertNotice, NotifyError};
use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::AlertAction;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

/// POSTs a JSON description of the alert to the action's URL.
pub struct WebhookChannel {
    client: reqwest::Client,
    backoff_base: Duration,
}

impl WebhookChannel {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(concat!("beacon/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            backoff_base: Duration::from_millis(100),
        })
    }

    /// Base delay before the second attempt; doubled for each later one.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    pub fn payload(notice: &AlertNotice) -> serde_json::Value {
        let event = &notice.event;
        serde_json::json!({
            "alert_id": event.id,
            "rule_id": event.rule_id,
            "rule_name": event.rule_name,
            "metric": event.metric_name,
            "severity": event.severity.to_string(),
            "message": event.message,
            "value": event.value,
            "threshold": event.threshold,
            "timestamp": event.timestamp.to_rfc3339(),
            "resolved_at": event.resolved.map(|t| t.to_rfc3339()),
            "duration_ms": event.duration_ms,
            "status": notice.phase.to_string(),
        })
    }

    async fn post_once(&self, url: &str, body: &serde_json::Value) -> std::result::Result<(), NotifyError> {
        let resp = self.client.post(url).json(body).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::HttpStatus {
                url: url.to_string(),
                status: status.as_u16(),
            })
        }
    }
}

#[async_trait]
impl ActionChannel for WebhookChannel {
    fn kind(&self) -> &str {
        "webhook"
    }

    async fn send(&self, action: &AlertAction, notice: &AlertNotice) -> Result<()> {
        let AlertAction::Webhook { url } = action else {
            return Err(super::mismatch(self.kind(), action).into());
        };
        let body = Self::payload(notice);

        let mut last_err = None;
        for attempt in 0..MAX_ATTEMPTS {
            match self.post_once(url, &body).await {
                Ok(()) => {
                    tracing::debug!(url = %url, alert_id = %notice.event.id, "Webhook delivered");
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        url = %url,
                        error = %e,
                        "Webhook send failed, retrying"
                    );
                    last_err = Some(e);
                }
            }
            if attempt + 1 < MAX_ATTEMPTS {
                tokio::time::sleep(self.backoff_base * 2u32.pow(attempt)).await;
            }
        }

        let err = last_err.unwrap_or(NotifyError::InvalidConfig("no attempts made".into()));
        tracing::error!(url = %url, error = %err, "Webhook failed after {MAX_ATTEMPTS} attempts");
        Err(err.into())
    }
}
