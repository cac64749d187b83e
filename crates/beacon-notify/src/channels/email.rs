use crate::{ActionChannel, AlertNotice, AlertPhase, NotifyError};
use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::AlertAction;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Deserialize;
use std::time::Duration;

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Clone, Deserialize)]
pub struct SmtpConfig {
    pub host: String,
    #[serde(default = "default_smtp_port")]
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    pub from: String,
    /// Plain connection without TLS, for local relays only.
    #[serde(default)]
    pub insecure: bool,
}

fn default_smtp_port() -> u16 {
    587
}

pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &SmtpConfig) -> Result<Self> {
        if config.host.trim().is_empty() {
            return Err(NotifyError::InvalidConfig("smtp host must not be empty".into()).into());
        }
        let from: Mailbox = config
            .from
            .parse()
            .map_err(|_| NotifyError::InvalidAddress(config.from.clone()))?;

        let mut builder = if config.insecure {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
                .map_err(|e| NotifyError::Smtp(e.to_string()))?
        };
        builder = builder.port(config.port).timeout(Some(Duration::from_secs(10)));

        if let (Some(user), Some(pass)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(user.clone(), pass.clone()));
        }

        Ok(Self {
            transport: builder.build(),
            from,
        })
    }

    fn subject(notice: &AlertNotice) -> String {
        let tag = match notice.phase {
            AlertPhase::Triggered => "",
            AlertPhase::Resolved => "[RESOLVED]",
        };
        format!(
            "[beacon][{}]{} {}",
            notice.event.severity, tag, notice.event.rule_name
        )
    }

    fn body(notice: &AlertNotice) -> String {
        let event = &notice.event;
        let mut body = format!(
            "Alert: {severity} ({phase})\nRule: {rule}\nMetric: {metric}\nValue: {value:.2}\nThreshold: {threshold:.2}\nMessage: {message}\nTime: {time}",
            severity = event.severity,
            phase = notice.phase,
            rule = event.rule_name,
            metric = event.metric_name,
            value = event.value,
            threshold = event.threshold,
            message = event.message,
            time = event.timestamp.to_rfc3339(),
        );
        if let (Some(resolved), Some(ms)) = (event.resolved, event.duration_ms) {
            body.push_str(&format!("\nResolved: {} (after {ms}ms)", resolved.to_rfc3339()));
        }
        body
    }

    fn build_messages(&self, to: &[String], notice: &AlertNotice) -> Result<Vec<(String, Message)>> {
        let subject = Self::subject(notice);
        let body = Self::body(notice);
        to.iter()
            .map(|recipient| {
                let mailbox: Mailbox = recipient
                    .parse()
                    .map_err(|_| NotifyError::InvalidAddress(recipient.clone()))?;
                let message = Message::builder()
                    .from(self.from.clone())
                    .to(mailbox)
                    .subject(&subject)
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.clone())
                    .map_err(|e| NotifyError::Smtp(e.to_string()))?;
                Ok((recipient.clone(), message))
            })
            .collect()
    }
}

#[async_trait]
impl ActionChannel for EmailChannel {
    fn kind(&self) -> &str {
        "email"
    }

    async fn send(&self, action: &AlertAction, notice: &AlertNotice) -> Result<()> {
        let AlertAction::Email { to } = action else {
            return Err(super::mismatch(self.kind(), action).into());
        };
        let messages = self.build_messages(to, notice)?;

        let mut failed = Vec::new();
        for (recipient, email) in messages {
            let mut last_err = None;
            for attempt in 0..MAX_ATTEMPTS {
                match self.transport.send(email.clone()).await {
                    Ok(_) => {
                        last_err = None;
                        break;
                    }
                    Err(e) => {
                        tracing::warn!(
                            attempt = attempt + 1,
                            recipient = %recipient,
                            error = %e,
                            "Email send failed, retrying"
                        );
                        last_err = Some(e);
                        if attempt + 1 < MAX_ATTEMPTS {
                            tokio::time::sleep(Duration::from_millis(100 * 2u64.pow(attempt))).await;
                        }
                    }
                }
            }
            if let Some(e) = last_err {
                tracing::error!(recipient = %recipient, error = %e, "Email send failed after {MAX_ATTEMPTS} attempts");
                failed.push(recipient);
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Smtp(format!("delivery failed for {}", failed.join(", "))).into())
        }
    }
}
