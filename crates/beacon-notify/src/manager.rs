use crate::channels::{ChannelMessage, EmailChannel, LogChannel, NotificationChannel, SmtpConfig, WebhookChannel};
use crate::{ActionChannel, AlertNotice};
use beacon_common::types::AlertAction;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Routes alert actions to the channel registered for their kind.
pub struct ActionDispatcher {
    channels: RwLock<HashMap<String, Arc<dyn ActionChannel>>>,
}

impl Default for ActionDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ActionDispatcher {
    /// An empty dispatcher; every action is dropped until a channel is registered.
    pub fn new() -> Self {
        Self {
            channels: RwLock::new(HashMap::new()),
        }
    }

    /// A dispatcher with log, webhook and notification channels, plus email
    /// when `smtp` is configured. Returns the receiving end of the
    /// notification channel.
    pub fn with_builtin_channels(
        smtp: Option<&SmtpConfig>,
    ) -> anyhow::Result<(Self, mpsc::UnboundedReceiver<ChannelMessage>)> {
        let dispatcher = Self::new();
        dispatcher.register(Arc::new(LogChannel));
        dispatcher.register(Arc::new(WebhookChannel::new(WEBHOOK_TIMEOUT)?));
        let (notification, rx) = NotificationChannel::new();
        dispatcher.register(Arc::new(notification));
        if let Some(smtp) = smtp {
            dispatcher.register(Arc::new(EmailChannel::new(smtp)?));
        }
        Ok((dispatcher, rx))
    }

    /// Register a channel, replacing any channel of the same kind.
    pub fn register(&self, channel: Arc<dyn ActionChannel>) -> Option<Arc<dyn ActionChannel>> {
        let kind = channel.kind().to_string();
        tracing::debug!(kind = %kind, "Action channel registered");
        self.channels.write().insert(kind, channel)
    }

    pub fn has_channel(&self, kind: &str) -> bool {
        self.channels.read().contains_key(kind)
    }

    pub fn kinds(&self) -> Vec<String> {
        let mut kinds: Vec<String> = self.channels.read().keys().cloned().collect();
        kinds.sort();
        kinds
    }

    /// Deliver `notice` through every action, one task per action.
    ///
    /// Failures are logged per action and never reach the caller. Returns
    /// the spawned handles; dropping them does not cancel delivery. Outside
    /// a tokio runtime nothing is sent.
    pub fn dispatch(&self, notice: &AlertNotice, actions: &[AlertAction]) -> Vec<JoinHandle<()>> {
        if actions.is_empty() {
            return Vec::new();
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(alert_id = %notice.event.id, "No async runtime, alert actions skipped");
            return Vec::new();
        };

        let channels = self.channels.read();
        let mut handles = Vec::with_capacity(actions.len());
        for action in actions {
            let Some(channel) = channels.get(action.kind()).cloned() else {
                tracing::warn!(
                    kind = action.kind(),
                    rule_id = %notice.event.rule_id,
                    "No channel registered for alert action"
                );
                continue;
            };
            let action = action.clone();
            let notice = notice.clone();
            handles.push(runtime.spawn(async move {
                if let Err(e) = channel.send(&action, &notice).await {
                    tracing::error!(
                        kind = action.kind(),
                        alert_id = %notice.event.id,
                        rule_id = %notice.event.rule_id,
                        error = %e,
                        "Alert action failed"
                    );
                }
            }));
        }
        handles
    }
}
