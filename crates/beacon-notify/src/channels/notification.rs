use crate::{ActionChannel, AlertNotice, NotifyError};
use anyhow::Result;
use async_trait::async_trait;
use beacon_common::types::AlertAction;
use serde::Serialize;
use tokio::sync::mpsc;

/// A notice addressed to a named in-process channel.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelMessage {
    pub channel: String,
    pub notice: AlertNotice,
}

/// Forwards notification actions to an in-process receiver, for embedding
/// applications that route alerts themselves.
pub struct NotificationChannel {
    sink: mpsc::UnboundedSender<ChannelMessage>,
}

impl NotificationChannel {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ChannelMessage>) {
        let (sink, rx) = mpsc::unbounded_channel();
        (Self { sink }, rx)
    }
}

#[async_trait]
impl ActionChannel for NotificationChannel {
    fn kind(&self) -> &str {
        "notification"
    }

    async fn send(&self, action: &AlertAction, notice: &AlertNotice) -> Result<()> {
        let AlertAction::Notification { channel } = action else {
            return Err(super::mismatch(self.kind(), action).into());
        };
        self.sink
            .send(ChannelMessage {
                channel: channel.clone(),
                notice: notice.clone(),
            })
            .map_err(|_| NotifyError::SinkClosed)?;
        Ok(())
    }
}
