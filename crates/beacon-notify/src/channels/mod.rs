pub mod email;
pub mod log;
pub mod notification;
pub mod webhook;

pub use self::email::{EmailChannel, SmtpConfig};
pub use self::log::LogChannel;
pub use self::notification::{ChannelMessage, NotificationChannel};
pub use self::webhook::WebhookChannel;

use crate::NotifyError;
use beacon_common::types::AlertAction;

pub(crate) fn mismatch(channel: &str, action: &AlertAction) -> NotifyError {
    NotifyError::ActionMismatch {
        channel: channel.to_string(),
        action: action.kind().to_string(),
    }
}
