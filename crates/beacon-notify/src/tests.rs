use crate::channels::{EmailChannel, LogChannel, NotificationChannel, SmtpConfig, WebhookChannel};
use crate::{ActionChannel, ActionDispatcher, AlertNotice, AlertPhase, NotifyError};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use beacon_common::types::{AlertAction, AlertEvent, Severity};
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

fn sample_event() -> AlertEvent {
    AlertEvent {
        id: "alert-1".into(),
        rule_id: "cpu-high".into(),
        rule_name: "CPU high".into(),
        metric_name: "cpu.usage".into(),
        value: 97.5,
        threshold: 90.0,
        severity: Severity::High,
        message: "cpu.usage is 97.50, above threshold 90.00".into(),
        timestamp: Utc::now(),
        resolved: None,
        duration_ms: None,
    }
}

#[derive(Default)]
struct RecordingChannel {
    seen: Mutex<Vec<(String, AlertPhase)>>,
}

#[async_trait]
impl ActionChannel for RecordingChannel {
    fn kind(&self) -> &str {
        "log"
    }

    async fn send(&self, action: &AlertAction, notice: &AlertNotice) -> Result<()> {
        self.seen.lock().push((action.kind().to_string(), notice.phase));
        Ok(())
    }
}

struct FailingChannel;

#[async_trait]
impl ActionChannel for FailingChannel {
    fn kind(&self) -> &str {
        "webhook"
    }

    async fn send(&self, _action: &AlertAction, _notice: &AlertNotice) -> Result<()> {
        Err(anyhow!("endpoint down"))
    }
}

#[test]
fn headline_mentions_phase_and_rule() {
    let mut event = sample_event();
    let triggered = AlertNotice::triggered(event.clone());
    assert!(triggered.headline().contains("CPU high"));
    assert!(!triggered.headline().contains("RESOLVED"));

    event.resolve(event.timestamp + ChronoDuration::seconds(5));
    let resolved = AlertNotice::resolved(event);
    assert!(resolved.headline().contains("RESOLVED"));
    assert_eq!(resolved.phase.to_string(), "resolved");
}

#[tokio::test]
async fn failing_action_does_not_stop_siblings() {
    let dispatcher = ActionDispatcher::new();
    let recorder = Arc::new(RecordingChannel::default());
    dispatcher.register(recorder.clone());
    dispatcher.register(Arc::new(FailingChannel));

    let actions = vec![
        AlertAction::Webhook {
            url: "http://127.0.0.1:1/hook".into(),
        },
        AlertAction::Log,
    ];
    let handles = dispatcher.dispatch(&AlertNotice::triggered(sample_event()), &actions);
    assert_eq!(handles.len(), 2);
    for handle in handles {
        handle.await.unwrap();
    }

    let seen = recorder.seen.lock();
    assert_eq!(seen.as_slice(), &[("log".to_string(), AlertPhase::Triggered)]);
}

#[tokio::test]
async fn unregistered_kind_is_skipped() {
    let dispatcher = ActionDispatcher::new();
    dispatcher.register(Arc::new(RecordingChannel::default()));

    let actions = vec![AlertAction::Email {
        to: vec!["ops@example.com".into()],
    }];
    assert!(dispatcher
        .dispatch(&AlertNotice::triggered(sample_event()), &actions)
        .is_empty());
}

#[test]
fn dispatch_outside_runtime_is_a_no_op() {
    let dispatcher = ActionDispatcher::new();
    dispatcher.register(Arc::new(LogChannel));
    assert!(dispatcher
        .dispatch(&AlertNotice::triggered(sample_event()), &[AlertAction::Log])
        .is_empty());
}

#[tokio::test]
async fn register_replaces_channel_of_same_kind() {
    let dispatcher = ActionDispatcher::new();
    assert!(dispatcher.register(Arc::new(LogChannel)).is_none());
    let replaced = dispatcher.register(Arc::new(RecordingChannel::default()));
    assert!(replaced.is_some());
    assert_eq!(dispatcher.kinds(), vec!["log"]);
}

#[tokio::test]
async fn builtin_channels_skip_email_without_smtp() {
    let (dispatcher, _rx) = ActionDispatcher::with_builtin_channels(None).unwrap();
    assert_eq!(dispatcher.kinds(), vec!["log", "notification", "webhook"]);
    assert!(!dispatcher.has_channel("email"));
}

#[tokio::test]
async fn notification_channel_forwards_to_receiver() {
    let (channel, mut rx) = NotificationChannel::new();
    let action = AlertAction::Notification {
        channel: "ops".into(),
    };
    channel
        .send(&action, &AlertNotice::triggered(sample_event()))
        .await
        .unwrap();

    let message = rx.recv().await.unwrap();
    assert_eq!(message.channel, "ops");
    assert_eq!(message.notice.event.rule_id, "cpu-high");

    drop(rx);
    let err = channel
        .send(&action, &AlertNotice::triggered(sample_event()))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<NotifyError>(), Some(NotifyError::SinkClosed)));
}

#[tokio::test]
async fn channels_reject_foreign_actions() {
    let notice = AlertNotice::triggered(sample_event());
    let err = LogChannel
        .send(&AlertAction::Webhook { url: "http://x".into() }, &notice)
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<NotifyError>(),
        Some(NotifyError::ActionMismatch { .. })
    ));

    let webhook = WebhookChannel::new(Duration::from_secs(1)).unwrap();
    assert!(webhook.send(&AlertAction::Log, &notice).await.is_err());
}

#[tokio::test]
async fn webhook_posts_json_payload() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let request = read_http_request(&mut socket).await;
        socket
            .write_all(b"HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n")
            .await
            .unwrap();
        request
    });

    let webhook = WebhookChannel::new(Duration::from_secs(5)).unwrap();
    let action = AlertAction::Webhook {
        url: format!("http://{addr}/hooks/alerts"),
    };
    webhook
        .send(&action, &AlertNotice::triggered(sample_event()))
        .await
        .unwrap();

    let request = server.await.unwrap();
    assert!(request.starts_with("POST /hooks/alerts"));
    let body = request.split("\r\n\r\n").nth(1).unwrap();
    let json: serde_json::Value = serde_json::from_str(body).unwrap();
    assert_eq!(json["rule_id"], "cpu-high");
    assert_eq!(json["status"], "triggered");
    assert_eq!(json["severity"], "high");
}

#[tokio::test]
async fn webhook_gives_up_after_three_attempts() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let webhook = WebhookChannel::new(Duration::from_millis(500))
        .unwrap()
        .with_backoff_base(Duration::from_millis(1));
    let action = AlertAction::Webhook {
        url: format!("http://{addr}/hook"),
    };
    let err = webhook
        .send(&action, &AlertNotice::triggered(sample_event()))
        .await
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<NotifyError>(), Some(NotifyError::Http(_))));
}

#[tokio::test]
async fn email_rejects_bad_recipient_before_connecting() {
    let config = SmtpConfig {
        host: "127.0.0.1".into(),
        port: 2525,
        username: None,
        password: None,
        from: "beacon@example.com".into(),
        insecure: true,
    };
    let channel = EmailChannel::new(&config).unwrap();
    let err = channel
        .send(
            &AlertAction::Email {
                to: vec!["not an address".into()],
            },
            &AlertNotice::triggered(sample_event()),
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<NotifyError>(),
        Some(NotifyError::InvalidAddress(_))
    ));
}

#[test]
fn email_config_requires_valid_sender() {
    let config: SmtpConfig = serde_json::from_str(r#"{"host": "smtp.example.com", "from": "nope"}"#).unwrap();
    assert_eq!(config.port, 587);
    assert!(EmailChannel::new(&config).is_err());
}

async fn read_http_request(socket: &mut tokio::net::TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let n = socket.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        let text = String::from_utf8_lossy(&buf);
        if let Some(header_end) = text.find("\r\n\r\n") {
            let content_length = text[..header_end]
                .lines()
                .find_map(|line| {
                    let (name, value) = line.split_once(':')?;
                    name.eq_ignore_ascii_case("content-length")
                        .then(|| value.trim().parse::<usize>().ok())
                        .flatten()
                })
                .unwrap_or(0);
            if buf.len() >= header_end + 4 + content_length {
                break;
            }
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}
