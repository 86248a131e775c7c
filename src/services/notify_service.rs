use std::sync::Mutex;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use crate::{error::DispatchError, models::AlertConfig};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Email,
    Push,
    Telegram,
}

impl Channel {
    pub fn label(self) -> &'static str {
        match self {
            Channel::Email => "Email",
            Channel::Push => "Push",
            Channel::Telegram => "Telegram",
        }
    }

    pub fn from_slug(s: &str) -> Option<Channel> {
        match s.to_lowercase().as_str() {
            "email" => Some(Channel::Email),
            "push" => Some(Channel::Push),
            "telegram" => Some(Channel::Telegram),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelCredentials {
    pub bot_token: String,
    pub chat_id: String,
}

/// Outbound notifications: test alerts and channel handshakes.
#[async_trait]
pub trait NotificationDispatch: Send + Sync {
    async fn send_test_alert(&self, channel: Channel, config: &AlertConfig) -> Result<(), DispatchError>;

    async fn connect_channel(
        &self,
        channel: Channel,
        credentials: &ChannelCredentials,
    ) -> Result<(), DispatchError>;
}

#[derive(Deserialize)]
struct TelegramReply {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram goes straight to the Bot API; email and push are handed to a JSON webhook.
pub struct HttpDispatcher {
    client: reqwest::Client,
    telegram_api_base: String,
    webhook_url: Option<String>,
}

impl HttpDispatcher {
    pub fn new(telegram_api_base: impl Into<String>, webhook_url: Option<String>) -> Self {
        HttpDispatcher {
            client: reqwest::Client::new(),
            telegram_api_base: telegram_api_base.into().trim_end_matches('/').to_string(),
            webhook_url,
        }
    }

    fn bot_url(&self, token: &str, method: &str) -> String {
        format!("{}/bot{}/{}", self.telegram_api_base, token, method)
    }

    async fn check_telegram(res: reqwest::Response) -> Result<(), DispatchError> {
        let status = res.status();
        let reply: TelegramReply = res.json().await?;
        if status.is_success() && reply.ok {
            Ok(())
        } else {
            Err(DispatchError::Rejected {
                channel: Channel::Telegram.label(),
                reason: reply.description.unwrap_or_else(|| status.to_string()),
            })
        }
    }

    async fn post_webhook(&self, channel: Channel, body: serde_json::Value) -> Result<(), DispatchError> {
        let Some(url) = self.webhook_url.as_deref() else {
            return Err(DispatchError::ChannelUnavailable(channel.label()));
        };

        self.client
            .post(url)
            .json(&body)
            .send()
            .await?
            .error_for_status()?;

        Ok(())
    }
}

#[async_trait]
impl NotificationDispatch for HttpDispatcher {
    async fn send_test_alert(&self, channel: Channel, config: &AlertConfig) -> Result<(), DispatchError> {
        let text = format!("Test {} alert from Portfolio Tracker", channel.label());

        match channel {
            Channel::Telegram => {
                let (token, chat_id) = config
                    .telegram_credentials()
                    .ok_or(DispatchError::MissingCredentials(channel.label()))?;

                let res = self
                    .client
                    .post(self.bot_url(token, "sendMessage"))
                    .json(&json!({ "chat_id": chat_id, "text": text }))
                    .send()
                    .await?;

                Self::check_telegram(res).await
            }
            Channel::Email => {
                let to = config
                    .email_address
                    .as_deref()
                    .ok_or(DispatchError::MissingCredentials(channel.label()))?;

                self.post_webhook(
                    channel,
                    json!({ "channel": "email", "to": to, "subject": "Test alert", "text": text }),
                )
                .await
            }
            Channel::Push => {
                self.post_webhook(channel, json!({ "channel": "push", "text": text }))
                    .await
            }
        }
    }

    async fn connect_channel(
        &self,
        channel: Channel,
        credentials: &ChannelCredentials,
    ) -> Result<(), DispatchError> {
        if channel != Channel::Telegram {
            return Err(DispatchError::ChannelUnavailable(channel.label()));
        }

        let res = self
            .client
            .get(self.bot_url(&credentials.bot_token, "getMe"))
            .send()
            .await?;

        Self::check_telegram(res).await
    }
}

/// Keeps every request in memory instead of delivering it. Backs the in-memory
/// storage mode and the tests.
#[derive(Default)]
pub struct RecordingDispatcher {
    sent: Mutex<Vec<Channel>>,
    connects: Mutex<Vec<ChannelCredentials>>,
    fail_with: Mutex<Option<String>>,
}

impl RecordingDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every later call fail with `reason`.
    pub fn fail_with(&self, reason: &str) {
        if let Ok(mut f) = self.fail_with.lock() {
            *f = Some(reason.to_string());
        }
    }

    pub fn sent(&self) -> Vec<Channel> {
        self.sent.lock().map(|s| s.clone()).unwrap_or_default()
    }

    pub fn connects(&self) -> Vec<ChannelCredentials> {
        self.connects.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn check(&self, channel: Channel) -> Result<(), DispatchError> {
        match self.fail_with.lock().ok().and_then(|f| f.clone()) {
            Some(reason) => Err(DispatchError::Rejected { channel: channel.label(), reason }),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationDispatch for RecordingDispatcher {
    async fn send_test_alert(&self, channel: Channel, _config: &AlertConfig) -> Result<(), DispatchError> {
        self.check(channel)?;
        if let Ok(mut s) = self.sent.lock() {
            s.push(channel);
        }
        tracing::info!("recorded test {} alert", channel.label());
        Ok(())
    }

    async fn connect_channel(
        &self,
        channel: Channel,
        credentials: &ChannelCredentials,
    ) -> Result<(), DispatchError> {
        self.check(channel)?;
        if let Ok(mut c) = self.connects.lock() {
            c.push(credentials.clone());
        }
        Ok(())
    }
}
