use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

/// Chat API endpoint used when none is configured.
pub const DEFAULT_CHAT_API_URL: &str = "https://slack.com/api/chat.postMessage";

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("webhook returned status {0}, expected 200")]
    UnexpectedStatus(StatusCode),
    #[error("chat api rejected message: {0}")]
    Rejected(String),
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<(), NotifyError>;

    /// False for sinks that drop every message without delivering it.
    fn delivers(&self) -> bool {
        true
    }
}

/// Posts `{"text": ...}` to an incoming-webhook URL.
#[derive(Debug, Clone)]
pub struct WebhookAlerter {
    client: Client,
    url: Url,
}

impl WebhookAlerter {
    pub fn new(url: Url, timeout: Duration) -> Self {
        Self {
            client: crate::http_client(timeout),
            url,
        }
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    text: &'a str,
}

#[async_trait::async_trait]
impl Notifier for WebhookAlerter {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.url.clone())
            .json(&WebhookPayload { text: message })
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(NotifyError::UnexpectedStatus(status));
        }
        Ok(())
    }
}

/// Sends messages through an authenticated chat API call
/// (`chat.postMessage` style: bearer token, channel, username, text).
#[derive(Debug, Clone)]
pub struct ChatApiAlerter {
    client: Client,
    api_url: Url,
    token: String,
    channel: String,
    username: String,
}

impl ChatApiAlerter {
    pub fn new(
        api_url: Url,
        token: String,
        channel: String,
        username: String,
        timeout: Duration,
    ) -> Self {
        Self {
            client: crate::http_client(timeout),
            api_url,
            token,
            channel,
            username,
        }
    }
}

#[derive(Serialize)]
struct ChatPostMessage<'a> {
    channel: &'a str,
    username: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatApiResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait::async_trait]
impl Notifier for ChatApiAlerter {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(&self.token)
            .json(&ChatPostMessage {
                channel: &self.channel,
                username: &self.username,
                text: message,
            })
            .send()
            .await?
            .error_for_status()?
            .json::<ChatApiResponse>()
            .await?;

        if !response.ok {
            return Err(NotifyError::Rejected(
                response.error.unwrap_or_else(|| "unknown error".to_owned()),
            ));
        }
        Ok(())
    }
}

/// The transport selected for this process. Exactly one is active.
#[derive(Debug, Clone, Default)]
pub enum Alerter {
    /// Notifications are turned off; messages are only logged by the caller.
    #[default]
    Disabled,
    Webhook(WebhookAlerter),
    ChatApi(ChatApiAlerter),
}

impl Alerter {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, Alerter::Disabled)
    }

    pub fn transport_name(&self) -> &'static str {
        match self {
            Alerter::Disabled => "disabled",
            Alerter::Webhook(_) => "webhook",
            Alerter::ChatApi(_) => "chat-api",
        }
    }
}

#[async_trait::async_trait]
impl Notifier for Alerter {
    async fn send(&self, message: &str) -> Result<(), NotifyError> {
        match self {
            Alerter::Disabled => {
                debug!(message_len = message.len(), "notifications disabled, dropping message");
                Ok(())
            }
            Alerter::Webhook(alerter) => alerter.send(message).await,
            Alerter::ChatApi(alerter) => alerter.send(message).await,
        }
    }

    fn delivers(&self) -> bool {
        self.is_enabled()
    }
}
