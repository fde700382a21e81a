use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, error, info};

use crate::config::TelegramConfig;

/// Text formatting mode understood by the Bot API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ParseMode {
    #[serde(rename = "HTML")]
    Html,
}

/// One message to deliver.
#[derive(Debug, Clone, PartialEq)]
pub struct OutboundMessage {
    pub chat_id: String,
    pub text: String,
    pub parse_mode: ParseMode,
    pub disable_web_page_preview: bool,
}

impl OutboundMessage {
    /// An HTML message with link previews turned off.
    pub fn html(chat_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            chat_id: chat_id.into(),
            text: text.into(),
            parse_mode: ParseMode::Html,
            disable_web_page_preview: true,
        }
    }
}

/// How the chat API answered a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    Delivered,
    Rejected { status: StatusCode },
}

/// Delivers formatted messages to a chat. Transport failures are errors;
/// a non-2xx answer is a [`DeliveryOutcome::Rejected`].
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryOutcome>;
}

#[derive(Debug, Serialize)]
struct SendMessageForm<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: ParseMode,
    disable_web_page_preview: bool,
}

/// Bot API `sendMessage` over a form-encoded POST.
pub struct TelegramNotifier {
    client: reqwest::Client,
    api_base_url: String,
    bot_token: String,
}

impl TelegramNotifier {
    pub fn new(config: &TelegramConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
        })
    }

    fn send_message_url(&self) -> String {
        format!("{}/bot{}/sendMessage", self.api_base_url, self.bot_token)
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryOutcome> {
        let form = SendMessageForm {
            chat_id: &message.chat_id,
            text: &message.text,
            parse_mode: message.parse_mode,
            disable_web_page_preview: message.disable_web_page_preview,
        };

        debug!(
            "Sending Telegram message to chat {} ({} chars)",
            message.chat_id,
            message.text.chars().count()
        );

        // The URL embeds the bot token, so it is never logged
        let response = self
            .client
            .post(self.send_message_url())
            .form(&form)
            .send()
            .await
            .map_err(|e| e.without_url())
            .context("Failed to send request to Telegram")?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            let error_body: String = error_body.chars().take(200).collect();
            error!("Telegram API error ({}): {}", status, error_body);
            return Ok(DeliveryOutcome::Rejected { status });
        }

        info!("Telegram message delivered to chat {}", message.chat_id);
        Ok(DeliveryOutcome::Delivered)
    }
}
