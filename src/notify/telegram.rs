//! Telegram Bot API transport.

use std::time::Duration;

use bytes::Bytes;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;

use super::{Notifier, NotifyError};

pub const DEFAULT_API_BASE: &str = "https://api.telegram.org";

/// Telegram rejects longer `sendMessage` texts.
const MAX_TEXT_CHARS: usize = 4096;
/// Telegram rejects longer document captions.
const MAX_CAPTION_CHARS: usize = 1024;

#[derive(Debug, Clone)]
pub struct TelegramOptions {
    pub api_base: String,
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone)]
pub struct TelegramNotifier {
    client: Client,
    options: TelegramOptions,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

impl TelegramNotifier {
    pub fn new(options: TelegramOptions, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client, options })
    }

    fn endpoint(&self, method: &str) -> Result<String, NotifyError> {
        if self.options.bot_token.is_empty() {
            return Err(NotifyError::NotConfigured("bot token is empty".into()));
        }
        if self.options.chat_id.is_empty() {
            return Err(NotifyError::NotConfigured("chat id is empty".into()));
        }
        Ok(format!(
            "{}/bot{}/{}",
            self.options.api_base.trim_end_matches('/'),
            self.options.bot_token,
            method
        ))
    }
}

#[async_trait::async_trait]
impl Notifier for TelegramNotifier {
    async fn send_text(&self, text: &str) -> Result<(), NotifyError> {
        let url = self.endpoint("sendMessage")?;
        let body = json!({
            "chat_id": self.options.chat_id,
            "text": truncate_chars(text, MAX_TEXT_CHARS),
        });

        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(transport)?;
        check(response).await
    }

    async fn send_document(
        &self,
        bytes: Bytes,
        filename: &str,
        caption: &str,
    ) -> Result<(), NotifyError> {
        let url = self.endpoint("sendDocument")?;
        let part = Part::bytes(bytes.to_vec())
            .file_name(filename.to_string())
            .mime_str("application/pdf")
            .map_err(transport)?;
        let form = Form::new()
            .text("chat_id", self.options.chat_id.clone())
            .text("caption", truncate_chars(caption, MAX_CAPTION_CHARS))
            .part("document", part);

        let response = self
            .client
            .post(url)
            .multipart(form)
            .send()
            .await
            .map_err(transport)?;
        check(response).await
    }
}

/// The request URL embeds the bot token, so it is stripped from errors.
fn transport(e: reqwest::Error) -> NotifyError {
    NotifyError::Transport(e.without_url().to_string())
}

async fn check(response: Response) -> Result<(), NotifyError> {
    let status = response.status();
    let text = response.text().await.map_err(transport)?;
    let parsed: Option<ApiResponse> = serde_json::from_str(&text).ok();

    match parsed {
        Some(api) if status.is_success() && api.ok => Ok(()),
        Some(api) => Err(NotifyError::Rejected {
            status: status.as_u16(),
            description: api.description.unwrap_or_else(|| "no description".into()),
        }),
        None => Err(NotifyError::Rejected {
            status: status.as_u16(),
            description: truncate_chars(&text, 200),
        }),
    }
}

fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}
