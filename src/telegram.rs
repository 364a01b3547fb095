use crate::config::TelegramConfig;
use crate::delivery::DeliveryChannel;
use crate::error::WatchError;
use crate::http::HttpClient;
use crate::models::OutboundMessage;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::{Value, json};
use std::path::Path;
use tracing::{debug, info, warn};

/// Telegram rejects photo captions longer than this.
const MAX_CAPTION_CHARS: usize = 1024;

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    description: Option<String>,
}

/// Delivers messages through the Telegram Bot API as HTML.
pub struct TelegramChannel {
    http: HttpClient,
    api_url: String,
    bot_token: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(http: HttpClient, config: &TelegramConfig) -> Self {
        Self {
            http,
            api_url: config.api_url.clone(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        }
    }

    fn method_url(&self, method: &str) -> String {
        format!("{}/bot{}/{}", self.api_url, self.bot_token, method)
    }

    pub async fn send_text(&self, text: &str) -> Result<(), WatchError> {
        let url = self.method_url("sendMessage");
        let body = json!({
            "chat_id": self.chat_id,
            "text": text,
            "parse_mode": "HTML",
            "disable_web_page_preview": true,
        });
        let payload = self
            .http
            .execute_json("telegram sendMessage", || {
                self.http.client().post(&url).json(&body)
            })
            .await
            .map_err(delivery_error)?;
        check_ok(payload)
    }

    pub async fn send_photo(&self, path: &Path, caption: &str) -> Result<(), WatchError> {
        let bytes = tokio::fs::read(path).await.map_err(|e| {
            WatchError::Delivery(format!("cannot read attachment {}: {}", path.display(), e))
        })?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("image")
            .to_string();

        let url = self.method_url("sendPhoto");
        let payload = self
            .http
            .execute_json("telegram sendPhoto", || {
                let photo = Part::bytes(bytes.clone()).file_name(file_name.clone());
                let form = Form::new()
                    .text("chat_id", self.chat_id.clone())
                    .text("caption", caption.to_string())
                    .text("parse_mode", "HTML")
                    .part("photo", photo);
                self.http.client().post(&url).multipart(form)
            })
            .await
            .map_err(delivery_error)?;
        check_ok(payload)
    }
}

#[async_trait]
impl DeliveryChannel for TelegramChannel {
    /// Sends the image with the text as caption when possible, falling back
    /// to a plain text message if the photo cannot be sent.
    async fn deliver(&self, message: &OutboundMessage) -> Result<(), WatchError> {
        if let Some(path) = &message.attachment_path {
            if message.text.chars().count() > MAX_CAPTION_CHARS {
                debug!("Message too long for a caption, sending text only");
            } else {
                match self.send_photo(path, &message.text).await {
                    Ok(()) => {
                        info!("Delivered message with attachment {}", path.display());
                        return Ok(());
                    }
                    Err(e) => {
                        warn!("Attachment delivery failed ({}), retrying as text-only", e);
                    }
                }
            }
        }

        self.send_text(&message.text).await?;
        info!("Delivered text message");
        Ok(())
    }
}

fn delivery_error(e: WatchError) -> WatchError {
    match e {
        WatchError::Delivery(_) => e,
        other => WatchError::Delivery(other.to_string()),
    }
}

fn check_ok(payload: Value) -> Result<(), WatchError> {
    let response: ApiResponse = serde_json::from_value(payload)
        .map_err(|e| WatchError::Delivery(format!("unexpected Telegram response: {e}")))?;
    if response.ok {
        Ok(())
    } else {
        Err(WatchError::Delivery(
            response
                .description
                .unwrap_or_else(|| "Telegram returned ok=false".to_string()),
        ))
    }
}
