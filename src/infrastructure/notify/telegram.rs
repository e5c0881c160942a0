use crate::domain::error::DomainError;
use crate::domain::ports::notifier::Notifier;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, warn};

const API_URL: &str = "https://api.telegram.org";

/// Telegram Bot API over plain HTTPS.
///
/// Inbound messages are read with `getUpdates`; the offset cursor only moves
/// forward, so an update is handed out once. Messages from other chats are
/// dropped.
pub struct TelegramNotifier {
    client: reqwest::Client,
    base_url: String,
    token: String,
    chat_id: i64,
    offset: Mutex<i64>,
}

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: i64,
    text: &'a str,
    parse_mode: &'a str,
}

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    result: Option<T>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    #[serde(default)]
    message: Option<Message>,
}

#[derive(Deserialize)]
struct Message {
    chat: Chat,
    #[serde(default)]
    text: Option<String>,
}

#[derive(Deserialize)]
struct Chat {
    id: i64,
}

impl TelegramNotifier {
    pub fn new(token: String, chat_id: i64) -> Self {
        Self::with_base_url(API_URL, token, chat_id)
    }

    pub fn with_base_url(base_url: impl Into<String>, token: String, chat_id: i64) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            token,
            chat_id,
            offset: Mutex::new(0),
        }
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/bot{}/{method}", self.base_url, self.token)
    }
}

/// Commands from the configured chat, trimmed and uppercased, plus the next
/// cursor value.
fn collect_commands(updates: Vec<Update>, chat_id: i64, offset: i64) -> (Vec<String>, i64) {
    let mut next = offset;
    let mut commands = Vec::new();
    for update in updates {
        next = next.max(update.update_id + 1);
        let Some(message) = update.message else {
            continue;
        };
        if message.chat.id != chat_id {
            debug!(chat = message.chat.id, "Ignoring message from another chat");
            continue;
        }
        if let Some(text) = message.text {
            let text = text.trim().to_uppercase();
            if !text.is_empty() {
                commands.push(text);
            }
        }
    }
    (commands, next)
}

#[async_trait]
impl Notifier for TelegramNotifier {
    fn name(&self) -> &str {
        "telegram"
    }

    async fn send(&self, text: &str) -> Result<(), DomainError> {
        let resp = self
            .client
            .post(self.endpoint("sendMessage"))
            .json(&SendMessage {
                chat_id: self.chat_id,
                text,
                parse_mode: "HTML",
            })
            .send()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("Telegram send failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(DomainError::DataUnavailable(format!(
                "Telegram API {status}: {body}"
            )));
        }
        Ok(())
    }

    async fn receive(&self) -> Result<Vec<String>, DomainError> {
        let mut offset = self.offset.lock().await;
        let resp = self
            .client
            .get(self.endpoint("getUpdates"))
            .query(&[("offset", offset.to_string()), ("timeout", "0".to_string())])
            .send()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("Telegram poll failed: {e}")))?;

        let body: ApiResponse<Vec<Update>> = resp
            .json()
            .await
            .map_err(|e| DomainError::DataUnavailable(format!("Telegram poll parse: {e}")))?;
        if !body.ok {
            let reason = body.description.unwrap_or_default();
            warn!("getUpdates rejected: {reason}");
            return Err(DomainError::DataUnavailable(format!("getUpdates: {reason}")));
        }

        let (commands, next) = collect_commands(body.result.unwrap_or_default(), self.chat_id, *offset);
        *offset = next;
        Ok(commands)
    }
}
