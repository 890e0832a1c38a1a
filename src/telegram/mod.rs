//! Telegram Bot API transport
//!
//! Normalizes `message` and `callback_query` updates into `ChatEvent`s,
//! hands them to the `ChatBot`, and renders replies with HTML parse mode
//! and inline keyboards. Works with long polling or the webhook route.

use crate::bot::{ButtonAction, ChatBot, Reply};
use crate::config::TelegramConfig;
use crate::error::{BotError, Result};
use crate::types::{ChatEvent, ChatId};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

const API_BASE: &str = "https://api.telegram.org";

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<Message>,
    pub callback_query: Option<CallbackQuery>,
}

impl Update {
    /// Chat the update belongs to, if any
    pub fn chat_id(&self) -> Option<ChatId> {
        match (&self.callback_query, &self.message) {
            (Some(query), _) => Some(
                query
                    .message
                    .as_ref()
                    .map(|m| m.chat.id)
                    .unwrap_or(query.from.id),
            ),
            (None, Some(message)) => Some(message.chat.id),
            (None, None) => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub from: Option<TelegramUser>,
    pub chat: Chat,
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TelegramUser {
    pub id: i64,
    #[serde(default)]
    pub first_name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    pub from: TelegramUser,
    pub message: Option<Message>,
    pub data: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GetUpdatesResponse {
    ok: bool,
    #[serde(default)]
    result: Vec<Update>,
    description: Option<String>,
}

#[derive(Debug, Serialize)]
struct SendMessageRequest {
    chat_id: ChatId,
    text: String,
    parse_mode: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    reply_markup: Option<Value>,
}

/// Convert a raw update into the bot's event shape. Updates the bot does not
/// act on (stickers, edits, joins) yield `None`.
pub fn normalize_update(update: &Update) -> Option<ChatEvent> {
    if let Some(query) = &update.callback_query {
        let chat_id = update.chat_id().unwrap_or(query.from.id);
        return Some(ChatEvent::Button {
            data: query.data.clone()?,
            user_id: query.from.id,
            chat_id,
        });
    }

    let message = update.message.as_ref()?;
    let text = message.text.as_deref()?.trim();
    if text.is_empty() {
        return None;
    }
    let user_id = message.from.as_ref().map(|u| u.id).unwrap_or(message.chat.id);
    let chat_id = message.chat.id;

    match text.strip_prefix('/') {
        Some(command) => {
            let (name, args) = command.split_once(char::is_whitespace).unwrap_or((command, ""));
            let name = name.split('@').next().unwrap_or(name);
            Some(ChatEvent::Command {
                name: name.to_lowercase(),
                args: args.trim().to_string(),
                user_id,
                chat_id,
            })
        }
        None => Some(ChatEvent::Text {
            text: text.to_string(),
            user_id,
            chat_id,
        }),
    }
}

/// Split a `getUpdates` batch into per-chat queues. Chats keep their update
/// order; updates without a chat get a queue of their own.
pub fn group_by_chat(updates: Vec<Update>) -> Vec<Vec<Update>> {
    let mut queues: Vec<(Option<ChatId>, Vec<Update>)> = Vec::new();

    for update in updates {
        let chat_id = update.chat_id();
        match queues
            .iter_mut()
            .find(|(id, _)| chat_id.is_some() && *id == chat_id)
        {
            Some((_, queue)) => queue.push(update),
            None => queues.push((chat_id, vec![update])),
        }
    }

    queues.into_iter().map(|(_, queue)| queue).collect()
}

/// `reply_markup` for a reply, or `None` when it has no buttons
pub fn inline_keyboard(reply: &Reply) -> Option<Value> {
    if reply.buttons.is_empty() {
        return None;
    }

    let rows: Vec<Vec<Value>> = reply
        .buttons
        .iter()
        .map(|row| {
            row.iter()
                .map(|button| match &button.action {
                    ButtonAction::Callback(data) => {
                        json!({ "text": button.label, "callback_data": data })
                    }
                    ButtonAction::Url(url) => json!({ "text": button.label, "url": url }),
                })
                .collect()
        })
        .collect();

    Some(json!({ "inline_keyboard": rows }))
}

/// Telegram transport
pub struct TelegramBot {
    http: Client,
    base_url: String,
    bot: Arc<ChatBot>,
    poll_interval: Duration,
    last_update_id: RwLock<i64>,
}

impl TelegramBot {
    pub fn new(config: &TelegramConfig, bot: Arc<ChatBot>) -> Result<Self> {
        let http = Client::builder()
            // long polling holds the request for up to 30s
            .timeout(Duration::from_secs(40))
            .build()?;

        Ok(Self {
            http,
            base_url: format!("{}/bot{}", API_BASE, config.bot_token),
            bot,
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            last_update_id: RwLock::new(0),
        })
    }

    /// Poll `getUpdates` forever. Each chat's updates run on their own task,
    /// in order, so a slow analysis only delays its own chat.
    pub async fn start_polling(self: Arc<Self>) {
        info!("Starting Telegram long polling...");

        loop {
            match self.poll_updates().await {
                Ok(updates) => {
                    if let Some(max_id) = updates.iter().map(|u| u.update_id).max() {
                        *self.last_update_id.write().await = max_id + 1;
                    }

                    for queue in group_by_chat(updates) {
                        let transport = self.clone();
                        tokio::spawn(async move {
                            for update in queue {
                                transport.handle_update(update).await;
                            }
                        });
                    }
                }
                Err(e) => {
                    error!("Failed to poll Telegram updates: {}", e);
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
            }

            tokio::time::sleep(self.poll_interval).await;
        }
    }

    async fn poll_updates(&self) -> Result<Vec<Update>> {
        let offset = *self.last_update_id.read().await;
        let url = format!("{}/getUpdates", self.base_url);

        let response: GetUpdatesResponse = self
            .http
            .get(&url)
            .query(&[("offset", offset.to_string()), ("timeout", "30".to_string())])
            .send()
            .await?
            .json()
            .await?;

        if !response.ok {
            return Err(BotError::Internal(format!(
                "getUpdates failed: {}",
                response.description.unwrap_or_default()
            )));
        }
        Ok(response.result)
    }

    /// Dispatch one update and deliver the reply. Failures are logged; the
    /// update is always considered handled.
    pub async fn handle_update(&self, update: Update) {
        if let Some(query) = &update.callback_query {
            self.answer_callback_query(&query.id).await;
        }

        let Some(event) = normalize_update(&update) else {
            debug!("Ignoring update {}", update.update_id);
            return;
        };

        let chat_id = event.chat_id();
        let reply = self.bot.handle(event).await;
        self.send_reply(chat_id, &reply).await;
    }

    pub async fn send_reply(&self, chat_id: ChatId, reply: &Reply) {
        let url = format!("{}/sendMessage", self.base_url);
        let request = SendMessageRequest {
            chat_id,
            text: reply.text.clone(),
            parse_mode: "HTML".to_string(),
            reply_markup: inline_keyboard(reply),
        };

        match self.http.post(&url).json(&request).send().await {
            Ok(resp) if !resp.status().is_success() => {
                error!("Telegram sendMessage to {} returned {}", chat_id, resp.status());
            }
            Ok(_) => {}
            Err(e) => error!("Failed to send Telegram reply: {}", e),
        }
    }

    async fn answer_callback_query(&self, callback_query_id: &str) {
        let url = format!("{}/answerCallbackQuery", self.base_url);
        let body = json!({ "callback_query_id": callback_query_id });

        if let Err(e) = self.http.post(&url).json(&body).send().await {
            error!("Failed to answer callback query: {}", e);
        }
    }
}
