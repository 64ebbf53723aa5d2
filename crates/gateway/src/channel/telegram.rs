//! Telegram Bot API transport.
//!
//! Long-polls `getUpdates`, classifies each message, and answers with
//! `sendMessage`. Only plain text reaches the turn executor; `/start` gets
//! the greeting and other content types get a fixed "text only" reply.
//!
//! Each chat is served by its own ordered worker (see [`super::dispatch`]),
//! so replies within a chat follow delivery order.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tokio::sync::Notify;

use ellis_domain::config::ChannelConfig;
use ellis_domain::error::{Error, Result};
use ellis_domain::persona::NON_TEXT_REPLY;
use ellis_domain::trace::TraceEvent;

use super::chunk::{split_message, TELEGRAM_MAX_UTF16};
use super::dispatch::{ChatWorkers, Handler, HandlerFuture};
use crate::runtime::TurnExecutor;

/// Timeout for non-polling API calls.
const API_TIMEOUT_SECS: u64 = 30;
/// Default wait for in-flight turns at shutdown.
const DEFAULT_SHUTDOWN_GRACE_SECS: u64 = 10;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Thin Bot API client.
pub struct TelegramClient {
    client: reqwest::Client,
    /// `{api_base}/bot{token}`
    endpoint: String,
    polling_timeout_secs: u64,
}

impl TelegramClient {
    pub fn new(config: &ChannelConfig, bot_token: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!(
                "{}/bot{}",
                config.api_base.trim_end_matches('/'),
                bot_token
            ),
            polling_timeout_secs: u64::from(config.polling_timeout_secs),
        }
    }

    /// Fetch updates with id >= `offset`, waiting up to the polling timeout.
    pub async fn get_updates(&self, offset: i64) -> Result<Vec<Update>> {
        let params = serde_json::json!({
            "offset": offset,
            "timeout": self.polling_timeout_secs,
            "allowed_updates": ["message"],
        });
        let wait = Duration::from_secs(self.polling_timeout_secs + 10);
        self.call("getUpdates", &params, wait).await
    }

    /// Send a text message, optionally as a reply to `reply_to`.
    pub async fn send_message(&self, chat_id: i64, text: &str, reply_to: Option<i64>) -> Result<()> {
        let mut params = serde_json::json!({
            "chat_id": chat_id,
            "text": text,
        });
        if let Some(id) = reply_to {
            params["reply_to_message_id"] = Value::Number(id.into());
        }
        let _sent: Value = self
            .call("sendMessage", &params, Duration::from_secs(API_TIMEOUT_SECS))
            .await?;
        Ok(())
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: &Value, wait: Duration) -> Result<T> {
        let url = format!("{}/{method}", self.endpoint);
        let response = self
            .client
            .post(&url)
            .json(params)
            .timeout(wait)
            .send()
            .await
            .map_err(|e| Error::Telegram(format!("{method}: {}", e.without_url())))?;

        let status = response.status();
        let body: TelegramResponse<T> = response
            .json()
            .await
            .map_err(|e| Error::Telegram(format!("{method}: HTTP {status}: {}", e.without_url())))?;

        if !body.ok {
            return Err(Error::Telegram(format!(
                "{method}: {}",
                body.description.unwrap_or_else(|| format!("HTTP {status}"))
            )));
        }
        body.result
            .ok_or_else(|| Error::Telegram(format!("{method}: ok but no result")))
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Inbound classification
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// What an inbound message asks of the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// `/start` or `/start@botname`.
    Start,
    /// Plain text for the conversation.
    Text(String),
    /// A content type we do not handle; carries the type name.
    NonText(&'static str),
}

impl Inbound {
    /// Classify a message. Returns `None` for anything we ignore (service
    /// messages, unsupported types with no text).
    pub fn classify(message: &TelegramMessage) -> Option<Self> {
        if let Some(text) = &message.text {
            return Some(if is_start_command(text) {
                Inbound::Start
            } else {
                Inbound::Text(text.clone())
            });
        }
        message.non_text_kind().map(Inbound::NonText)
    }
}

fn is_start_command(text: &str) -> bool {
    let Some(command) = text.split_whitespace().next() else {
        return false;
    };
    command == "/start" || command.starts_with("/start@")
}

/// A reply to send back, and whether it quotes the inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub text: String,
    pub quote: bool,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bot loop
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TelegramBot {
    client: TelegramClient,
    executor: Arc<TurnExecutor>,
    greeting: String,
    retry_delay: Duration,
    shutdown_grace: Duration,
}

impl TelegramBot {
    pub fn new(
        client: TelegramClient,
        executor: Arc<TurnExecutor>,
        greeting: String,
        retry_delay: Duration,
    ) -> Self {
        Self {
            client,
            executor,
            greeting,
            retry_delay,
            shutdown_grace: Duration::from_secs(DEFAULT_SHUTDOWN_GRACE_SECS),
        }
    }

    /// How long shutdown waits for in-flight turns before abandoning them.
    pub fn with_shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// Decide the reply for one classified message.
    pub async fn reply_for(&self, thread_id: &str, inbound: Inbound) -> Reply {
        respond(&self.executor, &self.greeting, thread_id, inbound).await
    }

    /// Poll until `shutdown` is notified, then wait for in-flight turns.
    ///
    /// Updates are queued per chat: one chat's messages are handled in the
    /// order Telegram delivered them, different chats run concurrently.
    pub async fn run(self: Arc<Self>, shutdown: Arc<Notify>) {
        tracing::info!("starting Telegram polling");
        let mut offset: i64 = 0;

        let bot = self.clone();
        let handler: Handler<Update> = Arc::new(move |update| -> HandlerFuture {
            let bot = bot.clone();
            Box::pin(async move { bot.handle_update(update).await })
        });
        let mut workers = ChatWorkers::new(handler);

        loop {
            let updates = tokio::select! {
                _ = shutdown.notified() => break,
                r = self.client.get_updates(offset) => r,
            };

            match updates {
                Ok(updates) => {
                    for update in updates {
                        offset = offset.max(update.update_id + 1);
                        let Some(chat_id) = update.message.as_ref().map(|m| m.chat.id) else {
                            continue;
                        };
                        workers.dispatch(chat_id, update);
                    }
                    workers.reap();
                }
                Err(e) => {
                    tracing::error!(error = %e, "Telegram polling error");
                    tokio::select! {
                        _ = shutdown.notified() => break,
                        _ = tokio::time::sleep(self.retry_delay) => {}
                    }
                }
            }
        }

        let in_flight = workers.workers();
        tracing::info!(in_flight, "Telegram polling stopped; finishing in-flight turns");
        if !workers.drain(self.shutdown_grace).await {
            tracing::warn!(
                grace_ms = self.shutdown_grace.as_millis() as u64,
                "in-flight turns abandoned at shutdown"
            );
        }
    }

    async fn handle_update(&self, update: Update) {
        let Some(message) = update.message else {
            return;
        };
        let Some(inbound) = Inbound::classify(&message) else {
            tracing::debug!(update_id = update.update_id, "ignoring update");
            return;
        };

        let chat_id = message.chat.id;
        let thread_id = chat_id.to_string();
        let reply = self.reply_for(&thread_id, inbound).await;
        if reply.text.is_empty() {
            tracing::warn!(thread_id = %thread_id, "empty reply; nothing sent");
            return;
        }

        let reply_to = reply.quote.then_some(message.message_id);
        for chunk in split_message(&reply.text, TELEGRAM_MAX_UTF16) {
            if let Err(e) = self.client.send_message(chat_id, &chunk, reply_to).await {
                tracing::error!(thread_id = %thread_id, error = %e, "failed to send reply");
                return;
            }
        }
        tracing::info!(thread_id = %thread_id, reply = %reply.text, "replied");
    }
}

/// Route a classified message: greeting and non-text replies are answered
/// here, text goes through the executor.
pub async fn respond(
    executor: &TurnExecutor,
    greeting: &str,
    thread_id: &str,
    inbound: Inbound,
) -> Reply {
    match inbound {
        Inbound::Start => {
            tracing::info!(thread_id = %thread_id, "conversation started");
            Reply {
                text: greeting.to_owned(),
                quote: false,
            }
        }
        Inbound::NonText(kind) => {
            TraceEvent::InboundDropped {
                thread_id: thread_id.to_owned(),
                reason: format!("non-text message ({kind})"),
            }
            .emit();
            Reply {
                text: NON_TEXT_REPLY.to_owned(),
                quote: true,
            }
        }
        Inbound::Text(text) => {
            tracing::info!(thread_id = %thread_id, text = %text, "text message received");
            Reply {
                text: executor.handle_turn(thread_id, &text).await,
                quote: true,
            }
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Bot API types
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Deserialize)]
struct TelegramResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Update {
    pub update_id: i64,
    pub message: Option<TelegramMessage>,
}

/// The subset of a Telegram `Message` we look at. Non-text payloads are
/// kept opaque; only their presence matters.
#[derive(Debug, Deserialize)]
pub struct TelegramMessage {
    pub message_id: i64,
    pub chat: TelegramChat,
    pub text: Option<String>,
    audio: Option<Value>,
    photo: Option<Value>,
    voice: Option<Value>,
    video: Option<Value>,
    document: Option<Value>,
    location: Option<Value>,
    contact: Option<Value>,
    sticker: Option<Value>,
}

impl TelegramMessage {
    fn non_text_kind(&self) -> Option<&'static str> {
        [
            ("audio", &self.audio),
            ("photo", &self.photo),
            ("voice", &self.voice),
            ("video", &self.video),
            ("document", &self.document),
            ("location", &self.location),
            ("contact", &self.contact),
            ("sticker", &self.sticker),
        ]
        .into_iter()
        .find(|(_, v)| v.is_some())
        .map(|(kind, _)| kind)
    }
}

#[derive(Debug, Deserialize)]
pub struct TelegramChat {
    pub id: i64,
}
