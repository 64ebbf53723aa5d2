//! Chat transports. Telegram is the only one.

pub mod chunk;
pub mod dispatch;
pub mod telegram;

pub use telegram::{respond, Inbound, Reply, TelegramBot, TelegramClient};
