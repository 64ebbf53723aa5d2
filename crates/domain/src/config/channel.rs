use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Telegram transport
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Bot API root, without the `/bot<token>` suffix.
    #[serde(default = "d_api_base")]
    pub api_base: String,
    /// Env var holding the bot token.
    #[serde(default = "d_token_env")]
    pub bot_token_env: String,
    /// Direct token (for config-only setups; prefer the env var).
    #[serde(default)]
    pub bot_token: Option<String>,
    /// Long-polling timeout passed to `getUpdates`.
    #[serde(default = "d_polling_timeout")]
    pub polling_timeout_secs: u32,
    /// Back-off after a failed poll.
    #[serde(default = "d_retry_delay_ms")]
    pub retry_delay_ms: u64,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            api_base: d_api_base(),
            bot_token_env: d_token_env(),
            bot_token: None,
            polling_timeout_secs: d_polling_timeout(),
            retry_delay_ms: d_retry_delay_ms(),
        }
    }
}

fn d_api_base() -> String {
    "https://api.telegram.org".into()
}
fn d_token_env() -> String {
    "BOT_TOKEN".into()
}
fn d_polling_timeout() -> u32 {
    30
}
fn d_retry_delay_ms() -> u64 {
    3_000
}
