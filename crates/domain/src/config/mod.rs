mod channel;
mod history;
mod llm;
mod observability;
mod persona;
mod sessions;

pub use channel::*;
pub use history::*;
pub use llm::*;
pub use observability::*;
pub use persona::*;
pub use sessions::*;

use serde::{Deserialize, Serialize};
use std::fmt;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub history: HistoryConfig,
    #[serde(default)]
    pub persona: PersonaConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub sessions: SessionsConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Environment overrides
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Env var overriding `llm.provider.model`.
pub const ENV_MODEL: &str = "ELLIS_MODEL";
/// Env var overriding `history.budget`.
pub const ENV_HISTORY_BUDGET: &str = "ELLIS_HISTORY_BUDGET";

impl Config {
    /// Apply environment overrides on top of the file config.
    ///
    /// `lookup` is `std::env::var(..).ok()` in production; tests pass a map.
    /// Unparseable values are reported as warnings and leave the file value.
    pub fn apply_env<F>(&mut self, lookup: F) -> Vec<ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut issues = Vec::new();

        if let Some(model) = lookup(ENV_MODEL).filter(|m| !m.trim().is_empty()) {
            self.llm.provider.model = model.trim().to_owned();
        }

        if let Some(raw) = lookup(ENV_HISTORY_BUDGET) {
            match raw.trim().parse::<usize>() {
                Ok(budget) => self.history.budget = budget,
                Err(_) => issues.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: ENV_HISTORY_BUDGET.into(),
                    message: format!("not a non-negative integer: {raw:?}"),
                }),
            }
        }

        issues
    }

    /// Resolve the Telegram bot token: plaintext config first, then the
    /// configured env var.
    pub fn bot_token<F>(&self, lookup: F) -> Option<String>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.channel
            .bot_token
            .clone()
            .or_else(|| lookup(&self.channel.bot_token_env))
            .filter(|t| !t.trim().is_empty())
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Config validation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Severity level for a configuration issue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigSeverity {
    Error,
    Warning,
}

/// A single configuration validation issue.
#[derive(Debug, Clone)]
pub struct ConfigError {
    pub severity: ConfigSeverity,
    pub field: String,
    pub message: String,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.severity {
            ConfigSeverity::Error => "ERROR",
            ConfigSeverity::Warning => "WARN",
        };
        write!(f, "[{tag}] {}: {}", self.field, self.message)
    }
}

impl Config {
    /// Validate the configuration and return a list of issues.
    ///
    /// Returns an empty vec when everything looks good.
    pub fn validate(&self) -> Vec<ConfigError> {
        let mut errors = Vec::new();

        let provider = &self.llm.provider;
        if provider.id.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.provider.id".into(),
                message: "provider id must not be empty".into(),
            });
        }
        if provider.base_url.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.provider.base_url".into(),
                message: "provider base_url must not be empty".into(),
            });
        }
        if provider.model.is_empty() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.provider.model".into(),
                message: "model must not be empty".into(),
            });
        }
        if provider.auth.key.is_some() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "llm.provider.auth.key".into(),
                message: "plaintext API key in config; prefer 'env'".into(),
            });
        }
        if provider.auth.key.is_none() && provider.auth.env.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.provider.auth".into(),
                message: "no API key source: set 'env' or 'key'".into(),
            });
        }

        if self.llm.timeout_ms == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "llm.timeout_ms".into(),
                message: "timeout must be greater than 0".into(),
            });
        }
        if let Some(t) = self.llm.temperature {
            if !(0.0..=2.0).contains(&t) {
                errors.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: "llm.temperature".into(),
                    message: format!("{t} is outside 0.0 – 2.0"),
                });
            }
        }

        if self.history.budget == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "history.budget".into(),
                message: "budget 0 sends only the newest message".into(),
            });
        }

        if self.channel.bot_token_env.is_empty() && self.channel.bot_token.is_none() {
            errors.push(ConfigError {
                severity: ConfigSeverity::Error,
                field: "channel.bot_token_env".into(),
                message: "no bot token source configured".into(),
            });
        }
        if self.channel.polling_timeout_secs == 0 {
            errors.push(ConfigError {
                severity: ConfigSeverity::Warning,
                field: "channel.polling_timeout_secs".into(),
                message: "0 turns long polling into short polling".into(),
            });
        }

        errors
    }
}
