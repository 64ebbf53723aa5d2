use std::fmt;

use serde::{Deserialize, Serialize};

/// Shared error type used across all Ellis crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP: {0}")]
    Http(String),

    #[error("timeout: {0}")]
    Timeout(String),

    #[error("provider {provider} ({kind}): {message}")]
    Provider {
        provider: String,
        kind: ProviderErrorKind,
        message: String,
    },

    #[error("telegram: {0}")]
    Telegram(String),

    #[error("config: {0}")]
    Config(String),

    #[error("auth: {0}")]
    Auth(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Build a provider error, classifying it from the HTTP status code.
    pub fn provider_status(provider: impl Into<String>, status: u16, body: &str) -> Self {
        Error::Provider {
            provider: provider.into(),
            kind: ProviderErrorKind::from_status(status),
            message: format!("HTTP {status} - {body}"),
        }
    }

    /// The provider failure class, or `None` for errors that never came
    /// back from a provider (transport, timeout, parsing, ...).
    pub fn provider_kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Error::Provider { kind, .. } => Some(*kind),
            _ => None,
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Provider failure classes
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Failure classes reported by the model provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Malformed request (HTTP 400).
    BadRequest,
    /// Missing or invalid credential (HTTP 401/403).
    Unauthorized,
    /// Unknown model or endpoint (HTTP 404).
    NotFound,
    /// Rate limit exceeded (HTTP 429).
    RateLimited,
    /// Provider internal error (HTTP 500).
    Internal,
    /// Anything the provider returned that has no dedicated class.
    Other,
}

impl ProviderErrorKind {
    pub fn from_status(status: u16) -> Self {
        match status {
            400 => Self::BadRequest,
            401 | 403 => Self::Unauthorized,
            404 => Self::NotFound,
            429 => Self::RateLimited,
            500 => Self::Internal,
            _ => Self::Other,
        }
    }

    /// Reply text shown to the end user for this failure class.
    ///
    /// `Other` has no fixed text; callers render the error detail instead.
    pub fn user_message(self) -> Option<&'static str> {
        match self {
            Self::BadRequest => Some("Invalid request. Please check your input."),
            Self::Unauthorized => Some("Unauthorized. Check the API key."),
            Self::NotFound => Some("Model not found. Verify the model name."),
            Self::RateLimited => Some("Rate limit exceeded. Try again later."),
            Self::Internal => Some("Internal server error. Try again later."),
            Self::Other => None,
        }
    }
}

impl fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::BadRequest => "bad_request",
            Self::Unauthorized => "unauthorized",
            Self::NotFound => "not_found",
            Self::RateLimited => "rate_limited",
            Self::Internal => "internal",
            Self::Other => "other",
        };
        f.write_str(s)
    }
}
