use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// LLM provider
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// Upper bound on a single model call. Expiry fails the turn.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// Sampling temperature (0.0 – 2.0). `None` lets the provider choose.
    #[serde(default)]
    pub temperature: Option<f32>,
    /// Maximum tokens in the response. `None` lets the provider choose.
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            timeout_ms: d_timeout_ms(),
            temperature: None,
            max_tokens: None,
            provider: ProviderConfig::default(),
        }
    }
}

/// An OpenAI-compatible chat completions endpoint (Groq by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default = "d_provider_id")]
    pub id: String,
    #[serde(default = "d_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default = "d_model")]
    pub model: String,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            id: d_provider_id(),
            base_url: d_base_url(),
            auth: AuthConfig::default(),
            model: d_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Header name (e.g. "Authorization", "x-api-key").
    #[serde(default)]
    pub header: Option<String>,
    /// Header value prefix (e.g. "Bearer ").
    #[serde(default)]
    pub prefix: Option<String>,
    /// Env var containing the key.
    #[serde(default = "d_key_env")]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env).
    #[serde(default)]
    pub key: Option<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            header: None,
            prefix: None,
            env: d_key_env(),
            key: None,
        }
    }
}

// ── serde default helpers ───────────────────────────────────────────

fn d_timeout_ms() -> u64 {
    60_000
}
fn d_provider_id() -> String {
    "groq".into()
}
fn d_base_url() -> String {
    "https://api.groq.com/openai/v1".into()
}
fn d_model() -> String {
    "qwen-2.5-32b".into()
}
fn d_key_env() -> Option<String> {
    Some("GROQ_API_KEY".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_target_groq() {
        let cfg = LlmConfig::default();
        assert_eq!(cfg.provider.id, "groq");
        assert_eq!(cfg.provider.base_url, "https://api.groq.com/openai/v1");
        assert_eq!(cfg.provider.model, "qwen-2.5-32b");
        assert_eq!(cfg.provider.auth.env.as_deref(), Some("GROQ_API_KEY"));
        assert_eq!(cfg.timeout_ms, 60_000);
    }

    #[test]
    fn partial_provider_keeps_other_defaults() {
        let cfg: LlmConfig = toml::from_str(
            r#"
            timeout_ms = 5000
            [provider]
            model = "llama-3.3-70b-versatile"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.timeout_ms, 5000);
        assert_eq!(cfg.provider.model, "llama-3.3-70b-versatile");
        assert_eq!(cfg.provider.id, "groq");
    }
}
