//! AppState construction shared by `serve` and `run`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;

use ellis_domain::config::{Config, ConfigSeverity};
use ellis_providers::{LlmProvider, OpenAiCompatProvider};
use ellis_sessions::ConversationStore;

use crate::runtime::{TurnExecutor, TurnSettings};
use crate::state::AppState;

/// Validate config, build the store and model provider, and return a wired
/// [`AppState`].
pub fn build_app_state(config: Arc<Config>) -> anyhow::Result<AppState> {
    // ── Config validation ────────────────────────────────────────────
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    if issues.iter().any(|i| i.severity == ConfigSeverity::Error) {
        anyhow::bail!(
            "config validation failed with {} error(s)",
            issues
                .iter()
                .filter(|i| i.severity == ConfigSeverity::Error)
                .count()
        );
    }

    // ── Model provider ───────────────────────────────────────────────
    let timeout = Duration::from_millis(config.llm.timeout_ms);
    let provider: Arc<dyn LlmProvider> = Arc::new(
        OpenAiCompatProvider::from_config(&config.llm.provider, timeout)
            .context("initializing model provider")?,
    );
    build_with_provider(config, provider)
}

/// Same as [`build_app_state`] minus validation, with a caller-supplied
/// provider.
pub fn build_with_provider(
    config: Arc<Config>,
    provider: Arc<dyn LlmProvider>,
) -> anyhow::Result<AppState> {
    tracing::info!(
        provider = provider.provider_id(),
        model = provider.default_model(),
        "model provider ready"
    );

    // ── Conversation store ───────────────────────────────────────────
    let store = if config.sessions.persist {
        let store = ConversationStore::open(&config.sessions.dir).with_context(|| {
            format!("opening transcript dir {}", config.sessions.dir.display())
        })?;
        tracing::info!(dir = %config.sessions.dir.display(), "conversation store ready (persistent)");
        store
    } else {
        tracing::info!("conversation store ready (in memory)");
        ConversationStore::in_memory()
    };
    let store = Arc::new(store);

    // ── Turn executor ────────────────────────────────────────────────
    let settings = TurnSettings::from_config(&config).context("loading persona prompt")?;
    tracing::info!(
        budget = settings.history.budget,
        unit = ?settings.history.unit,
        timeout_ms = config.llm.timeout_ms,
        "turn executor ready"
    );
    let executor = Arc::new(TurnExecutor::new(store.clone(), provider, settings));

    Ok(AppState {
        config,
        store,
        executor,
    })
}
