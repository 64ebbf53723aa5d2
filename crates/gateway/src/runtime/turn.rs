//! Turn execution: one user message in, one reply string out.
//!
//! A turn moves through [`TurnStage`]s under the thread's lock: load the
//! thread, record the user message, trim, prepend the persona, call the
//! model once, record the reply. Failures never escape; they become the
//! reply text.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::Instrument;

use ellis_contextpack::trim;
use ellis_domain::config::{Config, HistoryConfig};
use ellis_domain::error::{Error, Result};
use ellis_domain::trace::TraceEvent;
use ellis_domain::{Message, ProviderErrorKind};
use ellis_providers::{ChatRequest, LlmProvider};
use ellis_sessions::ConversationStore;

use super::thread_lock::ThreadLockMap;

/// Prune idle thread locks once this many are tracked.
const LOCK_PRUNE_THRESHOLD: usize = 1024;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Stages and settings
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Where a turn is in its lifecycle. `Failed` is only reachable from
/// `InvokingModel`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnStage {
    Idle,
    LoadingHistory,
    Trimming,
    InvokingModel,
    PersistingResult,
    Done,
    Failed,
}

/// Per-turn knobs, fixed at startup.
#[derive(Debug, Clone)]
pub struct TurnSettings {
    pub persona_prompt: String,
    pub history: HistoryConfig,
    pub timeout: Duration,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl TurnSettings {
    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self {
            persona_prompt: config.persona.load_prompt()?,
            history: config.history.clone(),
            timeout: Duration::from_millis(config.llm.timeout_ms),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        })
    }
}

/// Reply text for a failed model call.
pub fn failure_reply(err: &Error) -> String {
    match err.provider_kind().and_then(ProviderErrorKind::user_message) {
        Some(text) => text.to_owned(),
        None => format!("An unexpected error occurred: {err}"),
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Executor
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct TurnExecutor {
    store: Arc<ConversationStore>,
    provider: Arc<dyn LlmProvider>,
    locks: ThreadLockMap,
    settings: TurnSettings,
}

impl TurnExecutor {
    pub fn new(
        store: Arc<ConversationStore>,
        provider: Arc<dyn LlmProvider>,
        settings: TurnSettings,
    ) -> Self {
        Self {
            store,
            provider,
            locks: ThreadLockMap::new(),
            settings,
        }
    }

    /// Run one turn for `thread_id` and return the text to send back.
    ///
    /// Always returns a reply: model failures are converted to a
    /// user-facing message and logged.
    pub async fn handle_turn(&self, thread_id: &str, user_text: &str) -> String {
        let turn_id = uuid::Uuid::new_v4();
        let span = tracing::info_span!("turn", %turn_id, thread_id = %thread_id);
        self.run(thread_id, user_text, turn_id)
            .instrument(span)
            .await
    }

    async fn run(&self, thread_id: &str, user_text: &str, turn_id: uuid::Uuid) -> String {
        let started = Instant::now();
        enter(TurnStage::Idle);

        let _permit = match self.locks.acquire(thread_id).await {
            Ok(p) => p,
            Err(e) => {
                tracing::error!(error = %e, "could not lock thread");
                return failure_reply(&Error::Other(e.to_string()));
            }
        };

        // ── Load ──────────────────────────────────────────────────────
        enter(TurnStage::LoadingHistory);
        let mut window = self.store.get_history(thread_id);
        let stored = window.len();
        let user = Message::user(user_text);
        self.store.append(thread_id, user.clone());
        window.push(user);

        // ── Trim + persona ────────────────────────────────────────────
        enter(TurnStage::Trimming);
        let history = &self.settings.history;
        let (trimmed, report) = trim(&window, history.budget, history.unit);
        if report.oversize {
            tracing::debug!(size = report.size, budget = history.budget, "newest message exceeds history budget");
        }
        TraceEvent::HistoryTrimmed {
            thread_id: thread_id.to_owned(),
            stored: stored + 1,
            kept: report.kept,
            budget: history.budget,
        }
        .emit();

        let mut messages = Vec::with_capacity(trimmed.len() + 1);
        messages.push(Message::system(self.settings.persona_prompt.clone()));
        messages.extend(trimmed);

        // ── Model call ────────────────────────────────────────────────
        enter(TurnStage::InvokingModel);
        tracing::info!(input = %user_text, messages = messages.len(), "sending message to model");
        let req = ChatRequest {
            messages,
            temperature: self.settings.temperature,
            max_tokens: self.settings.max_tokens,
            model: None,
        };
        let timeout = self.settings.timeout;
        let result = match tokio::time::timeout(timeout, self.provider.chat(&req)).await {
            Ok(r) => r,
            Err(_) => Err(Error::Timeout(format!(
                "model call exceeded {} ms",
                timeout.as_millis()
            ))),
        };

        let (reply, outcome) = match result {
            Ok(resp) => {
                enter(TurnStage::PersistingResult);
                tracing::info!(reply = %resp.content, model = %resp.model, "received reply from model");
                self.store
                    .append(thread_id, Message::assistant(resp.content.clone()));
                enter(TurnStage::Done);
                (resp.content, "ok".to_owned())
            }
            Err(e) => {
                enter(TurnStage::Failed);
                let kind = e
                    .provider_kind()
                    .map(|k| k.to_string())
                    .unwrap_or_else(|| "unclassified".into());
                tracing::error!(input = %user_text, error = %e, kind = %kind, "model call failed");
                (failure_reply(&e), kind)
            }
        };

        TraceEvent::TurnCompleted {
            thread_id: thread_id.to_owned(),
            turn_id: turn_id.to_string(),
            outcome,
            duration_ms: started.elapsed().as_millis() as u64,
        }
        .emit();

        if self.locks.thread_count() > LOCK_PRUNE_THRESHOLD {
            self.locks.prune_idle();
        }

        reply
    }
}

fn enter(stage: TurnStage) {
    tracing::debug!(stage = ?stage, "turn stage");
}
