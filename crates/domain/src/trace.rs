use serde::Serialize;

/// Structured trace events emitted across all Ellis crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    LlmRequest {
        provider: String,
        model: String,
        messages: usize,
        duration_ms: u64,
        prompt_tokens: Option<u32>,
        completion_tokens: Option<u32>,
    },
    HistoryTrimmed {
        thread_id: String,
        stored: usize,
        kept: usize,
        budget: usize,
    },
    TranscriptAppend {
        thread_id: String,
        role: String,
        persisted: bool,
    },
    TurnCompleted {
        thread_id: String,
        turn_id: String,
        outcome: String,
        duration_ms: u64,
    },
    InboundDropped {
        thread_id: String,
        reason: String,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ellis_event");
    }
}
