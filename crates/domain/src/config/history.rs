use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Thread history window
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Controls how much of a thread's history accompanies each model call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Size budget for the trimmed window, in `unit`s.
    #[serde(default = "d_budget")]
    pub budget: usize,
    #[serde(default)]
    pub unit: SizeUnit,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            budget: d_budget(),
            unit: SizeUnit::default(),
        }
    }
}

/// How a message's size is measured against the history budget.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeUnit {
    /// Every message counts as one.
    #[default]
    Messages,
    /// Unicode scalar values in the message content.
    Chars,
    /// Characters divided by four, rounded up (at least one per message).
    ApproxTokens,
}

fn d_budget() -> usize {
    50
}
