use std::sync::Arc;

use ellis_domain::config::Config;
use ellis_sessions::ConversationStore;

use crate::runtime::TurnExecutor;

/// Shared application state, built once by [`crate::bootstrap`].
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<ConversationStore>,
    pub executor: Arc<TurnExecutor>,
}
