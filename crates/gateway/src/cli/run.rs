//! `ellis run`: one turn from the command line.
//!
//! Sends a single message through the same executor the bot uses and prints
//! the reply to stdout. Handy for checking the API key, model and persona
//! without Telegram.

use std::sync::Arc;

use ellis_domain::config::Config;

use crate::bootstrap;

pub async fn run(config: Arc<Config>, message: String, thread_id: String) -> anyhow::Result<()> {
    let state = bootstrap::build_app_state(config)?;
    let reply = state.executor.handle_turn(&thread_id, &message).await;
    println!("{reply}");
    Ok(())
}
