pub mod config;
pub mod run;

use clap::{Parser, Subcommand};

use ellis_domain::config::Config;

/// Ellis: a Telegram bot that talks to an LLM in the voice of Dr. Albert Ellis.
#[derive(Debug, Parser)]
#[command(name = "ellis", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the Telegram bot (default when no subcommand is given).
    Serve,
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Send a single message through the turn executor and print the reply.
    Run {
        /// The message to send.
        message: String,
        /// Conversation thread id (defaults to "cli:run").
        #[arg(long, default_value = "cli:run")]
        thread: String,
    },
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

// ── Config loading helper ─────────────────────────────────────────────

/// Env var naming the config file.
pub const ENV_CONFIG: &str = "ELLIS_CONFIG";

/// Load `.env`, then the configuration from the path specified by
/// `ELLIS_CONFIG` (or `config.toml` by default), then apply environment
/// overrides. Returns the [`Config`] and the path that was used.
pub fn load_config() -> anyhow::Result<(Config, String)> {
    // A missing .env is normal.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("WARNING: failed to load .env: {e}");
        }
    }

    let config_path = std::env::var(ENV_CONFIG).unwrap_or_else(|_| "config.toml".into());

    let mut config: Config = if std::path::Path::new(&config_path).exists() {
        let raw = std::fs::read_to_string(&config_path)
            .map_err(|e| anyhow::anyhow!("reading {config_path}: {e}"))?;
        toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {config_path}: {e}"))?
    } else {
        Config::default()
    };

    for issue in config.apply_env(|k| std::env::var(k).ok()) {
        eprintln!("WARNING: {issue}");
    }

    Ok((config, config_path))
}
