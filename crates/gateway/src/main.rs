use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use ellis_domain::config::{Config, LogFormat, ObservabilityConfig};
use ellis_gateway::bootstrap;
use ellis_gateway::channel::{TelegramBot, TelegramClient};
use ellis_gateway::cli::{Cli, Command, ConfigCommand};

/// Extra shutdown wait on top of the model timeout, for the final sendMessage.
const SHUTDOWN_SLACK: Duration = Duration::from_secs(5);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        // Default to serve when no subcommand is given.
        None | Some(Command::Serve) => {
            let (config, _config_path) = ellis_gateway::cli::load_config()?;
            init_tracing(&config.observability)?;
            serve(Arc::new(config)).await
        }
        Some(Command::Config(ConfigCommand::Validate)) => {
            let (config, config_path) = ellis_gateway::cli::load_config()?;
            let valid = ellis_gateway::cli::config::validate(&config, &config_path);
            if !valid {
                std::process::exit(1);
            }
            Ok(())
        }
        Some(Command::Config(ConfigCommand::Show)) => {
            let (config, _config_path) = ellis_gateway::cli::load_config()?;
            ellis_gateway::cli::config::show(&config);
            Ok(())
        }
        Some(Command::Run { message, thread }) => {
            init_cli_tracing();
            let (config, _) = ellis_gateway::cli::load_config()?;
            ellis_gateway::cli::run::run(Arc::new(config), message, thread).await
        }
        Some(Command::Version) => {
            println!("ellis {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

/// Initialize tracing for the long-running bot.
///
/// Stdout gets pretty or JSON output per `observability.format`; when
/// `observability.log_file` is set, the same events are also appended to
/// that file as plain text.
fn init_tracing(obs: &ObservabilityConfig) -> anyhow::Result<()> {
    let env_filter = || {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("info,ellis_gateway=debug"))
    };

    let stdout_layer = match obs.format {
        LogFormat::Pretty => tracing_subscriber::fmt::layer().boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer().json().boxed(),
    };

    let file_layer = match &obs.log_file {
        Some(path) => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("creating log dir {}", parent.display()))?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("opening log file {}", path.display()))?;
            Some(
                tracing_subscriber::fmt::layer()
                    .with_ansi(false)
                    .with_writer(Arc::new(file))
                    .with_filter(env_filter()),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(stdout_layer.with_filter(env_filter()))
        .with(file_layer)
        .init();

    Ok(())
}

/// Initialize compact stderr-only tracing for CLI one-shot commands.
///
/// Defaults to `warn` level so diagnostic output does not pollute stdout.
fn init_cli_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .compact()
        .init();
}

/// Run the Telegram bot until Ctrl-C.
async fn serve(config: Arc<Config>) -> anyhow::Result<()> {
    tracing::info!("Ellis starting");

    let bot_token = config
        .bot_token(|k| std::env::var(k).ok())
        .with_context(|| {
            format!(
                "no Telegram bot token: set {} or channel.bot_token",
                config.channel.bot_token_env
            )
        })?;

    let state = bootstrap::build_app_state(config.clone())?;

    let bot = Arc::new(TelegramBot::new(
        TelegramClient::new(&config.channel, &bot_token),
        state.executor.clone(),
        config.persona.greeting().to_owned(),
        Duration::from_millis(config.channel.retry_delay_ms),
    )
    // Long enough for a turn already at the model to finish.
    .with_shutdown_grace(Duration::from_millis(config.llm.timeout_ms) + SHUTDOWN_SLACK));

    // ── Graceful shutdown ─────────────────────────────────────────────
    let shutdown = Arc::new(tokio::sync::Notify::new());
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("shutdown signal received");
            shutdown.notify_one();
        });
    }

    bot.run(shutdown).await;

    tracing::info!(threads = state.store.thread_count(), "Ellis stopped");
    Ok(())
}
