use ellis_domain::config::{Config, ConfigError, ConfigSeverity};

/// Validate the config plus the secrets it points at.
///
/// Returns `false` when any error-level issue was found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let mut issues = config.validate();
    issues.extend(secret_issues(config, |k| std::env::var(k).ok()));

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();

    for issue in &issues {
        println!("{issue}");
    }
    println!(
        "\n{errors} error(s), {} warning(s) in {config_path}",
        issues.len() - errors
    );

    errors == 0
}

/// Missing secrets are errors for `serve` but only warnings here: the
/// config itself may be fine and the env just not loaded in this shell.
fn secret_issues<F>(config: &Config, lookup: F) -> Vec<ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut issues = Vec::new();

    if config.bot_token(&lookup).is_none() {
        issues.push(ConfigError {
            severity: ConfigSeverity::Warning,
            field: "channel.bot_token_env".into(),
            message: format!("{} is not set", config.channel.bot_token_env),
        });
    }

    let auth = &config.llm.provider.auth;
    if auth.key.is_none() {
        if let Some(env) = &auth.env {
            if lookup(env).map_or(true, |v| v.trim().is_empty()) {
                issues.push(ConfigError {
                    severity: ConfigSeverity::Warning,
                    field: "llm.provider.auth.env".into(),
                    message: format!("{env} is not set"),
                });
            }
        }
    }

    issues
}

/// Dump the resolved config as TOML with plaintext secrets masked.
pub fn show(config: &Config) {
    let mut masked = config.clone();
    if masked.channel.bot_token.is_some() {
        masked.channel.bot_token = Some("***".into());
    }
    if masked.llm.provider.auth.key.is_some() {
        masked.llm.provider.auth.key = Some("***".into());
    }

    match toml::to_string_pretty(&masked) {
        Ok(output) => print!("{output}"),
        Err(e) => {
            eprintln!("Failed to serialize config: {e}");
            std::process::exit(1);
        }
    }
}
