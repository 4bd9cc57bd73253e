use pw_domain::config::{Config, ConfigSeverity};

/// Parse and validate the config, printing any issues.
///
/// Returns `false` when errors (not just warnings) were found.
pub fn validate(config: &Config, config_path: &str) -> bool {
    let issues = config.validate();

    if issues.is_empty() {
        println!("Config OK ({config_path})");
        return true;
    }

    let error_count = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    let warning_count = issues.len() - error_count;

    for issue in &issues {
        println!("{issue}");
    }

    println!(
        "\n{} error(s), {} warning(s) in {config_path}",
        error_count, warning_count,
    );

    error_count == 0
}

/// Log every issue; refuse to run when any of them is an error.
pub fn ensure_runnable(config: &Config, config_path: &str) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Error => tracing::error!(%issue, "config issue"),
            ConfigSeverity::Warning => tracing::warn!(%issue, "config issue"),
        }
    }
    let errors = issues
        .iter()
        .filter(|e| e.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("{errors} config error(s) in {config_path}");
    }
    Ok(())
}

/// Render the resolved config (all defaults filled in) as TOML.
///
/// Plaintext tokens are masked.
pub fn render(config: &Config) -> anyhow::Result<String> {
    let mut shown = config.clone();
    for token in [&mut shown.auth.access_token, &mut shown.auth.refresh_token] {
        if token.is_some() {
            *token = Some("[REDACTED]".into());
        }
    }
    Ok(toml::to_string_pretty(&shown)?)
}

pub fn show(config: &Config) -> anyhow::Result<()> {
    print!("{}", render(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_ping_interval_blocks_listen() {
        let config = Config::from_toml(
            r#"
[auth]
access_token_env = "PUSHWIRE_TOKEN"

[channel.keepalive]
ping_interval_secs = 0
"#,
        )
        .unwrap();
        let err = ensure_runnable(&config, "pushwire.toml").unwrap_err();
        assert!(err.to_string().contains("1 config error(s)"));
    }

    #[test]
    fn warnings_do_not_block_listen() {
        let config = Config::from_toml(
            r#"
[auth]
access_token_env = "PUSHWIRE_TOKEN"

[channel.keepalive]
pong_grace_secs = 10
"#,
        )
        .unwrap();
        assert!(config.validate().iter().all(|e| e.severity == ConfigSeverity::Warning));
        assert!(ensure_runnable(&config, "pushwire.toml").is_ok());
    }

    #[test]
    fn render_masks_tokens() {
        let config = Config::from_toml(
            r#"
[auth]
access_token = "Atza|secret"
"#,
        )
        .unwrap();
        let out = render(&config).unwrap();
        assert!(!out.contains("Atza|secret"));
        assert!(out.contains("[REDACTED]"));
        assert!(out.contains("ping_interval_secs = 180"));
    }
}
