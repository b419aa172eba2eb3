//! Bridge from `hearth_config::Config` to the runtime types of the gateway
//! and telemetry crates.

use std::time::Duration;

use anyhow::{Context, Result, bail};
use hearth_config::Config;
use hearth_gateway::GatewayConfig;
use hearth_gateway::protocol::intents;
use hearth_telemetry::{FileRotation, LogConfig, LogFormat};

/// Convert config to [`GatewayConfig`].
///
/// # Errors
///
/// Fails when no token is configured or an intent name is unknown.
pub(crate) fn to_gateway_config(cfg: &Config) -> Result<GatewayConfig> {
    let Some(token) = cfg.gateway.token.as_deref() else {
        bail!("no bot token configured; set HEARTH_TOKEN or gateway.token");
    };

    let bits = intents::from_names(cfg.gateway.intents.iter().map(String::as_str))
        .map_err(|name| {
            anyhow::anyhow!(
                "unknown intent '{name}'; expected one of: {}",
                intents::names().collect::<Vec<_>>().join(", ")
            )
        })
        .context("invalid gateway.intents")?;

    let g = &cfg.gateway;
    let mut config = GatewayConfig::new(token).with_intents(bits);
    config.api_base.clone_from(&cfg.rest.api_base);
    config.api_version = cfg.rest.api_version;
    config.max_connect_attempts = g.max_connect_attempts;
    config.connect_retry_delay = Duration::from_secs(g.connect_retry_delay_secs);
    config.max_reconnect_attempts = g.max_reconnect_attempts;
    config.backoff_base = Duration::from_millis(g.backoff_base_ms);
    config.backoff_max = Duration::from_millis(g.backoff_max_ms);
    config.hello_timeout = Duration::from_secs(g.hello_timeout_secs);
    config.command_queue_capacity = g.command_queue_capacity;
    Ok(config)
}

/// Convert config to [`LogConfig`].
pub(crate) fn to_log_config(cfg: &Config) -> LogConfig {
    // Validated upstream; fall back to compact rather than fail startup.
    let format = cfg
        .logging
        .format
        .parse::<LogFormat>()
        .unwrap_or(LogFormat::Compact);

    let mut log_config = LogConfig::new(&cfg.logging.level).with_format(format);
    if let Some(dir) = &cfg.logging.directory {
        log_config = log_config.with_file_logging(dir, FileRotation::Daily);
    }
    for directive in &cfg.logging.directives {
        log_config = log_config.with_directive(directive);
    }

    log_config
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use hearth_telemetry::LogTarget;

    use super::*;

    fn with_token() -> Config {
        let mut cfg = Config::default();
        cfg.gateway.token = Some("abc".to_owned());
        cfg
    }

    #[test]
    fn gateway_config_from_defaults() {
        let config = to_gateway_config(&with_token()).unwrap();
        assert_eq!(config.token, "abc");
        assert_eq!(config.intents, intents::DEFAULT);
        assert_eq!(config.api_base, "https://discord.com/api");
        assert_eq!(config.api_version, 10);
        assert_eq!(config.max_connect_attempts, 5);
        assert_eq!(config.connect_retry_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.backoff_max, Duration::from_secs(60));
        assert_eq!(config.hello_timeout, Duration::from_secs(30));
    }

    #[test]
    fn intent_names_become_bits() {
        let mut cfg = with_token();
        cfg.gateway.intents = vec!["guilds".to_owned(), "GUILD_MEMBERS".to_owned()];
        let config = to_gateway_config(&cfg).unwrap();
        assert_eq!(config.intents, intents::GUILDS | intents::GUILD_MEMBERS);
    }

    #[test]
    fn unknown_intent_is_an_error() {
        let mut cfg = with_token();
        cfg.gateway.intents = vec!["guilds".to_owned(), "everything".to_owned()];
        let err = to_gateway_config(&cfg).unwrap_err();
        assert!(format!("{err:#}").contains("everything"));
    }

    #[test]
    fn missing_token_is_an_error() {
        let err = to_gateway_config(&Config::default()).unwrap_err();
        assert!(err.to_string().contains("HEARTH_TOKEN"));
    }

    #[test]
    fn log_config_follows_logging_section() {
        let mut cfg = Config::default();
        cfg.logging.level = "debug".to_owned();
        cfg.logging.format = "json".to_owned();
        cfg.logging.directives = vec!["hearth_cache=trace".to_owned()];

        let log = to_log_config(&cfg);
        assert_eq!(log.level, "debug");
        assert_eq!(log.format, LogFormat::Json);
        assert_eq!(log.target, LogTarget::Stderr);
        assert_eq!(log.directives, vec!["hearth_cache=trace".to_owned()]);
    }

    #[test]
    fn log_directory_selects_file_target() {
        let mut cfg = Config::default();
        cfg.logging.directory = Some(PathBuf::from("/var/log/hearth"));

        let log = to_log_config(&cfg);
        assert_eq!(log.target, LogTarget::File(PathBuf::from("/var/log/hearth")));
        assert!(!log.ansi);
    }
}
