//! Post-merge configuration validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{Config, LOG_FORMATS};

/// Validate a merged and deserialized configuration.
///
/// # Errors
///
/// Returns the first validation error found.
pub fn validate(config: &Config) -> ConfigResult<()> {
    validate_gateway(config)?;
    validate_rest(config)?;
    validate_logging(config)?;
    Ok(())
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_owned(),
        message: message.into(),
    }
}

fn validate_gateway(config: &Config) -> ConfigResult<()> {
    let g = &config.gateway;

    if g.intents.is_empty() {
        return Err(invalid("gateway.intents", "at least one intent is required"));
    }
    if g.intents.iter().any(|name| name.trim().is_empty()) {
        return Err(invalid("gateway.intents", "intent names must not be empty"));
    }
    if g.token.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(invalid("gateway.token", "token must not be blank"));
    }
    if g.max_connect_attempts == 0 {
        return Err(invalid(
            "gateway.max_connect_attempts",
            "must be at least 1",
        ));
    }
    if g.backoff_base_ms > g.backoff_max_ms {
        return Err(invalid(
            "gateway.backoff_base_ms",
            format!(
                "backoff_base_ms ({}) must not exceed backoff_max_ms ({})",
                g.backoff_base_ms, g.backoff_max_ms
            ),
        ));
    }
    if g.hello_timeout_secs == 0 {
        return Err(invalid("gateway.hello_timeout_secs", "must be at least 1"));
    }
    if g.command_queue_capacity == 0 {
        return Err(invalid(
            "gateway.command_queue_capacity",
            "must be at least 1",
        ));
    }

    Ok(())
}

fn validate_rest(config: &Config) -> ConfigResult<()> {
    let base = config.rest.api_base.trim();
    if base.is_empty() {
        return Err(invalid("rest.api_base", "must not be empty"));
    }
    if !(base.starts_with("https://") || base.starts_with("http://")) {
        return Err(invalid(
            "rest.api_base",
            format!("'{base}' is not an http(s) URL"),
        ));
    }
    if config.rest.api_version == 0 {
        return Err(invalid("rest.api_version", "must be at least 1"));
    }
    Ok(())
}

fn validate_logging(config: &Config) -> ConfigResult<()> {
    let l = &config.logging;

    if !LOG_FORMATS.contains(&l.format.as_str()) {
        return Err(invalid(
            "logging.format",
            format!(
                "unsupported format '{}'; expected one of: {}",
                l.format,
                LOG_FORMATS.join(", ")
            ),
        ));
    }
    if l.level.trim().is_empty() {
        return Err(invalid("logging.level", "must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn field_of(result: ConfigResult<()>) -> String {
        match result {
            Err(ConfigError::ValidationError { field, .. }) => field,
            other => panic!("expected a validation error, got {other:?}"),
        }
    }

    #[test]
    fn defaults_are_valid() {
        assert!(validate(&Config::default()).is_ok());
    }

    #[test]
    fn empty_intents_rejected() {
        let mut config = Config::default();
        config.gateway.intents.clear();
        assert_eq!(field_of(validate(&config)), "gateway.intents");

        config.gateway.intents = vec!["guilds".to_owned(), " ".to_owned()];
        assert_eq!(field_of(validate(&config)), "gateway.intents");
    }

    #[test]
    fn zero_connect_attempts_rejected() {
        let mut config = Config::default();
        config.gateway.max_connect_attempts = 0;
        assert_eq!(field_of(validate(&config)), "gateway.max_connect_attempts");
    }

    #[test]
    fn backoff_base_above_cap_rejected() {
        let mut config = Config::default();
        config.gateway.backoff_base_ms = 70_000;
        assert_eq!(field_of(validate(&config)), "gateway.backoff_base_ms");
    }

    #[test]
    fn unknown_log_format_rejected() {
        let mut config = Config::default();
        config.logging.format = "xml".to_owned();
        assert_eq!(field_of(validate(&config)), "logging.format");
    }

    #[test]
    fn empty_api_base_rejected() {
        let mut config = Config::default();
        config.rest.api_base = "  ".to_owned();
        assert_eq!(field_of(validate(&config)), "rest.api_base");

        config.rest.api_base = "discord.com/api".to_owned();
        assert_eq!(field_of(validate(&config)), "rest.api_base");
    }

    #[test]
    fn blank_token_rejected() {
        let mut config = Config::default();
        config.gateway.token = Some(String::new());
        assert_eq!(field_of(validate(&config)), "gateway.token");
    }
}
