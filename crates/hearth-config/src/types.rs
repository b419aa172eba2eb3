//! Configuration struct definitions.
//!
//! These types mirror the runtime settings of the gateway and logging crates
//! without depending on them. Every struct implements [`Default`] matching
//! `defaults.toml`, so a bare `[section]` header produces a working setup.

use std::path::PathBuf;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration for the `hearth` client.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Gateway session settings and credentials.
    pub gateway: GatewaySection,
    /// REST API endpoint.
    pub rest: RestSection,
    /// Logging level, format and target.
    pub logging: LoggingSection,
}

impl Config {
    /// Render the configuration as TOML. The token is never included.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

// ---------------------------------------------------------------------------
// GatewaySection
// ---------------------------------------------------------------------------

/// Gateway session settings.
#[derive(Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    /// Bot token. Prefer `HEARTH_TOKEN` over storing this in a file.
    pub token: Option<String>,
    /// Intent names (e.g. `"guilds"`, `"guild_members"`).
    pub intents: Vec<String>,
    /// Transport connection attempts per session.
    pub max_connect_attempts: u32,
    /// Delay between transport connection attempts, in seconds.
    pub connect_retry_delay_secs: u64,
    /// Consecutive sessions allowed to fail before giving up.
    pub max_reconnect_attempts: u32,
    /// Reconnect backoff base, in milliseconds.
    pub backoff_base_ms: u64,
    /// Reconnect backoff cap, in milliseconds.
    pub backoff_max_ms: u64,
    /// How long to wait for Hello, in seconds.
    pub hello_timeout_secs: u64,
    /// Capacity of the outbound command queue.
    pub command_queue_capacity: usize,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            token: None,
            intents: vec![
                "guilds".to_owned(),
                "guild_messages".to_owned(),
                "direct_messages".to_owned(),
            ],
            max_connect_attempts: 5,
            connect_retry_delay_secs: 5,
            max_reconnect_attempts: 10,
            backoff_base_ms: 1_000,
            backoff_max_ms: 60_000,
            hello_timeout_secs: 30,
            command_queue_capacity: 32,
        }
    }
}

impl std::fmt::Debug for GatewaySection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySection")
            .field("has_token", &self.token.is_some())
            .field("intents", &self.intents)
            .field("max_connect_attempts", &self.max_connect_attempts)
            .field("connect_retry_delay_secs", &self.connect_retry_delay_secs)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("backoff_base_ms", &self.backoff_base_ms)
            .field("backoff_max_ms", &self.backoff_max_ms)
            .field("hello_timeout_secs", &self.hello_timeout_secs)
            .field("command_queue_capacity", &self.command_queue_capacity)
            .finish()
    }
}

impl Serialize for GatewaySection {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("GatewaySection", 8)?;
        // token is omitted.
        state.serialize_field("intents", &self.intents)?;
        state.serialize_field("max_connect_attempts", &self.max_connect_attempts)?;
        state.serialize_field("connect_retry_delay_secs", &self.connect_retry_delay_secs)?;
        state.serialize_field("max_reconnect_attempts", &self.max_reconnect_attempts)?;
        state.serialize_field("backoff_base_ms", &self.backoff_base_ms)?;
        state.serialize_field("backoff_max_ms", &self.backoff_max_ms)?;
        state.serialize_field("hello_timeout_secs", &self.hello_timeout_secs)?;
        state.serialize_field("command_queue_capacity", &self.command_queue_capacity)?;
        state.end()
    }
}

// ---------------------------------------------------------------------------
// RestSection
// ---------------------------------------------------------------------------

/// REST API endpoint settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RestSection {
    /// Base URL without the version segment.
    pub api_base: String,
    /// API and gateway protocol version.
    pub api_version: u8,
}

impl Default for RestSection {
    fn default() -> Self {
        Self {
            api_base: "https://discord.com/api".to_owned(),
            api_version: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// LoggingSection
// ---------------------------------------------------------------------------

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Base level filter (`"trace"` through `"error"`).
    pub level: String,
    /// Output format: `"pretty"`, `"compact"`, `"json"` or `"full"`.
    pub format: String,
    /// Per-crate directives (e.g. `["hearth_gateway=debug"]`).
    pub directives: Vec<String>,
    /// Write rolling daily log files here instead of stderr.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_owned(),
            format: "compact".to_owned(),
            directives: Vec::new(),
            directory: None,
        }
    }
}

/// Log formats accepted in [`LoggingSection::format`].
pub const LOG_FORMATS: &[&str] = &["pretty", "compact", "json", "full"];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_token() {
        let mut section = GatewaySection::default();
        section.token = Some("very-secret-token".to_owned());

        let debug = format!("{section:?}");
        assert!(!debug.contains("very-secret-token"));
        assert!(debug.contains("has_token: true"));
    }

    #[test]
    fn serialize_omits_token() {
        let mut config = Config::default();
        config.gateway.token = Some("very-secret-token".to_owned());

        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("very-secret-token"));
        assert!(!json.contains("token"));

        let rendered = config.to_toml().unwrap();
        assert!(!rendered.contains("very-secret-token"));
        assert!(rendered.contains("[gateway]"));
    }

    #[test]
    fn bare_sections_use_defaults() {
        let config: Config = toml::from_str("[gateway]\n[logging]\n").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
            [gateway]
            token = "abc"
            max_connect_attempts = 2
        "#,
        )
        .unwrap();
        assert_eq!(config.gateway.token.as_deref(), Some("abc"));
        assert_eq!(config.gateway.max_connect_attempts, 2);
        assert_eq!(config.gateway.hello_timeout_secs, 30);
        assert_eq!(config.rest.api_version, 10);
    }
}
