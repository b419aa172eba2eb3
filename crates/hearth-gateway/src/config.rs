//! Runtime configuration for the gateway client.

use std::fmt;
use std::time::Duration;

use crate::protocol::{ConnectionProperties, PresenceUpdate, intents};

/// Default REST API base URL, without the version segment.
pub const DEFAULT_API_BASE: &str = "https://discord.com/api";

/// Default gateway protocol and REST API version.
pub const DEFAULT_API_VERSION: u8 = 10;

/// Settings for [`Client`](crate::Client) and
/// [`GatewaySession`](crate::GatewaySession).
#[derive(Clone)]
pub struct GatewayConfig {
    /// Bot token. Never logged.
    pub token: String,
    /// Intents bitmask sent with Identify.
    pub intents: u64,
    /// Client identification sent with Identify.
    pub properties: ConnectionProperties,
    /// Initial presence sent with Identify.
    pub presence: Option<PresenceUpdate>,
    /// REST API base URL, without the version segment.
    pub api_base: String,
    /// Gateway and REST API version.
    pub api_version: u8,
    /// Transport connection attempts per session before giving up.
    pub max_connect_attempts: u32,
    /// Fixed delay between transport connection attempts.
    pub connect_retry_delay: Duration,
    /// Consecutive sessions allowed to fail before becoming active.
    pub max_reconnect_attempts: u32,
    /// Base delay for reconnect backoff.
    pub backoff_base: Duration,
    /// Maximum reconnect backoff delay.
    pub backoff_max: Duration,
    /// How long to wait for Hello after the transport opens.
    pub hello_timeout: Duration,
    /// Capacity of the outbound command queue.
    pub command_queue_capacity: usize,
}

impl GatewayConfig {
    /// Default settings with the given token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            ..Self::default()
        }
    }

    /// Replace the intents bitmask.
    #[must_use]
    pub fn with_intents(mut self, intents: u64) -> Self {
        self.intents = intents;
        self
    }

    /// Set the initial presence.
    #[must_use]
    pub fn with_presence(mut self, presence: PresenceUpdate) -> Self {
        self.presence = Some(presence);
        self
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            token: String::new(),
            intents: intents::DEFAULT,
            properties: ConnectionProperties::default(),
            presence: None,
            api_base: DEFAULT_API_BASE.to_owned(),
            api_version: DEFAULT_API_VERSION,
            max_connect_attempts: 5,
            connect_retry_delay: Duration::from_secs(5),
            max_reconnect_attempts: 10,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            hello_timeout: Duration::from_secs(30),
            command_queue_capacity: 32,
        }
    }
}

impl fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("has_token", &!self.token.is_empty())
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .field("presence", &self.presence)
            .field("api_base", &self.api_base)
            .field("api_version", &self.api_version)
            .field("max_connect_attempts", &self.max_connect_attempts)
            .field("connect_retry_delay", &self.connect_retry_delay)
            .field("max_reconnect_attempts", &self.max_reconnect_attempts)
            .field("backoff_base", &self.backoff_base)
            .field("backoff_max", &self.backoff_max)
            .field("hello_timeout", &self.hello_timeout)
            .field("command_queue_capacity", &self.command_queue_capacity)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = GatewayConfig::default();
        assert_eq!(config.intents, intents::DEFAULT);
        assert_eq!(config.api_version, 10);
        assert_eq!(config.max_connect_attempts, 5);
        assert_eq!(config.connect_retry_delay, Duration::from_secs(5));
        assert_eq!(config.max_reconnect_attempts, 10);
        assert_eq!(config.backoff_base, Duration::from_secs(1));
        assert_eq!(config.backoff_max, Duration::from_secs(60));
        assert_eq!(config.hello_timeout, Duration::from_secs(30));
    }

    #[test]
    fn debug_hides_token() {
        let config = GatewayConfig::new("super-secret").with_intents(intents::GUILDS);
        let debug = format!("{config:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("has_token: true"));
        assert_eq!(config.intents, 1);
    }
}
