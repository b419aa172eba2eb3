//! Configuration error types.

use thiserror::Error;

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A config file exists but could not be read.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// File path.
        path: String,
        /// Underlying IO error.
        source: std::io::Error,
    },

    /// A config file (or the merged tree) is not valid TOML for [`Config`](crate::Config).
    #[error("failed to parse config {path}: {source}")]
    ParseError {
        /// File path, or a `<...>` marker for in-memory layers.
        path: String,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// An environment override could not be applied.
    #[error("invalid value in {var}: {message}")]
    EnvError {
        /// Variable name.
        var: String,
        /// What was wrong.
        message: String,
    },

    /// The merged configuration failed validation.
    #[error("invalid config field {field}: {message}")]
    ValidationError {
        /// Dotted field path (e.g. `gateway.intents`).
        field: String,
        /// What was wrong.
        message: String,
    },
}

/// Result alias for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;
