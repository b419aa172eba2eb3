#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Layered configuration for the `hearth` client.
//!
//! # Usage
//!
//! ```rust,no_run
//! use hearth_config::Config;
//!
//! let resolved = Config::load(None).unwrap();
//! println!("intents: {:?}", resolved.config.gateway.intents);
//! ```
//!
//! # Precedence
//!
//! From highest to lowest priority:
//!
//! 1. **Environment** (`HEARTH_TOKEN`, `HEARTH_LOG_LEVEL`,
//!    `HEARTH_LOG_FORMAT`, `HEARTH_INTENTS`)
//! 2. **Explicit file** (`--config <path>`)
//! 3. **User** (`<config dir>/hearth/config.toml`)
//! 4. **Embedded defaults** (`defaults.toml`)
//!
//! This crate does not depend on the gateway or telemetry crates.
//! Conversion into their runtime types happens in the binary.

/// Environment variable overrides.
pub mod env;
/// Configuration error types.
pub mod error;
/// Configuration file discovery and loading.
pub mod loader;
/// TOML layer merging.
pub mod merge;
/// Configuration struct definitions.
pub mod types;
/// Configuration validation rules.
pub mod validate;

pub use error::{ConfigError, ConfigResult};
pub use loader::ResolvedConfig;
pub use types::*;

impl Config {
    /// Load configuration with the full precedence chain.
    ///
    /// See [`loader::load`].
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if any layer is malformed or the merged
    /// configuration fails validation.
    pub fn load(explicit: Option<&std::path::Path>) -> ConfigResult<ResolvedConfig> {
        loader::load(explicit)
    }

    /// Load configuration from a single file (no layering).
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] if the file cannot be read, parsed or
    /// validated.
    pub fn load_file(path: &std::path::Path) -> ConfigResult<Self> {
        loader::load_file(path)
    }
}
