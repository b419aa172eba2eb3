//! Hearth Telemetry - Logging for the Hearth gateway client.
//!
//! Builds a `tracing-subscriber` registry from a [`LogConfig`]: an
//! `EnvFilter` plus one fmt layer in the chosen format, writing to stdout,
//! stderr or a rolling file.
//!
//! # Example
//!
//! ```rust,no_run
//! use hearth_telemetry::{LogConfig, LogFormat, setup_logging};
//!
//! # fn main() -> Result<(), hearth_telemetry::TelemetryError> {
//! let config = LogConfig::new("info")
//!     .with_format(LogFormat::Compact)
//!     .with_directive("hearth_gateway=debug");
//!
//! setup_logging(&config)?;
//! tracing::info!("Logging ready");
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod prelude;

mod error;
mod logging;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{
    FileRotation, LogConfig, LogFormat, LogTarget, setup_default_logging, setup_logging,
};
