//! Hearth Test - Shared test utilities for the Hearth gateway client.
//!
//! Provides a scripted in-memory transport, a one-shot HTTP responder and
//! JSON fixtures for use as a dev-dependency.
//!
//! # Usage
//!
//! ```toml
//! [dev-dependencies]
//! hearth-test.workspace = true
//! ```
//!
//! ```rust,ignore
//! let (connector, mut server) = MockConnector::new();
//! let mut session = GatewaySession::new(test_config(), connector, GATEWAY_URL, ...);
//! session.connect(false).await?;
//! let peer = server.accept().await;
//! peer.hello(45_000);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod http;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use http::*;
pub use mocks::*;
