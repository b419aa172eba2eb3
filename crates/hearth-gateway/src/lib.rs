//! Hearth gateway client.
//!
//! Keeps one gateway session alive across reconnects, feeds every dispatch
//! event through a [`Router`] into a [`StateCache`](hearth_cache::StateCache),
//! and hands decoded events to typed listeners.
//!
//! # Example
//!
//! ```no_run
//! use hearth_gateway::prelude::*;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), GatewayError> {
//! let mut client = Client::new(GatewayConfig::new("bot-token"));
//! client.on::<GuildCreate, _>(|ctx, ev| {
//!     println!("{} members in {}", ctx.cache().members(&ev.guild.id).len(), ev.guild.name);
//!     Ok(())
//! });
//! client.run(CancellationToken::new()).await
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod client;
pub mod command;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod listener;
pub mod prelude;
pub mod protocol;
pub mod rest;
pub mod session;
pub mod transport;

mod backoff;
mod heartbeat;

pub use client::Client;
pub use command::{GatewayCommand, GatewayHandle};
pub use config::GatewayConfig;
pub use dispatch::{DispatchOutcome, Router};
pub use error::{DispatchError, GatewayError, GatewayResult, RestError, RestResult};
pub use listener::{
    BoxError, ErasedListener, HandlerResult, ListenerContext, ListenerError, ListenerRegistry,
};
pub use rest::RestClient;
pub use session::{ConnectionState, GatewaySession, SessionData, SessionEnd};
pub use transport::{Connection, Connector, FrameSink, FrameStream, WsConnector};
