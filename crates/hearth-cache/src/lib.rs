#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]
//! Guild state cache for the Hearth gateway client.
//!
//! The cache holds one [`GuildState`] per guild and is rebuilt incrementally
//! from dispatch events. Each event type in [`events`] has exactly one
//! mutation on [`StateCache`]; the gateway's dispatch router picks it by
//! event name and applies it before any listener runs.
//!
//! # Example
//!
//! ```rust
//! use hearth_cache::prelude::*;
//!
//! let mut cache = StateCache::new();
//! let create: GuildCreate = serde_json::from_value(serde_json::json!({
//!     "id": "g1",
//!     "name": "Hearth",
//!     "members": [{"user": {"id": "u1", "username": "ann"}, "roles": []}],
//! }))
//! .unwrap();
//!
//! cache.apply_guild_create(&create);
//! assert_eq!(cache.members("g1").len(), 1);
//! ```
//!
//! # Design
//!
//! This crate performs no I/O and has no dependencies on other hearth
//! crates. Mutations never fail: events aimed at an unknown guild or entity
//! are logged and dropped, leaving the cache unchanged.

/// The guild registry and event mutations.
pub mod cache;
pub mod events;
/// Per-guild state.
pub mod guild;
pub mod model;
pub mod prelude;

pub use cache::StateCache;
pub use events::DispatchEvent;
pub use guild::GuildState;
