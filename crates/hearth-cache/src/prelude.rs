//! Prelude module - commonly used types for convenient import.
//!
//! Use `use hearth_cache::prelude::*;` to bring the cache, the event trait
//! and every event payload into scope.

// Cache
pub use crate::{GuildState, StateCache};

// Events
pub use crate::DispatchEvent;
pub use crate::events::*;

// Entities
pub use crate::model::{
    Channel, Emoji, GuildInfo, Integration, Member, Message, Role, Sticker, ThreadMember, User,
    VoiceState,
};
