//! Common imports for gateway clients.
//!
//! ```
//! use hearth_gateway::prelude::*;
//! ```

pub use crate::{
    Client, ConnectionState, DispatchOutcome, GatewayCommand, GatewayConfig, GatewayError,
    GatewayHandle, GatewayResult, GatewaySession, HandlerResult, ListenerContext,
    ListenerRegistry, RestClient, SessionEnd,
};
pub use crate::protocol::{Activity, PresenceUpdate, RequestGuildMembers, VoiceStateCommand};
pub use hearth_cache::prelude::*;
