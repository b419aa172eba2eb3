//! Dispatch router: event name to decode, cache mutation and listener.
//!
//! Runs synchronously inside the session's read loop, so the cache has a
//! single writer and events are applied strictly in receive order.

use std::sync::Arc;

use hearth_cache::events::{
    ChannelCreate, ChannelDelete, ChannelPinsUpdate, ChannelUpdate, GuildCreate, GuildDelete,
    GuildEmojisUpdate, GuildMemberAdd, GuildMemberRemove, GuildMemberUpdate, GuildMembersChunk,
    GuildRoleCreate, GuildRoleDelete, GuildRoleUpdate, GuildStickersUpdate, GuildUpdate,
    IntegrationCreate, IntegrationDelete, IntegrationUpdate, MessageCreate, MessageDelete,
    MessageDeleteBulk, MessageReactionAdd, MessageReactionRemove, MessageReactionRemoveAll,
    MessageReactionRemoveEmoji, MessageUpdate, Ready, Resumed, ThreadCreate, ThreadDelete,
    ThreadListSync, ThreadMemberUpdate, ThreadMembersUpdate, ThreadUpdate, UserUpdate,
    VoiceServerUpdate, VoiceStateUpdate, names,
};
use hearth_cache::{DispatchEvent, StateCache};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::command::GatewayHandle;
use crate::error::DispatchError;
use crate::listener::{ListenerContext, ListenerError, ListenerRegistry};
use crate::rest::RestClient;

/// What the router did with one dispatch event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A cache mutation ran. `changed` is `false` when it was dropped
    /// because its target was unknown.
    Applied {
        /// Whether the mutation reached its target.
        changed: bool,
    },
    /// The event only fed a listener.
    Observed,
    /// Nothing handled the event.
    Ignored,
    /// A new session was established.
    Ready {
        /// Session id for resuming.
        session_id: String,
        /// Gateway URL to resume on.
        resume_gateway_url: String,
    },
    /// A resume completed.
    Resumed,
}

/// Routes dispatch events into the cache and listeners.
#[derive(Debug)]
pub struct Router {
    cache: StateCache,
    listeners: ListenerRegistry,
    gateway: Option<GatewayHandle>,
    rest: Option<Arc<RestClient>>,
}

impl Router {
    /// Create a router with an empty cache.
    #[must_use]
    pub fn new(listeners: ListenerRegistry) -> Self {
        Self {
            cache: StateCache::new(),
            listeners,
            gateway: None,
            rest: None,
        }
    }

    /// Attach a REST client for listeners to use.
    #[must_use]
    pub fn with_rest(mut self, rest: Arc<RestClient>) -> Self {
        self.rest = Some(rest);
        self
    }

    pub(crate) fn set_gateway(&mut self, gateway: GatewayHandle) {
        self.gateway = Some(gateway);
    }

    /// The cache.
    #[must_use]
    pub fn cache(&self) -> &StateCache {
        &self.cache
    }

    /// The listener registry.
    #[must_use]
    pub fn listeners(&self) -> &ListenerRegistry {
        &self.listeners
    }

    /// Route one dispatch event.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] if the payload does not decode or a
    /// listener fails. Either way only this event is affected.
    pub fn dispatch(&mut self, event: &str, data: Value) -> Result<DispatchOutcome, DispatchError> {
        trace!(event, "Routing dispatch");
        match event {
            names::READY => self.ready(data),
            names::RESUMED => {
                let resumed: Resumed = decode(names::RESUMED, data)?;
                self.notify(&resumed, DispatchOutcome::Resumed)
            },

            names::GUILD_CREATE => self.apply(data, StateCache::apply_guild_create),
            names::GUILD_UPDATE => self.apply(data, StateCache::apply_guild_update),
            names::GUILD_DELETE => self.apply(data, StateCache::apply_guild_delete),

            names::CHANNEL_CREATE => self.apply(data, StateCache::apply_channel_create),
            names::CHANNEL_UPDATE => self.apply(data, StateCache::apply_channel_update),
            names::CHANNEL_DELETE => self.apply(data, StateCache::apply_channel_delete),
            names::CHANNEL_PINS_UPDATE => self.observe::<ChannelPinsUpdate>(data),

            names::THREAD_CREATE => self.apply(data, StateCache::apply_thread_create),
            names::THREAD_UPDATE => self.apply(data, StateCache::apply_thread_update),
            names::THREAD_DELETE => self.apply(data, StateCache::apply_thread_delete),
            names::THREAD_LIST_SYNC => self.apply(data, StateCache::apply_thread_list_sync),
            names::THREAD_MEMBER_UPDATE => {
                self.apply(data, StateCache::apply_thread_member_update)
            },
            names::THREAD_MEMBERS_UPDATE => {
                self.apply(data, StateCache::apply_thread_members_update)
            },

            names::GUILD_MEMBER_ADD => self.apply(data, StateCache::apply_member_add),
            names::GUILD_MEMBER_UPDATE => self.apply(data, StateCache::apply_member_update),
            names::GUILD_MEMBER_REMOVE => self.apply(data, StateCache::apply_member_remove),
            names::GUILD_MEMBERS_CHUNK => self.apply(data, StateCache::apply_members_chunk),

            names::GUILD_ROLE_CREATE => self.apply(data, StateCache::apply_role_create),
            names::GUILD_ROLE_UPDATE => self.apply(data, StateCache::apply_role_update),
            names::GUILD_ROLE_DELETE => self.apply(data, StateCache::apply_role_delete),
            names::GUILD_EMOJIS_UPDATE => self.apply(data, StateCache::apply_emojis_update),
            names::GUILD_STICKERS_UPDATE => self.apply(data, StateCache::apply_stickers_update),

            names::INTEGRATION_CREATE => self.apply(data, StateCache::apply_integration_create),
            names::INTEGRATION_UPDATE => self.apply(data, StateCache::apply_integration_update),
            names::INTEGRATION_DELETE => self.apply(data, StateCache::apply_integration_delete),

            names::MESSAGE_CREATE => self.observe::<MessageCreate>(data),
            names::MESSAGE_UPDATE => self.observe::<MessageUpdate>(data),
            names::MESSAGE_DELETE => self.observe::<MessageDelete>(data),
            names::MESSAGE_DELETE_BULK => self.observe::<MessageDeleteBulk>(data),
            names::MESSAGE_REACTION_ADD => self.observe::<MessageReactionAdd>(data),
            names::MESSAGE_REACTION_REMOVE => self.observe::<MessageReactionRemove>(data),
            names::MESSAGE_REACTION_REMOVE_ALL => self.observe::<MessageReactionRemoveAll>(data),
            names::MESSAGE_REACTION_REMOVE_EMOJI => {
                self.observe::<MessageReactionRemoveEmoji>(data)
            },

            names::VOICE_STATE_UPDATE => self.apply(data, StateCache::apply_voice_state_update),
            names::VOICE_SERVER_UPDATE => self.observe::<VoiceServerUpdate>(data),
            names::USER_UPDATE => self.apply(data, StateCache::apply_user_update),

            other => self.unknown(other, data),
        }
    }

    fn ready(&mut self, data: Value) -> Result<DispatchOutcome, DispatchError> {
        let ready: Ready = decode(names::READY, data)?;
        self.cache.apply_ready(&ready);
        let outcome = DispatchOutcome::Ready {
            session_id: ready.session_id.clone(),
            resume_gateway_url: ready.resume_gateway_url.clone(),
        };
        self.notify(&ready, outcome)
    }

    /// Decode, mutate, then notify.
    fn apply<E: DispatchEvent>(
        &mut self,
        data: Value,
        mutate: fn(&mut StateCache, &E) -> bool,
    ) -> Result<DispatchOutcome, DispatchError> {
        let event: E = decode(E::NAME, data)?;
        let changed = mutate(&mut self.cache, &event);
        debug!(event = E::NAME, changed, "Applied cache mutation");
        self.notify(&event, DispatchOutcome::Applied { changed })
    }

    /// Decode and notify; skipped entirely when nobody listens.
    fn observe<E: DispatchEvent>(&self, data: Value) -> Result<DispatchOutcome, DispatchError> {
        if !self.listeners.contains(E::NAME) {
            trace!(event = E::NAME, "No listener, skipping decode");
            return Ok(DispatchOutcome::Ignored);
        }
        let event: E = decode(E::NAME, data)?;
        self.notify(&event, DispatchOutcome::Observed)
    }

    /// Events without a table entry still reach a listener registered for
    /// them; it decodes the payload itself.
    fn unknown(&self, event: &str, data: Value) -> Result<DispatchOutcome, DispatchError> {
        let guild = data
            .get("guild_id")
            .and_then(Value::as_str)
            .and_then(|id| self.cache.guild(id));
        let ctx = self.context(guild);
        match self.listeners.invoke_raw(event, &ctx, data) {
            Some(result) => result
                .map(|()| DispatchOutcome::Observed)
                .map_err(|source| listener_error(event, source, DispatchOutcome::Observed)),
            None => {
                debug!(event, "Ignoring unknown dispatch event");
                Ok(DispatchOutcome::Ignored)
            },
        }
    }

    /// Invoke the listener for `event`, passing `outcome` through.
    fn notify<E: DispatchEvent>(
        &self,
        event: &E,
        outcome: DispatchOutcome,
    ) -> Result<DispatchOutcome, DispatchError> {
        let guild = event.guild_id().and_then(|id| self.cache.guild(id));
        let ctx = self.context(guild);
        match self.listeners.invoke(E::NAME, &ctx, event) {
            Some(Err(source)) => Err(listener_error(E::NAME, source, outcome)),
            Some(Ok(())) | None => Ok(outcome),
        }
    }

    fn context<'a>(
        &'a self,
        guild: Option<&'a hearth_cache::GuildState>,
    ) -> ListenerContext<'a> {
        ListenerContext::new(&self.cache, guild, self.gateway.as_ref(), self.rest.as_ref())
    }
}

fn decode<E: DispatchEvent>(event: &str, data: Value) -> Result<E, DispatchError> {
    // `d: null` is valid for payload-less events such as RESUMED.
    let data = if data.is_null() {
        Value::Object(Map::new())
    } else {
        data
    };
    serde_json::from_value(data).map_err(|source| DispatchError::Decode {
        event: event.to_owned(),
        source,
    })
}

fn listener_error(event: &str, source: ListenerError, outcome: DispatchOutcome) -> DispatchError {
    DispatchError::Listener {
        event: event.to_owned(),
        source,
        outcome,
    }
}
