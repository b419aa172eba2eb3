//! Type-erased listener registry.
//!
//! Callers register a closure for a concrete [`DispatchEvent`] type. The
//! registry stores it behind [`ErasedListener`], keyed by the event's wire
//! name, and recovers the concrete type on invocation with a checked
//! downcast (or by decoding the raw payload, for event names the router has
//! no table entry for).

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use hearth_cache::{DispatchEvent, GuildState, StateCache};
use serde_json::Value;
use tracing::warn;

use crate::command::GatewayHandle;
use crate::error::GatewayResult;
use crate::protocol::RequestGuildMembers;
use crate::rest::RestClient;

/// Error type listeners return.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type listeners return.
pub type HandlerResult = Result<(), BoxError>;

/// Errors raised while invoking a listener.
#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    /// The listener received a value of the wrong type.
    #[error("listener for {expected} received a different event type")]
    TypeMismatch {
        /// Wire name the listener was registered for.
        expected: &'static str,
    },

    /// The raw payload did not decode into the listener's event type.
    #[error("payload does not match {expected}: {source}")]
    Decode {
        /// Wire name the listener was registered for.
        expected: &'static str,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// The listener itself failed.
    #[error("{0}")]
    Handler(BoxError),
}

/// What a listener sees: the cache after the event was applied, the guild
/// scope the event belongs to, and handles for talking back to the server.
pub struct ListenerContext<'a> {
    cache: &'a StateCache,
    guild: Option<&'a GuildState>,
    gateway: Option<&'a GatewayHandle>,
    rest: Option<&'a Arc<RestClient>>,
}

impl<'a> ListenerContext<'a> {
    pub(crate) fn new(
        cache: &'a StateCache,
        guild: Option<&'a GuildState>,
        gateway: Option<&'a GatewayHandle>,
        rest: Option<&'a Arc<RestClient>>,
    ) -> Self {
        Self {
            cache,
            guild,
            gateway,
            rest,
        }
    }

    /// The whole cache.
    #[must_use]
    pub fn cache(&self) -> &'a StateCache {
        self.cache
    }

    /// The guild scope of the event, if it has one and it is cached.
    #[must_use]
    pub fn guild(&self) -> Option<&'a GuildState> {
        self.guild
    }

    /// Handle for sending gateway commands.
    #[must_use]
    pub fn gateway(&self) -> Option<&'a GatewayHandle> {
        self.gateway
    }

    /// REST client, cloneable into spawned tasks.
    #[must_use]
    pub fn rest(&self) -> Option<&'a Arc<RestClient>> {
        self.rest
    }

    /// Ask the gateway for members of a guild.
    ///
    /// Returns `Ok(false)` without sending anything when the guild is
    /// unavailable or no gateway handle is attached.
    ///
    /// # Errors
    ///
    /// Returns an error if the command queue is full or closed.
    pub fn request_guild_members(&self, request: RequestGuildMembers) -> GatewayResult<bool> {
        if self
            .cache
            .guild(&request.guild_id)
            .is_some_and(GuildState::is_unavailable)
        {
            warn!(guild_id = %request.guild_id, "Not requesting members of unavailable guild");
            return Ok(false);
        }
        let Some(gateway) = self.gateway else {
            return Ok(false);
        };
        gateway.request_guild_members(request)?;
        Ok(true)
    }
}

impl fmt::Debug for ListenerContext<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerContext")
            .field("guild", &self.guild.map(GuildState::id))
            .field("has_gateway", &self.gateway.is_some())
            .field("has_rest", &self.rest.is_some())
            .finish_non_exhaustive()
    }
}

/// A listener with its event type erased.
pub trait ErasedListener: Send + Sync {
    /// Wire name of the event this listener handles.
    fn event_name(&self) -> &'static str;

    /// Invoke with an already decoded event.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::TypeMismatch`] if `event` is not the
    /// listener's type, or the listener's own error.
    fn invoke(&self, ctx: &ListenerContext<'_>, event: &dyn Any) -> Result<(), ListenerError>;

    /// Decode `raw` into the listener's type and invoke.
    ///
    /// # Errors
    ///
    /// Returns [`ListenerError::Decode`] if the payload does not match, or
    /// the listener's own error.
    fn invoke_raw(&self, ctx: &ListenerContext<'_>, raw: Value) -> Result<(), ListenerError>;
}

struct TypedListener<E, F> {
    handler: F,
    _event: PhantomData<fn(&E)>,
}

impl<E, F> ErasedListener for TypedListener<E, F>
where
    E: DispatchEvent,
    F: Fn(&ListenerContext<'_>, &E) -> HandlerResult + Send + Sync + 'static,
{
    fn event_name(&self) -> &'static str {
        E::NAME
    }

    fn invoke(&self, ctx: &ListenerContext<'_>, event: &dyn Any) -> Result<(), ListenerError> {
        let event = event
            .downcast_ref::<E>()
            .ok_or(ListenerError::TypeMismatch { expected: E::NAME })?;
        (self.handler)(ctx, event).map_err(ListenerError::Handler)
    }

    fn invoke_raw(&self, ctx: &ListenerContext<'_>, raw: Value) -> Result<(), ListenerError> {
        let event: E = serde_json::from_value(raw).map_err(|source| ListenerError::Decode {
            expected: E::NAME,
            source,
        })?;
        (self.handler)(ctx, &event).map_err(ListenerError::Handler)
    }
}

/// Listeners keyed by event wire name, at most one per name.
///
/// Registration happens before the session starts; the router only reads
/// the registry afterwards.
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: HashMap<&'static str, Box<dyn ErasedListener>>,
}

impl ListenerRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for events of type `E`.
    ///
    /// A second registration for the same event replaces the first. Returns
    /// `true` if a listener was replaced.
    pub fn on<E, F>(&mut self, handler: F) -> bool
    where
        E: DispatchEvent,
        F: Fn(&ListenerContext<'_>, &E) -> HandlerResult + Send + Sync + 'static,
    {
        let listener = TypedListener::<E, F> {
            handler,
            _event: PhantomData,
        };
        self.insert(Box::new(listener))
    }

    /// Register an already erased listener. Same replacement policy as
    /// [`on`](Self::on).
    pub fn insert(&mut self, listener: Box<dyn ErasedListener>) -> bool {
        let name = listener.event_name();
        let replaced = self.listeners.insert(name, listener).is_some();
        if replaced {
            warn!(event = name, "Replaced existing listener");
        }
        replaced
    }

    /// Unregister the listener for `event`. Returns `true` if one existed.
    pub fn remove(&mut self, event: &str) -> bool {
        self.listeners.remove(event).is_some()
    }

    /// Whether a listener is registered for `event`.
    #[must_use]
    pub fn contains(&self, event: &str) -> bool {
        self.listeners.contains_key(event)
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listener is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Invoke the listener for `event`, if any, with a decoded value.
    pub(crate) fn invoke(
        &self,
        event: &str,
        ctx: &ListenerContext<'_>,
        value: &dyn Any,
    ) -> Option<Result<(), ListenerError>> {
        self.listeners.get(event).map(|l| l.invoke(ctx, value))
    }

    /// Invoke the listener for `event`, if any, with the raw payload.
    pub(crate) fn invoke_raw(
        &self,
        event: &str,
        ctx: &ListenerContext<'_>,
        raw: Value,
    ) -> Option<Result<(), ListenerError>> {
        self.listeners.get(event).map(|l| l.invoke_raw(ctx, raw))
    }
}

impl fmt::Debug for ListenerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.listeners.keys().collect();
        names.sort();
        f.debug_struct("ListenerRegistry")
            .field("events", &names)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use hearth_cache::events::{GuildRoleDelete, MessageCreate, UserUpdate};
    use serde_json::json;

    use super::*;

    fn ctx(cache: &StateCache) -> ListenerContext<'_> {
        ListenerContext::new(cache, None, None, None)
    }

    fn user_update() -> UserUpdate {
        serde_json::from_value(json!({"id": "u1", "username": "ann"})).unwrap()
    }

    #[test]
    fn typed_listener_receives_event() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut registry = ListenerRegistry::new();
        assert!(!registry.on::<UserUpdate, _>(move |_ctx, ev| {
            sink.lock().unwrap().push(ev.0.username.clone());
            Ok(())
        }));

        let cache = StateCache::new();
        let result = registry.invoke("USER_UPDATE", &ctx(&cache), &user_update());
        assert!(result.unwrap().is_ok());
        assert_eq!(*seen.lock().unwrap(), vec!["ann"]);
    }

    #[test]
    fn downcast_mismatch_is_reported() {
        let mut registry = ListenerRegistry::new();
        registry.on::<UserUpdate, _>(|_, _| Ok(()));

        let cache = StateCache::new();
        let wrong: GuildRoleDelete =
            serde_json::from_value(json!({"guild_id": "g", "role_id": "r"})).unwrap();
        let err = registry
            .invoke("USER_UPDATE", &ctx(&cache), &wrong)
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ListenerError::TypeMismatch { expected: "USER_UPDATE" }));
    }

    #[test]
    fn second_registration_replaces_first() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut registry = ListenerRegistry::new();
        registry.on::<UserUpdate, _>(|_, _| Err("first listener should be gone".into()));

        let counter = Arc::clone(&calls);
        let replaced = registry.on::<UserUpdate, _>(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        assert!(replaced);
        assert_eq!(registry.len(), 1);

        let cache = StateCache::new();
        registry
            .invoke("USER_UPDATE", &ctx(&cache), &user_update())
            .unwrap()
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn handler_error_propagates() {
        let mut registry = ListenerRegistry::new();
        registry.on::<UserUpdate, _>(|_, _| Err("boom".into()));

        let cache = StateCache::new();
        let err = registry
            .invoke("USER_UPDATE", &ctx(&cache), &user_update())
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ListenerError::Handler(_)));
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn raw_invocation_decodes_inside_the_record() {
        let seen = Arc::new(Mutex::new(None));
        let sink = Arc::clone(&seen);
        let mut registry = ListenerRegistry::new();
        registry.on::<MessageCreate, _>(move |_, ev| {
            *sink.lock().unwrap() = Some(ev.0.content.clone());
            Ok(())
        });

        let cache = StateCache::new();
        let raw = json!({"id": "m1", "channel_id": "c1", "content": "hello"});
        registry
            .invoke_raw("MESSAGE_CREATE", &ctx(&cache), raw)
            .unwrap()
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("hello"));

        let err = registry
            .invoke_raw("MESSAGE_CREATE", &ctx(&cache), json!({"id": 1}))
            .unwrap()
            .unwrap_err();
        assert!(matches!(err, ListenerError::Decode { .. }));
    }

    #[test]
    fn remove_and_lookup() {
        let mut registry = ListenerRegistry::new();
        assert!(registry.is_empty());
        registry.on::<UserUpdate, _>(|_, _| Ok(()));
        assert!(registry.contains("USER_UPDATE"));
        assert!(registry.invoke("MESSAGE_CREATE", &ctx(&StateCache::new()), &()).is_none());
        assert!(registry.remove("USER_UPDATE"));
        assert!(!registry.remove("USER_UPDATE"));
        assert!(!registry.contains("USER_UPDATE"));
    }

    #[test]
    fn member_requests_skip_unavailable_guilds() {
        let mut cache = StateCache::new();
        let delete = serde_json::from_value(json!({"id": "g1", "unavailable": true})).unwrap();
        let create = serde_json::from_value(json!({"id": "g1"})).unwrap();
        cache.apply_guild_create(&create);
        cache.apply_guild_delete(&delete);

        let context = ctx(&cache);
        assert!(!context.request_guild_members(RequestGuildMembers::all("g1")).unwrap());
    }
}
