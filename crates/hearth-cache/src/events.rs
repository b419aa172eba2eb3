//! Typed dispatch event payloads.
//!
//! Every event type implements [`DispatchEvent`], which ties the payload to
//! its wire name and exposes the guild it is scoped to. The wire names are
//! also collected in [`names`] for the router's match table.

use chrono::{DateTime, Utc};
use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::model::{
    Channel, Emoji, GuildInfo, Integration, Member, Message, Role, Sticker, ThreadMember,
    UnavailableGuild, User, VoiceState,
};

/// Wire names of the dispatch events this crate models.
pub mod names {
    #![allow(missing_docs)]

    pub const READY: &str = "READY";
    pub const RESUMED: &str = "RESUMED";
    pub const GUILD_CREATE: &str = "GUILD_CREATE";
    pub const GUILD_UPDATE: &str = "GUILD_UPDATE";
    pub const GUILD_DELETE: &str = "GUILD_DELETE";
    pub const CHANNEL_CREATE: &str = "CHANNEL_CREATE";
    pub const CHANNEL_UPDATE: &str = "CHANNEL_UPDATE";
    pub const CHANNEL_DELETE: &str = "CHANNEL_DELETE";
    pub const CHANNEL_PINS_UPDATE: &str = "CHANNEL_PINS_UPDATE";
    pub const THREAD_CREATE: &str = "THREAD_CREATE";
    pub const THREAD_UPDATE: &str = "THREAD_UPDATE";
    pub const THREAD_DELETE: &str = "THREAD_DELETE";
    pub const THREAD_LIST_SYNC: &str = "THREAD_LIST_SYNC";
    pub const THREAD_MEMBER_UPDATE: &str = "THREAD_MEMBER_UPDATE";
    pub const THREAD_MEMBERS_UPDATE: &str = "THREAD_MEMBERS_UPDATE";
    pub const GUILD_MEMBER_ADD: &str = "GUILD_MEMBER_ADD";
    pub const GUILD_MEMBER_UPDATE: &str = "GUILD_MEMBER_UPDATE";
    pub const GUILD_MEMBER_REMOVE: &str = "GUILD_MEMBER_REMOVE";
    pub const GUILD_MEMBERS_CHUNK: &str = "GUILD_MEMBERS_CHUNK";
    pub const GUILD_ROLE_CREATE: &str = "GUILD_ROLE_CREATE";
    pub const GUILD_ROLE_UPDATE: &str = "GUILD_ROLE_UPDATE";
    pub const GUILD_ROLE_DELETE: &str = "GUILD_ROLE_DELETE";
    pub const GUILD_EMOJIS_UPDATE: &str = "GUILD_EMOJIS_UPDATE";
    pub const GUILD_STICKERS_UPDATE: &str = "GUILD_STICKERS_UPDATE";
    pub const INTEGRATION_CREATE: &str = "INTEGRATION_CREATE";
    pub const INTEGRATION_UPDATE: &str = "INTEGRATION_UPDATE";
    pub const INTEGRATION_DELETE: &str = "INTEGRATION_DELETE";
    pub const MESSAGE_CREATE: &str = "MESSAGE_CREATE";
    pub const MESSAGE_UPDATE: &str = "MESSAGE_UPDATE";
    pub const MESSAGE_DELETE: &str = "MESSAGE_DELETE";
    pub const MESSAGE_DELETE_BULK: &str = "MESSAGE_DELETE_BULK";
    pub const MESSAGE_REACTION_ADD: &str = "MESSAGE_REACTION_ADD";
    pub const MESSAGE_REACTION_REMOVE: &str = "MESSAGE_REACTION_REMOVE";
    pub const MESSAGE_REACTION_REMOVE_ALL: &str = "MESSAGE_REACTION_REMOVE_ALL";
    pub const MESSAGE_REACTION_REMOVE_EMOJI: &str = "MESSAGE_REACTION_REMOVE_EMOJI";
    pub const VOICE_STATE_UPDATE: &str = "VOICE_STATE_UPDATE";
    pub const VOICE_SERVER_UPDATE: &str = "VOICE_SERVER_UPDATE";
    pub const USER_UPDATE: &str = "USER_UPDATE";
}

/// A decoded dispatch payload bound to its wire name.
pub trait DispatchEvent: DeserializeOwned + Send + Sync + 'static {
    /// The `t` field this payload arrives under.
    const NAME: &'static str;

    /// The guild this event is scoped to, if any.
    fn guild_id(&self) -> Option<&str>;
}

macro_rules! dispatch_event {
    ($ty:ty => $name:expr, |$ev:ident| $guild:expr) => {
        impl DispatchEvent for $ty {
            const NAME: &'static str = $name;

            fn guild_id(&self) -> Option<&str> {
                let $ev = self;
                $guild
            }
        }
    };
    ($ty:ty => $name:expr) => {
        dispatch_event!($ty => $name, |ev| Some(ev.guild_id.as_str()));
    };
}

/// Distinguishes an absent field from an explicit `null`.
///
/// Used with `#[serde(default)]`: absent yields `None`, `null` yields
/// `Some(None)`, a value yields `Some(Some(v))`.
fn explicit_null<'de, T, D>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

// ── Session ─────────────────────────────────────────────────

/// First dispatch of a freshly identified session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ready {
    /// Gateway protocol version.
    #[serde(default)]
    pub v: u8,
    /// The current user.
    pub user: User,
    /// Guilds the user is in, all initially unavailable.
    #[serde(default)]
    pub guilds: Vec<UnavailableGuild>,
    /// Session id for resuming.
    pub session_id: String,
    /// Gateway URL to use when resuming this session.
    #[serde(default)]
    pub resume_gateway_url: String,
    /// Partial application object.
    #[serde(default)]
    pub application: Option<Value>,
}

dispatch_event!(Ready => names::READY, |_ev| None);

/// Confirmation that a resume replayed all missed events.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Resumed {}

dispatch_event!(Resumed => names::RESUMED, |_ev| None);

// ── Guilds ──────────────────────────────────────────────────

/// A guild became available: initial load, outage recovery, or join.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildCreate {
    /// Guild metadata and role/emoji/sticker lists.
    #[serde(flatten)]
    pub guild: GuildInfo,
    /// When the current user joined.
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    /// Whether the guild is considered large.
    #[serde(default)]
    pub large: bool,
    /// Set when the guild is still unavailable.
    #[serde(default)]
    pub unavailable: Option<bool>,
    /// Total member count.
    #[serde(default)]
    pub member_count: Option<u64>,
    /// Voice states, lacking `guild_id` and `member`.
    #[serde(default)]
    pub voice_states: Vec<VoiceState>,
    /// Members known at load time.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Standing channels.
    #[serde(default)]
    pub channels: Vec<Channel>,
    /// Active threads visible to the current user.
    #[serde(default)]
    pub threads: Vec<Channel>,
}

dispatch_event!(GuildCreate => names::GUILD_CREATE, |ev| Some(ev.guild.id.as_str()));

/// Guild settings changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildUpdate(pub GuildInfo);

dispatch_event!(GuildUpdate => names::GUILD_UPDATE, |ev| Some(ev.0.id.as_str()));

/// The user left or was removed from a guild, or the guild went down.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GuildDelete(pub UnavailableGuild);

dispatch_event!(GuildDelete => names::GUILD_DELETE, |ev| Some(ev.0.id.as_str()));

// ── Channels & threads ──────────────────────────────────────

/// A channel was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelCreate(pub Channel);

/// A channel was updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelUpdate(pub Channel);

/// A channel was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelDelete(pub Channel);

/// A thread was created or the user was added to a private thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadCreate(pub Channel);

/// A thread was updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadUpdate(pub Channel);

/// A thread was deleted. Only `id`, `guild_id`, `parent_id` and `type` are set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadDelete(pub Channel);

dispatch_event!(ChannelCreate => names::CHANNEL_CREATE, |ev| ev.0.guild_id.as_deref());
dispatch_event!(ChannelUpdate => names::CHANNEL_UPDATE, |ev| ev.0.guild_id.as_deref());
dispatch_event!(ChannelDelete => names::CHANNEL_DELETE, |ev| ev.0.guild_id.as_deref());
dispatch_event!(ThreadCreate => names::THREAD_CREATE, |ev| ev.0.guild_id.as_deref());
dispatch_event!(ThreadUpdate => names::THREAD_UPDATE, |ev| ev.0.guild_id.as_deref());
dispatch_event!(ThreadDelete => names::THREAD_DELETE, |ev| ev.0.guild_id.as_deref());

/// A message was pinned or unpinned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelPinsUpdate {
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Channel id.
    pub channel_id: String,
    /// Time of the most recent pin.
    #[serde(default)]
    pub last_pin_timestamp: Option<DateTime<Utc>>,
}

dispatch_event!(ChannelPinsUpdate => names::CHANNEL_PINS_UPDATE, |ev| ev.guild_id.as_deref());

/// The full set of active threads for some channels after gaining access.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadListSync {
    /// Guild id.
    pub guild_id: String,
    /// Parent channels being synced. Absent means the whole guild.
    #[serde(default)]
    pub channel_ids: Option<Vec<String>>,
    /// Active threads in those channels.
    #[serde(default)]
    pub threads: Vec<Channel>,
    /// The current user's memberships in the synced threads.
    #[serde(default)]
    pub members: Vec<ThreadMember>,
}

dispatch_event!(ThreadListSync => names::THREAD_LIST_SYNC);

/// The current user's thread membership changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMemberUpdate {
    /// The updated membership.
    #[serde(flatten)]
    pub member: ThreadMember,
    /// Guild id.
    pub guild_id: String,
}

dispatch_event!(ThreadMemberUpdate => names::THREAD_MEMBER_UPDATE);

/// Users were added to or removed from a thread.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreadMembersUpdate {
    /// Thread id.
    pub id: String,
    /// Guild id.
    pub guild_id: String,
    /// Approximate member count, capped at 50.
    #[serde(default)]
    pub member_count: u32,
    /// Added users.
    #[serde(default)]
    pub added_members: Vec<ThreadMember>,
    /// Removed user ids.
    #[serde(default)]
    pub removed_member_ids: Vec<String>,
}

dispatch_event!(ThreadMembersUpdate => names::THREAD_MEMBERS_UPDATE);

// ── Members ─────────────────────────────────────────────────

/// A user joined a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberAdd {
    /// The new member.
    #[serde(flatten)]
    pub member: Member,
    /// Guild id.
    pub guild_id: String,
}

dispatch_event!(GuildMemberAdd => names::GUILD_MEMBER_ADD);

/// A partial member update.
///
/// `flags` and `permissions` are never carried. Fields typed
/// `Option<Option<T>>` distinguish "not sent" (`None`) from "cleared"
/// (`Some(None)`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberUpdate {
    /// Guild id.
    pub guild_id: String,
    /// The member's user.
    pub user: User,
    /// Full role list.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Nickname.
    #[serde(default, deserialize_with = "explicit_null")]
    pub nick: Option<Option<String>>,
    /// Guild avatar.
    #[serde(default, deserialize_with = "explicit_null")]
    pub avatar: Option<Option<String>>,
    /// Join time.
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    /// Boost start.
    #[serde(default, deserialize_with = "explicit_null")]
    pub premium_since: Option<Option<DateTime<Utc>>>,
    /// Server-side deafen.
    #[serde(default)]
    pub deaf: Option<bool>,
    /// Server-side mute.
    #[serde(default)]
    pub mute: Option<bool>,
    /// Membership screening state.
    #[serde(default)]
    pub pending: Option<bool>,
    /// Timeout expiry.
    #[serde(default, deserialize_with = "explicit_null")]
    pub communication_disabled_until: Option<Option<DateTime<Utc>>>,
}

dispatch_event!(GuildMemberUpdate => names::GUILD_MEMBER_UPDATE);

/// A user left or was removed from a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMemberRemove {
    /// Guild id.
    pub guild_id: String,
    /// The removed user.
    pub user: User,
}

dispatch_event!(GuildMemberRemove => names::GUILD_MEMBER_REMOVE);

/// One chunk of a request-guild-members response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildMembersChunk {
    /// Guild id.
    pub guild_id: String,
    /// Members in this chunk.
    #[serde(default)]
    pub members: Vec<Member>,
    /// Index of this chunk.
    #[serde(default)]
    pub chunk_index: u32,
    /// Total number of chunks.
    #[serde(default)]
    pub chunk_count: u32,
    /// Requested ids that do not exist.
    #[serde(default)]
    pub not_found: Vec<String>,
    /// Nonce from the request.
    #[serde(default)]
    pub nonce: Option<String>,
}

dispatch_event!(GuildMembersChunk => names::GUILD_MEMBERS_CHUNK);

// ── Roles, emoji, stickers ──────────────────────────────────

/// A role was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleCreate {
    /// Guild id.
    pub guild_id: String,
    /// The new role.
    pub role: Role,
}

/// A role was updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleUpdate {
    /// Guild id.
    pub guild_id: String,
    /// The updated role.
    pub role: Role,
}

/// A role was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildRoleDelete {
    /// Guild id.
    pub guild_id: String,
    /// Deleted role id.
    pub role_id: String,
}

dispatch_event!(GuildRoleCreate => names::GUILD_ROLE_CREATE);
dispatch_event!(GuildRoleUpdate => names::GUILD_ROLE_UPDATE);
dispatch_event!(GuildRoleDelete => names::GUILD_ROLE_DELETE);

/// Replacement emoji list for a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildEmojisUpdate {
    /// Guild id.
    pub guild_id: String,
    /// The complete emoji list.
    pub emojis: Vec<Emoji>,
}

dispatch_event!(GuildEmojisUpdate => names::GUILD_EMOJIS_UPDATE);

/// Replacement sticker list for a guild.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuildStickersUpdate {
    /// Guild id.
    pub guild_id: String,
    /// The complete sticker list.
    pub stickers: Vec<Sticker>,
}

dispatch_event!(GuildStickersUpdate => names::GUILD_STICKERS_UPDATE);

// ── Integrations ────────────────────────────────────────────

/// An integration was created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationCreate {
    /// The integration.
    #[serde(flatten)]
    pub integration: Integration,
    /// Guild id.
    pub guild_id: String,
}

/// An integration was updated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationUpdate {
    /// The integration.
    #[serde(flatten)]
    pub integration: Integration,
    /// Guild id.
    pub guild_id: String,
}

/// An integration was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntegrationDelete {
    /// Integration id.
    pub id: String,
    /// Guild id.
    pub guild_id: String,
    /// Bot or OAuth2 application behind the integration.
    #[serde(default)]
    pub application_id: Option<String>,
}

dispatch_event!(IntegrationCreate => names::INTEGRATION_CREATE);
dispatch_event!(IntegrationUpdate => names::INTEGRATION_UPDATE);
dispatch_event!(IntegrationDelete => names::INTEGRATION_DELETE);

// ── Messages & reactions ────────────────────────────────────

/// A message was sent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageCreate(pub Message);

/// A message was edited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageUpdate(pub Message);

dispatch_event!(MessageCreate => names::MESSAGE_CREATE, |ev| ev.0.guild_id.as_deref());
dispatch_event!(MessageUpdate => names::MESSAGE_UPDATE, |ev| ev.0.guild_id.as_deref());

/// A message was deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDelete {
    /// Message id.
    pub id: String,
    /// Channel id.
    pub channel_id: String,
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// Several messages were deleted at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeleteBulk {
    /// Message ids.
    pub ids: Vec<String>,
    /// Channel id.
    pub channel_id: String,
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
}

dispatch_event!(MessageDelete => names::MESSAGE_DELETE, |ev| ev.guild_id.as_deref());
dispatch_event!(MessageDeleteBulk => names::MESSAGE_DELETE_BULK, |ev| ev.guild_id.as_deref());

/// A user reacted to a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionAdd {
    /// Reacting user.
    pub user_id: String,
    /// Channel id.
    pub channel_id: String,
    /// Message id.
    pub message_id: String,
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Reacting member, for guild reactions.
    #[serde(default)]
    pub member: Option<Member>,
    /// Emoji used.
    pub emoji: Emoji,
    /// Author of the reacted message.
    #[serde(default)]
    pub message_author_id: Option<String>,
}

/// A user removed a reaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionRemove {
    /// User whose reaction was removed.
    pub user_id: String,
    /// Channel id.
    pub channel_id: String,
    /// Message id.
    pub message_id: String,
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Emoji removed.
    pub emoji: Emoji,
}

/// All reactions were removed from a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionRemoveAll {
    /// Channel id.
    pub channel_id: String,
    /// Message id.
    pub message_id: String,
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
}

/// All reactions with one emoji were removed from a message.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReactionRemoveEmoji {
    /// Channel id.
    pub channel_id: String,
    /// Message id.
    pub message_id: String,
    /// Guild id.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Emoji removed.
    pub emoji: Emoji,
}

dispatch_event!(MessageReactionAdd => names::MESSAGE_REACTION_ADD, |ev| ev.guild_id.as_deref());
dispatch_event!(MessageReactionRemove => names::MESSAGE_REACTION_REMOVE, |ev| ev.guild_id.as_deref());
dispatch_event!(MessageReactionRemoveAll => names::MESSAGE_REACTION_REMOVE_ALL, |ev| ev.guild_id.as_deref());
dispatch_event!(MessageReactionRemoveEmoji => names::MESSAGE_REACTION_REMOVE_EMOJI, |ev| ev.guild_id.as_deref());

// ── Voice & user ────────────────────────────────────────────

/// A user joined, left, or moved between voice channels.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VoiceStateUpdate(pub VoiceState);

dispatch_event!(VoiceStateUpdate => names::VOICE_STATE_UPDATE, |ev| ev.0.guild_id.as_deref());

/// The voice server for a guild changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceServerUpdate {
    /// Voice connection token.
    pub token: String,
    /// Guild id.
    pub guild_id: String,
    /// Voice server host; `None` while a new server is allocated.
    #[serde(default)]
    pub endpoint: Option<String>,
}

dispatch_event!(VoiceServerUpdate => names::VOICE_SERVER_UPDATE);

/// Properties of the current user changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserUpdate(pub User);

dispatch_event!(UserUpdate => names::USER_UPDATE, |_ev| None);
