//! Wire schemas for the entities held in the cache.
//!
//! These are plain data types mirroring the JSON objects the gateway sends.
//! Fields the cache never inspects are either omitted (serde ignores unknown
//! keys) or kept verbatim in an `extra` map where the object is stored and
//! handed back to listeners.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Channel type tags.
pub mod channel_kind {
    /// Text channel within a guild.
    pub const GUILD_TEXT: u8 = 0;
    /// Direct message between users.
    pub const DM: u8 = 1;
    /// Voice channel within a guild.
    pub const GUILD_VOICE: u8 = 2;
    /// Direct message between multiple users.
    pub const GROUP_DM: u8 = 3;
    /// Organizational category.
    pub const GUILD_CATEGORY: u8 = 4;
    /// Announcement channel.
    pub const GUILD_ANNOUNCEMENT: u8 = 5;
    /// Thread inside an announcement channel.
    pub const ANNOUNCEMENT_THREAD: u8 = 10;
    /// Public thread.
    pub const PUBLIC_THREAD: u8 = 11;
    /// Private thread.
    pub const PRIVATE_THREAD: u8 = 12;
    /// Stage voice channel.
    pub const GUILD_STAGE_VOICE: u8 = 13;
    /// Channel listing servers in a student hub.
    pub const GUILD_DIRECTORY: u8 = 14;
    /// Forum channel holding only threads.
    pub const GUILD_FORUM: u8 = 15;
    /// Media channel holding only threads.
    pub const GUILD_MEDIA: u8 = 16;

    /// Returns `true` if the tag denotes a thread.
    #[must_use]
    pub fn is_thread(kind: u8) -> bool {
        matches!(kind, ANNOUNCEMENT_THREAD | PUBLIC_THREAD | PRIVATE_THREAD)
    }
}

/// A user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// User id.
    pub id: String,
    /// Username, not unique across the platform.
    #[serde(default)]
    pub username: String,
    /// Legacy discriminator.
    #[serde(default)]
    pub discriminator: Option<String>,
    /// Display name.
    #[serde(default)]
    pub global_name: Option<String>,
    /// Avatar hash.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the account belongs to a bot.
    #[serde(default)]
    pub bot: bool,
    /// Whether the account is an official system user.
    #[serde(default)]
    pub system: bool,
    /// Public flags bitset.
    #[serde(default)]
    pub public_flags: u64,
}

/// A guild-scoped member record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Member {
    /// The account behind this member. `None` when the account was deleted
    /// or is otherwise inaccessible.
    #[serde(default)]
    pub user: Option<User>,
    /// Guild nickname.
    #[serde(default)]
    pub nick: Option<String>,
    /// Guild avatar hash overriding the user avatar.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Role ids held by the member.
    #[serde(default)]
    pub roles: Vec<String>,
    /// When the user joined the guild.
    #[serde(default)]
    pub joined_at: Option<DateTime<Utc>>,
    /// When the user started boosting the guild.
    #[serde(default)]
    pub premium_since: Option<DateTime<Utc>>,
    /// Member flags bitset. Not resent on member updates.
    #[serde(default)]
    pub flags: u64,
    /// Server-side deafen.
    #[serde(default)]
    pub deaf: bool,
    /// Server-side mute.
    #[serde(default)]
    pub mute: bool,
    /// Whether the member has yet to pass membership screening.
    #[serde(default)]
    pub pending: Option<bool>,
    /// Total permissions in a channel, only present in interaction payloads.
    /// Not resent on member updates.
    #[serde(default)]
    pub permissions: Option<String>,
    /// When the member's timeout expires.
    #[serde(default)]
    pub communication_disabled_until: Option<DateTime<Utc>>,
}

impl Member {
    /// The id of the underlying user, if the account is still reachable.
    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user.as_ref().map(|u| u.id.as_str())
    }
}

/// A guild role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Role id.
    pub id: String,
    /// Role name.
    #[serde(default)]
    pub name: String,
    /// RGB colour, zero for none.
    #[serde(default)]
    pub color: u32,
    /// Whether the role is displayed separately in the member list.
    #[serde(default)]
    pub hoist: bool,
    /// Role icon hash.
    #[serde(default)]
    pub icon: Option<String>,
    /// Unicode emoji used as the role icon.
    #[serde(default)]
    pub unicode_emoji: Option<String>,
    /// Sort position.
    #[serde(default)]
    pub position: i64,
    /// Permission bitset, serialized as a decimal string.
    #[serde(default)]
    pub permissions: String,
    /// Whether an integration manages the role.
    #[serde(default)]
    pub managed: bool,
    /// Whether the role can be mentioned.
    #[serde(default)]
    pub mentionable: bool,
    /// Role flags bitset.
    #[serde(default)]
    pub flags: u64,
}

/// A custom or unicode emoji.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Emoji {
    /// Emoji id, `None` for unicode emoji.
    #[serde(default)]
    pub id: Option<String>,
    /// Emoji name; only `None` in reaction payloads for deleted emoji.
    #[serde(default)]
    pub name: Option<String>,
    /// Roles allowed to use the emoji.
    #[serde(default)]
    pub roles: Vec<String>,
    /// Creator of the emoji.
    #[serde(default)]
    pub user: Option<User>,
    /// Whether the emoji must be wrapped in colons.
    #[serde(default)]
    pub require_colons: Option<bool>,
    /// Whether the emoji is managed by an integration.
    #[serde(default)]
    pub managed: Option<bool>,
    /// Whether the emoji is animated.
    #[serde(default)]
    pub animated: Option<bool>,
    /// Whether the emoji can currently be used.
    #[serde(default)]
    pub available: Option<bool>,
}

/// A guild sticker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sticker {
    /// Sticker id.
    pub id: String,
    /// Sticker name.
    #[serde(default)]
    pub name: String,
    /// Sticker description.
    #[serde(default)]
    pub description: Option<String>,
    /// Autocomplete tags.
    #[serde(default)]
    pub tags: String,
    /// Sticker type (standard or guild).
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// Image format.
    #[serde(default)]
    pub format_type: u8,
    /// Whether the sticker can currently be used.
    #[serde(default)]
    pub available: Option<bool>,
    /// Guild the sticker belongs to.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Uploader.
    #[serde(default)]
    pub user: Option<User>,
}

/// Thread-specific channel fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMetadata {
    /// Whether the thread is archived.
    #[serde(default)]
    pub archived: bool,
    /// Minutes of inactivity before the thread auto-archives.
    #[serde(default)]
    pub auto_archive_duration: u32,
    /// When the archive status last changed.
    #[serde(default)]
    pub archive_timestamp: Option<DateTime<Utc>>,
    /// Whether the thread is locked.
    #[serde(default)]
    pub locked: bool,
    /// Whether non-moderators can add other non-moderators.
    #[serde(default)]
    pub invitable: Option<bool>,
    /// When the thread was created.
    #[serde(default)]
    pub create_timestamp: Option<DateTime<Utc>>,
}

/// The current user's membership in a thread.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadMember {
    /// Thread id; omitted inside guild-create thread objects.
    #[serde(default)]
    pub id: Option<String>,
    /// User id; omitted inside guild-create thread objects.
    #[serde(default)]
    pub user_id: Option<String>,
    /// When the user joined the thread.
    #[serde(default)]
    pub join_timestamp: Option<DateTime<Utc>>,
    /// Notification flags.
    #[serde(default)]
    pub flags: u64,
}

/// A channel or a thread.
///
/// Threads are channels whose [`kind`](Self::kind) is one of the thread tags
/// in [`channel_kind`]. Fields the cache does not interpret are preserved in
/// [`extra`](Self::extra).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    /// Channel id.
    pub id: String,
    /// Type tag, see [`channel_kind`].
    #[serde(rename = "type", default)]
    pub kind: u8,
    /// Owning guild. `None` for channels outside any guild.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
    /// Parent category, or parent channel for threads.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Sort position.
    #[serde(default)]
    pub position: Option<i64>,
    /// Creator of a thread.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Approximate member count of a thread, capped at 50.
    #[serde(default)]
    pub member_count: Option<u32>,
    /// Thread-specific fields.
    #[serde(default)]
    pub thread_metadata: Option<ThreadMetadata>,
    /// The current user's thread membership, if joined.
    #[serde(default)]
    pub member: Option<ThreadMember>,
    /// Remaining protocol fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Channel {
    /// Returns `true` if this channel is a thread.
    #[must_use]
    pub fn is_thread(&self) -> bool {
        channel_kind::is_thread(self.kind)
    }
}

/// A user's voice connection status within a guild.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceState {
    /// Guild id; omitted inside guild-create payloads.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Connected channel; `None` means the user left voice.
    #[serde(default)]
    pub channel_id: Option<String>,
    /// The user this state belongs to.
    pub user_id: String,
    /// Member snapshot; omitted inside guild-create payloads.
    #[serde(default)]
    pub member: Option<Member>,
    /// Voice session id.
    #[serde(default)]
    pub session_id: String,
    /// Server-side deafen.
    #[serde(default)]
    pub deaf: bool,
    /// Server-side mute.
    #[serde(default)]
    pub mute: bool,
    /// Local deafen.
    #[serde(default)]
    pub self_deaf: bool,
    /// Local mute.
    #[serde(default)]
    pub self_mute: bool,
    /// Whether the user is streaming.
    #[serde(default)]
    pub self_stream: Option<bool>,
    /// Whether the user's camera is on.
    #[serde(default)]
    pub self_video: bool,
    /// Whether the user's permission to speak is denied.
    #[serde(default)]
    pub suppress: bool,
}

/// Guild metadata.
///
/// `roles`, `emojis` and `stickers` are only populated on the wire; the cache
/// moves them into dedicated collections on [`GuildState`](crate::GuildState)
/// and keeps the remaining metadata here as an opaque snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GuildInfo {
    /// Guild id.
    pub id: String,
    /// Guild name.
    #[serde(default)]
    pub name: String,
    /// Icon hash.
    #[serde(default)]
    pub icon: Option<String>,
    /// Owner user id.
    #[serde(default)]
    pub owner_id: Option<String>,
    /// Description shown in discovery.
    #[serde(default)]
    pub description: Option<String>,
    /// Roles, when carried by the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roles: Option<Vec<Role>>,
    /// Custom emoji, when carried by the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub emojis: Option<Vec<Emoji>>,
    /// Custom stickers, when carried by the payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stickers: Option<Vec<Sticker>>,
    /// Remaining settings, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A guild entry from the READY guild list or a guild-delete payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnavailableGuild {
    /// Guild id.
    pub id: String,
    /// Whether the guild is unavailable due to an outage.
    #[serde(default)]
    pub unavailable: bool,
}

/// A guild integration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Integration {
    /// Integration id.
    pub id: String,
    /// Integration name.
    #[serde(default)]
    pub name: String,
    /// Integration type (`twitch`, `youtube`, `discord`, ...).
    #[serde(rename = "type", default)]
    pub kind: String,
    /// Whether the integration is enabled.
    #[serde(default)]
    pub enabled: bool,
    /// Role the integration manages.
    #[serde(default)]
    pub role_id: Option<String>,
    /// User who added the integration.
    #[serde(default)]
    pub user: Option<User>,
    /// Remaining fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message id.
    pub id: String,
    /// Channel the message was sent in.
    pub channel_id: String,
    /// Guild the message was sent in.
    #[serde(default)]
    pub guild_id: Option<String>,
    /// Author; partial or absent on some updates.
    #[serde(default)]
    pub author: Option<User>,
    /// Member properties of the author, for guild messages.
    #[serde(default)]
    pub member: Option<Member>,
    /// Message text.
    #[serde(default)]
    pub content: String,
    /// When the message was sent.
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
    /// Users mentioned in the message.
    #[serde(default)]
    pub mentions: Vec<User>,
    /// Remaining fields, kept verbatim.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}
