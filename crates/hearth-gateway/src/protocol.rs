//! Gateway protocol types, opcodes, close codes and intent flags.
//!
//! Implements the wire format for gateway protocol v10. Dispatch payloads
//! stay as `serde_json::Value` here; the router decodes them into the
//! typed events from `hearth_cache::events`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

// ── Opcodes ──────────────────────────────────────────────────

/// Gateway opcodes.
pub mod opcode {
    /// Event dispatch (receive only).
    pub const DISPATCH: u64 = 0;
    /// Heartbeat (bidirectional).
    pub const HEARTBEAT: u64 = 1;
    /// Identify (send only).
    pub const IDENTIFY: u64 = 2;
    /// Presence update (send only).
    pub const PRESENCE_UPDATE: u64 = 3;
    /// Voice state update (send only).
    pub const VOICE_STATE_UPDATE: u64 = 5;
    /// Resume (send only).
    pub const RESUME: u64 = 6;
    /// Server requests reconnect (receive only).
    pub const RECONNECT: u64 = 7;
    /// Request guild members (send only).
    pub const REQUEST_GUILD_MEMBERS: u64 = 8;
    /// Invalid session (receive only).
    pub const INVALID_SESSION: u64 = 9;
    /// Hello, carries the heartbeat interval (receive only).
    pub const HELLO: u64 = 10;
    /// Heartbeat ACK (receive only).
    pub const HEARTBEAT_ACK: u64 = 11;
}

// ── Close Codes ──────────────────────────────────────────────

/// Gateway close codes.
pub mod close_code {
    /// Normal closure; invalidates the session.
    pub const NORMAL: u16 = 1000;
    /// Endpoint going away; invalidates the session.
    pub const GOING_AWAY: u16 = 1001;
    /// Unknown error.
    pub const UNKNOWN_ERROR: u16 = 4000;
    /// Unknown opcode sent.
    pub const UNKNOWN_OPCODE: u16 = 4001;
    /// Invalid payload sent.
    pub const DECODE_ERROR: u16 = 4002;
    /// Payload sent before identifying.
    pub const NOT_AUTHENTICATED: u16 = 4003;
    /// Authentication failed, bad token.
    pub const AUTHENTICATION_FAILED: u16 = 4004;
    /// Identified twice.
    pub const ALREADY_AUTHENTICATED: u16 = 4005;
    /// Invalid sequence on resume.
    pub const INVALID_SEQ: u16 = 4007;
    /// Rate limited.
    pub const RATE_LIMITED: u16 = 4008;
    /// Session timed out.
    pub const SESSION_TIMEOUT: u16 = 4009;
    /// Invalid shard configuration.
    pub const INVALID_SHARD: u16 = 4010;
    /// Sharding required.
    pub const SHARDING_REQUIRED: u16 = 4011;
    /// Invalid API version.
    pub const INVALID_API_VERSION: u16 = 4012;
    /// Invalid intents value.
    pub const INVALID_INTENTS: u16 = 4013;
    /// Disallowed intents (not enabled for the application).
    pub const DISALLOWED_INTENTS: u16 = 4014;
}

/// Returns `true` if a session closed with `code` may be resumed.
///
/// Codes outside the table are treated as not resumable.
#[must_use]
pub fn is_resumable_close(code: u16) -> bool {
    use close_code::{
        ALREADY_AUTHENTICATED, DECODE_ERROR, INVALID_SEQ, NOT_AUTHENTICATED, RATE_LIMITED,
        SESSION_TIMEOUT, UNKNOWN_ERROR,
    };

    matches!(
        code,
        UNKNOWN_ERROR
            | DECODE_ERROR
            | NOT_AUTHENTICATED
            | ALREADY_AUTHENTICATED
            | INVALID_SEQ
            | RATE_LIMITED
            | SESSION_TIMEOUT
    )
}

/// Map a close code to the terminal error it implies, if any.
///
/// A `Some` result means the client must stop instead of reconnecting.
#[must_use]
pub fn fatal_close_error(code: u16) -> Option<GatewayError> {
    match code {
        close_code::AUTHENTICATION_FAILED => Some(GatewayError::AuthenticationFailed),
        close_code::INVALID_INTENTS | close_code::DISALLOWED_INTENTS => {
            Some(GatewayError::InvalidIntents(code))
        },
        close_code::INVALID_SHARD
        | close_code::SHARDING_REQUIRED
        | close_code::INVALID_API_VERSION => Some(GatewayError::UnrecoverableClose(code)),
        _ => None,
    }
}

// ── Intent Flags ─────────────────────────────────────────────

/// Gateway intent bits.
pub mod intents {
    #![allow(missing_docs)]

    pub const GUILDS: u64 = 1 << 0;
    pub const GUILD_MEMBERS: u64 = 1 << 1;
    pub const GUILD_MODERATION: u64 = 1 << 2;
    pub const GUILD_EMOJIS_AND_STICKERS: u64 = 1 << 3;
    pub const GUILD_INTEGRATIONS: u64 = 1 << 4;
    pub const GUILD_WEBHOOKS: u64 = 1 << 5;
    pub const GUILD_INVITES: u64 = 1 << 6;
    pub const GUILD_VOICE_STATES: u64 = 1 << 7;
    pub const GUILD_PRESENCES: u64 = 1 << 8;
    pub const GUILD_MESSAGES: u64 = 1 << 9;
    pub const GUILD_MESSAGE_REACTIONS: u64 = 1 << 10;
    pub const GUILD_MESSAGE_TYPING: u64 = 1 << 11;
    pub const DIRECT_MESSAGES: u64 = 1 << 12;
    pub const DIRECT_MESSAGE_REACTIONS: u64 = 1 << 13;
    pub const DIRECT_MESSAGE_TYPING: u64 = 1 << 14;
    pub const MESSAGE_CONTENT: u64 = 1 << 15;
    pub const GUILD_SCHEDULED_EVENTS: u64 = 1 << 16;
    pub const AUTO_MODERATION_CONFIGURATION: u64 = 1 << 20;
    pub const AUTO_MODERATION_EXECUTION: u64 = 1 << 21;

    /// Default intents: `GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES`.
    ///
    /// Privileged intents (`GUILD_MEMBERS`, `GUILD_PRESENCES`,
    /// `MESSAGE_CONTENT`) must be opted into explicitly.
    pub const DEFAULT: u64 = GUILDS | GUILD_MESSAGES | DIRECT_MESSAGES;

    const NAMED: &[(&str, u64)] = &[
        ("guilds", GUILDS),
        ("guild_members", GUILD_MEMBERS),
        ("guild_moderation", GUILD_MODERATION),
        ("guild_emojis_and_stickers", GUILD_EMOJIS_AND_STICKERS),
        ("guild_integrations", GUILD_INTEGRATIONS),
        ("guild_webhooks", GUILD_WEBHOOKS),
        ("guild_invites", GUILD_INVITES),
        ("guild_voice_states", GUILD_VOICE_STATES),
        ("guild_presences", GUILD_PRESENCES),
        ("guild_messages", GUILD_MESSAGES),
        ("guild_message_reactions", GUILD_MESSAGE_REACTIONS),
        ("guild_message_typing", GUILD_MESSAGE_TYPING),
        ("direct_messages", DIRECT_MESSAGES),
        ("direct_message_reactions", DIRECT_MESSAGE_REACTIONS),
        ("direct_message_typing", DIRECT_MESSAGE_TYPING),
        ("message_content", MESSAGE_CONTENT),
        ("guild_scheduled_events", GUILD_SCHEDULED_EVENTS),
        ("auto_moderation_configuration", AUTO_MODERATION_CONFIGURATION),
        ("auto_moderation_execution", AUTO_MODERATION_EXECUTION),
    ];

    /// Look up an intent bit by its snake-case name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<u64> {
        NAMED
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, bit)| *bit)
    }

    /// Combine intent names into a bitmask.
    ///
    /// # Errors
    ///
    /// Returns the first unknown name.
    pub fn from_names<'a, I>(names: I) -> Result<u64, String>
    where
        I: IntoIterator<Item = &'a str>,
    {
        names.into_iter().try_fold(0u64, |mask, name| {
            from_name(name)
                .map(|bit| mask | bit)
                .ok_or_else(|| name.to_owned())
        })
    }

    /// Every known intent name.
    pub fn names() -> impl Iterator<Item = &'static str> {
        NAMED.iter().map(|(n, _)| *n)
    }
}

// ── Wire Types ───────────────────────────────────────────────

/// Raw gateway envelope as received/sent over the transport.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayPayload {
    /// Opcode for the payload.
    pub op: u64,
    /// Event data (opcode-dependent).
    #[serde(default)]
    pub d: Option<Value>,
    /// Sequence number (only for `op=0` dispatch events).
    #[serde(default)]
    pub s: Option<u64>,
    /// Event name (only for `op=0` dispatch events).
    #[serde(default)]
    pub t: Option<String>,
}

impl GatewayPayload {
    /// Decode an envelope from a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Json`] if the frame is not a valid envelope.
    pub fn decode(text: &str) -> GatewayResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Encode the envelope as a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Json`] if the data cannot be serialized.
    pub fn encode(&self) -> GatewayResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Build a client command envelope.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Json`] if `data` cannot be serialized.
    pub fn command<T: Serialize>(op: u64, data: &T) -> GatewayResult<Self> {
        Ok(Self {
            op,
            d: Some(serde_json::to_value(data)?),
            s: None,
            t: None,
        })
    }

    /// Build a heartbeat (`op=1`) carrying the last sequence seen.
    #[must_use]
    pub fn heartbeat(sequence: Option<u64>) -> Self {
        Self {
            op: opcode::HEARTBEAT,
            d: sequence.map(Value::from),
            s: None,
            t: None,
        }
    }
}

/// Hello payload (`op=10`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds.
    pub heartbeat_interval: u64,
}

/// Response from `GET /gateway/bot`.
#[derive(Debug, Deserialize)]
pub struct GatewayBotResponse {
    /// Gateway `WebSocket` URL.
    pub url: String,
}

// ── Identify / Resume ────────────────────────────────────────

/// Client identification strings sent with Identify.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionProperties {
    /// Operating system.
    pub os: String,
    /// Library name.
    pub browser: String,
    /// Library name.
    pub device: String,
}

impl Default for ConnectionProperties {
    fn default() -> Self {
        Self {
            os: std::env::consts::OS.to_owned(),
            browser: "hearth".to_owned(),
            device: "hearth".to_owned(),
        }
    }
}

/// Identify payload (`op=2`).
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct Identify {
    /// Authentication token.
    pub token: String,
    /// Subscribed intents bitmask.
    pub intents: u64,
    /// Client identification.
    pub properties: ConnectionProperties,
    /// Initial presence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence: Option<PresenceUpdate>,
}

impl fmt::Debug for Identify {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identify")
            .field("token", &"[REDACTED]")
            .field("intents", &self.intents)
            .field("properties", &self.properties)
            .field("presence", &self.presence)
            .finish()
    }
}

/// Resume payload (`op=6`).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resume {
    /// Authentication token.
    pub token: String,
    /// Session to resume.
    pub session_id: String,
    /// Last sequence number received.
    pub seq: u64,
}

impl fmt::Debug for Resume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Resume")
            .field("token", &"[REDACTED]")
            .field("session_id", &self.session_id)
            .field("seq", &self.seq)
            .finish()
    }
}

// ── Commands ─────────────────────────────────────────────────

/// An activity shown in the client's presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Activity name.
    pub name: String,
    /// Activity type (0 playing, 1 streaming, 2 listening, 3 watching,
    /// 4 custom, 5 competing).
    #[serde(rename = "type")]
    pub kind: u8,
    /// Stream URL, for streaming activities.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Presence update payload (`op=3`), also used as the initial presence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceUpdate {
    /// Unix time in milliseconds the client went idle.
    pub since: Option<u64>,
    /// Activities.
    pub activities: Vec<Activity>,
    /// Status: `online`, `dnd`, `idle`, `invisible` or `offline`.
    pub status: String,
    /// Whether the client is AFK.
    pub afk: bool,
}

impl PresenceUpdate {
    /// An online presence with a single activity.
    #[must_use]
    pub fn online(activity: Option<Activity>) -> Self {
        Self {
            since: None,
            activities: activity.into_iter().collect(),
            status: "online".to_owned(),
            afk: false,
        }
    }
}

/// Voice state update payload (`op=5`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoiceStateCommand {
    /// Guild id.
    pub guild_id: String,
    /// Channel to join, `None` to disconnect.
    pub channel_id: Option<String>,
    /// Whether the client is muted.
    pub self_mute: bool,
    /// Whether the client is deafened.
    pub self_deaf: bool,
}

/// Request guild members payload (`op=8`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestGuildMembers {
    /// Guild id.
    pub guild_id: String,
    /// Username prefix, empty for all members.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Maximum number of members, zero for no limit with an empty query.
    pub limit: u32,
    /// Whether to include presences.
    #[serde(default)]
    pub presences: bool,
    /// Specific users to fetch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_ids: Option<Vec<String>>,
    /// Nonce echoed back in the member chunks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

impl RequestGuildMembers {
    /// Request every member of a guild.
    #[must_use]
    pub fn all(guild_id: impl Into<String>) -> Self {
        Self {
            guild_id: guild_id.into(),
            query: Some(String::new()),
            limit: 0,
            presences: false,
            user_ids: None,
            nonce: Some(uuid::Uuid::new_v4().simple().to_string()),
        }
    }

    /// Request specific users of a guild.
    #[must_use]
    pub fn users(guild_id: impl Into<String>, user_ids: Vec<String>) -> Self {
        Self {
            query: None,
            user_ids: Some(user_ids),
            ..Self::all(guild_id)
        }
    }
}

// ── URLs ─────────────────────────────────────────────────────

/// Append the protocol version and encoding query to a gateway URL.
///
/// Any existing query or trailing slash is replaced, so applying this to a
/// URL that already carries the suffix is a no-op.
#[must_use]
pub fn with_query(url: &str, version: u8) -> String {
    let base = url.split('?').next().unwrap_or(url).trim_end_matches('/');
    format!("{base}/?v={version}&encoding=json")
}

/// Validate a resume gateway URL.
///
/// The URL must parse with a `ws` or `wss` scheme and carry a host.
#[must_use]
pub fn is_valid_resume_url(raw: &str) -> bool {
    url::Url::parse(raw).is_ok_and(|parsed| {
        matches!(parsed.scheme(), "ws" | "wss") && parsed.host_str().is_some_and(|h| !h.is_empty())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn opcode_constants() {
        assert_eq!(opcode::DISPATCH, 0);
        assert_eq!(opcode::HEARTBEAT, 1);
        assert_eq!(opcode::IDENTIFY, 2);
        assert_eq!(opcode::PRESENCE_UPDATE, 3);
        assert_eq!(opcode::VOICE_STATE_UPDATE, 5);
        assert_eq!(opcode::RESUME, 6);
        assert_eq!(opcode::RECONNECT, 7);
        assert_eq!(opcode::REQUEST_GUILD_MEMBERS, 8);
        assert_eq!(opcode::INVALID_SESSION, 9);
        assert_eq!(opcode::HELLO, 10);
        assert_eq!(opcode::HEARTBEAT_ACK, 11);
    }

    #[test]
    fn resumable_close_codes() {
        for code in [4000, 4002, 4003, 4005, 4007, 4008, 4009] {
            assert!(is_resumable_close(code), "{code} should resume");
        }
    }

    #[test]
    fn non_resumable_close_codes() {
        for code in [4004, 4010, 4011, 4012, 4013, 4014] {
            assert!(!is_resumable_close(code), "{code} should not resume");
        }
    }

    #[test]
    fn unknown_close_codes_are_not_resumable() {
        for code in [0, 1000, 1001, 1006, 3999, 4001, 4006, 4015, 4999, u16::MAX] {
            assert!(!is_resumable_close(code), "{code} should not resume");
        }
    }

    #[test]
    fn fatal_close_mapping() {
        assert!(matches!(
            fatal_close_error(4004),
            Some(GatewayError::AuthenticationFailed)
        ));
        assert!(matches!(
            fatal_close_error(4013),
            Some(GatewayError::InvalidIntents(4013))
        ));
        assert!(matches!(
            fatal_close_error(4014),
            Some(GatewayError::InvalidIntents(4014))
        ));
        for code in [4010, 4011, 4012] {
            assert!(matches!(
                fatal_close_error(code),
                Some(GatewayError::UnrecoverableClose(c)) if c == code
            ));
        }
        for code in [1000, 4000, 4009, 4999] {
            assert!(fatal_close_error(code).is_none());
        }
    }

    #[test]
    fn intent_bits() {
        assert_eq!(intents::DEFAULT, 1 | 512 | 4096);
        assert_eq!(intents::AUTO_MODERATION_EXECUTION, 1 << 21);
        assert_eq!(intents::from_name("message_content"), Some(1 << 15));
        assert_eq!(intents::from_name("GUILDS"), Some(1));
        assert_eq!(intents::from_name("nope"), None);
        assert_eq!(intents::names().count(), 19);
    }

    #[test]
    fn intents_from_names() {
        let mask = intents::from_names(["guilds", "guild_members"]).unwrap();
        assert_eq!(mask, 0b11);
        assert_eq!(
            intents::from_names(["guilds", "bogus"]).unwrap_err(),
            "bogus"
        );
        assert_eq!(intents::from_names(std::iter::empty()).unwrap(), 0);
    }

    #[test]
    fn envelope_decodes_minimal_hello() {
        let payload = GatewayPayload::decode(r#"{"op":10,"d":{"heartbeat_interval":41250}}"#).unwrap();
        assert_eq!(payload.op, opcode::HELLO);
        assert!(payload.s.is_none());
        assert!(payload.t.is_none());

        let hello: HelloPayload = serde_json::from_value(payload.d.unwrap()).unwrap();
        assert_eq!(hello.heartbeat_interval, 41250);
    }

    #[test]
    fn malformed_envelope_is_an_error() {
        assert!(GatewayPayload::decode("not json").is_err());
        assert!(GatewayPayload::decode(r#"{"d":{}}"#).is_err());
        assert!(GatewayPayload::decode(r#"{"op":"ten"}"#).is_err());
    }

    #[test]
    fn heartbeat_carries_nullable_sequence() {
        let hb = GatewayPayload::heartbeat(Some(99));
        assert_eq!(hb.op, opcode::HEARTBEAT);
        assert_eq!(hb.d, Some(Value::from(99)));

        let hb = GatewayPayload::heartbeat(None);
        let text = hb.encode().unwrap();
        assert!(text.contains(r#""d":null"#));
    }

    #[test]
    fn identify_preserves_token_and_intents() {
        let identify = Identify {
            token: "secret-token".into(),
            intents: intents::GUILDS | intents::MESSAGE_CONTENT,
            properties: ConnectionProperties::default(),
            presence: Some(PresenceUpdate::online(None)),
        };
        let text = GatewayPayload::command(opcode::IDENTIFY, &identify)
            .unwrap()
            .encode()
            .unwrap();

        let envelope = GatewayPayload::decode(&text).unwrap();
        assert_eq!(envelope.op, opcode::IDENTIFY);
        let decoded: Identify = serde_json::from_value(envelope.d.unwrap()).unwrap();
        assert_eq!(decoded.token, "secret-token");
        assert_eq!(decoded.intents, identify.intents);
        assert_eq!(decoded, identify);
    }

    #[test]
    fn debug_output_redacts_token() {
        let identify = Identify {
            token: "secret-token".into(),
            intents: 1,
            properties: ConnectionProperties::default(),
            presence: None,
        };
        let resume = Resume {
            token: "secret-token".into(),
            session_id: "sess".into(),
            seq: 3,
        };
        assert!(!format!("{identify:?}").contains("secret-token"));
        assert!(!format!("{resume:?}").contains("secret-token"));
        assert!(format!("{resume:?}").contains("sess"));
    }

    #[test]
    fn request_members_carries_nonce() {
        let all = RequestGuildMembers::all("g1");
        assert_eq!(all.query.as_deref(), Some(""));
        assert_eq!(all.limit, 0);
        assert!(all.nonce.is_some());

        let some = RequestGuildMembers::users("g1", vec!["u1".into()]);
        let value = serde_json::to_value(&some).unwrap();
        assert!(value.get("query").is_none());
        assert_eq!(value["user_ids"][0], "u1");
        assert_ne!(some.nonce, all.nonce);
    }

    #[test]
    fn query_suffix_is_normalised() {
        assert_eq!(
            with_query("wss://gateway.discord.gg", 10),
            "wss://gateway.discord.gg/?v=10&encoding=json"
        );
        assert_eq!(
            with_query("wss://gateway.discord.gg/", 10),
            "wss://gateway.discord.gg/?v=10&encoding=json"
        );
        let once = with_query("wss://resume.discord.gg", 10);
        assert_eq!(with_query(&once, 10), once);
    }

    #[test]
    fn valid_resume_urls() {
        assert!(is_valid_resume_url("wss://gateway-us-east1-b.discord.gg"));
        assert!(is_valid_resume_url("wss://gateway.discord.gg/?v=10&encoding=json"));
        assert!(is_valid_resume_url("ws://127.0.0.1:9000"));
    }

    #[test]
    fn invalid_resume_urls() {
        assert!(!is_valid_resume_url(""));
        assert!(!is_valid_resume_url("https://gateway.discord.gg"));
        assert!(!is_valid_resume_url("gateway.discord.gg"));
        assert!(!is_valid_resume_url("wss://"));
    }
}
