//! JSON fixtures and configuration for gateway tests.

use std::time::Duration;

use hearth_gateway::GatewayConfig;
use serde_json::{Value, json};

/// Token used by [`test_config`].
pub const TEST_TOKEN: &str = "test-token";

/// Gateway URL handed to sessions under test.
pub const GATEWAY_URL: &str = "wss://gateway.test/?v=10&encoding=json";

/// Resume URL returned by [`ready`].
pub const RESUME_URL: &str = "wss://resume.gateway.test";

/// Settings with no retry or backoff delays so tests run fast.
#[must_use]
pub fn test_config() -> GatewayConfig {
    let mut config = GatewayConfig::new(TEST_TOKEN);
    config.max_connect_attempts = 3;
    config.connect_retry_delay = Duration::ZERO;
    config.max_reconnect_attempts = 3;
    config.backoff_base = Duration::ZERO;
    config.backoff_max = Duration::ZERO;
    config.hello_timeout = Duration::from_secs(5);
    config
}

/// A READY payload listing `guild_ids` as unavailable.
#[must_use]
pub fn ready(session_id: &str, guild_ids: &[&str]) -> Value {
    let guilds: Vec<Value> = guild_ids
        .iter()
        .map(|id| json!({"id": id, "unavailable": true}))
        .collect();
    json!({
        "v": 10,
        "user": {"id": "bot", "username": "hearth", "bot": true},
        "guilds": guilds,
        "session_id": session_id,
        "resume_gateway_url": RESUME_URL,
    })
}

/// A member payload for `user_id`.
#[must_use]
pub fn member(user_id: &str) -> Value {
    json!({
        "user": {"id": user_id, "username": format!("user-{user_id}")},
        "roles": [],
        "joined_at": "2024-01-01T00:00:00+00:00",
        "deaf": false,
        "mute": false,
        "flags": 0,
    })
}

/// A text channel in `guild_id`.
#[must_use]
pub fn channel(id: &str, guild_id: &str) -> Value {
    json!({"id": id, "type": 0, "guild_id": guild_id, "name": format!("channel-{id}")})
}

/// A public thread under `parent_id`.
#[must_use]
pub fn thread(id: &str, guild_id: &str, parent_id: &str) -> Value {
    json!({
        "id": id,
        "type": 11,
        "guild_id": guild_id,
        "parent_id": parent_id,
        "name": format!("thread-{id}"),
        "thread_metadata": {"archived": false, "auto_archive_duration": 1440, "locked": false},
    })
}

/// A GUILD_CREATE payload with one role, the given members plus one member
/// without a user, and one text channel.
#[must_use]
pub fn guild_create(guild_id: &str, member_ids: &[&str]) -> Value {
    let mut members: Vec<Value> = member_ids.iter().map(|id| member(id)).collect();
    members.push(json!({"user": null, "roles": []}));
    json!({
        "id": guild_id,
        "name": format!("guild-{guild_id}"),
        "roles": [{"id": guild_id, "name": "@everyone", "permissions": "0"}],
        "emojis": [],
        "stickers": [],
        "members": members,
        "channels": [channel("c1", guild_id)],
        "threads": [],
        "voice_states": [],
    })
}
