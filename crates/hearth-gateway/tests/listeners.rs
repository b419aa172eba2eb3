//! Listeners driven by a live session.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use hearth_cache::events::{GuildMemberRemove, GuildMemberUpdate, Ready};
use hearth_gateway::{GatewaySession, ListenerRegistry, SessionEnd};
use hearth_test::prelude::*;
use serde_json::json;
use tokio_util::sync::CancellationToken;

const QUIET_INTERVAL_MS: u64 = 1_000_000_000;
const LIMIT: Duration = Duration::from_secs(10);

async fn run_script(
    listeners: ListenerRegistry,
    script: impl FnOnce(&MockPeer),
) -> GatewaySession<MockConnector> {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let mut session = GatewaySession::new(
        test_config(),
        connector,
        GATEWAY_URL,
        listeners,
        None,
        CancellationToken::new(),
    );
    session.connect(false).await.unwrap();
    let peer = server.accept().await;
    peer.hello(QUIET_INTERVAL_MS);
    script(&peer);
    peer.reconnect();
    let end = within(LIMIT, session.run_session(false)).await.unwrap();
    assert_eq!(end, SessionEnd::ReconnectRequested);
    session
}

#[tokio::test]
async fn listener_sees_cache_after_member_removal() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut listeners = ListenerRegistry::new();
    listeners.on::<GuildMemberRemove, _>(move |ctx, ev| {
        let members = ctx.cache().members(&ev.guild_id);
        let remaining: Vec<Option<String>> = members
            .iter()
            .map(|m| m.user.as_ref().map(|u| u.id.clone()))
            .collect();
        sink.lock().unwrap().push(remaining);
        Ok(())
    });

    let session = run_script(listeners, |peer| {
        peer.dispatch(1, "GUILD_CREATE", guild_create("G1", &["u1"]));
        peer.dispatch(
            2,
            "GUILD_MEMBER_REMOVE",
            json!({"guild_id": "G1", "user": {"id": "u1"}}),
        );
    })
    .await;

    assert_eq!(*seen.lock().unwrap(), vec![vec![None]]);
    let members = session.cache().members("G1");
    assert_eq!(members.len(), 1);
    assert!(members[0].user.is_none());
}

#[tokio::test]
async fn failing_listener_does_not_end_the_session() {
    let mut listeners = ListenerRegistry::new();
    listeners.on::<Ready, _>(|_, _| Err("boom".into()));

    let session = run_script(listeners, |peer| {
        peer.dispatch(1, "READY", ready("s1", &[]));
        peer.dispatch(2, "GUILD_CREATE", guild_create("g1", &[]));
    })
    .await;

    assert_eq!(session.session_data().session_id.as_deref(), Some("s1"));
    assert!(session.cache().guild("g1").is_some());
}

#[tokio::test]
async fn member_update_merges_through_the_session() {
    let calls = Arc::new(Mutex::new(0_u32));
    let counter = Arc::clone(&calls);
    let mut listeners = ListenerRegistry::new();
    listeners.on::<GuildMemberUpdate, _>(move |_, _| {
        let mut calls = counter.lock().unwrap();
        *calls = calls.saturating_add(1);
        Ok(())
    });

    let mut member = member("u1");
    member["flags"] = json!(2);
    member["permissions"] = json!("8");
    let mut guild = guild_create("g1", &[]);
    guild["members"] = json!([member]);

    let session = run_script(listeners, |peer| {
        peer.dispatch(1, "GUILD_CREATE", guild);
        peer.dispatch(
            2,
            "GUILD_MEMBER_UPDATE",
            json!({
                "guild_id": "g1",
                "user": {"id": "u1"},
                "roles": [],
                "nick": "renamed",
            }),
        );
        // Unknown member: warning only.
        peer.dispatch(
            3,
            "GUILD_MEMBER_UPDATE",
            json!({"guild_id": "g1", "user": {"id": "ghost"}, "roles": []}),
        );
    })
    .await;

    let guild = session.cache().guild("g1").unwrap();
    let member = guild.member("u1").unwrap();
    assert_eq!(member.nick.as_deref(), Some("renamed"));
    assert_eq!(member.flags, 2);
    assert_eq!(member.permissions.as_deref(), Some("8"));
    assert!(guild.member("ghost").is_none());
    assert_eq!(*calls.lock().unwrap(), 2);
}
