//! The reconnect loop across several connections.

use std::time::Duration;

use hearth_gateway::protocol::{PresenceUpdate, RequestGuildMembers, opcode};
use hearth_gateway::{
    ConnectionState, GatewayConfig, GatewayError, GatewaySession, ListenerRegistry,
};
use hearth_test::prelude::*;
use serde_json::Value;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

const QUIET_INTERVAL_MS: u64 = 1_000_000_000;
const LIMIT: Duration = Duration::from_secs(10);

fn session_with(
    config: GatewayConfig,
    connector: MockConnector,
) -> GatewaySession<MockConnector> {
    GatewaySession::new(
        config,
        connector,
        GATEWAY_URL,
        ListenerRegistry::new(),
        None,
        CancellationToken::new(),
    )
}

type RunHandle =
    tokio::task::JoinHandle<(Result<(), GatewayError>, GatewaySession<MockConnector>)>;

fn spawn_run(mut session: GatewaySession<MockConnector>) -> RunHandle {
    tokio::spawn(async move {
        let result = session.run().await;
        (result, session)
    })
}

async fn wait_for(state: &mut watch::Receiver<ConnectionState>, target: ConnectionState) {
    within(LIMIT, state.wait_for(|s| *s == target))
        .await
        .unwrap();
}

#[tokio::test]
async fn reconnect_request_resumes_on_resume_url() {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let session = session_with(test_config(), connector);
    let shutdown = session.shutdown_token().clone();
    let mut state = session.subscribe_state();
    let run = spawn_run(session);

    let mut first = within(LIMIT, server.accept()).await;
    assert_eq!(first.url(), GATEWAY_URL);
    first.hello(QUIET_INTERVAL_MS);
    assert_eq!(
        within(LIMIT, first.next_non_heartbeat()).await["op"],
        opcode::IDENTIFY
    );
    first.dispatch(1, "READY", ready("s1", &["g1"]));
    first.dispatch(2, "GUILD_CREATE", guild_create("g1", &["u1"]));
    first.reconnect();
    assert_eq!(within(LIMIT, first.recv_close()).await, Some(4000));

    let mut second = within(LIMIT, server.accept()).await;
    assert_eq!(second.url(), format!("{RESUME_URL}/?v=10&encoding=json"));
    second.hello(QUIET_INTERVAL_MS);
    let resume: Value = within(LIMIT, second.next_non_heartbeat()).await;
    assert_eq!(resume["op"], opcode::RESUME);
    assert_eq!(resume["d"]["session_id"], "s1");
    assert_eq!(resume["d"]["seq"], 2);
    assert_eq!(resume["d"]["token"], TEST_TOKEN);

    second.dispatch(3, "RESUMED", Value::Null);
    wait_for(&mut state, ConnectionState::Active).await;

    shutdown.cancel();
    let (result, session) = within(LIMIT, run).await.unwrap();
    result.unwrap();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert!(session.cache().guild("g1").is_some());
    assert_eq!(session.session_data().sequence, Some(3));
    assert_eq!(within(LIMIT, second.recv_close()).await, Some(1000));
}

#[tokio::test]
async fn non_resumable_close_identifies_afresh() {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let session = session_with(test_config(), connector);
    let shutdown = session.shutdown_token().clone();
    let run = spawn_run(session);

    let mut first = within(LIMIT, server.accept()).await;
    first.hello(QUIET_INTERVAL_MS);
    within(LIMIT, first.next_non_heartbeat()).await;
    first.dispatch(1, "READY", ready("s1", &[]));
    first.close(1000);

    let mut second = within(LIMIT, server.accept()).await;
    assert_eq!(second.url(), GATEWAY_URL);
    second.hello(QUIET_INTERVAL_MS);
    assert_eq!(
        within(LIMIT, second.next_non_heartbeat()).await["op"],
        opcode::IDENTIFY
    );

    shutdown.cancel();
    let (result, session) = within(LIMIT, run).await.unwrap();
    result.unwrap();
    assert_eq!(session.session_data().session_id, None);
    assert_eq!(session.session_data().sequence, None);
}

#[tokio::test]
async fn authentication_failure_is_terminal() {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let run = spawn_run(session_with(test_config(), connector.clone()));

    let mut peer = within(LIMIT, server.accept()).await;
    peer.hello(QUIET_INTERVAL_MS);
    within(LIMIT, peer.next_non_heartbeat()).await;
    peer.close(4004);

    let (result, session) = within(LIMIT, run).await.unwrap();
    assert!(matches!(result, Err(GatewayError::AuthenticationFailed)));
    assert_eq!(session.state(), ConnectionState::Failed);
    assert_eq!(connector.urls().len(), 1);
}

#[tokio::test]
async fn disallowed_intents_are_terminal() {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let run = spawn_run(session_with(test_config(), connector));

    let peer = within(LIMIT, server.accept()).await;
    peer.hello(QUIET_INTERVAL_MS);
    peer.close(4014);

    let (result, _session) = within(LIMIT, run).await.unwrap();
    assert!(matches!(result, Err(GatewayError::InvalidIntents(4014))));
}

#[tokio::test]
async fn sessions_that_never_become_active_exhaust_the_budget() {
    init_test_tracing();
    let mut config = test_config();
    config.max_reconnect_attempts = 1;
    let (connector, mut server) = MockConnector::new();
    let run = spawn_run(session_with(config, connector.clone()));

    let drive = tokio::spawn(async move {
        loop {
            let peer = server.accept().await;
            peer.hello(QUIET_INTERVAL_MS);
            peer.end();
        }
    });

    let (result, session) = within(LIMIT, run).await.unwrap();
    drive.abort();
    assert!(matches!(
        result,
        Err(GatewayError::ReconnectBudgetExhausted { attempts: 2 })
    ));
    assert_eq!(session.state(), ConnectionState::Failed);
    assert_eq!(connector.urls().len(), 2);
}

#[tokio::test]
async fn shutdown_before_hello_closes_cleanly() {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let session = session_with(test_config(), connector);
    let shutdown = session.shutdown_token().clone();
    let mut state = session.subscribe_state();
    let run = spawn_run(session);

    let mut peer = within(LIMIT, server.accept()).await;
    wait_for(&mut state, ConnectionState::AwaitingHello).await;
    shutdown.cancel();

    let (result, session) = within(LIMIT, run).await.unwrap();
    result.unwrap();
    assert_eq!(session.state(), ConnectionState::Disconnected);
    assert_eq!(within(LIMIT, peer.recv_close()).await, Some(1000));
}

#[tokio::test]
async fn commands_wait_for_an_active_session() {
    init_test_tracing();
    let (connector, mut server) = MockConnector::new();
    let session = session_with(test_config(), connector);
    let shutdown = session.shutdown_token().clone();
    let handle = session.handle();
    let run = spawn_run(session);

    let mut peer = within(LIMIT, server.accept()).await;
    peer.hello(QUIET_INTERVAL_MS);
    assert_eq!(
        within(LIMIT, peer.next_non_heartbeat()).await["op"],
        opcode::IDENTIFY
    );

    // Queued while identifying; the member request targets an unknown guild.
    handle
        .request_guild_members(RequestGuildMembers::all("missing"))
        .unwrap();
    handle
        .update_presence(PresenceUpdate::online(None))
        .unwrap();

    peer.dispatch(1, "READY", ready("s1", &["g1"]));
    let presence = within(LIMIT, peer.next_non_heartbeat()).await;
    assert_eq!(presence["op"], opcode::PRESENCE_UPDATE);
    assert_eq!(presence["d"]["status"], "online");

    peer.dispatch(2, "GUILD_CREATE", guild_create("g1", &["u1"]));
    // The answered heartbeat proves the guild-create was applied.
    peer.request_heartbeat();
    assert_eq!(within(LIMIT, peer.recv_json()).await["op"], opcode::HEARTBEAT);
    handle
        .request_guild_members(RequestGuildMembers::all("g1"))
        .unwrap();
    let request = within(LIMIT, peer.next_non_heartbeat()).await;
    assert_eq!(request["op"], opcode::REQUEST_GUILD_MEMBERS);
    assert_eq!(request["d"]["guild_id"], "g1");

    shutdown.cancel();
    within(LIMIT, run).await.unwrap().0.unwrap();
}
