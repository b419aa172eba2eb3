//! Session state machine.
//!
//! One [`GatewaySession`] keeps a single logical session alive across any
//! number of transport connections. Each connection runs two tasks: the
//! read loop (this module, which also drives the [`Router`]) and the
//! heartbeat task. A per-connection [`CancellationToken`], a child of the
//! client-wide shutdown token, ties their lifetimes together.
//!
//! # Lifecycle
//!
//! ```text
//! Disconnected -> Connecting -> AwaitingHello -> Identifying | Resuming -> Active
//!      ^                                                                    |
//!      +------------- ReconnectPending (resumable) <------------------------+
//!                                                   \-> Failed (terminal)
//! ```

use std::sync::Arc;
use std::time::Duration;

use hearth_cache::StateCache;
use serde_json::Value;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use crate::backoff::Backoff;
use crate::command::{GatewayCommand, GatewayHandle};
use crate::config::GatewayConfig;
use crate::dispatch::{DispatchOutcome, Router};
use crate::error::{DispatchError, GatewayError, GatewayResult};
use crate::heartbeat::{self, SharedSequence};
use crate::listener::ListenerRegistry;
use crate::protocol::{
    self, GatewayPayload, HelloPayload, Identify, Resume, close_code, opcode,
};
use crate::rest::RestClient;
use crate::transport::{Connection, Connector, FrameSink, FrameStream};

/// Capacity of the per-connection writer queue.
const OUTBOUND_CAPACITY: usize = 64;

/// How long the writer gets to flush after the read loop ends.
const WRITER_GRACE: Duration = Duration::from_secs(2);

// ── State ────────────────────────────────────────────────────

/// Observable state of the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No connection; the next one will identify.
    Disconnected,
    /// Opening the transport.
    Connecting,
    /// Transport open, waiting for Hello.
    AwaitingHello,
    /// Identify sent, waiting for READY.
    Identifying,
    /// Resume sent, waiting for RESUMED.
    Resuming,
    /// Session established; events are flowing.
    Active,
    /// Connection lost; the next one will resume.
    ReconnectPending,
    /// Gave up. Terminal.
    Failed,
}

/// Something for the writer task to put on the wire.
#[derive(Debug)]
pub(crate) enum Outbound {
    /// A gateway payload.
    Frame(GatewayPayload),
    /// A close frame; the writer stops after sending it.
    Close(u16),
}

/// Resume credentials and bookkeeping that survive reconnects.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionData {
    /// Session id from READY.
    pub session_id: Option<String>,
    /// Last sequence number received.
    pub sequence: Option<u64>,
    /// Validated resume URL from READY.
    pub resume_gateway_url: Option<String>,
    /// Heartbeat interval from the last Hello.
    pub heartbeat_interval: Option<Duration>,
}

impl SessionData {
    /// Returns `true` if a resume is possible.
    #[must_use]
    pub fn can_resume(&self) -> bool {
        self.session_id.is_some() && self.resume_gateway_url.is_some()
    }

    /// Forget the session; the next connection identifies from scratch.
    pub fn clear(&mut self) {
        self.session_id = None;
        self.sequence = None;
        self.resume_gateway_url = None;
    }
}

/// Why a call to [`GatewaySession::run_session`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEnd {
    /// The server closed the connection.
    Closed {
        /// Close code from the close frame.
        code: u16,
        /// Verdict from the close-code table.
        resumable: bool,
    },
    /// The server invalidated the session (`op=9`).
    InvalidSession {
        /// Payload of the invalid-session message.
        resumable: bool,
    },
    /// The server asked for a reconnect (`op=7`).
    ReconnectRequested,
    /// The connection was cancelled locally, e.g. after a failed heartbeat.
    Cancelled,
    /// Client shutdown.
    Shutdown,
}

impl SessionEnd {
    /// Whether the next connection should resume.
    #[must_use]
    pub fn can_resume(&self) -> bool {
        match self {
            Self::Closed { resumable, .. } | Self::InvalidSession { resumable } => *resumable,
            Self::ReconnectRequested | Self::Cancelled => true,
            Self::Shutdown => false,
        }
    }
}

/// One open connection: the read half plus everything spawned for it.
struct LiveConnection {
    stream: Box<dyn FrameStream>,
    outbound: mpsc::Sender<Outbound>,
    token: CancellationToken,
    writer: JoinHandle<()>,
    heartbeat: Option<JoinHandle<()>>,
    sequence: SharedSequence,
    hello_seen: bool,
    server_closed: bool,
}

// ── Session ──────────────────────────────────────────────────

/// Gateway session state machine.
///
/// Owns the transport connection, resume credentials, and the dispatch
/// [`Router`] (and through it the [`StateCache`]).
pub struct GatewaySession<C> {
    config: GatewayConfig,
    connector: C,
    gateway_url: String,
    data: SessionData,
    router: Router,
    state_tx: watch::Sender<ConnectionState>,
    commands_rx: mpsc::Receiver<GatewayCommand>,
    handle: GatewayHandle,
    shutdown: CancellationToken,
    connection: Option<LiveConnection>,
    reached_active: bool,
}

impl<C: Connector> GatewaySession<C> {
    /// Create a session. Does not connect yet.
    ///
    /// `gateway_url` is used as given for fresh connections, so it should
    /// already carry the version and encoding query.
    #[must_use]
    pub fn new(
        config: GatewayConfig,
        connector: C,
        gateway_url: impl Into<String>,
        listeners: ListenerRegistry,
        rest: Option<Arc<RestClient>>,
        shutdown: CancellationToken,
    ) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);
        let (commands_tx, commands_rx) = mpsc::channel(config.command_queue_capacity.max(1));
        let handle = GatewayHandle::new(commands_tx, state_rx);

        let mut router = Router::new(listeners);
        if let Some(rest) = rest {
            router = router.with_rest(rest);
        }
        router.set_gateway(handle.clone());

        Self {
            config,
            connector,
            gateway_url: gateway_url.into(),
            data: SessionData::default(),
            router,
            state_tx,
            commands_rx,
            handle,
            shutdown,
            connection: None,
            reached_active: false,
        }
    }

    /// The state cache.
    #[must_use]
    pub fn cache(&self) -> &StateCache {
        self.router.cache()
    }

    /// The dispatch router.
    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Handle for queueing gateway commands.
    #[must_use]
    pub fn handle(&self) -> GatewayHandle {
        self.handle.clone()
    }

    /// Current connection state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// A receiver that observes every state change.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// Resume credentials and last sequence.
    #[must_use]
    pub fn session_data(&self) -> &SessionData {
        &self.data
    }

    /// The shutdown token this session observes.
    #[must_use]
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!(from = ?previous, to = ?state, "Connection state changed");
        }
    }

    // ── Run loop ─────────────────────────────────────────────

    /// Run the session until shutdown or a fatal error.
    ///
    /// Reconnects transparently, resuming when the previous session ended
    /// resumably and fresh-identifying otherwise.
    ///
    /// # Errors
    ///
    /// Returns the terminal error: a fatal close code, exhausted connect
    /// attempts, or an exhausted reconnect budget.
    pub async fn run(&mut self) -> GatewayResult<()> {
        let mut backoff = Backoff::new(self.config.backoff_base, self.config.backoff_max);
        let mut failed_sessions: u32 = 0;
        let mut can_resume = false;

        loop {
            if self.shutdown.is_cancelled() {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }

            let resuming = can_resume && self.data.can_resume();
            if let Err(e) = self.connect(resuming).await {
                if matches!(e, GatewayError::Shutdown) {
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                }
                error!(error = %e, "Giving up on gateway connection");
                self.set_state(ConnectionState::Failed);
                return Err(e);
            }

            self.reached_active = false;
            let outcome = self.run_session(resuming).await;
            if self.reached_active {
                backoff.reset();
                failed_sessions = 0;
            }

            match outcome {
                Ok(SessionEnd::Shutdown) => {
                    info!("Gateway session shut down");
                    self.set_state(ConnectionState::Disconnected);
                    return Ok(());
                },
                Ok(SessionEnd::Closed { code, resumable }) => {
                    if let Some(err) = protocol::fatal_close_error(code) {
                        error!(code, error = %err, "Fatal gateway close");
                        self.set_state(ConnectionState::Failed);
                        return Err(err);
                    }
                    info!(code, resumable, "Gateway closed the connection");
                    can_resume = resumable;
                },
                Ok(end) => {
                    info!(reason = ?end, resumable = end.can_resume(), "Gateway session ended");
                    can_resume = end.can_resume();
                },
                Err(e) if e.is_fatal() => {
                    error!(error = %e, "Fatal gateway error");
                    self.set_state(ConnectionState::Failed);
                    return Err(e);
                },
                Err(e) => {
                    warn!(error = %e, "Gateway connection error");
                    can_resume = e.can_resume();
                },
            }

            if !self.reached_active {
                failed_sessions = failed_sessions.saturating_add(1);
                if failed_sessions > self.config.max_reconnect_attempts {
                    error!(
                        attempts = failed_sessions,
                        "Max reconnect attempts exceeded"
                    );
                    self.set_state(ConnectionState::Failed);
                    return Err(GatewayError::ReconnectBudgetExhausted {
                        attempts: failed_sessions,
                    });
                }
            }

            if !can_resume || !self.data.can_resume() {
                self.data.clear();
                can_resume = false;
            }
            self.set_state(if can_resume {
                ConnectionState::ReconnectPending
            } else {
                ConnectionState::Disconnected
            });

            let delay = backoff.next_delay();
            info!(
                delay_ms = delay.as_millis(),
                attempt = failed_sessions,
                resume = can_resume,
                "Reconnecting after backoff"
            );
            if self.sleep_or_shutdown(delay).await.is_err() {
                self.set_state(ConnectionState::Disconnected);
                return Ok(());
            }
        }
    }

    /// Sleep for `delay`, returning early on shutdown.
    async fn sleep_or_shutdown(&self, delay: Duration) -> GatewayResult<()> {
        tokio::select! {
            () = tokio::time::sleep(delay) => Ok(()),
            () = self.shutdown.cancelled() => Err(GatewayError::Shutdown),
        }
    }

    // ── Connect ──────────────────────────────────────────────

    /// Open the transport.
    ///
    /// Uses the resume URL from READY when `resuming`, the gateway URL
    /// otherwise. Failed attempts are retried after a fixed delay.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::ConnectFailed`] once every attempt has
    /// failed, or [`GatewayError::Shutdown`] if shutdown interrupts.
    pub async fn connect(&mut self, resuming: bool) -> GatewayResult<()> {
        let url = match (&self.data.resume_gateway_url, resuming) {
            (Some(resume), true) => protocol::with_query(resume, self.config.api_version),
            _ => self.gateway_url.clone(),
        };
        let max_attempts = self.config.max_connect_attempts.max(1);
        self.set_state(ConnectionState::Connecting);

        let mut attempt: u32 = 0;
        loop {
            attempt = attempt.saturating_add(1);
            info!(url = %url, attempt, resuming, "Connecting to gateway");

            let err = tokio::select! {
                biased;
                () = self.shutdown.cancelled() => return Err(GatewayError::Shutdown),
                result = self.connector.connect(&url) => match result {
                    Ok(connection) => {
                        self.install(connection);
                        return Ok(());
                    },
                    Err(e) => e,
                },
            };

            if attempt >= max_attempts {
                error!(attempts = attempt, error = %err, "Every connection attempt failed");
                return Err(GatewayError::ConnectFailed {
                    attempts: attempt,
                    source: Box::new(err),
                });
            }
            warn!(
                attempt,
                error = %err,
                delay_ms = self.config.connect_retry_delay.as_millis(),
                "Connection attempt failed, retrying"
            );
            self.sleep_or_shutdown(self.config.connect_retry_delay)
                .await?;
        }
    }

    fn install(&mut self, connection: Connection) {
        let Connection { sink, stream } = connection;
        let token = self.shutdown.child_token();
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_CAPACITY);
        let writer = tokio::spawn(run_writer(sink, outbound_rx, token.clone()));

        // A previous connection that was never run is simply dropped.
        if let Some(stale) = self.connection.take() {
            stale.token.cancel();
            stale.writer.abort();
        }

        self.connection = Some(LiveConnection {
            stream,
            outbound,
            token,
            writer,
            heartbeat: None,
            sequence: Arc::new(Mutex::new(self.data.sequence)),
            hello_seen: false,
            server_closed: false,
        });
        self.set_state(ConnectionState::AwaitingHello);
    }

    // ── Read loop ────────────────────────────────────────────

    /// Run the read loop on the connection opened by [`connect`].
    ///
    /// Returns how the session ended; [`SessionEnd::can_resume`] says
    /// whether the next connection should resume. The connection is torn
    /// down before this returns.
    ///
    /// # Errors
    ///
    /// Transport failures, a malformed envelope, and a missing Hello end
    /// the session with an error. Malformed dispatch payloads do not.
    ///
    /// [`connect`]: Self::connect
    pub async fn run_session(&mut self, can_resume: bool) -> GatewayResult<SessionEnd> {
        let mut conn = self.connection.take().ok_or(GatewayError::NotConnected)?;
        let shutdown = self.shutdown.clone();
        let hello_timer = tokio::time::sleep(self.config.hello_timeout);
        tokio::pin!(hello_timer);

        let result = loop {
            let active = self.state() == ConnectionState::Active;
            tokio::select! {
                biased;
                () = shutdown.cancelled() => {
                    info!("Gateway session received shutdown signal");
                    break Ok(SessionEnd::Shutdown);
                }
                () = conn.token.cancelled() => {
                    warn!("Connection cancelled locally");
                    break Ok(SessionEnd::Cancelled);
                }
                () = &mut hello_timer, if !conn.hello_seen => {
                    break Err(GatewayError::HelloTimeout);
                }
                Some(command) = self.commands_rx.recv(), if active => {
                    self.forward_command(&conn, command).await;
                }
                frame = conn.stream.recv() => match frame {
                    Ok(Some(text)) => match self.handle_frame(&mut conn, &text, can_resume).await {
                        Ok(Some(end)) => break Ok(end),
                        Ok(None) => {},
                        Err(e) => break Err(e),
                    },
                    Ok(None) => break Err(GatewayError::ConnectionLost),
                    Err(GatewayError::Closed(code)) => {
                        conn.server_closed = true;
                        break Ok(SessionEnd::Closed {
                            code,
                            resumable: protocol::is_resumable_close(code),
                        });
                    }
                    Err(e) => break Err(e),
                },
            }
        };

        let resumable = match &result {
            Ok(end) => end.can_resume(),
            Err(e) => e.can_resume(),
        };
        teardown(conn, resumable).await;
        result
    }

    /// Handle one text frame. `Some` ends the session.
    async fn handle_frame(
        &mut self,
        conn: &mut LiveConnection,
        text: &str,
        can_resume: bool,
    ) -> GatewayResult<Option<SessionEnd>> {
        let payload = GatewayPayload::decode(text)?;
        trace!(op = payload.op, seq = ?payload.s, event = ?payload.t, "Received payload");

        if let Some(seq) = payload.s {
            self.data.sequence = Some(seq);
            *conn.sequence.lock().await = Some(seq);
        }

        match payload.op {
            opcode::HELLO => {
                self.handle_hello(conn, payload.d, can_resume).await?;
                Ok(None)
            },
            opcode::DISPATCH => {
                self.handle_dispatch(payload.t, payload.d);
                Ok(None)
            },
            opcode::HEARTBEAT => {
                let seq = *conn.sequence.lock().await;
                debug!(seq = ?seq, "Server requested heartbeat");
                send(conn, GatewayPayload::heartbeat(seq)).await?;
                Ok(None)
            },
            opcode::HEARTBEAT_ACK => {
                debug!("Heartbeat acknowledged");
                Ok(None)
            },
            opcode::RECONNECT => {
                info!("Server requested reconnect (op=7)");
                Ok(Some(SessionEnd::ReconnectRequested))
            },
            opcode::INVALID_SESSION => {
                let resumable = payload
                    .d
                    .as_ref()
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                info!(resumable, "Invalid session (op=9)");
                Ok(Some(SessionEnd::InvalidSession { resumable }))
            },
            op => {
                debug!(op, "Ignoring unknown opcode");
                Ok(None)
            },
        }
    }

    async fn handle_hello(
        &mut self,
        conn: &mut LiveConnection,
        data: Option<Value>,
        can_resume: bool,
    ) -> GatewayResult<()> {
        let hello: HelloPayload = serde_json::from_value(data.unwrap_or(Value::Null))?;
        if hello.heartbeat_interval == 0 {
            return Err(GatewayError::Protocol("Hello with zero heartbeat interval".into()));
        }
        let interval = Duration::from_millis(hello.heartbeat_interval);
        self.data.heartbeat_interval = Some(interval);

        if conn.hello_seen {
            debug!(interval_ms = hello.heartbeat_interval, "Ignoring repeated Hello");
            return Ok(());
        }
        conn.hello_seen = true;
        debug!(interval_ms = hello.heartbeat_interval, "Received Hello");

        conn.heartbeat = Some(tokio::spawn(heartbeat::run_heartbeat(
            interval,
            Arc::clone(&conn.sequence),
            conn.outbound.clone(),
            conn.token.clone(),
        )));

        if can_resume && self.data.can_resume() {
            let resume = Resume {
                token: self.config.token.clone(),
                session_id: self.data.session_id.clone().unwrap_or_default(),
                seq: self.data.sequence.unwrap_or(0),
            };
            info!(session_id = %resume.session_id, seq = resume.seq, "Resuming session");
            send(conn, GatewayPayload::command(opcode::RESUME, &resume)?).await?;
            self.set_state(ConnectionState::Resuming);
        } else {
            if can_resume {
                warn!("No resume credentials, identifying instead");
            }
            self.data.clear();
            *conn.sequence.lock().await = None;
            let identify = Identify {
                token: self.config.token.clone(),
                intents: self.config.intents,
                properties: self.config.properties.clone(),
                presence: self.config.presence.clone(),
            };
            info!(intents = identify.intents, "Identifying");
            send(conn, GatewayPayload::command(opcode::IDENTIFY, &identify)?).await?;
            self.set_state(ConnectionState::Identifying);
        }
        Ok(())
    }

    fn handle_dispatch(&mut self, event: Option<String>, data: Option<Value>) {
        let Some(event) = event else {
            warn!("Dispatch without an event name");
            return;
        };

        let outcome = match self.router.dispatch(&event, data.unwrap_or(Value::Null)) {
            Ok(outcome) => outcome,
            Err(e @ DispatchError::Decode { .. }) => {
                warn!(error = %e, "Dropping malformed dispatch event");
                return;
            },
            Err(DispatchError::Listener {
                event,
                source,
                outcome,
            }) => {
                error!(event = %event, error = %source, "Listener failed");
                outcome
            },
        };

        match outcome {
            DispatchOutcome::Ready {
                session_id,
                resume_gateway_url,
            } => {
                info!(session_id = %session_id, "Gateway session established (READY)");
                self.data.session_id = Some(session_id);
                if protocol::is_valid_resume_url(&resume_gateway_url) {
                    self.data.resume_gateway_url = Some(resume_gateway_url);
                } else {
                    warn!(url = %resume_gateway_url, "READY contained invalid resume URL, ignoring");
                    self.data.resume_gateway_url = None;
                }
                self.mark_active();
            },
            DispatchOutcome::Resumed => {
                info!("Gateway session resumed");
                self.mark_active();
            },
            DispatchOutcome::Applied { .. } | DispatchOutcome::Observed | DispatchOutcome::Ignored => {},
        }
    }

    fn mark_active(&mut self) {
        self.reached_active = true;
        self.set_state(ConnectionState::Active);
    }

    async fn forward_command(&self, conn: &LiveConnection, command: GatewayCommand) {
        if let GatewayCommand::RequestGuildMembers(request) = &command
            && self
                .cache()
                .guild(&request.guild_id)
                .is_none_or(hearth_cache::GuildState::is_unavailable)
        {
            warn!(guild_id = %request.guild_id, "Dropping member request for unavailable guild");
            return;
        }

        match command.into_payload() {
            Ok(payload) => {
                debug!(op = payload.op, "Forwarding gateway command");
                if conn.outbound.send(Outbound::Frame(payload)).await.is_err() {
                    debug!("Writer gone, dropping command");
                }
            },
            Err(e) => warn!(error = %e, "Failed to encode gateway command"),
        }
    }
}

impl<C> std::fmt::Debug for GatewaySession<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewaySession")
            .field("gateway_url", &self.gateway_url)
            .field("state", &*self.state_tx.borrow())
            .field("data", &self.data)
            .field("connected", &self.connection.is_some())
            .finish_non_exhaustive()
    }
}

// ── Connection tasks ─────────────────────────────────────────

async fn send(conn: &LiveConnection, payload: GatewayPayload) -> GatewayResult<()> {
    conn.outbound
        .send(Outbound::Frame(payload))
        .await
        .map_err(|_| GatewayError::ConnectionLost)
}

/// Drain the outbound queue into the sink. A failed send cancels the
/// connection so the read loop notices.
async fn run_writer(
    mut sink: Box<dyn FrameSink>,
    mut outbound: mpsc::Receiver<Outbound>,
    token: CancellationToken,
) {
    while let Some(item) = outbound.recv().await {
        match item {
            Outbound::Frame(payload) => {
                let text = match payload.encode() {
                    Ok(text) => text,
                    Err(e) => {
                        error!(error = %e, "Failed to serialize gateway payload");
                        continue;
                    },
                };
                if let Err(e) = sink.send(text).await {
                    warn!(error = %e, "Writer send failed, cancelling connection");
                    token.cancel();
                    return;
                }
            },
            Outbound::Close(code) => {
                if let Err(e) = sink.close(code).await {
                    debug!(error = %e, "Close frame not sent");
                }
                return;
            },
        }
    }
}

/// Stop the heartbeat, close the socket and let the writer flush.
async fn teardown(conn: LiveConnection, resumable: bool) {
    let LiveConnection {
        stream,
        outbound,
        token,
        mut writer,
        heartbeat,
        server_closed,
        ..
    } = conn;

    token.cancel();
    if let Some(heartbeat) = heartbeat {
        heartbeat.abort();
    }
    if !server_closed {
        // 1000 invalidates the session server-side.
        let code = if resumable {
            close_code::UNKNOWN_ERROR
        } else {
            close_code::NORMAL
        };
        if outbound.try_send(Outbound::Close(code)).is_err() {
            debug!("Writer unavailable for close frame");
        }
    }

    drop(outbound);
    tokio::select! {
        _ = &mut writer => {},
        () = tokio::time::sleep(WRITER_GRACE) => {
            writer.abort();
        },
    }
    drop(stream);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_data_requires_both_credentials() {
        let mut data = SessionData {
            session_id: Some("s1".into()),
            ..SessionData::default()
        };
        assert!(!data.can_resume());

        data.resume_gateway_url = Some("wss://resume.example".into());
        assert!(data.can_resume());
    }

    #[test]
    fn clear_keeps_heartbeat_interval() {
        let mut data = SessionData {
            session_id: Some("s1".into()),
            sequence: Some(42),
            resume_gateway_url: Some("wss://resume.example".into()),
            heartbeat_interval: Some(Duration::from_millis(41_250)),
        };
        data.clear();
        assert_eq!(data.sequence, None);
        assert!(!data.can_resume());
        assert_eq!(data.heartbeat_interval, Some(Duration::from_millis(41_250)));
    }

    #[test]
    fn session_end_resumability() {
        assert!(SessionEnd::ReconnectRequested.can_resume());
        assert!(SessionEnd::Cancelled.can_resume());
        assert!(!SessionEnd::Shutdown.can_resume());
        assert!(SessionEnd::InvalidSession { resumable: true }.can_resume());
        assert!(!SessionEnd::InvalidSession { resumable: false }.can_resume());
        assert!(
            !SessionEnd::Closed {
                code: 4004,
                resumable: false
            }
            .can_resume()
        );
    }

    struct NeverConnects;

    #[async_trait::async_trait]
    impl Connector for NeverConnects {
        async fn connect(&self, _url: &str) -> GatewayResult<Connection> {
            Err(GatewayError::Transport("refused".into()))
        }
    }

    fn session(config: GatewayConfig) -> GatewaySession<NeverConnects> {
        GatewaySession::new(
            config,
            NeverConnects,
            "wss://gateway.example/?v=10&encoding=json",
            ListenerRegistry::new(),
            None,
            CancellationToken::new(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn connect_gives_up_after_budget() {
        let mut config = GatewayConfig::new("token");
        config.max_connect_attempts = 3;
        let mut session = session(config);

        let err = session.connect(false).await.unwrap_err();
        assert!(matches!(err, GatewayError::ConnectFailed { attempts: 3, .. }));
        assert!(err.is_fatal());
    }

    #[tokio::test(start_paused = true)]
    async fn run_fails_when_connect_fails() {
        let mut config = GatewayConfig::new("token");
        config.max_connect_attempts = 1;
        let mut session = session(config);

        assert!(session.run().await.is_err());
        assert_eq!(session.state(), ConnectionState::Failed);
    }

    #[tokio::test]
    async fn run_session_without_connection_is_an_error() {
        let mut session = session(GatewayConfig::new("token"));
        assert!(matches!(
            session.run_session(false).await,
            Err(GatewayError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn cancelled_shutdown_returns_cleanly() {
        let mut session = session(GatewayConfig::new("token"));
        session.shutdown_token().cancel();
        session.run().await.unwrap();
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }
}
