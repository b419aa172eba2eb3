//! Scripted in-memory gateway transport.
//!
//! [`MockConnector`] implements [`Connector`]. Every successful connect
//! hands a [`MockPeer`] to the paired [`MockServer`]; the test drives the
//! server side of that connection through the peer.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use hearth_gateway::protocol::opcode;
use hearth_gateway::{
    Connection, Connector, FrameSink, FrameStream, GatewayError, GatewayResult,
};
use serde_json::{Value, json};
use tokio::sync::mpsc;

/// Frame sent by the client, as seen by the peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientFrame {
    /// A text frame.
    Text(String),
    /// A close frame with its code.
    Close(u16),
}

/// Frame queued by the peer for the client.
#[derive(Debug)]
enum ServerFrame {
    Text(String),
    Close(u16),
    End,
}

#[derive(Debug, Default)]
struct ConnectorState {
    urls: Vec<String>,
    failures_left: u32,
}

/// [`Connector`] backed by in-memory channels.
#[derive(Debug, Clone)]
pub struct MockConnector {
    state: Arc<Mutex<ConnectorState>>,
    accepted: mpsc::UnboundedSender<MockPeer>,
}

impl MockConnector {
    /// Create a connector and the server that receives its connections.
    #[must_use]
    pub fn new() -> (Self, MockServer) {
        let (accepted, rx) = mpsc::unbounded_channel();
        let connector = Self {
            state: Arc::new(Mutex::new(ConnectorState::default())),
            accepted,
        };
        (connector, MockServer { accepted: rx })
    }

    /// Make the next `count` connection attempts fail.
    pub fn fail_next(&self, count: u32) {
        if let Ok(mut state) = self.state.lock() {
            state.failures_left = count;
        }
    }

    /// Every URL a connection was attempted on, in order.
    #[must_use]
    pub fn urls(&self) -> Vec<String> {
        self.state
            .lock()
            .map(|state| state.urls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> GatewayResult<Connection> {
        {
            let mut state = self
                .state
                .lock()
                .map_err(|_| GatewayError::Transport("connector state poisoned".into()))?;
            state.urls.push(url.to_owned());
            if state.failures_left > 0 {
                state.failures_left = state.failures_left.saturating_sub(1);
                return Err(GatewayError::Transport("connection refused".into()));
            }
        }

        let (to_peer, from_client) = mpsc::unbounded_channel();
        let (to_client, from_peer) = mpsc::unbounded_channel();
        let send_broken = Arc::new(AtomicBool::new(false));
        let peer = MockPeer {
            url: url.to_owned(),
            incoming: from_client,
            outgoing: to_client,
            send_broken: Arc::clone(&send_broken),
        };
        self.accepted
            .send(peer)
            .map_err(|_| GatewayError::Transport("mock server dropped".into()))?;

        Ok(Connection {
            sink: Box::new(MockSink {
                frames: to_peer,
                broken: send_broken,
            }),
            stream: Box::new(MockStream(from_peer)),
        })
    }
}

struct MockSink {
    frames: mpsc::UnboundedSender<ClientFrame>,
    broken: Arc<AtomicBool>,
}

#[async_trait]
impl FrameSink for MockSink {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("broken pipe".into()));
        }
        self.frames
            .send(ClientFrame::Text(text))
            .map_err(|_| GatewayError::Transport("peer hung up".into()))
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        self.frames
            .send(ClientFrame::Close(code))
            .map_err(|_| GatewayError::Transport("peer hung up".into()))
    }
}

struct MockStream(mpsc::UnboundedReceiver<ServerFrame>);

#[async_trait]
impl FrameStream for MockStream {
    async fn recv(&mut self) -> GatewayResult<Option<String>> {
        match self.0.recv().await {
            Some(ServerFrame::Text(text)) => Ok(Some(text)),
            Some(ServerFrame::Close(code)) => Err(GatewayError::Closed(code)),
            Some(ServerFrame::End) | None => Ok(None),
        }
    }
}

/// Receives connections made through a [`MockConnector`].
#[derive(Debug)]
pub struct MockServer {
    accepted: mpsc::UnboundedReceiver<MockPeer>,
}

impl MockServer {
    /// Wait for the next connection.
    ///
    /// # Panics
    ///
    /// Panics if every connector clone was dropped.
    pub async fn accept(&mut self) -> MockPeer {
        self.accepted
            .recv()
            .await
            .expect("mock connector dropped before connecting")
    }
}

/// The server end of one mock connection.
#[derive(Debug)]
pub struct MockPeer {
    url: String,
    incoming: mpsc::UnboundedReceiver<ClientFrame>,
    outgoing: mpsc::UnboundedSender<ServerFrame>,
    send_broken: Arc<AtomicBool>,
}

impl MockPeer {
    /// URL the client connected to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn push(&self, frame: ServerFrame) {
        // The client may already be gone; tests assert on outcomes instead.
        let _ = self.outgoing.send(frame);
    }

    /// Send a raw text frame.
    pub fn send_raw(&self, text: impl Into<String>) {
        self.push(ServerFrame::Text(text.into()));
    }

    /// Send a JSON payload.
    pub fn send_json(&self, payload: &Value) {
        self.send_raw(payload.to_string());
    }

    /// Send Hello (`op=10`).
    pub fn hello(&self, heartbeat_interval_ms: u64) {
        self.send_json(&json!({
            "op": opcode::HELLO,
            "d": {"heartbeat_interval": heartbeat_interval_ms},
        }));
    }

    /// Send a dispatch event (`op=0`).
    pub fn dispatch(&self, seq: u64, event: &str, data: Value) {
        self.send_json(&json!({"op": opcode::DISPATCH, "s": seq, "t": event, "d": data}));
    }

    /// Send Invalid Session (`op=9`).
    pub fn invalid_session(&self, resumable: bool) {
        self.send_json(&json!({"op": opcode::INVALID_SESSION, "d": resumable}));
    }

    /// Send Reconnect (`op=7`).
    pub fn reconnect(&self) {
        self.send_json(&json!({"op": opcode::RECONNECT, "d": null}));
    }

    /// Ask the client for an immediate heartbeat (`op=1`).
    pub fn request_heartbeat(&self) {
        self.send_json(&json!({"op": opcode::HEARTBEAT, "d": null}));
    }

    /// Acknowledge a heartbeat (`op=11`).
    pub fn heartbeat_ack(&self) {
        self.send_json(&json!({"op": opcode::HEARTBEAT_ACK}));
    }

    /// Close the connection with `code`.
    pub fn close(&self, code: u16) {
        self.push(ServerFrame::Close(code));
    }

    /// Make every later text frame sent by the client fail while the
    /// stream stays open.
    pub fn fail_sends(&self) {
        self.send_broken.store(true, Ordering::SeqCst);
    }

    /// End the stream without a close frame.
    pub fn end(&self) {
        self.push(ServerFrame::End);
    }

    /// Next frame from the client, or `None` once the client hung up.
    pub async fn recv(&mut self) -> Option<ClientFrame> {
        self.incoming.recv().await
    }

    /// Next text frame from the client, decoded as JSON.
    ///
    /// # Panics
    ///
    /// Panics on a close frame, a hang-up, or invalid JSON.
    pub async fn recv_json(&mut self) -> Value {
        match self.recv().await {
            Some(ClientFrame::Text(text)) => {
                serde_json::from_str(&text).expect("client sent invalid JSON")
            },
            other => panic!("expected a text frame, got {other:?}"),
        }
    }

    /// Next payload that is not a heartbeat.
    ///
    /// # Panics
    ///
    /// Same as [`recv_json`](Self::recv_json).
    pub async fn next_non_heartbeat(&mut self) -> Value {
        loop {
            let payload = self.recv_json().await;
            if payload["op"] != opcode::HEARTBEAT {
                return payload;
            }
        }
    }

    /// Wait for the client's close frame, skipping text frames.
    ///
    /// Returns `None` if the client hung up without one.
    pub async fn recv_close(&mut self) -> Option<u16> {
        loop {
            match self.recv().await? {
                ClientFrame::Close(code) => return Some(code),
                ClientFrame::Text(_) => {},
            }
        }
    }
}
