//! Transport abstraction and the `WebSocket` implementation.
//!
//! The session only needs text frames in both directions plus close codes.
//! [`Connector`] opens a connection and hands back its two halves: a
//! [`FrameSink`] owned by the writer task and a [`FrameStream`] owned by
//! the read loop.

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::trace;

use crate::error::{GatewayError, GatewayResult};

/// Close code reported when the peer closes without a status.
const NO_STATUS: u16 = 1005;

/// Write half of a connection.
#[async_trait]
pub trait FrameSink: Send {
    /// Send one text frame.
    async fn send(&mut self, text: String) -> GatewayResult<()>;

    /// Send a close frame with `code`.
    async fn close(&mut self, code: u16) -> GatewayResult<()>;
}

/// Read half of a connection.
#[async_trait]
pub trait FrameStream: Send + Sync {
    /// Receive the next text frame.
    ///
    /// Returns `Ok(None)` when the stream ends without a close frame and
    /// [`GatewayError::Closed`] when the peer sends one. Must be cancel-safe:
    /// dropping the future must not lose a frame.
    async fn recv(&mut self) -> GatewayResult<Option<String>>;
}

/// Opens connections to a gateway URL.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new connection.
    async fn connect(&self, url: &str) -> GatewayResult<Connection>;
}

/// A freshly opened connection, split into halves.
pub struct Connection {
    /// Write half.
    pub sink: Box<dyn FrameSink>,
    /// Read half.
    pub stream: Box<dyn FrameStream>,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

// ── WebSocket ────────────────────────────────────────────────

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Connector backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, url: &str) -> GatewayResult<Connection> {
        let (ws, _response) = connect_async(url).await?;
        let (writer, reader) = ws.split();
        Ok(Connection {
            sink: Box::new(WsSink(writer)),
            stream: Box::new(WsReader(reader)),
        })
    }
}

struct WsSink(SplitSink<WsStream, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send(&mut self, text: String) -> GatewayResult<()> {
        self.0.send(Message::Text(text.into())).await?;
        Ok(())
    }

    async fn close(&mut self, code: u16) -> GatewayResult<()> {
        let frame = CloseFrame {
            code: code.into(),
            reason: "closing".into(),
        };
        self.0.send(Message::Close(Some(frame))).await?;
        Ok(())
    }
}

struct WsReader(SplitStream<WsStream>);

#[async_trait]
impl FrameStream for WsReader {
    async fn recv(&mut self) -> GatewayResult<Option<String>> {
        loop {
            match self.0.next().await {
                Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                Some(Ok(Message::Close(frame))) => {
                    let code = frame.as_ref().map_or(NO_STATUS, |f| f.code.into());
                    return Err(GatewayError::Closed(code));
                },
                Some(Ok(other)) => {
                    // Ping/pong is answered by tungstenite; binary is unused.
                    trace!(kind = ?std::mem::discriminant(&other), "Skipping non-text frame");
                },
                Some(Err(e)) => return Err(e.into()),
                None => return Ok(None),
            }
        }
    }
}
