//! Error types for the gateway client.

use crate::dispatch::DispatchOutcome;
use crate::listener::ListenerError;

/// Errors produced by the gateway session and its reconnect loop.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// `WebSocket` transport error.
    #[error("WebSocket error: {0}")]
    WebSocket(Box<tokio_tungstenite::tungstenite::Error>),

    /// Transport failure reported by a non-WebSocket connector.
    #[error("Transport error: {0}")]
    Transport(String),

    /// REST failure while discovering the gateway URL.
    #[error("REST error: {0}")]
    Rest(#[from] RestError),

    /// The gateway envelope could not be encoded or decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Connection closed with a code.
    #[error("Connection closed with code {0}")]
    Closed(u16),

    /// The connection ended without a close frame.
    #[error("Connection lost")]
    ConnectionLost,

    /// Authentication failed (close code 4004).
    #[error("Authentication failed (close code 4004)")]
    AuthenticationFailed,

    /// Invalid intents configuration (close code 4013 or 4014).
    #[error("Invalid intents configuration (close code {0})")]
    InvalidIntents(u16),

    /// Unrecoverable close code from the gateway.
    #[error("Unrecoverable close code: {0}")]
    UnrecoverableClose(u16),

    /// The gateway did not send a Hello payload in time.
    #[error("Timed out waiting for Hello from gateway")]
    HelloTimeout,

    /// Every connection attempt failed.
    #[error("Failed to connect after {attempts} attempts: {source}")]
    ConnectFailed {
        /// Number of attempts made.
        attempts: u32,
        /// The last connection error.
        #[source]
        source: Box<GatewayError>,
    },

    /// Too many consecutive sessions failed before becoming active.
    #[error("Gave up after {attempts} consecutive failed sessions")]
    ReconnectBudgetExhausted {
        /// Number of failed sessions.
        attempts: u32,
    },

    /// Protocol violation from the gateway.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// No live session to send a command on.
    #[error("Gateway is not connected")]
    NotConnected,

    /// The outbound command queue is full.
    #[error("Gateway command queue is full")]
    CommandQueueFull,

    /// Shutdown was requested.
    #[error("Shutdown requested")]
    Shutdown,
}

impl From<tokio_tungstenite::tungstenite::Error> for GatewayError {
    fn from(err: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket(Box::new(err))
    }
}

impl GatewayError {
    /// Returns `true` if the client must not reconnect after this error.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::AuthenticationFailed
            | Self::InvalidIntents(_)
            | Self::UnrecoverableClose(_)
            | Self::ConnectFailed { .. }
            | Self::ReconnectBudgetExhausted { .. } => true,
            Self::Rest(err) => err.is_unauthorized(),
            _ => false,
        }
    }

    /// Returns `true` if the session may be resumed after this error.
    ///
    /// Transport failures leave the server-side session intact. A malformed
    /// envelope means the stream can no longer be trusted, so the next
    /// session identifies from scratch.
    #[must_use]
    pub fn can_resume(&self) -> bool {
        match self {
            Self::WebSocket(_)
            | Self::Transport(_)
            | Self::ConnectionLost
            | Self::HelloTimeout => true,
            Self::Closed(code) => crate::protocol::is_resumable_close(*code),
            _ => false,
        }
    }
}

/// Errors produced by the REST client.
#[derive(Debug, thiserror::Error)]
pub enum RestError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status.
    #[error("API error {code} (HTTP {status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// API error code from the body, zero if absent.
        code: u64,
        /// Error message from the body.
        message: String,
    },

    /// A URL could not be built.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

impl RestError {
    /// Returns `true` if the API rejected the credentials.
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api { status: 401, .. })
    }
}

/// Errors produced while routing a single dispatch event.
///
/// These never end the session; the router's caller logs them and moves on.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The event payload did not match its schema.
    #[error("Failed to decode {event} payload: {source}")]
    Decode {
        /// Wire name of the event.
        event: String,
        /// Decoder error.
        #[source]
        source: serde_json::Error,
    },

    /// A listener returned an error.
    #[error("Listener for {event} failed: {source}")]
    Listener {
        /// Wire name of the event.
        event: String,
        /// Listener error.
        #[source]
        source: ListenerError,
        /// What the router did before the listener ran.
        outcome: DispatchOutcome,
    },
}

/// Result type for gateway operations.
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Result type for REST operations.
pub type RestResult<T> = Result<T, RestError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = GatewayError::AuthenticationFailed;
        assert!(err.to_string().contains("4004"));

        let err = GatewayError::InvalidIntents(4013);
        assert!(err.to_string().contains("4013"));

        let err = GatewayError::HelloTimeout;
        assert!(err.to_string().contains("Hello"));

        let err = GatewayError::ConnectFailed {
            attempts: 5,
            source: Box::new(GatewayError::Transport("refused".into())),
        };
        assert!(err.to_string().contains("5 attempts"));
        assert!(err.to_string().contains("refused"));
    }

    #[test]
    fn fatal_classification() {
        assert!(GatewayError::AuthenticationFailed.is_fatal());
        assert!(GatewayError::InvalidIntents(4014).is_fatal());
        assert!(GatewayError::UnrecoverableClose(4012).is_fatal());
        assert!(GatewayError::ReconnectBudgetExhausted { attempts: 3 }.is_fatal());
        assert!(!GatewayError::ConnectionLost.is_fatal());
        assert!(!GatewayError::HelloTimeout.is_fatal());
        assert!(!GatewayError::Closed(4000).is_fatal());

        let unauthorized = RestError::Api {
            status: 401,
            code: 0,
            message: "401: Unauthorized".into(),
        };
        assert!(GatewayError::Rest(unauthorized).is_fatal());
    }

    #[test]
    fn resume_classification() {
        assert!(GatewayError::ConnectionLost.can_resume());
        assert!(GatewayError::Transport("reset".into()).can_resume());
        assert!(GatewayError::Closed(4009).can_resume());
        assert!(!GatewayError::Closed(1000).can_resume());
        assert!(!GatewayError::Protocol("bad envelope".into()).can_resume());

        let json = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert!(!GatewayError::Json(json).can_resume());
    }

    #[test]
    fn api_error_carries_code_and_message() {
        let err = RestError::Api {
            status: 403,
            code: 50013,
            message: "Missing Permissions".into(),
        };
        assert!(err.to_string().contains("50013"));
        assert!(err.to_string().contains("Missing Permissions"));
        assert!(!err.is_unauthorized());
    }
}
