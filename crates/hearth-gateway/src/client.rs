//! Top-level client: configuration, listeners and REST in one place.

use std::sync::Arc;

use hearth_cache::DispatchEvent;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::listener::{HandlerResult, ListenerContext, ListenerRegistry};
use crate::rest::RestClient;
use crate::session::GatewaySession;
use crate::transport::{Connector, WsConnector};

/// Gateway client builder.
///
/// Register listeners with [`on`](Self::on) before connecting; the
/// registry is fixed once the session starts.
#[derive(Debug)]
pub struct Client {
    config: GatewayConfig,
    rest: Arc<RestClient>,
    listeners: ListenerRegistry,
}

impl Client {
    /// Create a client.
    #[must_use]
    pub fn new(config: GatewayConfig) -> Self {
        let rest = Arc::new(RestClient::from_config(&config));
        Self {
            config,
            rest,
            listeners: ListenerRegistry::new(),
        }
    }

    /// Register a listener for events of type `E`. Returns `true` if it
    /// replaced an earlier one.
    pub fn on<E, F>(&mut self, handler: F) -> bool
    where
        E: DispatchEvent,
        F: Fn(&ListenerContext<'_>, &E) -> HandlerResult + Send + Sync + 'static,
    {
        self.listeners.on::<E, F>(handler)
    }

    /// The listener registry.
    pub fn listeners_mut(&mut self) -> &mut ListenerRegistry {
        &mut self.listeners
    }

    /// The REST client.
    #[must_use]
    pub fn rest(&self) -> &Arc<RestClient> {
        &self.rest
    }

    /// The configuration.
    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Build a session against a known gateway URL.
    #[must_use]
    pub fn into_session<C: Connector>(
        self,
        connector: C,
        gateway_url: impl Into<String>,
        shutdown: CancellationToken,
    ) -> GatewaySession<C> {
        GatewaySession::new(
            self.config,
            connector,
            gateway_url,
            self.listeners,
            Some(self.rest),
            shutdown,
        )
    }

    /// Discover the gateway URL over REST and build a session.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Rest`](crate::GatewayError::Rest) if
    /// discovery fails.
    pub async fn connect_with<C: Connector>(
        self,
        connector: C,
        shutdown: CancellationToken,
    ) -> GatewayResult<GatewaySession<C>> {
        let url = self.rest.gateway_url().await?;
        info!(url = %url, "Discovered gateway URL");
        Ok(self.into_session(connector, url, shutdown))
    }

    /// Connect over `WebSocket` and run until `shutdown` fires or a fatal
    /// error occurs.
    ///
    /// # Errors
    ///
    /// Returns discovery errors and the session's terminal error.
    pub async fn run(self, shutdown: CancellationToken) -> GatewayResult<()> {
        let mut session = self.connect_with(WsConnector, shutdown).await?;
        session.run().await
    }
}

#[cfg(test)]
mod tests {
    use hearth_cache::events::{GuildCreate, MessageCreate};

    use super::*;

    #[test]
    fn rest_client_follows_config() {
        let mut config = GatewayConfig::new("token");
        config.api_base = "http://127.0.0.1:9/api/".into();
        config.api_version = 9;
        let client = Client::new(config);
        assert_eq!(client.rest().base_url(), "http://127.0.0.1:9/api/v9");
    }

    #[test]
    fn listeners_carry_into_session() {
        let mut client = Client::new(GatewayConfig::new("token"));
        assert!(!client.on::<GuildCreate, _>(|_, _| Ok(())));
        assert!(!client.on::<MessageCreate, _>(|_, _| Ok(())));
        assert!(client.on::<GuildCreate, _>(|_, _| Ok(())));

        let session = client.into_session(
            WsConnector,
            "wss://gateway.example/?v=10&encoding=json",
            CancellationToken::new(),
        );
        assert_eq!(session.router().listeners().len(), 2);
    }
}
