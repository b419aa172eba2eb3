//! Minimal REST client for one-shot API calls.
//!
//! Covers gateway discovery and the handful of writes a bot needs from a
//! listener. Rate-limit bookkeeping is left to the server: a 429 surfaces as
//! [`RestError::Api`] like any other non-success status.

use std::fmt;

use hearth_cache::model::{Channel, Message};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::GatewayConfig;
use crate::error::{RestError, RestResult};
use crate::protocol::{self, GatewayBotResponse};

/// Body of `POST /channels/{id}/messages`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateMessage {
    /// Message text.
    pub content: String,
    /// Text-to-speech.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub tts: bool,
}

/// Body of `POST /guilds/{id}/channels`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateChannel {
    /// Channel name.
    pub name: String,
    /// Channel type tag.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Parent category.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Channel topic.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
}

/// Body of `POST /channels/{id}/threads`.
#[derive(Debug, Clone, Default, Serialize)]
pub struct CreateThread {
    /// Thread name.
    pub name: String,
    /// Minutes of inactivity before auto-archiving.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auto_archive_duration: Option<u32>,
    /// Thread type tag.
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<u8>,
}

/// Error body returned by the API.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: u64,
    #[serde(default)]
    message: String,
}

/// Authenticated HTTP client for the REST API.
#[derive(Clone)]
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    api_version: u8,
}

impl fmt::Debug for RestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.base_url)
            .field("has_token", &!self.token.is_empty())
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a client for `{api_base}/v{api_version}`.
    #[must_use]
    pub fn new(token: impl Into<String>, api_base: &str, api_version: u8) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("{}/v{api_version}", api_base.trim_end_matches('/')),
            token: token.into(),
            api_version,
        }
    }

    /// Create a client from gateway settings.
    #[must_use]
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(config.token.clone(), &config.api_base, config.api_version)
    }

    /// The versioned base URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send a request and decode the JSON response.
    ///
    /// # Errors
    ///
    /// Returns [`RestError::Api`] for non-success statuses, and transport or
    /// decode errors otherwise.
    pub async fn request<B, R>(&self, method: Method, path: &str, body: Option<&B>) -> RestResult<R>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        if !path.starts_with('/') {
            return Err(RestError::InvalidUrl(path.to_owned()));
        }
        let url = format!("{}{path}", self.base_url);
        debug!(method = %method, path, "REST request");

        let mut request = self
            .http
            .request(method, &url)
            .header("Authorization", format!("Bot {}", self.token));
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let err = api_error(status.as_u16(), &bytes);
            warn!(path, error = %err, "REST request failed");
            return Err(err);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Discover the gateway URL, with the version and encoding query
    /// appended.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn gateway_url(&self) -> RestResult<String> {
        let body: GatewayBotResponse = self
            .request::<(), _>(Method::GET, "/gateway/bot", None)
            .await?;
        Ok(protocol::with_query(&body.url, self.api_version))
    }

    /// Post a message to a channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn send_message(&self, channel_id: &str, message: &CreateMessage) -> RestResult<Message> {
        self.request(Method::POST, &format!("/channels/{channel_id}/messages"), Some(message))
            .await
    }

    /// Create a guild channel.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_channel(&self, guild_id: &str, channel: &CreateChannel) -> RestResult<Channel> {
        self.request(Method::POST, &format!("/guilds/{guild_id}/channels"), Some(channel))
            .await
    }

    /// Start a thread without a message.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn create_thread(&self, channel_id: &str, thread: &CreateThread) -> RestResult<Channel> {
        self.request(Method::POST, &format!("/channels/{channel_id}/threads"), Some(thread))
            .await
    }
}

/// Build an API error from a non-success response.
fn api_error(status: u16, body: &[u8]) -> RestError {
    match serde_json::from_slice::<ApiErrorBody>(body) {
        Ok(parsed) => RestError::Api {
            status,
            code: parsed.code,
            message: parsed.message,
        },
        Err(_) => RestError::Api {
            status,
            code: 0,
            message: String::from_utf8_lossy(body).into_owned(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_url_includes_version() {
        let client = RestClient::new("t", "https://discord.com/api/", 10);
        assert_eq!(client.base_url(), "https://discord.com/api/v10");
    }

    #[test]
    fn debug_hides_token() {
        let client = RestClient::new("very-secret", DEFAULT_BASE, 10);
        assert!(!format!("{client:?}").contains("very-secret"));
    }

    const DEFAULT_BASE: &str = crate::config::DEFAULT_API_BASE;

    #[test]
    fn api_error_parses_body() {
        let err = api_error(403, br#"{"code": 50013, "message": "Missing Permissions"}"#);
        assert!(matches!(
            err,
            RestError::Api { status: 403, code: 50013, ref message } if message == "Missing Permissions"
        ));
    }

    #[test]
    fn api_error_falls_back_to_raw_body() {
        let err = api_error(502, b"Bad Gateway");
        assert!(matches!(
            err,
            RestError::Api { status: 502, code: 0, ref message } if message == "Bad Gateway"
        ));
    }

    #[test]
    fn request_bodies_serialize_wire_names() {
        let channel = CreateChannel {
            name: "general".into(),
            kind: 0,
            ..Default::default()
        };
        let value = serde_json::to_value(&channel).unwrap();
        assert_eq!(value["type"], 0);
        assert!(value.get("parent_id").is_none());

        let message = CreateMessage {
            content: "hi".into(),
            tts: false,
        };
        let value = serde_json::to_value(&message).unwrap();
        assert!(value.get("tts").is_none());
    }

    #[tokio::test]
    async fn relative_paths_are_rejected() {
        let client = RestClient::new("t", "http://127.0.0.1:1", 10);
        let err = client
            .request::<(), serde_json::Value>(Method::GET, "gateway", None)
            .await
            .unwrap_err();
        assert!(matches!(err, RestError::InvalidUrl(_)));
    }
}
