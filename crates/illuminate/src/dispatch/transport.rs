//! Transports that deliver a message to a channel's viewers.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use reqwest::header::AUTHORIZATION;
use tracing::debug;

use super::{DispatchError, MessageEnvelope};

/// Default host of the extension message API.
pub const DEFAULT_API_BASE_URL: &str = "https://api.twitch.tv";

/// Bytes of a rejection body kept in [`DispatchError::Rejected`].
pub const MAX_ERROR_BODY_BYTES: usize = 512;

/// Publish capability of the external broadcast service.
#[async_trait]
pub trait BroadcastTransport: Send + Sync {
    /// Deliver `envelope` to `channel_id`, authenticated with `credential`.
    async fn publish(
        &self,
        channel_id: &str,
        credential: &str,
        envelope: &MessageEnvelope,
    ) -> Result<(), DispatchError>;
}

/// HTTP client for `POST /extensions/message/{channel_id}`.
#[derive(Debug, Clone)]
pub struct ExtensionMessageClient {
    client: Client,
    /// Base URL, e.g. "https://api.twitch.tv".
    base_url: String,
    /// Extension client id sent with every request.
    client_id: String,
}

impl ExtensionMessageClient {
    pub fn new(
        base_url: impl Into<String>,
        client_id: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, DispatchError> {
        let client = Client::builder().timeout(timeout).build()?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            client_id: client_id.into(),
        })
    }

    fn message_url(&self, channel_id: &str) -> String {
        format!("{}/extensions/message/{}", self.base_url, channel_id)
    }
}

#[async_trait]
impl BroadcastTransport for ExtensionMessageClient {
    async fn publish(
        &self,
        channel_id: &str,
        credential: &str,
        envelope: &MessageEnvelope,
    ) -> Result<(), DispatchError> {
        let url = self.message_url(channel_id);
        let response = self
            .client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", credential))
            .header("Client-Id", &self.client_id)
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        debug!(channel_id, status = status.as_u16(), "broadcast API responded");

        if status.is_success() {
            return Ok(());
        }

        Err(DispatchError::Rejected {
            status: status.as_u16(),
            body: read_error_body(response).await,
        })
    }
}

/// Read at most about [`MAX_ERROR_BODY_BYTES`] of a rejection body.
async fn read_error_body(mut response: Response) -> String {
    let mut body = Vec::new();
    while body.len() <= MAX_ERROR_BODY_BYTES {
        match response.chunk().await {
            Ok(Some(chunk)) => body.extend_from_slice(&chunk),
            _ => break,
        }
    }
    truncate_body(String::from_utf8_lossy(&body).into_owned())
}

fn truncate_body(mut body: String) -> String {
    if body.len() > MAX_ERROR_BODY_BYTES {
        let mut end = MAX_ERROR_BODY_BYTES;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        body.truncate(end);
    }
    body
}
