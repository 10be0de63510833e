//! Publishing game state to a channel's viewers.
//!
//! Each dispatch mints a fresh `external` token for the channel and runs the
//! publish call as a tracked task. The caller awaits the task and always gets
//! a [`DispatchResult`] back; failures never escape as errors. Dispatches for
//! the same channel are not serialized, so viewers may observe two rapid
//! updates in either order.

mod error;
mod transport;
mod types;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::task::TaskTracker;
use tracing::{info, warn};

use crate::auth::ExtensionAuth;
use crate::registry::GameState;

pub use error::DispatchError;
pub use transport::{
    BroadcastTransport, DEFAULT_API_BASE_URL, ExtensionMessageClient, MAX_ERROR_BODY_BYTES,
};
pub use types::{DispatchResult, MessageEnvelope};

/// Size cap on a published message.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 5 * 1024;

pub struct Dispatcher {
    auth: ExtensionAuth,
    transport: Arc<dyn BroadcastTransport>,
    tasks: TaskTracker,
    max_message_bytes: usize,
}

impl Dispatcher {
    pub fn new(auth: ExtensionAuth, transport: Arc<dyn BroadcastTransport>) -> Self {
        Self {
            auth,
            transport,
            tasks: TaskTracker::new(),
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }

    pub fn with_max_message_bytes(mut self, max_message_bytes: usize) -> Self {
        self.max_message_bytes = max_message_bytes;
        self
    }

    /// Mint the outbound token for `channel_id`.
    pub fn issue_outbound_credential(&self, channel_id: &str) -> Result<String, DispatchError> {
        Ok(self.auth.issue_outbound(channel_id)?)
    }

    /// Publish `game_state` to every viewer of `channel_id`.
    pub async fn dispatch(&self, channel_id: &str, game_state: &GameState) -> DispatchResult {
        let result = self.publish(channel_id, game_state).await;

        match &result {
            Ok(()) => info!(channel_id, "dispatched game state"),
            Err(e) => warn!(channel_id, error = %e, "game state dispatch failed"),
        }

        result.into()
    }

    async fn publish(&self, channel_id: &str, game_state: &GameState) -> Result<(), DispatchError> {
        let message = serde_json::to_string(game_state)?;
        if message.len() > self.max_message_bytes {
            return Err(DispatchError::PayloadTooLarge {
                size: message.len(),
                limit: self.max_message_bytes,
            });
        }

        let credential = self.issue_outbound_credential(channel_id)?;
        let envelope = MessageEnvelope::broadcast(message);
        let transport = Arc::clone(&self.transport);
        let channel_id = channel_id.to_string();

        // Spawned so the publish finishes even if the request is dropped.
        self.tasks
            .spawn(async move {
                transport
                    .publish(&channel_id, &credential, &envelope)
                    .await
            })
            .await
            .map_err(|e| DispatchError::TaskFailed(e.to_string()))?
    }

    /// Number of publish calls still in flight.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait up to `grace` for in-flight publishes. Returns false if some were
    /// still running and got dropped.
    pub async fn shutdown(&self, grace: Duration) -> bool {
        self.tasks.close();
        if tokio::time::timeout(grace, self.tasks.wait()).await.is_ok() {
            return true;
        }

        warn!(
            pending = self.tasks.len(),
            "dropping in-flight dispatches at shutdown"
        );
        false
    }
}
