//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::ExtensionAuth;
use crate::dispatch::Dispatcher;
use crate::registry::SessionRegistry;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Active broadcaster sessions.
    pub registry: Arc<SessionRegistry>,
    /// Publishes game state to viewers.
    pub dispatcher: Arc<Dispatcher>,
    /// Verifies inbound extension tokens.
    pub auth: ExtensionAuth,
}

impl AppState {
    pub fn new(registry: Arc<SessionRegistry>, dispatcher: Arc<Dispatcher>, auth: ExtensionAuth) -> Self {
        Self {
            registry,
            dispatcher,
            auth,
        }
    }
}
