//! In-memory registry of active broadcaster sessions.
//!
//! Sessions are keyed by channel id. Every read-modify-write happens while
//! the map shard is held and contains no `.await`, so no two requests can
//! interleave on one session's fields. Guards returned from here must be
//! dropped before awaiting anything.

mod error;
mod session;

use dashmap::DashMap;
use dashmap::mapref::one::RefMut;
use tracing::{debug, info};

pub use error::{RegistryError, RegistryResult};
pub use session::{
    BroadcasterSession, CHOSEN_TALENTS, DISPLAYING_TALENTS, GameState, GameStatePatch, TALENTS,
};

/// Outcome of merging an update into a session.
#[derive(Debug, Clone)]
pub struct StateUpdate {
    /// Whether any field was written.
    pub changed: bool,
    /// Game state after the merge.
    pub game_state: GameState,
}

/// Owner of every [`BroadcasterSession`].
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: DashMap<String, BroadcasterSession>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the session for `channel_id`, creating an empty one if needed.
    pub fn upsert(&self, channel_id: &str) -> RefMut<'_, String, BroadcasterSession> {
        self.sessions
            .entry(channel_id.to_string())
            .or_insert_with(|| {
                info!(channel_id, "registered broadcaster session");
                BroadcasterSession::new(channel_id)
            })
    }

    /// Upsert the session and merge `patch` into it in one step.
    pub fn upsert_and_merge(&self, channel_id: &str, patch: &GameStatePatch) -> StateUpdate {
        let mut session = self.upsert(channel_id);
        let changed = session.merge_state(patch);
        debug!(channel_id, changed, "merged broadcaster update");
        StateUpdate {
            changed,
            game_state: session.game_state.clone(),
        }
    }

    /// Attach a viewer to an existing session and return its game state.
    ///
    /// Only the game state is cloned. The viewer set stays in the map.
    pub fn register_viewer(&self, channel_id: &str, viewer_id: &str) -> RegistryResult<GameState> {
        let mut session = self
            .sessions
            .get_mut(channel_id)
            .ok_or_else(|| RegistryError::NotFound(channel_id.to_string()))?;

        if session.add_viewer(viewer_id) {
            debug!(channel_id, viewer_id, "viewer attached");
        }

        Ok(session.game_state.clone())
    }

    /// Snapshot of the session for `channel_id`.
    pub fn get(&self, channel_id: &str) -> Option<BroadcasterSession> {
        self.sessions.get(channel_id).map(|s| s.clone())
    }

    pub fn contains(&self, channel_id: &str) -> bool {
        self.sessions.contains_key(channel_id)
    }

    /// Drop the session. Its viewers go with it.
    pub fn remove(&self, channel_id: &str) -> bool {
        let removed = self.sessions.remove(channel_id).is_some();
        if removed {
            info!(channel_id, "removed broadcaster session");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
