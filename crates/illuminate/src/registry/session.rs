//! Broadcaster sessions and their game state.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Ordered list of talent identifiers.
pub const TALENTS: &str = "talents";
/// Whether the overlay should show talents on hover.
pub const DISPLAYING_TALENTS: &str = "displayingTalents";
/// Talents picked so far this game.
pub const CHOSEN_TALENTS: &str = "chosenTalents";

/// Open-ended game state published to viewers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameState(Map<String, Value>);

impl GameState {
    /// State that hides the overlay for every viewer.
    pub fn reset() -> Self {
        let mut fields = Map::new();
        fields.insert(DISPLAYING_TALENTS.to_string(), Value::Bool(false));
        fields.insert(TALENTS.to_string(), json!([]));
        Self(fields)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

/// Fields supplied by a broadcaster update.
///
/// A key being present is what makes it an update, so explicit `false` or
/// `null` values are applied. `talents` is the exception, see
/// [`BroadcasterSession::merge_state`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GameStatePatch(Map<String, Value>);

impl GameStatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style field setter.
    pub fn with(mut self, field: impl Into<String>, value: Value) -> Self {
        self.0.insert(field.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Map<String, Value>> for GameStatePatch {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}

/// JSON truthiness: `null`, `false`, `0`, `""` and `[]` are falsy.
fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// An active broadcaster and the viewers attached to it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcasterSession {
    pub channel_id: String,
    pub game_state: GameState,
    pub viewers: HashSet<String>,
    pub created_at: DateTime<Utc>,
}

impl BroadcasterSession {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            game_state: GameState::default(),
            viewers: HashSet::new(),
            created_at: Utc::now(),
        }
    }

    /// Overwrite each supplied field of the game state.
    ///
    /// `talents` only counts when truthy: an empty or null list leaves the
    /// stored talents alone. Returns whether any field was written.
    pub fn merge_state(&mut self, patch: &GameStatePatch) -> bool {
        let mut changed = false;
        for (field, value) in &patch.0 {
            if field == TALENTS && !is_truthy(value) {
                continue;
            }
            self.game_state.0.insert(field.clone(), value.clone());
            changed = true;
        }
        changed
    }

    /// Attach a viewer. Returns false when it was already attached.
    pub fn add_viewer(&mut self, viewer_id: &str) -> bool {
        if self.viewers.contains(viewer_id) {
            return false;
        }
        self.viewers.insert(viewer_id.to_string())
    }
}
