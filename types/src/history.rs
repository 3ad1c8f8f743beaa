use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::Game;

/// A game as it was immediately before the mutation named by `action`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEntry {
    pub action: String,
    pub game_state: Game,
    pub timestamp: DateTime<Utc>,
}

impl HistoryEntry {
    /// Takes an owned copy of `game`, so later edits to the live game never
    /// reach the entry.
    pub fn capture(action: impl Into<String>, game: &Game) -> Self {
        Self {
            action: action.into(),
            game_state: game.clone(),
            timestamp: Utc::now(),
        }
    }
}
