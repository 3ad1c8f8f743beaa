use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use types::{Game, GameStatus, GameType, HistoryEntry, Player, Round};
use uuid::Uuid;

use crate::DatabaseError;

/// Column-for-column shape of a row in the `games` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameRow {
    pub id: String,
    pub name: String,
    pub players: String,
    pub rounds: String,
    pub current_round: i64,
    pub max_rounds: i64,
    pub collect_proposed_scores: bool,
    pub game_type: String,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryRow {
    pub id: Option<i64>,
    pub game_id: String,
    pub position: i64,
    pub action: String,
    pub game_state: String,
    pub timestamp: DateTime<Utc>,
}

impl TryFrom<&Game> for GameRow {
    type Error = DatabaseError;

    fn try_from(game: &Game) -> Result<Self, Self::Error> {
        Ok(Self {
            id: game.id.to_string(),
            name: game.name.clone(),
            players: serde_json::to_string(&game.players)?,
            rounds: serde_json::to_string(&game.rounds)?,
            current_round: i64::from(game.current_round),
            max_rounds: i64::from(game.max_rounds),
            collect_proposed_scores: game.collect_proposed_scores,
            game_type: game.game_type.as_str().to_string(),
            status: game.status.as_str().to_string(),
            created_at: game.created_at,
            updated_at: game.updated_at,
        })
    }
}

impl TryFrom<GameRow> for Game {
    type Error = DatabaseError;

    fn try_from(row: GameRow) -> Result<Self, Self::Error> {
        let players: Vec<Player> = serde_json::from_str(&row.players)?;
        let rounds: Vec<Round> = serde_json::from_str(&row.rounds)?;
        let game_type = GameType::parse(&row.game_type)
            .ok_or_else(|| DatabaseError::Query(format!("unknown game type {}", row.game_type)))?;
        let status = GameStatus::parse(&row.status)
            .ok_or_else(|| DatabaseError::Query(format!("unknown game status {}", row.status)))?;
        let current_round = u32::try_from(row.current_round)
            .map_err(|_| DatabaseError::Query(format!("bad current_round {}", row.current_round)))?;
        let max_rounds = u32::try_from(row.max_rounds)
            .map_err(|_| DatabaseError::Query(format!("bad max_rounds {}", row.max_rounds)))?;

        Ok(Game {
            id: Uuid::parse_str(&row.id)?,
            name: row.name,
            players,
            rounds,
            current_round,
            max_rounds,
            collect_proposed_scores: row.collect_proposed_scores,
            game_type,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl HistoryRow {
    pub fn from_entry(
        game_id: Uuid,
        position: usize,
        entry: &HistoryEntry,
    ) -> Result<Self, DatabaseError> {
        Ok(Self {
            id: None,
            game_id: game_id.to_string(),
            position: position as i64,
            action: entry.action.clone(),
            game_state: serde_json::to_string(&entry.game_state)?,
            timestamp: entry.timestamp,
        })
    }
}

impl TryFrom<HistoryRow> for HistoryEntry {
    type Error = DatabaseError;

    fn try_from(row: HistoryRow) -> Result<Self, Self::Error> {
        Ok(HistoryEntry {
            action: row.action,
            game_state: serde_json::from_str(&row.game_state)?,
            timestamp: row.timestamp,
        })
    }
}
