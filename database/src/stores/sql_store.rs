use async_trait::async_trait;
use chrono::Utc;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};
use types::{Game, HistoryEntry};
use uuid::Uuid;

use super::GameStore;
use crate::models::{GameRow, HistoryRow};
use crate::DatabaseError;

const GAME_COLUMNS: &str = "id, name, players, rounds, current_round, max_rounds, \
     collect_proposed_scores, game_type, status, created_at, updated_at";

/// The durable store: games and history rows in a SQL database.
pub struct SqlGameStore {
    pool: SqlitePool,
}

impl SqlGameStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn run_migrations(&self) -> Result<(), DatabaseError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn game_row(row: &SqliteRow) -> Result<GameRow, DatabaseError> {
    Ok(GameRow {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        players: row.try_get("players")?,
        rounds: row.try_get("rounds")?,
        current_round: row.try_get("current_round")?,
        max_rounds: row.try_get("max_rounds")?,
        collect_proposed_scores: row.try_get("collect_proposed_scores")?,
        game_type: row.try_get("game_type")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn history_row(row: &SqliteRow) -> Result<HistoryRow, DatabaseError> {
    Ok(HistoryRow {
        id: row.try_get("id")?,
        game_id: row.try_get("game_id")?,
        position: row.try_get("position")?,
        action: row.try_get("action")?,
        game_state: row.try_get("game_state")?,
        timestamp: row.try_get("timestamp")?,
    })
}

#[async_trait]
impl GameStore for SqlGameStore {
    fn name(&self) -> &'static str {
        "sql"
    }

    async fn save_game(&self, game: &Game) -> Result<(), DatabaseError> {
        let row = GameRow::try_from(game)?;
        sqlx::query(&format!(
            "INSERT INTO games ({GAME_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                players = excluded.players,
                rounds = excluded.rounds,
                current_round = excluded.current_round,
                max_rounds = excluded.max_rounds,
                collect_proposed_scores = excluded.collect_proposed_scores,
                game_type = excluded.game_type,
                status = excluded.status,
                updated_at = ?"
        ))
        .bind(row.id)
        .bind(row.name)
        .bind(row.players)
        .bind(row.rounds)
        .bind(row.current_round)
        .bind(row.max_rounds)
        .bind(row.collect_proposed_scores)
        .bind(row.game_type)
        .bind(row.status)
        .bind(row.created_at)
        .bind(row.updated_at)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_games(&self) -> Result<Vec<Game>, DatabaseError> {
        let rows = sqlx::query(&format!(
            "SELECT {GAME_COLUMNS} FROM games ORDER BY updated_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|r| game_row(r).and_then(Game::try_from))
            .collect()
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>, DatabaseError> {
        let row = sqlx::query(&format!("SELECT {GAME_COLUMNS} FROM games WHERE id = ?"))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| game_row(&r).and_then(Game::try_from))
            .transpose()
    }

    async fn delete_game(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM game_history WHERE game_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM games WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn clear_all_games(&self) -> Result<(), DatabaseError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM game_history").execute(&mut *tx).await?;
        sqlx::query("DELETE FROM games").execute(&mut *tx).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn save_game_history(
        &self,
        game_id: Uuid,
        entries: &[HistoryEntry],
    ) -> Result<(), DatabaseError> {
        let rows = entries
            .iter()
            .enumerate()
            .map(|(position, entry)| HistoryRow::from_entry(game_id, position, entry))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;

        sqlx::query("DELETE FROM game_history WHERE game_id = ?")
            .bind(game_id.to_string())
            .execute(&mut *tx)
            .await?;

        for row in rows {
            sqlx::query(
                "INSERT INTO game_history (game_id, position, action, game_state, timestamp) VALUES (?, ?, ?, ?, ?)",
            )
            .bind(row.game_id)
            .bind(row.position)
            .bind(row.action)
            .bind(row.game_state)
            .bind(row.timestamp)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn get_game_history(
        &self,
        game_id: Option<Uuid>,
    ) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let rows = match game_id {
            Some(id) => {
                sqlx::query(
                    "SELECT id, game_id, position, action, game_state, timestamp
                     FROM game_history WHERE game_id = ? ORDER BY position",
                )
                .bind(id.to_string())
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(
                    "SELECT id, game_id, position, action, game_state, timestamp
                     FROM game_history ORDER BY timestamp, position",
                )
                .fetch_all(&self.pool)
                .await?
            }
        };

        rows.iter()
            .map(|r| history_row(r).and_then(HistoryEntry::try_from))
            .collect()
    }
}
