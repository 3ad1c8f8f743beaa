use async_trait::async_trait;
use types::{Game, HistoryEntry};
use uuid::Uuid;

use crate::DatabaseError;

/// A place games and their undo history can be kept.
#[async_trait]
pub trait GameStore: Send + Sync {
    /// Short name used in log messages.
    fn name(&self) -> &'static str;

    /// Inserts the game, or replaces the stored copy and bumps `updated_at`
    /// when one with the same id exists.
    async fn save_game(&self, game: &Game) -> Result<(), DatabaseError>;

    /// Every stored game, most recently updated first.
    async fn get_games(&self) -> Result<Vec<Game>, DatabaseError>;

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>, DatabaseError>;

    /// Removes the game and its stored history.
    async fn delete_game(&self, id: Uuid) -> Result<(), DatabaseError>;

    /// Removes every game and all stored history.
    async fn clear_all_games(&self) -> Result<(), DatabaseError>;

    /// Replaces every stored entry belonging to `game_id` with `entries`.
    async fn save_game_history(
        &self,
        game_id: Uuid,
        entries: &[HistoryEntry],
    ) -> Result<(), DatabaseError>;

    /// Entries for one game in log order, or all entries ordered by
    /// timestamp when `game_id` is `None`.
    async fn get_game_history(
        &self,
        game_id: Option<Uuid>,
    ) -> Result<Vec<HistoryEntry>, DatabaseError>;
}
