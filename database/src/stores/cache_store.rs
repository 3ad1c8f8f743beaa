use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use types::{Game, HistoryEntry};
use uuid::Uuid;

use super::GameStore;
use crate::cache::{LocalCache, GAMES_KEY, HISTORY_KEY};
use crate::DatabaseError;

type HistoryMap = HashMap<Uuid, Vec<HistoryEntry>>;

/// Games and history kept as JSON documents in a [`LocalCache`].
#[derive(Clone)]
pub struct CacheGameStore {
    cache: Arc<dyn LocalCache>,
}

impl CacheGameStore {
    pub fn new(cache: Arc<dyn LocalCache>) -> Self {
        Self { cache }
    }

    pub fn cache(&self) -> &Arc<dyn LocalCache> {
        &self.cache
    }

    fn read_games(&self) -> Result<Vec<Game>, DatabaseError> {
        match self.cache.get(GAMES_KEY)? {
            Some(stored) => Ok(serde_json::from_str(&stored)?),
            None => Ok(Vec::new()),
        }
    }

    fn write_games(&self, games: &[Game]) -> Result<(), DatabaseError> {
        self.cache.set(GAMES_KEY, &serde_json::to_string(games)?)
    }

    fn read_history(&self) -> Result<HistoryMap, DatabaseError> {
        match self.cache.get(HISTORY_KEY)? {
            Some(stored) => Ok(serde_json::from_str(&stored)?),
            None => Ok(HistoryMap::new()),
        }
    }

    fn write_history(&self, history: &HistoryMap) -> Result<(), DatabaseError> {
        self.cache.set(HISTORY_KEY, &serde_json::to_string(history)?)
    }
}

#[async_trait]
impl GameStore for CacheGameStore {
    fn name(&self) -> &'static str {
        "local-cache"
    }

    async fn save_game(&self, game: &Game) -> Result<(), DatabaseError> {
        let mut games = self.read_games()?;
        match games.iter_mut().find(|g| g.id == game.id) {
            Some(existing) => {
                *existing = Game {
                    updated_at: Utc::now(),
                    created_at: existing.created_at,
                    ..game.clone()
                };
            }
            None => games.push(game.clone()),
        }
        self.write_games(&games)
    }

    async fn get_games(&self) -> Result<Vec<Game>, DatabaseError> {
        let mut games = self.read_games()?;
        games.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(games)
    }

    async fn get_game(&self, id: Uuid) -> Result<Option<Game>, DatabaseError> {
        Ok(self.read_games()?.into_iter().find(|g| g.id == id))
    }

    async fn delete_game(&self, id: Uuid) -> Result<(), DatabaseError> {
        let mut games = self.read_games()?;
        games.retain(|g| g.id != id);
        self.write_games(&games)?;

        let mut history = self.read_history()?;
        if history.remove(&id).is_some() {
            self.write_history(&history)?;
        }
        Ok(())
    }

    async fn clear_all_games(&self) -> Result<(), DatabaseError> {
        self.cache.remove(GAMES_KEY)?;
        self.cache.remove(HISTORY_KEY)
    }

    async fn save_game_history(
        &self,
        game_id: Uuid,
        entries: &[HistoryEntry],
    ) -> Result<(), DatabaseError> {
        let mut history = self.read_history()?;
        if entries.is_empty() {
            history.remove(&game_id);
        } else {
            history.insert(game_id, entries.to_vec());
        }
        self.write_history(&history)
    }

    async fn get_game_history(
        &self,
        game_id: Option<Uuid>,
    ) -> Result<Vec<HistoryEntry>, DatabaseError> {
        let mut history = self.read_history()?;
        Ok(match game_id {
            Some(id) => history.remove(&id).unwrap_or_default(),
            None => {
                let mut all: Vec<_> = history.into_values().flatten().collect();
                all.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
                all
            }
        })
    }
}
