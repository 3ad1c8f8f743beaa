//! The persistence boundary: a durable store backed by the local cache.
//!
//! Nothing here returns an error. Every write also lands in the cache. Reads
//! that fail on the durable store are answered from the cache, and every
//! failure is logged.

use std::{future::Future, sync::Arc, time::Duration};

use types::{Game, HistoryEntry};
use uuid::Uuid;

use crate::cache::{FileCache, LocalCache, MemoryCache};
use crate::config::StorageConfig;
use crate::retry::{retry_with_backoff, BoxFuture};
use crate::settings::Settings;
use crate::stores::{CacheGameStore, GameStore, SqlGameStore};
use crate::DatabaseError;

/// Where a write ended up.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum WriteOutcome {
    Primary,
    LocalCache,
    Failed,
}

impl WriteOutcome {
    pub fn is_stored(self) -> bool {
        !matches!(self, WriteOutcome::Failed)
    }
}

pub struct Storage {
    primary: Option<Arc<dyn GameStore>>,
    local: CacheGameStore,
    write_retries: usize,
    retry_delay: Duration,
}

impl Storage {
    pub fn new(primary: Option<Arc<dyn GameStore>>, cache: Arc<dyn LocalCache>) -> Self {
        Self {
            primary,
            local: CacheGameStore::new(cache),
            write_retries: 0,
            retry_delay: Duration::ZERO,
        }
    }

    pub fn local_only(cache: Arc<dyn LocalCache>) -> Self {
        Self::new(None, cache)
    }

    pub fn in_memory() -> Self {
        Self::local_only(Arc::new(MemoryCache::new()))
    }

    pub fn with_retries(mut self, write_retries: usize, retry_delay: Duration) -> Self {
        self.write_retries = write_retries;
        self.retry_delay = retry_delay;
        self
    }

    /// Builds storage from configuration. A database that cannot be reached
    /// or migrated leaves the storage running on the local cache alone.
    pub async fn from_config(config: &StorageConfig) -> Self {
        let cache: Arc<dyn LocalCache> = match &config.cache_dir {
            Some(dir) => match FileCache::open(dir) {
                Ok(cache) => Arc::new(cache),
                Err(e) => {
                    tracing::error!(
                        "Cannot open cache directory {}: {e}. Using memory cache",
                        dir.display()
                    );
                    Arc::new(MemoryCache::new())
                }
            },
            None => Arc::new(MemoryCache::new()),
        };

        let primary: Option<Arc<dyn GameStore>> = match config.create_pool().await {
            Ok(Some(pool)) => {
                let store = SqlGameStore::new(pool);
                match store.run_migrations().await {
                    Ok(()) => Some(Arc::new(store) as Arc<dyn GameStore>),
                    Err(e) => {
                        tracing::warn!("Database unusable, using local cache only: {e}");
                        None
                    }
                }
            }
            Ok(None) => {
                tracing::info!("No database configured, using local cache only");
                None
            }
            Err(e) => {
                tracing::warn!("Database unreachable, using local cache only: {e}");
                None
            }
        };

        Self::new(primary, cache).with_retries(config.write_retries, config.retry_delay())
    }

    pub fn has_primary(&self) -> bool {
        self.primary.is_some()
    }

    pub fn cache(&self) -> &Arc<dyn LocalCache> {
        self.local.cache()
    }

    async fn write<P, L, Fut>(&self, op: &'static str, on_primary: P, on_local: L) -> WriteOutcome
    where
        P: Fn(Arc<dyn GameStore>) -> BoxFuture<(), DatabaseError>,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<(), DatabaseError>>,
    {
        if let Some(primary) = &self.primary {
            let result = retry_with_backoff(
                op,
                || on_primary(primary.clone()),
                self.write_retries,
                self.retry_delay,
            )
            .await;
            match result {
                Ok(()) => {
                    // The cache mirrors every successful primary write.
                    if let Err(e) = on_local().await {
                        tracing::warn!("{op} succeeded but the local cache copy failed: {e}");
                    }
                    return WriteOutcome::Primary;
                }
                Err(e) => tracing::warn!(
                    "{op} failed on {} store, writing to local cache: {e}",
                    primary.name()
                ),
            }
        }

        match on_local().await {
            Ok(()) => WriteOutcome::LocalCache,
            Err(e) => {
                tracing::error!("{op} failed on local cache: {e}");
                WriteOutcome::Failed
            }
        }
    }

    async fn read<T, P, L, Fut>(&self, op: &'static str, on_primary: P, on_local: L) -> T
    where
        T: Default,
        P: FnOnce(Arc<dyn GameStore>) -> BoxFuture<T, DatabaseError>,
        L: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DatabaseError>>,
    {
        if let Some(primary) = &self.primary {
            match on_primary(primary.clone()).await {
                Ok(value) => return value,
                Err(e) => tracing::warn!(
                    "{op} failed on {} store, reading local cache: {e}",
                    primary.name()
                ),
            }
        }

        on_local().await.unwrap_or_else(|e| {
            tracing::error!("{op} failed on local cache: {e}");
            T::default()
        })
    }

    pub async fn save_game(&self, game: &Game) -> WriteOutcome {
        self.write(
            "save_game",
            |store| {
                let game = game.clone();
                Box::pin(async move { store.save_game(&game).await })
            },
            || self.local.save_game(game),
        )
        .await
    }

    pub async fn get_games(&self) -> Vec<Game> {
        self.read(
            "get_games",
            |store| Box::pin(async move { store.get_games().await }),
            || self.local.get_games(),
        )
        .await
    }

    pub async fn get_game(&self, id: Uuid) -> Option<Game> {
        self.read(
            "get_game",
            |store| Box::pin(async move { store.get_game(id).await }),
            || self.local.get_game(id),
        )
        .await
    }

    pub async fn delete_game(&self, id: Uuid) -> WriteOutcome {
        self.write(
            "delete_game",
            |store| Box::pin(async move { store.delete_game(id).await }),
            || self.local.delete_game(id),
        )
        .await
    }

    pub async fn clear_all_games(&self) -> WriteOutcome {
        self.write(
            "clear_all_games",
            |store| Box::pin(async move { store.clear_all_games().await }),
            || self.local.clear_all_games(),
        )
        .await
    }

    pub async fn save_game_history(&self, game_id: Uuid, entries: &[HistoryEntry]) -> WriteOutcome {
        self.write(
            "save_game_history",
            |store| {
                let entries = entries.to_vec();
                Box::pin(async move { store.save_game_history(game_id, &entries).await })
            },
            || self.local.save_game_history(game_id, entries),
        )
        .await
    }

    pub async fn get_game_history(&self, game_id: Option<Uuid>) -> Vec<HistoryEntry> {
        self.read(
            "get_game_history",
            |store| Box::pin(async move { store.get_game_history(game_id).await }),
            || self.local.get_game_history(game_id),
        )
        .await
    }

    pub fn get_settings(&self) -> Settings {
        Settings::load(self.cache().as_ref())
    }

    pub fn save_settings(&self, settings: &Settings) -> WriteOutcome {
        match settings.save(self.cache().as_ref()) {
            Ok(()) => WriteOutcome::LocalCache,
            Err(e) => {
                tracing::error!("save_settings failed on local cache: {e}");
                WriteOutcome::Failed
            }
        }
    }
}
