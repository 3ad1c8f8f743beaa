pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod retry;
pub mod settings;
pub mod storage;
pub mod stores;


pub use cache::{FileCache, LocalCache, MemoryCache};
pub use config::{FileConfig, StorageConfig};
pub use error::DatabaseError;
pub use models::{GameRow, HistoryRow};
pub use retry::retry_with_backoff;
pub use settings::{Settings, Theme};
pub use storage::{Storage, WriteOutcome};
pub use stores::{CacheGameStore, GameStore, SqlGameStore};
