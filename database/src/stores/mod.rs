pub mod cache_store;
pub mod sql_store;
pub mod traits;

pub use cache_store::CacheGameStore;
pub use sql_store::SqlGameStore;
pub use traits::GameStore;
