use std::{path::PathBuf, str::FromStr, time::Duration};

use serde::Deserialize;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::DatabaseError;

pub const DATABASE_URL_ENV: &str = "SCORER_DATABASE_URL";
pub const CACHE_DIR_ENV: &str = "SCORER_CACHE_DIR";

/// Settings read from a YAML file. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FileConfig {
    pub database_url: Option<String>,
    pub cache_dir: Option<PathBuf>,
    pub write_retries: Option<usize>,
    pub retry_delay_ms: Option<u64>,
}

impl FileConfig {
    pub fn from_yaml(contents: &str) -> Result<Self, DatabaseError> {
        serde_yaml::from_str(contents).map_err(|e| DatabaseError::Config(e.to_string()))
    }

    pub fn load(path: &std::path::Path) -> Result<Self, DatabaseError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml(&contents)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    /// Durable store location. `None` keeps everything in the local cache.
    pub database_url: Option<String>,
    /// Directory for the file-backed cache. `None` uses memory.
    pub cache_dir: Option<PathBuf>,
    pub write_retries: usize,
    pub retry_delay_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_url: None,
            cache_dir: None,
            write_retries: 1,
            retry_delay_ms: 50,
        }
    }
}

impl StorageConfig {
    pub fn local_only() -> Self {
        Self::default()
    }

    /// Each setting comes from the CLI argument if given, then the
    /// environment, then the YAML file, then the default.
    pub fn from_cli_or_env_or_yaml(
        cli_database_url: Option<String>,
        cli_cache_dir: Option<PathBuf>,
        yaml_config: Option<FileConfig>,
    ) -> Self {
        let yaml = yaml_config.unwrap_or_default();
        let defaults = Self::default();

        let database_url = cli_database_url
            .or_else(|| std::env::var(DATABASE_URL_ENV).ok())
            .or(yaml.database_url)
            .filter(|url| !url.trim().is_empty());
        let cache_dir = cli_cache_dir
            .or_else(|| std::env::var(CACHE_DIR_ENV).ok().map(PathBuf::from))
            .or(yaml.cache_dir);

        Self {
            database_url,
            cache_dir,
            write_retries: yaml.write_retries.unwrap_or(defaults.write_retries),
            retry_delay_ms: yaml.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub async fn create_pool(&self) -> Result<Option<sqlx::SqlitePool>, DatabaseError> {
        let Some(url) = &self.database_url else {
            return Ok(None);
        };
        let options = SqliteConnectOptions::from_str(url)
            .map_err(|e| DatabaseError::Config(e.to_string()))?
            .create_if_missing(true);
        // an in-memory database exists per connection
        let max_connections = if url.contains(":memory:") { 1 } else { 5 };
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options)
            .await
            .map_err(|e| DatabaseError::Connection(e.to_string()))?;
        Ok(Some(pool))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_beats_yaml() {
        let yaml = FileConfig {
            database_url: Some("sqlite://from-yaml.db".to_string()),
            cache_dir: Some(PathBuf::from("/tmp/yaml")),
            write_retries: Some(3),
            retry_delay_ms: None,
        };
        let config = StorageConfig::from_cli_or_env_or_yaml(
            Some("sqlite://from-cli.db".to_string()),
            Some(PathBuf::from("/tmp/cli")),
            Some(yaml),
        );
        assert_eq!(config.database_url.as_deref(), Some("sqlite://from-cli.db"));
        assert_eq!(config.cache_dir, Some(PathBuf::from("/tmp/cli")));
        assert_eq!(config.write_retries, 3);
        assert_eq!(config.retry_delay_ms, 50);
    }

    #[test]
    fn parses_yaml() {
        let yaml = FileConfig::from_yaml(
            "database_url: sqlite://scores.db\ncache_dir: /var/cache/scorer\nretry_delay_ms: 10\n",
        )
        .unwrap();
        assert_eq!(yaml.database_url.as_deref(), Some("sqlite://scores.db"));
        assert_eq!(yaml.retry_delay_ms, Some(10));
        assert!(yaml.write_retries.is_none());
    }

    #[test]
    fn malformed_yaml_is_a_config_error() {
        assert!(matches!(
            FileConfig::from_yaml("database_url: [unclosed"),
            Err(DatabaseError::Config(_))
        ));
    }

    #[tokio::test]
    async fn no_url_means_no_pool() {
        let pool = StorageConfig::local_only().create_pool().await.unwrap();
        assert!(pool.is_none());
    }
}
