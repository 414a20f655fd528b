//! Configuration for the ledger store

use std::path::PathBuf;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

pub const DEFAULT_DATABASE_PATH: &str = "freelance.db";
pub const DEFAULT_MAX_CONNECTIONS: u32 = 8;
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 30_000;

/// Store configuration
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// SQLite database file
    pub database_path: PathBuf,

    /// Pool size. Each in-flight transaction holds one connection.
    pub max_connections: u32,

    /// How long a writer waits for the database lock before failing (milliseconds)
    pub busy_timeout_ms: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            database_path: PathBuf::from(DEFAULT_DATABASE_PATH),
            max_connections: DEFAULT_MAX_CONNECTIONS,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
        }
    }
}

impl StoreConfig {
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        Self {
            database_path: database_path.into(),
            ..Self::default()
        }
    }

    pub fn with_max_connections(mut self, max_connections: u32) -> Self {
        self.max_connections = max_connections.max(1);
        self
    }

    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout_ms = timeout.as_millis().try_into().unwrap_or(u64::MAX);
        self
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    /// Connection options. WAL lets readers run alongside the single writer.
    pub(crate) fn connect_options(&self, create_if_missing: bool) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.database_path)
            .create_if_missing(create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(self.busy_timeout())
            .foreign_keys(true)
    }

    pub(crate) fn pool_options(&self) -> SqlitePoolOptions {
        SqlitePoolOptions::new().max_connections(self.max_connections.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.database_path, PathBuf::from("freelance.db"));
        assert_eq!(config.max_connections, 8);
        assert_eq!(config.busy_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn test_builder_keeps_at_least_one_connection() {
        let config = StoreConfig::new("/tmp/x.db").with_max_connections(0);
        assert_eq!(config.max_connections, 1);
        assert_eq!(config.database_path, PathBuf::from("/tmp/x.db"));
    }

    #[test]
    fn test_busy_timeout_roundtrip() {
        let config = StoreConfig::default().with_busy_timeout(Duration::from_millis(250));
        assert_eq!(config.busy_timeout_ms, 250);
    }
}
