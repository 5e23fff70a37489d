//! # Database Pool
//!
//! Opens the SQLite file Fogon keeps its lots and registers in.
//!
//! ```text
//!  AppConfig::load()?.db_config()   or   DbConfig::in_memory()
//!          │
//!          ▼
//!  Database::new(config) ── WAL, foreign keys, migrations
//!          │
//!          ├── reads (balance, stock, reports) ── any pooled connection
//!          └── writes ── LedgerEngine write gate ── one transaction at a time
//! ```
//!
//! Under WAL, readers see the last committed state while an operation's
//! transaction is in flight, so a half-applied purchase is never visible.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

use crate::error::{DbError, DbResult};
use crate::migrations;

/// Pool settings.
///
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/fogon/fogon.db").max_connections(5);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DbConfig {
    /// SQLite file, created on first connect.
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub min_connections: u32,
    /// How long to wait for a free connection.
    pub connect_timeout: Duration,
    pub idle_timeout: Duration,
    /// Apply pending migrations on connect.
    pub run_migrations: bool,
}

impl DbConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            run_migrations: true,
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// A private in-memory database, one per call.
    ///
    /// Pinned to a single connection: every `:memory:` connection would
    /// otherwise open its own empty database.
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1,
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            run_migrations: true,
        }
    }
}

/// Handle to the SQLite pool. Clones share it.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Connects with WAL journaling, NORMAL sync and foreign keys on, then
    /// migrates if the config asks for it.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(path = %config.database_path.display(), "Opening database");

        let url = format!("sqlite://{}?mode=rwc", config.database_path.display());
        let options = SqliteConnectOptions::from_str(&url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(max_connections = config.max_connections, "Database pool ready");

        if config.run_migrations {
            migrations::run_migrations(&pool).await?;
        }

        Ok(Database { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}
