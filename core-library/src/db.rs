//! # Database Connection Pool Module
//!
//! Provides SQLite connection pooling with optimal configuration for the
//! music library.
//!
//! ## Features
//!
//! - **WAL Mode**: Enabled for better concurrency (multiple readers, one writer)
//! - **Connection Pooling**: Configurable min/max connections with timeouts
//! - **Foreign Keys**: Enforced for referential integrity
//! - **Automatic Migrations**: Runs on initialization
//! - **Health Checks**: Connection validation
//!
//! ## Testing
//!
//! For tests, use in-memory databases:
//!
//! ```rust,ignore
//! let pool = create_test_pool().await?;
//! ```

use crate::{LibraryError, Result};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Pool, Sqlite};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Database configuration for the SQLite connection pool
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    /// Database file path or `:memory:` for an in-memory database
    pub database_url: String,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Maximum time to wait for a connection from the pool
    pub acquire_timeout: Duration,

    /// Enable statement caching (number of statements to cache)
    pub statement_cache_capacity: usize,
}

impl DatabaseConfig {
    /// Create a new database configuration for the given file path
    pub fn new(database_path: impl Into<PathBuf>) -> Self {
        let path = database_path.into();
        let database_url = format!("sqlite:{}", path.display());

        Self {
            database_url,
            min_connections: 1,
            max_connections: 5,
            acquire_timeout: Duration::from_secs(30),
            statement_cache_capacity: 100,
        }
    }

    /// Create a configuration for an in-memory database (useful for testing)
    ///
    /// An in-memory SQLite database is private to its connection, so the
    /// pool is capped at a single connection to keep one shared database.
    pub fn in_memory() -> Self {
        Self {
            database_url: "sqlite::memory:".to_string(),
            min_connections: 1,
            max_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            statement_cache_capacity: 100,
        }
    }

    /// Set the minimum number of connections
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Set the maximum number of connections
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Set the connection acquire timeout
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = timeout;
        self
    }

    /// Set the statement cache capacity
    pub fn statement_cache_capacity(mut self, capacity: usize) -> Self {
        self.statement_cache_capacity = capacity;
        self
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self::in_memory()
    }
}

/// Create a configured SQLite connection pool
///
/// This function:
/// 1. Configures SQLite connection options (WAL mode, foreign keys, etc.)
/// 2. Creates a connection pool with the specified configuration
/// 3. Runs database migrations
/// 4. Performs a health check
///
/// # Errors
///
/// Returns an error if:
/// - The database file cannot be accessed
/// - Connection pool creation fails
/// - Migrations fail
/// - Health check fails
pub async fn create_pool(config: DatabaseConfig) -> Result<Pool<Sqlite>> {
    info!(
        database_url = %config.database_url,
        min_connections = config.min_connections,
        max_connections = config.max_connections,
        "Creating database connection pool"
    );

    let mut connect_options =
        SqliteConnectOptions::from_str(&config.database_url).map_err(LibraryError::Database)?;

    connect_options = connect_options
        // Enable WAL mode for better concurrency
        .journal_mode(SqliteJournalMode::Wal)
        // NORMAL synchronous mode for good balance of safety and speed
        .synchronous(SqliteSynchronous::Normal)
        // Enable foreign key constraints
        .foreign_keys(true)
        // Create database if it doesn't exist
        .create_if_missing(true)
        .statement_cache_capacity(config.statement_cache_capacity);

    debug!("SQLite connection options configured");

    let pool = SqlitePoolOptions::new()
        .min_connections(config.min_connections)
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(connect_options)
        .await
        .map_err(|e| {
            warn!(error = %e, "Failed to create connection pool");
            LibraryError::Database(e)
        })?;

    info!(
        connections = pool.size(),
        "Database connection pool created successfully"
    );

    run_migrations(&pool).await?;
    health_check(&pool).await?;

    Ok(pool)
}

/// Create a connection pool for testing with an in-memory database
///
/// Convenience constructor with migrations already applied.
pub async fn create_test_pool() -> Result<Pool<Sqlite>> {
    let config = DatabaseConfig::in_memory();
    create_pool(config).await
}

/// Run database migrations
///
/// Applies all pending migrations from the `migrations/` directory.
/// Migrations are embedded in the binary at compile time via `sqlx::migrate!()`.
async fn run_migrations(pool: &Pool<Sqlite>) -> Result<()> {
    info!("Running database migrations");

    sqlx::migrate!("./migrations").run(pool).await.map_err(|e| {
        warn!(error = %e, "Migration failed");
        LibraryError::Migration(e.to_string())
    })?;

    info!("Database migrations completed successfully");
    Ok(())
}

/// Perform a health check on the connection pool
async fn health_check(pool: &Pool<Sqlite>) -> Result<()> {
    debug!("Performing database health check");

    sqlx::query("SELECT 1").fetch_one(pool).await.map_err(|e| {
        warn!(error = %e, "Database health check failed");
        LibraryError::Database(e)
    })?;

    debug!("Database health check passed");
    Ok(())
}
