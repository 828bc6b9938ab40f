//! Shared test utilities for mlcp integration tests.
//!
//! Every test gets its own SQLite database file inside a fresh temporary
//! directory, opened through the same pool settings the binary uses (WAL,
//! foreign keys, busy timeout) with all migrations applied.

use sqlx::SqlitePool;
use tempfile::TempDir;

use mlcp_db::config::DbConfig;
use mlcp_db::pool;

/// A migrated temporary database.
///
/// The directory (and the database inside it) is removed when this value is
/// dropped, so keep it alive for the duration of the test.
pub struct TestDb {
    pub pool: SqlitePool,
    pub config: DbConfig,
    _dir: TempDir,
}

/// Create a temporary database with migrations applied.
pub async fn create_test_db() -> TestDb {
    let dir = tempfile::Builder::new()
        .prefix("mlcp_test_")
        .tempdir()
        .expect("failed to create temp directory");
    let config = DbConfig::for_path(&dir.path().join("mlcp.db"));

    let pool = pool::create_pool(&config)
        .await
        .unwrap_or_else(|e| panic!("failed to open temp database {}: {e:#}", config.database_url));

    pool::run_migrations(&pool)
        .await
        .expect("migrations should succeed");

    TestDb {
        pool,
        config,
        _dir: dir,
    }
}

impl TestDb {
    /// Close the pool before the directory is removed.
    pub async fn close(self) {
        self.pool.close().await;
    }
}
