//! Database initialization
//!
//! Opens (creating if needed) the SQLite ledger file and brings its schema up
//! to date. Safe to run against a ledger written by an older release.

use crate::db::table_schemas::sync_all_table_schemas;
use crate::Result;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

/// Default SQLite busy timeout; writers wait this long for the lock
pub const BUSY_TIMEOUT_MS: u64 = 5000;

const MAX_CONNECTIONS: u32 = 5;

/// Open the ledger database, creating file and parent directories if needed
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    // WAL allows concurrent readers alongside the single writer
    let options = SqliteConnectOptions::new()
        .filename(db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_millis(BUSY_TIMEOUT_MS));

    let pool = SqlitePoolOptions::new()
        .max_connections(MAX_CONNECTIONS)
        .connect_with(options)
        .await?;

    if newly_created {
        info!(path = %db_path.display(), "Initialized new ledger database");
    } else {
        info!(path = %db_path.display(), "Opened existing ledger database");
    }

    initialize_schema(&pool).await?;

    Ok(pool)
}

/// Create missing tables, add missing columns, then create indexes
///
/// Idempotent.
pub async fn initialize_schema(pool: &SqlitePool) -> Result<()> {
    create_point_entries_table(pool).await?;

    // Older ledgers lack the approval columns; indexes below depend on them
    sync_all_table_schemas(pool).await?;
    backfill_pending_status(pool).await?;

    create_indexes(pool).await?;
    Ok(())
}

/// Give rows without a status an explicit `pending`
///
/// Columns added by older tooling may lack the default, leaving NULLs that
/// the status filters and decision guards would never match.
async fn backfill_pending_status(pool: &SqlitePool) -> Result<()> {
    let result = sqlx::query(
        "UPDATE point_entries SET approval_status = 'pending' WHERE approval_status IS NULL",
    )
    .execute(pool)
    .await?;

    if result.rows_affected() > 0 {
        info!(
            rows = result.rows_affected(),
            "Marked entries without a status as pending"
        );
    }
    Ok(())
}

async fn create_point_entries_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS point_entries (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            occurred_at TEXT NOT NULL,
            point_change INTEGER NOT NULL,
            subject TEXT NOT NULL,
            submitter TEXT NOT NULL,
            note TEXT NOT NULL,
            approval_status TEXT NOT NULL DEFAULT 'pending'
                CHECK (approval_status IN ('pending', 'approved', 'rejected')),
            decided_by TEXT,
            decided_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_point_entries_status ON point_entries(approval_status)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
