//! Database access layer for mspec-ingest
//!
//! Stores normalized machine records in SQLite. The mapping engine never
//! touches the database; handlers pass it finished records.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};
use std::path::Path;
use tracing::info;

mod machines;
mod stats;

pub use machines::{distinct_sources, insert_machine, list_machines, MachineFilter, MachineRow};
pub use stats::{machine_stats, MachineStats, MemoryStats};

/// Open (creating if needed) the database file and ensure the schema exists
pub async fn init_database(db_path: &Path) -> Result<SqlitePool> {
    let newly_created = !db_path.exists();

    if let Some(parent) = db_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create database directory {}", parent.display()))?;
    }

    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());
    let pool = SqlitePoolOptions::new()
        .max_connections(10)
        .connect(&db_url)
        .await
        .with_context(|| format!("Failed to open database {}", db_path.display()))?;

    if newly_created {
        info!("Initialized new database: {}", db_path.display());
    } else {
        info!("Opened existing database: {}", db_path.display());
    }

    // WAL lets stats/list readers proceed while ingestion writes
    sqlx::query("PRAGMA journal_mode = WAL").execute(&pool).await?;
    sqlx::query("PRAGMA busy_timeout = 5000").execute(&pool).await?;

    create_schema(&pool).await?;
    Ok(pool)
}

/// Private in-memory database (single connection so every query sees the same data)
pub async fn open_in_memory() -> Result<SqlitePool> {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .context("Failed to open in-memory database")?;
    create_schema(&pool).await?;
    Ok(pool)
}

/// Create tables and indexes (idempotent)
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS machines (
            guid TEXT PRIMARY KEY,
            os TEXT,
            cpu TEXT,
            memory_gb REAL,
            source TEXT NOT NULL,
            timestamp TEXT NOT NULL,
            diagnostics TEXT
        )
        "#,
    )
    .execute(pool)
    .await
    .context("Failed to create machines table")?;

    for (name, column) in [
        ("idx_machines_os", "os"),
        ("idx_machines_cpu", "cpu"),
        ("idx_machines_timestamp", "timestamp DESC"),
    ] {
        sqlx::query(&format!("CREATE INDEX IF NOT EXISTS {} ON machines({})", name, column))
            .execute(pool)
            .await
            .with_context(|| format!("Failed to create index {}", name))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_database_creates_file_and_schema() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("nested").join("machines.db");

        let pool = init_database(&db_path).await.unwrap();
        assert!(db_path.exists());

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM machines")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);

        // Schema creation is idempotent
        create_schema(&pool).await.unwrap();
    }
}
