mod models;
mod seeders;

pub use models::*;
pub use seeders::{ensure_admin_user, seed_rooms};

use anyhow::Result;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use tracing::info;

pub type DbPool = SqlitePool;

/// Execute a SQL migration file, properly handling comments
async fn execute_sql(pool: &SqlitePool, sql: &str) -> Result<()> {
    for statement in sql.split(';') {
        // Strip SQL comment lines (lines starting with --)
        let cleaned: String = statement
            .lines()
            .filter(|line| !line.trim().starts_with("--"))
            .collect::<Vec<_>>()
            .join("\n");
        let trimmed = cleaned.trim();
        if !trimmed.is_empty() {
            sqlx::query(trimmed).execute(pool).await?;
        }
    }
    Ok(())
}

/// Open (or create) the database inside `data_dir` and bring the schema up to date
pub async fn init(data_dir: &Path) -> Result<DbPool> {
    let db_path = data_dir.join("roombook.db");

    info!("Initializing database at {}", db_path.display());

    // Per-connection pragmas: every pooled connection enforces foreign keys
    let options = SqliteConnectOptions::new()
        .filename(&db_path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    info!("Database initialized successfully");
    Ok(pool)
}

async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    info!("Running database migrations...");

    // Migration 001: users, sessions, rooms, room assets, bookings
    let has_bookings_table: Option<(String,)> = sqlx::query_as(
        "SELECT name FROM sqlite_master WHERE type='table' AND name='bookings'",
    )
    .fetch_optional(pool)
    .await?;
    if has_bookings_table.is_none() {
        execute_sql(pool, include_str!("../../migrations/001_initial.sql")).await?;
    }

    info!("Migrations completed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_init_creates_schema_and_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();

        let tables: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type='table' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.0.as_str()).collect();
        for expected in ["bookings", "room_assets", "rooms", "sessions", "users"] {
            assert!(names.contains(&expected), "missing table {}", expected);
        }
        pool.close().await;

        // Re-opening an existing database must not fail
        let pool = init(dir.path()).await.unwrap();
        pool.close().await;
    }

    #[tokio::test]
    async fn test_foreign_keys_are_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let pool = init(dir.path()).await.unwrap();

        let result = sqlx::query(
            "INSERT INTO room_assets (id, room_id, asset, created_at) VALUES ('a', 'missing', 'x', 'now')",
        )
        .execute(&pool)
        .await;
        assert!(result.is_err());
    }
}
