//! SQLite schema
//!
//! Idempotent: safe to run on every startup.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::Result;

/// Create all tables used by partydj-session
pub async fn init_schema(pool: &SqlitePool) -> Result<()> {
    create_parties_table(pool).await?;
    create_host_credentials_table(pool).await?;
    create_session_kv_table(pool).await?;
    info!("Database schema ready");
    Ok(())
}

async fn create_parties_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS parties (
            id TEXT PRIMARY KEY,
            code TEXT NOT NULL UNIQUE,
            owner_user_id TEXT NOT NULL,
            name TEXT NOT NULL,
            description TEXT,
            playlist_id TEXT NOT NULL,
            token_spend INTEGER NOT NULL DEFAULT 0 CHECK (token_spend >= 0),
            status TEXT NOT NULL DEFAULT 'inactive'
                CHECK (status IN ('inactive', 'active', 'closed')),
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_parties_owner ON parties(owner_user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

async fn create_host_credentials_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS host_credentials (
            user_id TEXT PRIMARY KEY,
            refresh_token TEXT NOT NULL,
            access_token TEXT,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}

async fn create_session_kv_table(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS session_kv (
            key TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            PRIMARY KEY (key, field)
        )
        "#,
    )
    .execute(pool)
    .await?;
    Ok(())
}
