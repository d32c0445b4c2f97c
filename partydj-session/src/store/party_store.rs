//! Relational party records
//!
//! Parties are keyed by their six-character session code. The store knows
//! nothing about authorization; callers check host ownership.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use partydj_common::events::SessionStatus;
use sqlx::{sqlite::SqliteRow, Row, SqlitePool};

use crate::error::{Error, Result};
use crate::models::Party;

/// Catalog OAuth tokens of a host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostCredentials {
    pub user_id: String,
    pub refresh_token: String,
    /// Last access token, refreshed on demand
    pub access_token: Option<String>,
}

/// Party and host credential persistence
#[async_trait]
pub trait PartyStore: Send + Sync {
    async fn create_party(&self, party: &Party) -> Result<()>;

    async fn get_party_by_code(&self, code: &str) -> Result<Option<Party>>;

    async fn code_exists(&self, code: &str) -> Result<bool>;

    async fn set_session_status(&self, party_id: &str, status: SessionStatus) -> Result<()>;

    /// Add `delta` to the party's token spend, returning the new total
    async fn increment_token_spend(&self, party_id: &str, delta: u64) -> Result<u64>;

    async fn delete_party(&self, party_id: &str) -> Result<()>;

    async fn get_host_credentials(&self, user_id: &str) -> Result<Option<HostCredentials>>;

    async fn save_host_credentials(&self, credentials: &HostCredentials) -> Result<()>;
}

/// `PartyStore` on SQLite
#[derive(Clone)]
pub struct SqlitePartyStore {
    pool: SqlitePool,
}

impl SqlitePartyStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn party_from_row(row: &SqliteRow) -> Result<Party> {
    let status: String = row.get("status");
    let status = SessionStatus::parse(&status)
        .ok_or_else(|| Error::Common(partydj_common::Error::Internal(format!("Unknown session status: {status}"))))?;

    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| Error::Common(partydj_common::Error::Internal(format!("Failed to parse created_at: {e}"))))?
        .with_timezone(&Utc);

    let token_spend: i64 = row.get("token_spend");

    Ok(Party {
        id: row.get("id"),
        code: row.get("code"),
        owner_user_id: row.get("owner_user_id"),
        name: row.get("name"),
        description: row.get("description"),
        playlist_id: row.get("playlist_id"),
        token_spend: token_spend.max(0) as u64,
        status,
        created_at,
    })
}

#[async_trait]
impl PartyStore for SqlitePartyStore {
    async fn create_party(&self, party: &Party) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO parties (
                id, code, owner_user_id, name, description,
                playlist_id, token_spend, status, created_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&party.id)
        .bind(&party.code)
        .bind(&party.owner_user_id)
        .bind(&party.name)
        .bind(&party.description)
        .bind(&party.playlist_id)
        .bind(party.token_spend as i64)
        .bind(party.status.as_str())
        .bind(party.created_at.to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_party_by_code(&self, code: &str) -> Result<Option<Party>> {
        let row = sqlx::query(
            r#"
            SELECT id, code, owner_user_id, name, description,
                   playlist_id, token_spend, status, created_at
            FROM parties
            WHERE code = ?
            "#,
        )
        .bind(code)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(party_from_row).transpose()
    }

    async fn code_exists(&self, code: &str) -> Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM parties WHERE code = ?")
            .bind(code)
            .fetch_one(&self.pool)
            .await?;
        Ok(count > 0)
    }

    async fn set_session_status(&self, party_id: &str, status: SessionStatus) -> Result<()> {
        let result = sqlx::query("UPDATE parties SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(party_id)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Party {party_id}")));
        }
        Ok(())
    }

    async fn increment_token_spend(&self, party_id: &str, delta: u64) -> Result<u64> {
        let total: Option<i64> = sqlx::query_scalar(
            "UPDATE parties SET token_spend = token_spend + ? WHERE id = ? RETURNING token_spend",
        )
        .bind(delta as i64)
        .bind(party_id)
        .fetch_optional(&self.pool)
        .await?;

        total
            .map(|t| t.max(0) as u64)
            .ok_or_else(|| Error::NotFound(format!("Party {party_id}")))
    }

    async fn delete_party(&self, party_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM parties WHERE id = ?")
            .bind(party_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_host_credentials(&self, user_id: &str) -> Result<Option<HostCredentials>> {
        let row = sqlx::query(
            "SELECT user_id, refresh_token, access_token FROM host_credentials WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| HostCredentials {
            user_id: row.get("user_id"),
            refresh_token: row.get("refresh_token"),
            access_token: row.get("access_token"),
        }))
    }

    async fn save_host_credentials(&self, credentials: &HostCredentials) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO host_credentials (user_id, refresh_token, access_token, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                refresh_token = excluded.refresh_token,
                access_token = excluded.access_token,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&credentials.user_id)
        .bind(&credentials.refresh_token)
        .bind(&credentials.access_token)
        .bind(partydj_common::time::now().to_rfc3339())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}
