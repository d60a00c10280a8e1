//! Session lifecycle: issue, validate, revoke and sweep.
//!
//! Each operation is a single SQL statement. Validation always checks expiry
//! itself, so correctness never depends on the sweeper having run.

use chrono::Utc;

use crate::crypto;
use crate::db::{format_timestamp, now_timestamp, IssuedSession, Session};
use crate::DbPool;

#[derive(Clone)]
pub struct SessionStore {
    db: DbPool,
    ttl: chrono::Duration,
}

impl SessionStore {
    pub fn new(db: DbPool, ttl: chrono::Duration) -> Self {
        Self { db, ttl }
    }

    pub fn ttl(&self) -> chrono::Duration {
        self.ttl
    }

    /// Create a session for `user_id` and return the raw token
    pub async fn issue(&self, user_id: &str) -> Result<IssuedSession, sqlx::Error> {
        let token = crypto::generate_token();
        let now = Utc::now();
        let expires_at = format_timestamp(now + self.ttl);

        sqlx::query(
            "INSERT INTO sessions (id, user_id, token_hash, expires_at, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(user_id)
        .bind(crypto::hash_token(&token))
        .bind(&expires_at)
        .bind(format_timestamp(now))
        .execute(&self.db)
        .await?;

        Ok(IssuedSession { token, expires_at })
    }

    /// Look up a live session by raw token. Expired rows are ignored.
    pub async fn validate(&self, token: &str) -> Result<Option<Session>, sqlx::Error> {
        if token.is_empty() {
            return Ok(None);
        }

        sqlx::query_as("SELECT * FROM sessions WHERE token_hash = ? AND expires_at > ?")
            .bind(crypto::hash_token(token))
            .bind(now_timestamp())
            .fetch_optional(&self.db)
            .await
    }

    /// Delete the session for `token`; returns the number of rows removed
    pub async fn revoke(&self, token: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE token_hash = ?")
            .bind(crypto::hash_token(token))
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Log a user out everywhere
    pub async fn revoke_all_for_user(&self, user_id: &str) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE user_id = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    /// Delete every expired session
    pub async fn sweep(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now_timestamp())
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
