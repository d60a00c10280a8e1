//! Session model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: String,
    pub token_hash: String,
    pub expires_at: String,
    pub created_at: String,
}

/// A freshly issued session; the raw token is only ever held here
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: String,
}
