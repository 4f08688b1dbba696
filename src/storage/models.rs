//! Database models for Warden Core.
//!
//! These are the row types returned by SQLx queries.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{Session, User};
use crate::error::WardenError;

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, WardenError> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| WardenError::Internal(e.to_string()))
}

/// Database row for users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    pub id: String,
    pub email: String,
    pub password_hash: String,
    pub reset_token_hash: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl TryFrom<UserRow> for User {
    type Error = WardenError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(User {
            id: Uuid::parse_str(&row.id).map_err(|e| WardenError::Internal(e.to_string()))?,
            email: row.email,
            password_hash: row.password_hash,
            reset_token_hash: row.reset_token_hash,
            created_at: parse_timestamp(&row.created_at)?,
            updated_at: parse_timestamp(&row.updated_at)?,
        })
    }
}

/// Database row for user_sessions table.
#[derive(Debug, Clone, FromRow)]
pub struct UserSessionRow {
    pub session_id: String,
    pub user_id: String,
    pub created_at: String,
}

impl TryFrom<UserSessionRow> for Session {
    type Error = WardenError;

    fn try_from(row: UserSessionRow) -> Result<Self, Self::Error> {
        Ok(Session {
            session_id: row.session_id,
            user_id: row.user_id,
            created_at: parse_timestamp(&row.created_at)?,
        })
    }
}
