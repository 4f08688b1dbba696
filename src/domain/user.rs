//! User domain types.
//!
//! Users are owned by the user store; the auth strategies only read them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::auth::verify_password;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// Unique identifier.
    pub id: Uuid,
    /// User's email address.
    pub email: String,
    /// Password hash (PHC string, salt embedded).
    #[serde(skip)]
    pub password_hash: String,
    /// SHA-256 hex digest of an outstanding password reset token.
    #[serde(skip)]
    pub reset_token_hash: Option<String>,
    /// When the user was created.
    pub created_at: DateTime<Utc>,
    /// When the user was last updated.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Create a new user from an already hashed password.
    pub fn new(email: String, password_hash: String) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            email,
            password_hash,
            reset_token_hash: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check a plaintext password against the stored hash.
    pub fn is_valid_password(&self, password: &str) -> bool {
        verify_password(&self.password_hash, password)
    }
}

/// Lookup filter for the user store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserFilter {
    Id(Uuid),
    Email(String),
    ResetTokenHash(String),
}
