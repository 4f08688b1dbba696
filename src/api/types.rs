//! API request and response types.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::User;

// ==================== Status ====================

/// Liveness response.
#[derive(Debug, Serialize, ToSchema)]
pub struct StatusResponse {
    pub status: String,
}

// ==================== Users ====================

/// Email and password pair. Both fields are optional so missing values can
/// be reported individually.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CredentialsRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

/// Response after registering a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct RegisterResponse {
    pub email: String,
    pub message: String,
}

/// Public view of a user.
#[derive(Debug, Serialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    pub email: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
        }
    }
}

// ==================== Password reset ====================

/// Request a password reset token.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ResetTokenRequest {
    #[serde(default)]
    pub email: Option<String>,
}

/// Issued reset token.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResetTokenResponse {
    pub email: String,
    pub reset_token: String,
}

/// Set a new password with a reset token.
#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub reset_token: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub email: String,
    pub message: String,
}
