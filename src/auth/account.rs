//! Account management: registration, login checks and password resets.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::auth::hash_password;
use crate::domain::{User, UserFilter};
use crate::error::{WardenError, WardenResult};
use crate::storage::{UserStore, WardenRepository};

/// Outcome of checking an email/password pair.
#[derive(Debug)]
pub enum LoginOutcome {
    NoUser,
    WrongPassword,
    Authenticated(User),
}

#[derive(Clone)]
pub struct AccountService {
    repository: WardenRepository,
}

impl AccountService {
    pub fn new(repository: WardenRepository) -> Self {
        Self { repository }
    }

    /// Reset tokens are stored as digests, like API keys.
    pub fn hash_token(token: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        hex::encode(hasher.finalize())
    }

    /// Register a new user. Fails if the email is taken.
    pub async fn register_user(&self, email: &str, password: &str) -> WardenResult<User> {
        if self.repository.get_user_by_email(email).await?.is_some() {
            return Err(WardenError::BadRequest(format!("User {} already exists", email)));
        }

        let user = User::new(email.to_string(), hash_password(password)?);
        self.repository.create_user(&user).await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(user)
    }

    /// Check every user with this email until one accepts the password.
    pub async fn login(&self, email: &str, password: &str) -> WardenResult<LoginOutcome> {
        let users = self
            .repository
            .search(&UserFilter::Email(email.to_string()))
            .await?;

        if users.is_empty() {
            return Ok(LoginOutcome::NoUser);
        }

        Ok(users
            .into_iter()
            .find(|user| user.is_valid_password(password))
            .map(LoginOutcome::Authenticated)
            .unwrap_or(LoginOutcome::WrongPassword))
    }

    /// Issue a one-time reset token for `email`.
    pub async fn get_reset_password_token(&self, email: &str) -> WardenResult<String> {
        let user = self
            .repository
            .get_user_by_email(email)
            .await?
            .ok_or_else(|| WardenError::NotFound(format!("No user for {}", email)))?;

        let token = Uuid::new_v4().to_string();
        self.repository
            .set_reset_token_hash(user.id, Some(&Self::hash_token(&token)))
            .await?;

        tracing::info!(user_id = %user.id, "Password reset token issued");
        Ok(token)
    }

    /// Set a new password using a reset token. The token is consumed.
    pub async fn update_password(&self, reset_token: &str, password: &str) -> WardenResult<()> {
        let digest = Self::hash_token(reset_token);
        let user = self
            .repository
            .search(&UserFilter::ResetTokenHash(digest))
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| WardenError::Forbidden("Invalid reset token".to_string()))?;

        self.repository
            .update_password_hash(user.id, &hash_password(password)?)
            .await?;

        tracing::info!(user_id = %user.id, "Password updated");
        Ok(())
    }
}
