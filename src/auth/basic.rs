//! HTTP Basic authentication.
//!
//! `Authorization: Basic <base64(email:password)>` resolved against the user
//! store. Each step returns `None` on bad input so a broken header simply
//! leaves the request unauthenticated.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD, Engine};

use crate::auth::{authorization_header, AuthStrategy};
use crate::domain::{User, UserFilter};
use crate::error::WardenResult;
use crate::storage::UserStore;

#[derive(Clone)]
pub struct BasicAuth {
    users: Arc<dyn UserStore>,
}

impl BasicAuth {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// The credentials part of a `Basic` header.
    pub fn extract_base64(header: &str) -> Option<&str> {
        header.strip_prefix("Basic ")
    }

    /// Standard base64 to UTF-8 text.
    pub fn decode(encoded: &str) -> Option<String> {
        let bytes = STANDARD.decode(encoded).ok()?;
        String::from_utf8(bytes).ok()
    }

    /// Split `email:password` on the first colon.
    pub fn split_credentials(decoded: &str) -> Option<(&str, &str)> {
        decoded.split_once(':')
    }

    /// First user with this email whose password matches.
    pub async fn resolve_user(&self, email: &str, password: &str) -> WardenResult<Option<User>> {
        let candidates = self
            .users
            .search(&UserFilter::Email(email.to_string()))
            .await?;

        Ok(candidates
            .into_iter()
            .find(|user| user.is_valid_password(password)))
    }
}

#[async_trait]
impl AuthStrategy for BasicAuth {
    fn name(&self) -> &'static str {
        "basic_auth"
    }

    async fn current_user(&self, headers: &HeaderMap) -> WardenResult<Option<User>> {
        let Some(decoded) = authorization_header(headers)
            .and_then(Self::extract_base64)
            .and_then(Self::decode)
        else {
            return Ok(None);
        };
        let Some((email, password)) = Self::split_credentials(&decoded) else {
            return Ok(None);
        };

        let user = self.resolve_user(email, password).await?;
        if user.is_none() {
            tracing::debug!("Basic credentials did not match a user");
        }
        Ok(user)
    }
}
