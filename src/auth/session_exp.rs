//! Expiring sessions.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::auth::{AuthStrategy, SessionExpiry, SessionStore, SessionStrategy};
use crate::domain::User;
use crate::error::WardenResult;
use crate::logging::token_prefix;
use crate::storage::UserStore;

/// Wraps a session strategy so sessions stop resolving once they are older
/// than the configured duration.
pub struct SessionExpAuth<S> {
    inner: S,
    expiry: SessionExpiry,
}

impl<S: SessionStrategy> SessionExpAuth<S> {
    pub fn new(inner: S, expiry: SessionExpiry) -> Self {
        Self { inner, expiry }
    }
}

#[async_trait]
impl<S: SessionStrategy> SessionStrategy for SessionExpAuth<S> {
    fn session_name(&self) -> &str {
        self.inner.session_name()
    }

    fn store(&self) -> &SessionStore {
        self.inner.store()
    }

    fn users(&self) -> &Arc<dyn UserStore> {
        self.inner.users()
    }

    async fn create_session(&self, user_id: &str) -> WardenResult<Option<String>> {
        let session_id = self.inner.create_session(user_id).await?;
        if session_id.is_some() && self.expiry.is_bounded() {
            tracing::debug!(
                user_id = %user_id,
                duration_secs = self.expiry.duration_secs(),
                "Session will expire"
            );
        }
        Ok(session_id)
    }

    async fn user_id_for_session(&self, session_id: &str) -> WardenResult<Option<String>> {
        let Some(session) = self.inner.session(session_id).await? else {
            return Ok(None);
        };

        if self.expiry.is_expired(&session) {
            tracing::info!(
                session = %token_prefix(session_id),
                user_id = %session.user_id,
                "Session expired"
            );
            self.inner.remove_session(session_id).await?;
            return Ok(None);
        }

        Ok(Some(session.user_id))
    }

    async fn remove_session(&self, session_id: &str) -> WardenResult<bool> {
        self.inner.remove_session(session_id).await
    }

    async fn purge_expired(&self) -> WardenResult<usize> {
        let inner = self.inner.purge_expired().await?;
        Ok(inner + self.store().purge_expired(&self.expiry).await)
    }
}

#[async_trait]
impl<S: SessionStrategy> AuthStrategy for SessionExpAuth<S> {
    fn name(&self) -> &'static str {
        "session_exp_auth"
    }

    async fn current_user(&self, headers: &HeaderMap) -> WardenResult<Option<User>> {
        self.current_session_user(headers).await
    }

    fn as_session(&self) -> Option<&dyn SessionStrategy> {
        Some(self)
    }
}
