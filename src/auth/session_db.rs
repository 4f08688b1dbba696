//! Sessions backed by durable storage.
//!
//! The persistence backend is the source of truth; the in-memory map of the
//! inner strategy is kept as a cache that is warmed at startup and refreshed
//! on every lookup. Snapshot writes are last-writer-wins, so a concurrent
//! destroy and create in two processes sharing one file can lose an update.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;

use crate::auth::{AuthStrategy, SessionExpiry, SessionStore, SessionStrategy};
use crate::domain::{Session, SessionFilter, User};
use crate::error::WardenResult;
use crate::logging::token_prefix;
use crate::storage::{SessionPersistence, UserStore};

pub struct SessionDbAuth<S> {
    inner: S,
    persistence: Arc<dyn SessionPersistence>,
    expiry: SessionExpiry,
}

impl<S: SessionStrategy> SessionDbAuth<S> {
    pub fn new(inner: S, persistence: Arc<dyn SessionPersistence>, expiry: SessionExpiry) -> Self {
        Self {
            inner,
            persistence,
            expiry,
        }
    }

    /// Replace the in-memory sessions with the persisted snapshot.
    pub async fn reload(&self) -> WardenResult<usize> {
        let snapshot = self.persistence.load_snapshot().await?;
        let count = snapshot.len();
        self.inner.store().replace_all(snapshot).await;
        tracing::info!(sessions = count, "Session table loaded from storage");
        Ok(count)
    }

    async fn find_persisted(&self, session_id: &str) -> WardenResult<Option<Session>> {
        let filter = SessionFilter::SessionId(session_id.to_string());
        Ok(self.persistence.search(&filter).await?.into_iter().next())
    }
}

#[async_trait]
impl<S: SessionStrategy> SessionStrategy for SessionDbAuth<S> {
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
        let Some(session_id) = self.inner.create_session(user_id).await? else {
            return Ok(None);
        };
        let Some(session) = self.inner.session(&session_id).await? else {
            return Ok(None);
        };

        if let Err(e) = self.persistence.save(&session).await {
            // Don't hand out a session that would vanish on the next lookup.
            self.inner.remove_session(&session_id).await?;
            return Err(e);
        }

        Ok(Some(session_id))
    }

    async fn session(&self, session_id: &str) -> WardenResult<Option<Session>> {
        self.find_persisted(session_id).await
    }

    async fn user_id_for_session(&self, session_id: &str) -> WardenResult<Option<String>> {
        let Some(session) = self.find_persisted(session_id).await? else {
            // Stale cache entry from another process' logout.
            self.inner.store().remove(session_id).await;
            return Ok(None);
        };

        if self.expiry.is_expired(&session) {
            tracing::info!(
                session = %token_prefix(session_id),
                user_id = %session.user_id,
                "Persisted session expired"
            );
            self.remove_session(session_id).await?;
            return Ok(None);
        }

        let user_id = session.user_id.clone();
        self.inner.store().upsert(session).await;
        Ok(Some(user_id))
    }

    async fn remove_session(&self, session_id: &str) -> WardenResult<bool> {
        let cached = self.inner.remove_session(session_id).await?;
        let persisted = self.persistence.remove(session_id).await?;
        Ok(cached || persisted)
    }

    async fn purge_expired(&self) -> WardenResult<usize> {
        // Delete by id so sessions saved during the sweep are left alone.
        let expired: Vec<String> = self
            .persistence
            .load_snapshot()
            .await?
            .into_iter()
            .filter(|s| self.expiry.is_expired(s))
            .map(|s| s.session_id)
            .collect();

        if expired.is_empty() {
            return Ok(0);
        }

        let purged = self.persistence.remove_many(&expired).await?;
        for session_id in &expired {
            self.inner.store().remove(session_id).await;
        }

        Ok(purged)
    }
}

#[async_trait]
impl<S: SessionStrategy> AuthStrategy for SessionDbAuth<S> {
    fn name(&self) -> &'static str {
        "session_db_auth"
    }

    async fn current_user(&self, headers: &HeaderMap) -> WardenResult<Option<User>> {
        self.current_session_user(headers).await
    }

    fn as_session(&self) -> Option<&dyn SessionStrategy> {
        Some(self)
    }
}
