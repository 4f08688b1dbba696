//! In-memory session store and the base session strategy.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::HeaderMap;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::auth::{AuthStrategy, Clock, SessionExpiry, SessionStrategy};
use crate::domain::{Session, User};
use crate::error::WardenResult;
use crate::logging::token_prefix;
use crate::storage::UserStore;

/// Process-wide map of session id to session record.
///
/// Built once at startup and shared by reference; clones share the same map.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a session unless its id is already taken.
    pub async fn insert(&self, session: Session) -> bool {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&session.session_id) {
            return false;
        }
        sessions.insert(session.session_id.clone(), session);
        true
    }

    /// Insert or overwrite a session.
    pub async fn upsert(&self, session: Session) {
        let mut sessions = self.sessions.write().await;
        sessions.insert(session.session_id.clone(), session);
    }

    pub async fn get(&self, session_id: &str) -> Option<Session> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) -> Option<Session> {
        self.sessions.write().await.remove(session_id)
    }

    /// Replace the whole map, e.g. after loading a persisted snapshot.
    pub async fn replace_all(&self, snapshot: Vec<Session>) {
        let mut sessions = self.sessions.write().await;
        *sessions = snapshot
            .into_iter()
            .map(|s| (s.session_id.clone(), s))
            .collect();
    }

    /// Remove every session `expiry` considers expired.
    pub async fn purge_expired(&self, expiry: &SessionExpiry) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, session| !expiry.is_expired(session));
        before - sessions.len()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }
}

/// Session authentication backed only by the in-memory map.
#[derive(Clone)]
pub struct SessionAuth {
    store: SessionStore,
    session_name: String,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl SessionAuth {
    pub fn new(
        store: SessionStore,
        session_name: impl Into<String>,
        users: Arc<dyn UserStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            session_name: session_name.into(),
            users,
            clock,
        }
    }
}

#[async_trait]
impl SessionStrategy for SessionAuth {
    fn session_name(&self) -> &str {
        &self.session_name
    }

    fn store(&self) -> &SessionStore {
        &self.store
    }

    fn users(&self) -> &Arc<dyn UserStore> {
        &self.users
    }

    async fn create_session(&self, user_id: &str) -> WardenResult<Option<String>> {
        if user_id.is_empty() {
            return Ok(None);
        }

        loop {
            let session_id = Uuid::new_v4().to_string();
            let session = Session::new(session_id.clone(), user_id.to_string(), self.clock.now());
            if self.store.insert(session).await {
                tracing::info!(
                    user_id = %user_id,
                    session = %token_prefix(&session_id),
                    "Session created"
                );
                return Ok(Some(session_id));
            }
        }
    }

    async fn user_id_for_session(&self, session_id: &str) -> WardenResult<Option<String>> {
        Ok(self.store.get(session_id).await.map(|s| s.user_id))
    }

    async fn remove_session(&self, session_id: &str) -> WardenResult<bool> {
        let removed = self.store.remove(session_id).await.is_some();
        if removed {
            tracing::info!(session = %token_prefix(session_id), "Session destroyed");
        }
        Ok(removed)
    }
}

#[async_trait]
impl AuthStrategy for SessionAuth {
    fn name(&self) -> &'static str {
        "session_auth"
    }

    async fn current_user(&self, headers: &HeaderMap) -> WardenResult<Option<User>> {
        self.current_session_user(headers).await
    }

    fn as_session(&self) -> Option<&dyn SessionStrategy> {
        Some(self)
    }
}
