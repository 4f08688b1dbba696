//! Collaborator contracts for user lookup and durable session storage.

use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::{Session, SessionFilter, User, UserFilter};
use crate::error::WardenResult;

/// Read access to registered users.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// All users matching `filter`.
    async fn search(&self, filter: &UserFilter) -> WardenResult<Vec<User>>;

    /// A single user by id.
    async fn get(&self, id: Uuid) -> WardenResult<Option<User>>;
}

/// Durable storage for sessions.
///
/// Errors mean the backend is unavailable and must not be read as "no
/// session".
#[async_trait]
pub trait SessionPersistence: Send + Sync {
    async fn save(&self, session: &Session) -> WardenResult<()>;

    async fn search(&self, filter: &SessionFilter) -> WardenResult<Vec<Session>>;

    /// Returns whether a record was removed.
    async fn remove(&self, session_id: &str) -> WardenResult<bool>;

    /// Every stored session.
    async fn load_snapshot(&self) -> WardenResult<Vec<Session>>;

    /// Remove every listed session in one step, returning how many existed.
    async fn remove_many(&self, session_ids: &[String]) -> WardenResult<usize>;
}
