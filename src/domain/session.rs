//! Session domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;

/// Server-side record binding an opaque token to a user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Random 128-bit token (UUIDv4 text form).
    pub session_id: String,
    /// Owner of the session.
    pub user_id: String,
    /// When the session was issued.
    pub created_at: DateTime<Utc>,
}

impl Session {
    pub fn new(session_id: String, user_id: String, created_at: DateTime<Utc>) -> Self {
        Self {
            session_id,
            user_id,
            created_at,
        }
    }
}

/// Lookup filter for session persistence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionFilter {
    SessionId(String),
}

impl SessionFilter {
    pub fn matches(&self, session: &Session) -> bool {
        match self {
            SessionFilter::SessionId(id) => session.session_id == *id,
        }
    }
}

/// Outcome of running a request through an auth strategy.
///
/// Malformed, unknown and expired credentials all collapse into `Rejected`.
#[derive(Debug, Clone)]
pub enum AuthResult {
    /// Credentials resolved to a user.
    Authenticated(User),
    /// No credential was presented at all.
    Unauthenticated,
    /// A credential was presented but did not resolve to a user.
    Rejected,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matching() {
        let session = Session::new("abc".into(), "user-1".into(), Utc::now());

        assert!(SessionFilter::SessionId("abc".into()).matches(&session));
        assert!(!SessionFilter::SessionId("user-1".into()).matches(&session));
    }
}
