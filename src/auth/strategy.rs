//! Authentication strategy traits.
//!
//! An [`AuthStrategy`] derives a user from request headers. Session based
//! strategies additionally implement [`SessionStrategy`], which is the seam
//! the expiry and persistence decorators wrap.

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::{
    header::{AUTHORIZATION, COOKIE},
    HeaderMap,
};
use uuid::Uuid;

use crate::auth::SessionStore;
use crate::domain::{AuthResult, Session, User};
use crate::error::WardenResult;
use crate::storage::UserStore;

/// Returns the `Authorization` header verbatim.
pub fn authorization_header(headers: &HeaderMap) -> Option<&str> {
    headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok())
}

/// Returns the value of the cookie called `session_name`.
pub fn session_cookie(headers: &HeaderMap, session_name: &str) -> Option<String> {
    if session_name.is_empty() {
        return None;
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(key, _)| key.trim() == session_name)
        .map(|(_, value)| value.trim().to_string())
}

/// One mechanism for deriving identity from a request.
#[async_trait]
pub trait AuthStrategy: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Resolve the requesting user, or `None` if the request does not carry
    /// a usable credential.
    async fn current_user(&self, headers: &HeaderMap) -> WardenResult<Option<User>>;

    /// Session operations, when this strategy issues sessions.
    fn as_session(&self) -> Option<&dyn SessionStrategy> {
        None
    }

    /// Classify a request for the access gate.
    async fn authenticate(&self, headers: &HeaderMap, session_name: &str) -> WardenResult<AuthResult> {
        if authorization_header(headers).is_none() && session_cookie(headers, session_name).is_none() {
            return Ok(AuthResult::Unauthenticated);
        }

        Ok(match self.current_user(headers).await? {
            Some(user) => AuthResult::Authenticated(user),
            None => AuthResult::Rejected,
        })
    }
}

/// Session lifecycle operations.
///
/// Decorators hold an inner strategy and override `create_session`,
/// `user_id_for_session` and `remove_session`; everything else delegates.
#[async_trait]
pub trait SessionStrategy: Send + Sync {
    /// Name of the cookie carrying the session id.
    fn session_name(&self) -> &str;

    /// The process-wide session map.
    fn store(&self) -> &SessionStore;

    /// User lookup used to turn a session into a [`User`].
    fn users(&self) -> &Arc<dyn UserStore>;

    /// Issue a new session for `user_id`. An empty id yields `None`.
    async fn create_session(&self, user_id: &str) -> WardenResult<Option<String>>;

    /// Raw session record, without any validity check.
    async fn session(&self, session_id: &str) -> WardenResult<Option<Session>> {
        Ok(self.store().get(session_id).await)
    }

    /// The user bound to an active session.
    async fn user_id_for_session(&self, session_id: &str) -> WardenResult<Option<String>>;

    /// Forget a session. Returns whether anything was removed.
    async fn remove_session(&self, session_id: &str) -> WardenResult<bool>;

    /// Drop expired sessions, returning how many were removed.
    async fn purge_expired(&self) -> WardenResult<usize> {
        Ok(0)
    }

    fn session_cookie(&self, headers: &HeaderMap) -> Option<String> {
        session_cookie(headers, self.session_name())
    }

    /// Log out the session named by the request cookie.
    async fn destroy_session(&self, headers: &HeaderMap) -> WardenResult<bool> {
        let Some(session_id) = self.session_cookie(headers) else {
            return Ok(false);
        };

        if self.user_id_for_session(&session_id).await?.is_none() {
            return Ok(false);
        }

        self.remove_session(&session_id).await
    }

    /// Cookie, then session, then user lookup.
    async fn current_session_user(&self, headers: &HeaderMap) -> WardenResult<Option<User>> {
        let Some(session_id) = self.session_cookie(headers) else {
            return Ok(None);
        };

        let Some(user_id) = self.user_id_for_session(&session_id).await? else {
            return Ok(None);
        };

        let Ok(user_id) = user_id.parse::<Uuid>() else {
            tracing::warn!(user_id = %user_id, "Session bound to a malformed user id");
            return Ok(None);
        };

        self.users().get(user_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_authorization_header_verbatim() {
        let mut headers = HeaderMap::new();
        assert!(authorization_header(&headers).is_none());

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic  abc=="));
        assert_eq!(authorization_header(&headers), Some("Basic  abc=="));
    }

    #[test]
    fn test_session_cookie_lookup() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; _my_session_id=abc-123; other=1"),
        );

        assert_eq!(
            session_cookie(&headers, "_my_session_id"),
            Some("abc-123".to_string())
        );
        assert_eq!(session_cookie(&headers, "theme"), Some("dark".to_string()));
        assert!(session_cookie(&headers, "missing").is_none());
        assert!(session_cookie(&headers, "").is_none());
    }

    #[test]
    fn test_session_cookie_across_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("a=1"));
        headers.append(COOKIE, HeaderValue::from_static("sid=xyz"));

        assert_eq!(session_cookie(&headers, "sid"), Some("xyz".to_string()));
    }
}
