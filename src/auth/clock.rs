//! Time source for session timestamps and expiry.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};

use crate::domain::Session;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Time-bounded validity for sessions.
///
/// A duration of zero or less means sessions never expire.
#[derive(Clone)]
pub struct SessionExpiry {
    duration_secs: i64,
    clock: Arc<dyn Clock>,
}

impl SessionExpiry {
    pub fn new(duration_secs: i64, clock: Arc<dyn Clock>) -> Self {
        Self {
            duration_secs,
            clock,
        }
    }

    pub fn duration_secs(&self) -> i64 {
        self.duration_secs
    }

    /// Whether sessions expire at all.
    pub fn is_bounded(&self) -> bool {
        self.duration_secs > 0
    }

    /// When `session` stops being valid, or `None` if it never does.
    pub fn expires_at(&self, session: &Session) -> Option<DateTime<Utc>> {
        self.is_bounded()
            .then(|| session.created_at + Duration::seconds(self.duration_secs))
    }

    pub fn is_expired(&self, session: &Session) -> bool {
        self.expires_at(session)
            .map(|expires_at| expires_at < self.clock.now())
            .unwrap_or(false)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ManualClock;
    use super::*;

    #[test]
    fn test_unbounded_durations_never_expire() {
        let clock = ManualClock::new();
        let session = Session::new("id".into(), "user".into(), clock.now());

        for duration in [0, -5] {
            let expiry = SessionExpiry::new(duration, clock.clone());
            clock.advance(1_000_000);
            assert!(!expiry.is_expired(&session));
            assert!(expiry.expires_at(&session).is_none());
        }
    }

    #[test]
    fn test_expiry_boundary() {
        let clock = ManualClock::new();
        let expiry = SessionExpiry::new(10, clock.clone());
        let session = Session::new("id".into(), "user".into(), clock.now());

        clock.advance(10);
        assert!(!expiry.is_expired(&session));

        clock.advance(1);
        assert!(expiry.is_expired(&session));
    }
}
