//! Authentication module for Warden Core.
//!
//! Provides the access gate and the pluggable strategies behind it:
//! - Basic: `Authorization: Basic` credentials checked against the user store
//! - Session: cookie-borne session ids, optionally expiring and/or persisted

mod account;
mod basic;
pub(crate) mod clock;
mod gate;
mod middleware;
mod password;
pub(crate) mod session;
mod session_db;
mod session_exp;
mod strategy;

pub use account::*;
pub use basic::*;
pub use clock::{Clock, SessionExpiry, SystemClock};
pub use gate::*;
pub use middleware::*;
pub use password::*;
pub use session::{SessionAuth, SessionStore};
pub use session_db::*;
pub use session_exp::*;
pub use strategy::*;
