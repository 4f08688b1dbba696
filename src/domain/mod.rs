//! Domain types for Warden Core.
//!
//! Users, sessions and the result of an authentication attempt.

mod session;
mod user;

pub use session::*;
pub use user::*;
