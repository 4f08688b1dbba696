//! HTTP API layer for Warden Core.
//!
//! Account and session endpoints behind the authentication gate.

pub mod handlers;
mod routes;
mod types;

pub use routes::build_router;
