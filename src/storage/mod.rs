//! Storage layer for Warden Core.
//!
//! Users and durable sessions live in SQLite via SQLx; sessions can
//! alternatively be kept in a JSON snapshot file.

mod file_sessions;
mod models;
mod repository;
mod store;

pub use file_sessions::FileSessionStore;
pub use repository::WardenRepository;
pub use store::*;

#[cfg(test)]
pub(crate) use repository::testing;
