//! Storage crate: per-chat conversation sessions and their persistence.
//!
//! ## Modules
//!
//! - [`error`] – Storage error types
//! - [`models`] – Session, Turn, TurnRole
//! - [`backend`] – SessionBackend trait (whole-session get/set/delete)
//! - [`inmemory`] – InMemorySessionBackend
//! - [`session_repo`] – SqliteSessionBackend (SQLite)
//! - [`sqlite_pool`] – SqlitePoolManager
//! - [`session_store`] – SessionStore and per-chat SessionGuard

mod backend;
mod error;
mod inmemory;
mod models;
mod session_repo;
mod session_store;
mod sqlite_pool;

pub use backend::SessionBackend;
pub use error::StorageError;
pub use inmemory::InMemorySessionBackend;
pub use models::{Session, Turn, TurnRole};
pub use session_repo::SqliteSessionBackend;
pub use session_store::{SessionGuard, SessionStore};
pub use sqlite_pool::SqlitePoolManager;
