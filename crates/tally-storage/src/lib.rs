//! Tally Storage Layer
//!
//! Durable key-value persistence for client state. Callers depend on the
//! [`KeyValueStore`] trait; [`Database`] backs it with SQLite and
//! [`MemoryStore`] keeps everything in process.

mod database;
mod error;
mod kv;
mod migrations;

pub use database::Database;
pub use error::StorageError;
pub use kv::{KeyValueStore, MemoryStore};

pub type Result<T> = std::result::Result<T, StorageError>;
