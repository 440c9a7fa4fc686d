//! SQLite backend for the Wayfare ride service.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every store call executes as one
//! closure on that thread, so each multi-statement write runs inside its own
//! transaction with no interleaving from other calls.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;
