//! SQLite backend for the Tally points ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. That single connection also serialises
//! concurrent appends: the aggregate update is a relative SQL increment inside
//! the same transaction as the event insert, so no update is ever lost.

mod encode;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use store::SqliteStore;

#[cfg(test)]
mod tests;
