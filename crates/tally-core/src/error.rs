//! Error types for `tally-core`.

use chrono::NaiveDate;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("profile already exists: {0}")]
  ProfileExists(Uuid),

  #[error("an event with idempotency key {0:?} was already applied")]
  DuplicateEvent(String),

  #[error("points must be a positive magnitude, got {0}")]
  InvalidPoints(i64),

  #[error("limit must be between 1 and 100, got {0}")]
  InvalidLimit(usize),

  #[error("from_date {from} is after to_date {to}")]
  InvalidDateRange { from: NaiveDate, to: NaiveDate },

  #[error("invalid cursor token: {0:?}")]
  InvalidCursor(String),

  #[error("days must be between 1 and 365, got {0}")]
  InvalidDays(u32),

  #[error("storage error: {0}")]
  Storage(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
