//! Error type for `tally-store-sqlite`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] tally_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("column decode error: {0}")]
  Decode(String),

  /// Attempted to append or recompute for a user with no profile.
  #[error("profile not found: {0}")]
  ProfileNotFound(Uuid),

  #[error("profile already exists: {0}")]
  ProfileExists(Uuid),

  /// The idempotency key was already used by an earlier event.
  #[error("an event with idempotency key {0:?} was already applied")]
  DuplicateEvent(String),
}

impl From<Error> for tally_core::Error {
  fn from(e: Error) -> Self {
    match e {
      Error::Core(inner) => inner,
      Error::ProfileNotFound(id) => Self::ProfileNotFound(id),
      Error::ProfileExists(id) => Self::ProfileExists(id),
      Error::DuplicateEvent(key) => Self::DuplicateEvent(key),
      other => Self::Storage(other.to_string()),
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
