//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Every 4xx response carries a machine-readable `code` alongside the
//! human-readable message, so the chore-status collaborator can distinguish
//! e.g. a replayed transition (`duplicate_event`) from a bad filter.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use serde_json::json;
use tally_core::Error as LedgerError;
use thiserror::Error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  #[error("not found: {0}")]
  NotFound(String),

  #[error("conflict: {message}")]
  Conflict {
    code:    &'static str,
    message: String,
  },

  #[error("bad request: {message}")]
  Validation {
    code:    &'static str,
    message: String,
  },

  #[error("store error: {0}")]
  Store(String),
}

impl ApiError {
  /// Map a ledger error onto the HTTP taxonomy: validation failures become
  /// 400s, unknown users 404s, duplicate applications 409s, and storage
  /// failures pass through untouched as 500s.
  pub fn from_store<E: Into<LedgerError>>(err: E) -> Self {
    let err = err.into();
    let message = err.to_string();
    match err {
      LedgerError::ProfileNotFound(_) => Self::NotFound(message),
      LedgerError::Storage(_) => Self::Store(message),

      LedgerError::ProfileExists(_) => Self::Conflict {
        code: "profile_exists",
        message,
      },
      LedgerError::DuplicateEvent(_) => Self::Conflict {
        code: "duplicate_event",
        message,
      },

      LedgerError::InvalidPoints(_) => Self::validation("invalid_points", message),
      LedgerError::InvalidLimit(_) => Self::validation("invalid_limit", message),
      LedgerError::InvalidDateRange { .. } => {
        Self::validation("invalid_date_range", message)
      }
      LedgerError::InvalidCursor(_) => Self::validation("invalid_cursor", message),
      LedgerError::InvalidDays(_) => Self::validation("invalid_days", message),
    }
  }

  fn validation(code: &'static str, message: String) -> Self {
    Self::Validation { code, message }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, message) = match self {
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "not_found", m),
      ApiError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
      ApiError::Validation { code, message } => {
        (StatusCode::BAD_REQUEST, code, message)
      }
      ApiError::Store(m) => (StatusCode::INTERNAL_SERVER_ERROR, "storage", m),
    };
    (status, Json(json!({ "code": code, "error": message }))).into_response()
  }
}
