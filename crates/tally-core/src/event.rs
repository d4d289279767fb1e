//! Points events — the fundamental unit of the Tally ledger.
//!
//! An event is an immutable record of a single point change for a user at a
//! point in time. Events are never updated or physically deleted; the per-user
//! total in [`crate::profile::Profile`] is kept in lockstep with the log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── EventKind ───────────────────────────────────────────────────────────────

/// The direction of a point change.
///
/// The signed delta is derived from the kind and an always-positive magnitude,
/// so the sign convention can never disagree with the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
  Add,
  Subtract,
}

impl EventKind {
  /// The sign this kind contributes to the aggregate.
  pub fn sign(self) -> i64 {
    match self {
      Self::Add => 1,
      Self::Subtract => -1,
    }
  }

  /// The discriminant string stored in the `kind` column.
  /// Must match the `rename_all = "lowercase"` serde tags above.
  pub fn discriminant(self) -> &'static str {
    match self {
      Self::Add => "add",
      Self::Subtract => "subtract",
    }
  }
}

// ─── PointsEvent ─────────────────────────────────────────────────────────────

/// An immutable point change for a user. Once written, no field is ever
/// updated; the event log is the audit trail the aggregate is derived from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PointsEvent {
  pub event_id:        Uuid,
  pub user_id:         Uuid,
  /// The daily-chore instance that triggered this event, if any.
  pub chore_id:        Option<Uuid>,
  /// Serialised as `event_type`, matching the `POST /events` request shape.
  #[serde(rename = "event_type")]
  pub kind:            EventKind,
  /// Strictly positive magnitude; the sign lives in `kind`.
  pub points:          i64,
  /// Server-assigned timestamp; never changes after creation.
  pub created_at:      DateTime<Utc>,
  /// De-duplication key for chore-status transitions (unique when present).
  pub idempotency_key: Option<String>,
}

impl PointsEvent {
  /// The signed contribution of this event to the user's total.
  pub fn delta(&self) -> i64 { self.kind.sign() * self.points }
}

// ─── NewEvent ────────────────────────────────────────────────────────────────

/// Input to [`crate::store::LedgerStore::append_event`].
/// `created_at` is always set by the store; it is not accepted from callers.
#[derive(Debug, Clone)]
pub struct NewEvent {
  pub user_id:         Uuid,
  pub kind:            EventKind,
  /// Magnitude of the change; must be strictly positive.
  pub points:          i64,
  pub chore_id:        Option<Uuid>,
  pub idempotency_key: Option<String>,
}

impl NewEvent {
  /// Convenience constructor with no chore reference or idempotency key.
  pub fn new(user_id: Uuid, kind: EventKind, points: i64) -> Self {
    Self {
      user_id,
      kind,
      points,
      chore_id: None,
      idempotency_key: None,
    }
  }

  /// The signed contribution this event will make to the user's total.
  pub fn delta(&self) -> i64 { self.kind.sign() * self.points }

  /// Reject zero and negative magnitudes before anything touches storage.
  pub fn validate(&self) -> Result<()> {
    if self.points <= 0 {
      return Err(Error::InvalidPoints(self.points));
    }
    Ok(())
  }
}
