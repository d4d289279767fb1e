//! Profile — the per-user aggregate the event log is folded into.
//!
//! A profile owns the running `total_points` counter. The central invariant
//! of the ledger is that this counter always equals the sum of the signed
//! deltas of the user's events; [`crate::store::LedgerStore::recompute_total`]
//! is the repair path when drift is suspected.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A user's profile and point aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
  /// Identity; matches the id issued by the external account system.
  pub user_id:      Uuid,
  pub name:         String,
  pub avatar_url:   Option<String>,
  /// Running total; always equals the sum of the user's event deltas.
  pub total_points: i64,
  pub created_at:   DateTime<Utc>,
}

/// Input to [`crate::store::LedgerStore::create_profile`].
///
/// The user id is supplied separately by the caller so the profile shares its
/// identity with the externally-created account.
#[derive(Debug, Clone)]
pub struct NewProfile {
  pub name:       String,
  pub avatar_url: Option<String>,
}
