//! Query types for filtered, paginated reads of the event log.
//!
//! Pagination is keyset-based: the caller receives an opaque cursor token for
//! the position after the last returned event and passes it back to resume.
//! Offsets are never exposed, so pages stay stable while new events append.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE_NO_PAD as B64;
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  Error, Result,
  event::{EventKind, PointsEvent},
};

/// Page size when the caller does not specify one.
pub const DEFAULT_LIMIT: usize = 20;
/// Hard upper bound on page size.
pub const MAX_LIMIT: usize = 100;
/// Hard upper bound on the daily-summary window.
pub const MAX_SUMMARY_DAYS: u32 = 365;

// ─── Cursor ──────────────────────────────────────────────────────────────────

/// A keyset position in the `(created_at, event_id)` ordering.
///
/// Serialised as an opaque base64 token so callers cannot depend on its
/// shape. A token that fails to decode is a validation error; it is never
/// partially interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
  pub created_at: DateTime<Utc>,
  pub event_id:   Uuid,
}

impl Cursor {
  /// The position immediately after `event` — resuming here skips it.
  pub fn after(event: &PointsEvent) -> Self {
    Self {
      created_at: event.created_at,
      event_id:   event.event_id,
    }
  }

  pub fn encode(&self) -> String {
    let raw = format!(
      "{}|{}",
      self.created_at.to_rfc3339_opts(SecondsFormat::Micros, false),
      self.event_id.hyphenated(),
    );
    B64.encode(raw)
  }

  pub fn decode(token: &str) -> Result<Self> {
    let bad = || Error::InvalidCursor(token.to_owned());

    let raw = B64.decode(token).map_err(|_| bad())?;
    let raw = String::from_utf8(raw).map_err(|_| bad())?;
    let (ts, id) = raw.split_once('|').ok_or_else(bad)?;

    let created_at = DateTime::parse_from_rfc3339(ts)
      .map_err(|_| bad())?
      .with_timezone(&Utc);
    let event_id = Uuid::parse_str(id).map_err(|_| bad())?;

    Ok(Self { created_at, event_id })
  }
}

// ─── EventFilter ─────────────────────────────────────────────────────────────

/// Parameters for [`crate::store::LedgerStore::list_events`].
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
  /// Restrict to events of one kind.
  pub kind:      Option<EventKind>,
  /// Inclusive lower bound on the calendar date (UTC) of `created_at`.
  pub from_date: Option<NaiveDate>,
  /// Inclusive upper bound on the calendar date (UTC) of `created_at`.
  pub to_date:   Option<NaiveDate>,
  /// Page size in `1..=MAX_LIMIT`; defaults to [`DEFAULT_LIMIT`].
  pub limit:     Option<usize>,
  /// Resume after this position.
  pub cursor:    Option<Cursor>,
}

impl EventFilter {
  /// Check bounds and date ordering. Runs before any storage call.
  pub fn validate(&self) -> Result<()> {
    if let Some(limit) = self.limit {
      if limit < 1 || limit > MAX_LIMIT {
        return Err(Error::InvalidLimit(limit));
      }
    }
    if let (Some(from), Some(to)) = (self.from_date, self.to_date) {
      if from > to {
        return Err(Error::InvalidDateRange { from, to });
      }
    }
    Ok(())
  }

  /// The page size after defaulting.
  pub fn effective_limit(&self) -> usize { self.limit.unwrap_or(DEFAULT_LIMIT) }
}

/// Bounds check for [`crate::store::LedgerStore::daily_summary`].
pub fn validate_days(days: u32) -> Result<()> {
  if days < 1 || days > MAX_SUMMARY_DAYS {
    return Err(Error::InvalidDays(days));
  }
  Ok(())
}

// ─── EventPage ───────────────────────────────────────────────────────────────

/// One page of the event log, in ascending `(created_at, event_id)` order.
#[derive(Debug, Clone)]
pub struct EventPage {
  pub events:      Vec<PointsEvent>,
  /// Present iff more events remain past this page.
  pub next_cursor: Option<Cursor>,
}

// ─── DayTotal ────────────────────────────────────────────────────────────────

/// The signed point total for one calendar day (UTC).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayTotal {
  pub date:  NaiveDate,
  pub total: i64,
}
