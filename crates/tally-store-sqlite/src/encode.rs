//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microsecond
//! precision, `+00:00` offset) so that lexical order equals chronological
//! order — keyset pagination and the date-portion filters depend on this.
//! UUIDs are stored as hyphenated lowercase strings.

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use tally_core::{
  event::{EventKind, PointsEvent},
  profile::Profile,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, false)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::Decode(e.to_string()))
}

// ─── NaiveDate ───────────────────────────────────────────────────────────────

/// Calendar dates compare against the `YYYY-MM-DD` prefix of `created_at`.
pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d").map_err(|e| Error::Decode(e.to_string()))
}

// ─── EventKind ───────────────────────────────────────────────────────────────

pub fn encode_kind(k: EventKind) -> &'static str { k.discriminant() }

pub fn decode_kind(s: &str) -> Result<EventKind> {
  match s {
    "add" => Ok(EventKind::Add),
    "subtract" => Ok(EventKind::Subtract),
    other => Err(Error::Decode(format!("unknown event kind: {other:?}"))),
  }
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `points_events` row.
pub struct RawEvent {
  pub event_id:        String,
  pub user_id:         String,
  pub chore_id:        Option<String>,
  pub kind:            String,
  pub points:          i64,
  pub created_at:      String,
  pub idempotency_key: Option<String>,
}

impl RawEvent {
  pub fn into_event(self) -> Result<PointsEvent> {
    Ok(PointsEvent {
      event_id:        decode_uuid(&self.event_id)?,
      user_id:         decode_uuid(&self.user_id)?,
      chore_id:        self.chore_id.as_deref().map(decode_uuid).transpose()?,
      kind:            decode_kind(&self.kind)?,
      points:          self.points,
      created_at:      decode_dt(&self.created_at)?,
      idempotency_key: self.idempotency_key,
    })
  }
}

/// Raw strings read directly from a `profiles` row.
pub struct RawProfile {
  pub user_id:      String,
  pub name:         String,
  pub avatar_url:   Option<String>,
  pub total_points: i64,
  pub created_at:   String,
}

impl RawProfile {
  pub fn into_profile(self) -> Result<Profile> {
    Ok(Profile {
      user_id:      decode_uuid(&self.user_id)?,
      name:         self.name,
      avatar_url:   self.avatar_url,
      total_points: self.total_points,
      created_at:   decode_dt(&self.created_at)?,
    })
  }
}
