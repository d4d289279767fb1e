//! [`SqliteStore`] — the SQLite implementation of [`LedgerStore`].

use std::{collections::HashMap, path::Path};

use chrono::{DateTime, Duration, NaiveDate, SubsecRound as _, Utc};
use rusqlite::{OptionalExtension as _, types::Value};
use uuid::Uuid;

use tally_core::{
  event::{NewEvent, PointsEvent},
  profile::{NewProfile, Profile},
  query::{self, Cursor, DayTotal, EventFilter, EventPage},
  store::LedgerStore,
};

use crate::{
  Error, Result,
  encode::{
    RawEvent, RawProfile, decode_date, encode_date, encode_dt, encode_kind,
    encode_uuid,
  },
  schema::SCHEMA,
};

const EVENT_COLUMNS: &str =
  "event_id, user_id, chore_id, kind, points, created_at, idempotency_key";

const PROFILE_COLUMNS: &str =
  "user_id, name, avatar_url, total_points, created_at";

/// Signed-delta sum over the `kind`/`points` columns.
const DELTA_SUM: &str =
  "SUM(CASE kind WHEN 'subtract' THEN -points ELSE points END)";

/// Result of the transactional append, reported from inside the connection
/// closure so the transaction rolls back before we map it onto an error.
enum AppendOutcome {
  Applied(DateTime<Utc>),
  NoProfile,
  DuplicateKey,
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Tally points ledger backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Apply a fully-built event: insert it and add its delta to the owner's
  /// `total_points`, in one transaction. Tests use this directly to plant
  /// events with controlled timestamps; [`LedgerStore::append_event`] is the
  /// public path and stamps `created_at` at insertion instead.
  pub(crate) async fn apply_event(&self, event: PointsEvent) -> Result<PointsEvent> {
    self.append_in_tx(event, false).await
  }

  /// The append transaction. With `stamp_on_insert`, `created_at` is assigned
  /// inside the connection closure — the connection serialises appends, so
  /// timestamp order then agrees with insertion order even when callers race
  /// to enqueue.
  async fn append_in_tx(
    &self,
    mut event: PointsEvent,
    stamp_on_insert: bool,
  ) -> Result<PointsEvent> {
    let delta           = event.delta();
    let event_id_str    = encode_uuid(event.event_id);
    let user_id_str     = encode_uuid(event.user_id);
    let chore_id_str    = event.chore_id.map(encode_uuid);
    let kind_str        = encode_kind(event.kind).to_owned();
    let points          = event.points;
    let planted_at      = event.created_at;
    let idempotency_key = event.idempotency_key.clone();

    let outcome: AppendOutcome = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        if let Some(key) = idempotency_key.as_deref() {
          let dup: Option<i64> = tx
            .query_row(
              "SELECT 1 FROM points_events WHERE idempotency_key = ?1",
              rusqlite::params![key],
              |r| r.get(0),
            )
            .optional()?;
          if dup.is_some() {
            return Ok(AppendOutcome::DuplicateKey);
          }
        }

        // Relative increment at the storage layer; never read-modify-write.
        let updated = tx.execute(
          "UPDATE profiles SET total_points = total_points + ?1 WHERE user_id = ?2",
          rusqlite::params![delta, user_id_str],
        )?;
        if updated == 0 {
          return Ok(AppendOutcome::NoProfile);
        }

        // Truncated to the stored microsecond precision, so the returned
        // event matches the row exactly.
        let created_at = if stamp_on_insert {
          Utc::now().trunc_subsecs(6)
        } else {
          planted_at
        };

        tx.execute(
          "INSERT INTO points_events (
             event_id, user_id, chore_id, kind, points, created_at,
             idempotency_key
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            event_id_str,
            user_id_str,
            chore_id_str,
            kind_str,
            points,
            encode_dt(created_at),
            idempotency_key,
          ],
        )?;

        tx.commit()?;
        Ok(AppendOutcome::Applied(created_at))
      })
      .await?;

    match outcome {
      AppendOutcome::Applied(created_at) => {
        event.created_at = created_at;
        Ok(event)
      }
      AppendOutcome::NoProfile => Err(Error::ProfileNotFound(event.user_id)),
      AppendOutcome::DuplicateKey => {
        Err(Error::DuplicateEvent(event.idempotency_key.unwrap_or_default()))
      }
    }
  }
}

// ─── LedgerStore impl ────────────────────────────────────────────────────────

impl LedgerStore for SqliteStore {
  type Error = Error;

  // ── Profiles ──────────────────────────────────────────────────────────────

  async fn create_profile(&self, user_id: Uuid, input: NewProfile) -> Result<Profile> {
    let profile = Profile {
      user_id,
      name: input.name,
      avatar_url: input.avatar_url,
      total_points: 0,
      created_at: Utc::now(),
    };

    let id_str     = encode_uuid(profile.user_id);
    let name       = profile.name.clone();
    let avatar_url = profile.avatar_url.clone();
    let at_str     = encode_dt(profile.created_at);

    let inserted: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "INSERT INTO profiles (user_id, name, avatar_url, total_points, created_at)
           VALUES (?1, ?2, ?3, 0, ?4)
           ON CONFLICT (user_id) DO NOTHING",
          rusqlite::params![id_str, name, avatar_url, at_str],
        )?)
      })
      .await?;

    if inserted == 0 {
      return Err(Error::ProfileExists(user_id));
    }
    Ok(profile)
  }

  async fn get_profile(&self, user_id: Uuid) -> Result<Option<Profile>> {
    let id_str = encode_uuid(user_id);

    let raw: Option<RawProfile> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {PROFILE_COLUMNS} FROM profiles WHERE user_id = ?1"),
              rusqlite::params![id_str],
              |row| {
                Ok(RawProfile {
                  user_id:      row.get(0)?,
                  name:         row.get(1)?,
                  avatar_url:   row.get(2)?,
                  total_points: row.get(3)?,
                  created_at:   row.get(4)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawProfile::into_profile).transpose()
  }

  async fn list_profiles(&self) -> Result<Vec<Profile>> {
    let raws: Vec<RawProfile> = self
      .conn
      .call(|conn| {
        let mut stmt = conn
          .prepare(&format!("SELECT {PROFILE_COLUMNS} FROM profiles ORDER BY created_at, user_id"))?;
        let rows = stmt
          .query_map([], |row| {
            Ok(RawProfile {
              user_id:      row.get(0)?,
              name:         row.get(1)?,
              avatar_url:   row.get(2)?,
              total_points: row.get(3)?,
              created_at:   row.get(4)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawProfile::into_profile).collect()
  }

  // ── Events — append-only writes ───────────────────────────────────────────

  async fn append_event(&self, input: NewEvent) -> Result<PointsEvent> {
    input.validate().map_err(Error::Core)?;

    // `created_at` here is a placeholder; the transaction stamps the real
    // timestamp at insertion.
    let event = PointsEvent {
      event_id:        Uuid::new_v4(),
      user_id:         input.user_id,
      chore_id:        input.chore_id,
      kind:            input.kind,
      points:          input.points,
      created_at:      Utc::now(),
      idempotency_key: input.idempotency_key,
    };

    self.append_in_tx(event, true).await
  }

  // ── Reads ─────────────────────────────────────────────────────────────────

  async fn get_event(&self, event_id: Uuid) -> Result<Option<PointsEvent>> {
    let id_str = encode_uuid(event_id);

    let raw: Option<RawEvent> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!("SELECT {EVENT_COLUMNS} FROM points_events WHERE event_id = ?1"),
              rusqlite::params![id_str],
              |row| {
                Ok(RawEvent {
                  event_id:        row.get(0)?,
                  user_id:         row.get(1)?,
                  chore_id:        row.get(2)?,
                  kind:            row.get(3)?,
                  points:          row.get(4)?,
                  created_at:      row.get(5)?,
                  idempotency_key: row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawEvent::into_event).transpose()
  }

  async fn list_events(&self, user_id: Uuid, filter: &EventFilter) -> Result<EventPage> {
    filter.validate().map_err(Error::Core)?;

    let limit       = filter.effective_limit();
    let user_id_str = encode_uuid(user_id);
    let kind_str    = filter.kind.map(encode_kind).map(str::to_owned);
    let from_str    = filter.from_date.map(encode_date);
    let to_str      = filter.to_date.map(encode_date);
    let cursor_pos  = filter
      .cursor
      .map(|c| (encode_dt(c.created_at), encode_uuid(c.event_id)));

    let raws: Option<Vec<RawEvent>> = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM profiles WHERE user_id = ?1",
            rusqlite::params![user_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(None);
        }

        let mut sql = format!(
          "SELECT {EVENT_COLUMNS} FROM points_events WHERE user_id = ?"
        );
        let mut params: Vec<Value> = vec![Value::Text(user_id_str)];

        if let Some(kind) = kind_str {
          sql.push_str(" AND kind = ?");
          params.push(Value::Text(kind));
        }
        // Date bounds compare the YYYY-MM-DD prefix of the fixed-width
        // timestamp, inclusive on both ends.
        if let Some(from) = from_str {
          sql.push_str(" AND substr(created_at, 1, 10) >= ?");
          params.push(Value::Text(from));
        }
        if let Some(to) = to_str {
          sql.push_str(" AND substr(created_at, 1, 10) <= ?");
          params.push(Value::Text(to));
        }
        if let Some((ts, id)) = cursor_pos {
          sql.push_str(
            " AND (created_at > ? OR (created_at = ? AND event_id > ?))",
          );
          params.push(Value::Text(ts.clone()));
          params.push(Value::Text(ts));
          params.push(Value::Text(id));
        }

        // One past the page, to learn whether more remain.
        sql.push_str(" ORDER BY created_at ASC, event_id ASC LIMIT ?");
        params.push(Value::Integer((limit + 1) as i64));

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), |row| {
            Ok(RawEvent {
              event_id:        row.get(0)?,
              user_id:         row.get(1)?,
              chore_id:        row.get(2)?,
              kind:            row.get(3)?,
              points:          row.get(4)?,
              created_at:      row.get(5)?,
              idempotency_key: row.get(6)?,
            })
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(rows))
      })
      .await?;

    let raws = raws.ok_or(Error::ProfileNotFound(user_id))?;

    let mut events: Vec<PointsEvent> = raws
      .into_iter()
      .map(RawEvent::into_event)
      .collect::<Result<_>>()?;

    let next_cursor = if events.len() > limit {
      events.truncate(limit);
      events.last().map(Cursor::after)
    } else {
      None
    };

    Ok(EventPage { events, next_cursor })
  }

  async fn daily_summary(&self, user_id: Uuid, days: u32) -> Result<Vec<DayTotal>> {
    query::validate_days(days).map_err(Error::Core)?;

    // Window bounds in UTC, today included.
    let today = Utc::now().date_naive();
    let start = today - Duration::days(i64::from(days) - 1);

    let user_id_str = encode_uuid(user_id);
    let start_str   = encode_date(start);

    let rows: Option<Vec<(String, i64)>> = self
      .conn
      .call(move |conn| {
        let exists: bool = conn
          .query_row(
            "SELECT 1 FROM profiles WHERE user_id = ?1",
            rusqlite::params![user_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(None);
        }

        let mut stmt = conn.prepare(&format!(
          "SELECT substr(created_at, 1, 10) AS day, {DELTA_SUM}
           FROM points_events
           WHERE user_id = ?1 AND substr(created_at, 1, 10) >= ?2
           GROUP BY day"
        ))?;
        let rows = stmt
          .query_map(rusqlite::params![user_id_str, start_str], |row| {
            Ok((row.get(0)?, row.get(1)?))
          })?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(Some(rows))
      })
      .await?;

    let rows = rows.ok_or(Error::ProfileNotFound(user_id))?;

    let mut by_day: HashMap<NaiveDate, i64> = HashMap::new();
    for (day_str, total) in rows {
      by_day.insert(decode_date(&day_str)?, total);
    }

    // Zero-fill the window, oldest first.
    let mut totals = Vec::with_capacity(days as usize);
    for offset in 0..days {
      let date = start + Duration::days(i64::from(offset));
      totals.push(DayTotal {
        date,
        total: by_day.get(&date).copied().unwrap_or(0),
      });
    }

    Ok(totals)
  }

  // ── Reconciliation ────────────────────────────────────────────────────────

  async fn recompute_total(&self, user_id: Uuid) -> Result<i64> {
    let user_id_str = encode_uuid(user_id);

    let total: Option<i64> = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;

        let exists: bool = tx
          .query_row(
            "SELECT 1 FROM profiles WHERE user_id = ?1",
            rusqlite::params![user_id_str],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);

        if !exists {
          return Ok(None);
        }

        let total: i64 = tx.query_row(
          &format!(
            "SELECT COALESCE({DELTA_SUM}, 0) FROM points_events WHERE user_id = ?1"
          ),
          rusqlite::params![user_id_str],
          |r| r.get(0),
        )?;

        tx.execute(
          "UPDATE profiles SET total_points = ?1 WHERE user_id = ?2",
          rusqlite::params![total, user_id_str],
        )?;

        tx.commit()?;
        Ok(Some(total))
      })
      .await?;

    total.ok_or(Error::ProfileNotFound(user_id))
  }
}
