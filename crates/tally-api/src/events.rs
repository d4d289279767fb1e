//! Handlers for `/events` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/events` | `?user_id` required; optional `event_type`, `from_date`, `to_date`, `limit`, `cursor` |
//! | `GET`  | `/events/{id}` | Single event |
//! | `POST` | `/events` | Body: [`NewEventBody`]; returns 201 + stored event |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tally_core::{
  event::{EventKind, NewEvent, PointsEvent},
  query::{Cursor, EventFilter},
  store::LedgerStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /events`.
///
/// The chore-status collaborator sends one of these per status transition,
/// with `event_type: "add"` when a chore flips to done and `"subtract"` when
/// it flips back, and an `idempotency_key` identifying the transition.
#[derive(Debug, Deserialize)]
pub struct NewEventBody {
  pub user_id:         Uuid,
  pub event_type:      EventKind,
  /// Positive magnitude; the direction lives in `event_type`.
  pub points:          i64,
  pub chore_id:        Option<Uuid>,
  pub idempotency_key: Option<String>,
}

impl From<NewEventBody> for NewEvent {
  fn from(b: NewEventBody) -> Self {
    NewEvent {
      user_id:         b.user_id,
      kind:            b.event_type,
      points:          b.points,
      chore_id:        b.chore_id,
      idempotency_key: b.idempotency_key,
    }
  }
}

/// `POST /events` — returns 201 + the stored [`PointsEvent`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<NewEventBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let event = store
    .append_event(NewEvent::from(body))
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(event)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /events/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<PointsEvent>, ApiError>
where
  S: LedgerStore,
{
  let event = store
    .get_event(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("event {id} not found")))?;
  Ok(Json(event))
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  /// Required: the user whose events to return.
  pub user_id:    Uuid,
  /// If set, restrict to events of this kind (`add` or `subtract`).
  pub event_type: Option<EventKind>,
  /// Inclusive `YYYY-MM-DD` lower bound on the event date (UTC).
  pub from_date:  Option<NaiveDate>,
  /// Inclusive `YYYY-MM-DD` upper bound on the event date (UTC).
  pub to_date:    Option<NaiveDate>,
  /// Page size, 1–100. Defaults to 20.
  pub limit:      Option<usize>,
  /// Opaque token from a previous page's `next_cursor`.
  pub cursor:     Option<String>,
}

/// One page of a user's event log.
#[derive(Debug, Serialize)]
pub struct EventPageBody {
  pub events:      Vec<PointsEvent>,
  /// Token for the next page; omitted once the log is exhausted.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub next_cursor: Option<String>,
}

/// `GET /events?user_id=<id>[&event_type=...][&from_date=...][&to_date=...][&limit=...][&cursor=...]`
pub async fn list<S>(
  State(store): State<Arc<S>>,
  Query(params): Query<ListParams>,
) -> Result<Json<EventPageBody>, ApiError>
where
  S: LedgerStore,
{
  let cursor = params
    .cursor
    .as_deref()
    .map(Cursor::decode)
    .transpose()
    .map_err(ApiError::from_store)?;

  let filter = EventFilter {
    kind:      params.event_type,
    from_date: params.from_date,
    to_date:   params.to_date,
    limit:     params.limit,
    cursor,
  };

  let page = store
    .list_events(params.user_id, &filter)
    .await
    .map_err(ApiError::from_store)?;

  Ok(Json(EventPageBody {
    events:      page.events,
    next_cursor: page.next_cursor.map(|c| c.encode()),
  }))
}
