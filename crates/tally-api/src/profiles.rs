//! Handlers for `/profiles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/profiles` | All profiles |
//! | `POST` | `/profiles` | Body: [`CreateBody`]; 409 if the id is taken |
//! | `GET`  | `/profiles/{id}` | 404 if not found |
//! | `POST` | `/profiles/{id}/recompute` | Rebuild the total from the event log |
//! | `GET`  | `/profiles/{id}/summary` | Per-day totals; optional `?days=N`, default 7 |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use tally_core::{
  profile::{NewProfile, Profile},
  query::DayTotal,
  store::LedgerStore,
};
use uuid::Uuid;

use crate::error::ApiError;

// ─── List ─────────────────────────────────────────────────────────────────────

/// `GET /profiles`
pub async fn list<S>(
  State(store): State<Arc<S>>,
) -> Result<Json<Vec<Profile>>, ApiError>
where
  S: LedgerStore,
{
  let profiles = store
    .list_profiles()
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(profiles))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// JSON body accepted by `POST /profiles`. The `user_id` comes from the
/// external account system so the profile shares its identity.
#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub user_id:    Uuid,
  pub name:       String,
  pub avatar_url: Option<String>,
}

/// `POST /profiles` — returns 201 + the stored [`Profile`].
pub async fn create<S>(
  State(store): State<Arc<S>>,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
{
  let profile = store
    .create_profile(
      body.user_id,
      NewProfile {
        name:       body.name,
        avatar_url: body.avatar_url,
      },
    )
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, Json(profile)))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /profiles/{id}`
pub async fn get_one<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<Profile>, ApiError>
where
  S: LedgerStore,
{
  let profile = store
    .get_profile(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("profile {id} not found")))?;
  Ok(Json(profile))
}

// ─── Recompute ────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct RecomputeBody {
  pub user_id:      Uuid,
  pub total_points: i64,
}

/// `POST /profiles/{id}/recompute` — the drift-repair path; rebuilds the
/// stored total from the event log and returns it.
pub async fn recompute<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RecomputeBody>, ApiError>
where
  S: LedgerStore,
{
  let total_points = store
    .recompute_total(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(RecomputeBody {
    user_id: id,
    total_points,
  }))
}

// ─── Daily summary ────────────────────────────────────────────────────────────

const DEFAULT_SUMMARY_DAYS: u32 = 7;

#[derive(Debug, Deserialize)]
pub struct SummaryParams {
  pub days: Option<u32>,
}

/// `GET /profiles/{id}/summary[?days=N]` — one total per trailing calendar
/// day (UTC), today included, oldest first.
pub async fn summary<S>(
  State(store): State<Arc<S>>,
  Path(id): Path<Uuid>,
  Query(params): Query<SummaryParams>,
) -> Result<Json<Vec<DayTotal>>, ApiError>
where
  S: LedgerStore,
{
  let days = params.days.unwrap_or(DEFAULT_SUMMARY_DAYS);
  let totals = store
    .daily_summary(id, days)
    .await
    .map_err(ApiError::from_store)?;
  Ok(Json(totals))
}
