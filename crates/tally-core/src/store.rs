//! The `LedgerStore` trait — the narrow data-access contract the ledger
//! consumes.
//!
//! The trait is implemented by storage backends (e.g. `tally-store-sqlite`).
//! The HTTP layer (`tally-api`) depends on this abstraction, not on any
//! concrete backend.

use std::future::Future;

use uuid::Uuid;

use crate::{
  event::{NewEvent, PointsEvent},
  profile::{NewProfile, Profile},
  query::{DayTotal, EventFilter, EventPage},
};

/// Abstraction over a points-ledger backend.
///
/// The event log is strictly append-only; the only mutation a backend ever
/// performs on a profile's `total_points` is the atomic delta applied
/// alongside an event insert (plus the explicit overwrite in
/// [`recompute_total`](Self::recompute_total)).
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`). The associated
/// error must convert into [`crate::Error`] so callers can map it onto the
/// ledger's error taxonomy without knowing the backend.
pub trait LedgerStore: Send + Sync {
  type Error: std::error::Error + Into<crate::Error> + Send + Sync + 'static;

  // ── Profiles ──────────────────────────────────────────────────────────

  /// Create and persist a profile for an externally-issued user id, with
  /// `total_points` starting at 0.
  ///
  /// Returns an error if the id is already taken.
  fn create_profile(
    &self,
    user_id: Uuid,
    input: NewProfile,
  ) -> impl Future<Output = Result<Profile, Self::Error>> + Send + '_;

  /// Retrieve a profile by user id. Returns `None` if not found.
  fn get_profile(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<Option<Profile>, Self::Error>> + Send + '_;

  /// List all profiles.
  fn list_profiles(
    &self,
  ) -> impl Future<Output = Result<Vec<Profile>, Self::Error>> + Send + '_;

  // ── Events — append-only writes ───────────────────────────────────────

  /// Append one event and apply its signed delta to the user's
  /// `total_points`, atomically: a reader never observes one effect without
  /// the other, and a failure leaves neither applied.
  ///
  /// Fails if the user has no profile, if the magnitude is not strictly
  /// positive, or if the idempotency key was already used.
  fn append_event(
    &self,
    input: NewEvent,
  ) -> impl Future<Output = Result<PointsEvent, Self::Error>> + Send + '_;

  // ── Reads ─────────────────────────────────────────────────────────────

  /// Retrieve a single event by id. Returns `None` if not found.
  fn get_event(
    &self,
    event_id: Uuid,
  ) -> impl Future<Output = Result<Option<PointsEvent>, Self::Error>> + Send + '_;

  /// Return one page of the user's events in ascending
  /// `(created_at, event_id)` order, applying `filter`. Pure read; fails if
  /// the user has no profile.
  ///
  /// Following `next_cursor` until it is absent yields exactly the full
  /// event set, with no overlap or gap.
  fn list_events<'a>(
    &'a self,
    user_id: Uuid,
    filter: &'a EventFilter,
  ) -> impl Future<Output = Result<EventPage, Self::Error>> + Send + 'a;

  /// One signed total per calendar day (UTC) for the trailing `days` days,
  /// today included; days without events report 0. Ordered oldest to
  /// newest.
  fn daily_summary(
    &self,
    user_id: Uuid,
    days: u32,
  ) -> impl Future<Output = Result<Vec<DayTotal>, Self::Error>> + Send + '_;

  // ── Reconciliation ────────────────────────────────────────────────────

  /// Recompute `total_points` from the full event log and overwrite the
  /// stored aggregate; returns the recomputed value. Idempotent — the
  /// designated repair path for detected drift, never invoked
  /// automatically.
  fn recompute_total(
    &self,
    user_id: Uuid,
  ) -> impl Future<Output = Result<i64, Self::Error>> + Send + '_;
}
