//! Integration tests for `SqliteStore` against an in-memory database.

use std::sync::Arc;

use chrono::{Duration, NaiveDate, Utc};
use tally_core::{
  event::{EventKind, NewEvent, PointsEvent},
  profile::NewProfile,
  query::EventFilter,
  store::LedgerStore,
};
use uuid::Uuid;

use crate::SqliteStore;

async fn store() -> SqliteStore {
  SqliteStore::open_in_memory()
    .await
    .expect("in-memory store")
}

async fn member(s: &SqliteStore, name: &str) -> Uuid {
  let user_id = Uuid::new_v4();
  s.create_profile(
    user_id,
    NewProfile {
      name:       name.into(),
      avatar_url: None,
    },
  )
  .await
  .unwrap();
  user_id
}

/// An event with a caller-controlled timestamp, for planting history on
/// specific calendar dates via `apply_event`.
fn event_on(user_id: Uuid, kind: EventKind, points: i64, date: NaiveDate) -> PointsEvent {
  PointsEvent {
    event_id: Uuid::new_v4(),
    user_id,
    chore_id: None,
    kind,
    points,
    created_at: date.and_hms_opt(12, 0, 0).unwrap().and_utc(),
    idempotency_key: None,
  }
}

fn date(s: &str) -> NaiveDate { s.parse().expect("test date") }

// ─── Profiles ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn create_and_get_profile() {
  let s = store().await;

  let user_id = Uuid::new_v4();
  let profile = s
    .create_profile(
      user_id,
      NewProfile {
        name:       "Alice".into(),
        avatar_url: Some("https://example.com/alice.png".into()),
      },
    )
    .await
    .unwrap();
  assert_eq!(profile.user_id, user_id);
  assert_eq!(profile.total_points, 0);

  let fetched = s.get_profile(user_id).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, user_id);
  assert_eq!(fetched.name, "Alice");
  assert_eq!(
    fetched.avatar_url.as_deref(),
    Some("https://example.com/alice.png")
  );
  assert_eq!(fetched.total_points, 0);
}

#[tokio::test]
async fn get_profile_missing_returns_none() {
  let s = store().await;
  let result = s.get_profile(Uuid::new_v4()).await.unwrap();
  assert!(result.is_none());
}

#[tokio::test]
async fn create_profile_with_taken_id_errors() {
  let s = store().await;
  let user_id = member(&s, "Alice").await;

  let err = s
    .create_profile(
      user_id,
      NewProfile {
        name:       "Impostor".into(),
        avatar_url: None,
      },
    )
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ProfileExists(id) if id == user_id));

  // The original profile is untouched.
  let fetched = s.get_profile(user_id).await.unwrap().unwrap();
  assert_eq!(fetched.name, "Alice");
}

#[tokio::test]
async fn list_profiles_returns_all() {
  let s = store().await;
  member(&s, "Alice").await;
  member(&s, "Bob").await;
  member(&s, "Carol").await;

  let all = s.list_profiles().await.unwrap();
  assert_eq!(all.len(), 3);
}

// ─── Appending ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn append_updates_total_in_lockstep() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  s.append_event(NewEvent::new(user, EventKind::Add, 5))
    .await
    .unwrap();
  s.append_event(NewEvent::new(user, EventKind::Add, 10))
    .await
    .unwrap();
  s.append_event(NewEvent::new(user, EventKind::Subtract, 3))
    .await
    .unwrap();

  let profile = s.get_profile(user).await.unwrap().unwrap();
  assert_eq!(profile.total_points, 12);

  let page = s
    .list_events(user, &EventFilter::default())
    .await
    .unwrap();
  assert_eq!(page.events.len(), 3);
  assert_eq!(page.events.iter().map(|e| e.delta()).sum::<i64>(), 12);
}

#[tokio::test]
async fn append_for_unknown_user_errors() {
  let s = store().await;
  let ghost = Uuid::new_v4();

  let err = s
    .append_event(NewEvent::new(ghost, EventKind::Add, 5))
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ProfileNotFound(id) if id == ghost));
}

#[tokio::test]
async fn append_rejects_nonpositive_magnitudes() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  for points in [0, -7] {
    let err = s
      .append_event(NewEvent::new(user, EventKind::Add, points))
      .await
      .unwrap_err();
    assert!(matches!(
      err,
      crate::Error::Core(tally_core::Error::InvalidPoints(_))
    ));
  }

  // Nothing was applied.
  let profile = s.get_profile(user).await.unwrap().unwrap();
  assert_eq!(profile.total_points, 0);
}

#[tokio::test]
async fn event_fields_roundtrip() {
  let s = store().await;
  let user = member(&s, "Alice").await;
  let chore = Uuid::new_v4();

  let mut input = NewEvent::new(user, EventKind::Subtract, 4);
  input.chore_id = Some(chore);
  input.idempotency_key = Some(format!("{chore}:undone:1"));

  let appended = s.append_event(input).await.unwrap();

  let fetched = s.get_event(appended.event_id).await.unwrap().unwrap();
  assert_eq!(fetched.user_id, user);
  assert_eq!(fetched.chore_id, Some(chore));
  assert_eq!(fetched.kind, EventKind::Subtract);
  assert_eq!(fetched.points, 4);
  assert_eq!(fetched.delta(), -4);
  assert_eq!(
    fetched.idempotency_key.as_deref(),
    Some(format!("{chore}:undone:1").as_str())
  );
}

#[tokio::test]
async fn append_returns_the_stored_timestamp() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  let appended = s
    .append_event(NewEvent::new(user, EventKind::Add, 5))
    .await
    .unwrap();

  // The returned `created_at` is the one assigned at insertion; it matches
  // the stored row exactly, including sub-second precision.
  let fetched = s.get_event(appended.event_id).await.unwrap().unwrap();
  assert_eq!(fetched.created_at, appended.created_at);
}

#[tokio::test]
async fn get_event_missing_returns_none() {
  let s = store().await;
  let result = s.get_event(Uuid::new_v4()).await.unwrap();
  assert!(result.is_none());
}

// ─── Idempotency keys ────────────────────────────────────────────────────────

#[tokio::test]
async fn duplicate_idempotency_key_conflicts_and_applies_nothing() {
  let s = store().await;
  let user = member(&s, "Alice").await;
  let chore = Uuid::new_v4();

  let mut first = NewEvent::new(user, EventKind::Add, 5);
  first.chore_id = Some(chore);
  first.idempotency_key = Some(format!("{chore}:done:1"));
  s.append_event(first.clone()).await.unwrap();

  // Replay of the same chore transition.
  let err = s.append_event(first).await.unwrap_err();
  assert!(matches!(err, crate::Error::DuplicateEvent(_)));

  // Awarded exactly once.
  let profile = s.get_profile(user).await.unwrap().unwrap();
  assert_eq!(profile.total_points, 5);
  let page = s.list_events(user, &EventFilter::default()).await.unwrap();
  assert_eq!(page.events.len(), 1);
}

#[tokio::test]
async fn distinct_keys_and_absent_keys_do_not_conflict() {
  let s = store().await;
  let user = member(&s, "Alice").await;
  let chore = Uuid::new_v4();

  let mut done = NewEvent::new(user, EventKind::Add, 5);
  done.idempotency_key = Some(format!("{chore}:done:1"));
  s.append_event(done).await.unwrap();

  let mut undone = NewEvent::new(user, EventKind::Subtract, 5);
  undone.idempotency_key = Some(format!("{chore}:undone:1"));
  s.append_event(undone).await.unwrap();

  // Manual adjustments carry no key; several may coexist.
  s.append_event(NewEvent::new(user, EventKind::Add, 2))
    .await
    .unwrap();
  s.append_event(NewEvent::new(user, EventKind::Add, 2))
    .await
    .unwrap();

  let profile = s.get_profile(user).await.unwrap().unwrap();
  assert_eq!(profile.total_points, 4);
}

// ─── Reconciliation ──────────────────────────────────────────────────────────

#[tokio::test]
async fn recompute_matches_stored_total() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  for (kind, points) in [
    (EventKind::Add, 5),
    (EventKind::Add, 12),
    (EventKind::Subtract, 4),
    (EventKind::Add, 1),
    (EventKind::Subtract, 9),
  ] {
    s.append_event(NewEvent::new(user, kind, points))
      .await
      .unwrap();
  }

  let stored = s.get_profile(user).await.unwrap().unwrap().total_points;
  let recomputed = s.recompute_total(user).await.unwrap();
  assert_eq!(recomputed, 5);
  assert_eq!(recomputed, stored);
}

#[tokio::test]
async fn recompute_is_idempotent() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  s.append_event(NewEvent::new(user, EventKind::Add, 7))
    .await
    .unwrap();

  let first = s.recompute_total(user).await.unwrap();
  let second = s.recompute_total(user).await.unwrap();
  assert_eq!(first, 7);
  assert_eq!(first, second);
}

#[tokio::test]
async fn recompute_with_no_events_yields_zero() {
  let s = store().await;
  let user = member(&s, "Alice").await;
  assert_eq!(s.recompute_total(user).await.unwrap(), 0);
}

#[tokio::test]
async fn recompute_for_unknown_user_errors() {
  let s = store().await;
  let err = s.recompute_total(Uuid::new_v4()).await.unwrap_err();
  assert!(matches!(err, crate::Error::ProfileNotFound(_)));
}

// ─── Pagination ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn pagination_concatenates_to_full_ordered_set() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  let mut appended = Vec::new();
  for _ in 0..25 {
    let event = s
      .append_event(NewEvent::new(user, EventKind::Add, 1))
      .await
      .unwrap();
    appended.push(event.event_id);
  }

  let mut filter = EventFilter {
    limit: Some(10),
    ..Default::default()
  };
  let mut collected = Vec::new();
  let mut pages = 0;
  loop {
    let page = s.list_events(user, &filter).await.unwrap();
    pages += 1;
    collected.extend(page.events);
    match page.next_cursor {
      Some(cursor) => filter.cursor = Some(cursor),
      None => break,
    }
  }

  assert_eq!(pages, 3);
  assert_eq!(collected.len(), 25);

  // Ascending (created_at, event_id), no overlap or gap.
  for window in collected.windows(2) {
    let key = |e: &tally_core::event::PointsEvent| (e.created_at, e.event_id);
    assert!(key(&window[0]) < key(&window[1]));
  }
  let mut ids: Vec<Uuid> = collected.iter().map(|e| e.event_id).collect();
  ids.sort();
  ids.dedup();
  assert_eq!(ids.len(), 25);
  appended.sort();
  assert_eq!(ids, appended);
}

#[tokio::test]
async fn max_limit_pages_have_no_overlap_or_gap() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  for _ in 0..250 {
    s.append_event(NewEvent::new(user, EventKind::Add, 1))
      .await
      .unwrap();
  }

  let mut filter = EventFilter {
    limit: Some(100),
    ..Default::default()
  };
  let mut sizes = Vec::new();
  loop {
    let page = s.list_events(user, &filter).await.unwrap();
    sizes.push(page.events.len());
    match page.next_cursor {
      Some(cursor) => filter.cursor = Some(cursor),
      None => break,
    }
  }

  assert_eq!(sizes, vec![100, 100, 50]);
}

#[tokio::test]
async fn default_limit_is_twenty() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  for _ in 0..21 {
    s.append_event(NewEvent::new(user, EventKind::Add, 1))
      .await
      .unwrap();
  }

  let page = s.list_events(user, &EventFilter::default()).await.unwrap();
  assert_eq!(page.events.len(), 20);
  assert!(page.next_cursor.is_some());
}

#[tokio::test]
async fn filter_validation_runs_before_storage() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  for limit in [0, 101] {
    let filter = EventFilter {
      limit: Some(limit),
      ..Default::default()
    };
    let err = s.list_events(user, &filter).await.unwrap_err();
    assert!(matches!(
      err,
      crate::Error::Core(tally_core::Error::InvalidLimit(_))
    ));
  }
}

// ─── Filters ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn kind_filter_restricts_events() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  s.append_event(NewEvent::new(user, EventKind::Add, 5))
    .await
    .unwrap();
  s.append_event(NewEvent::new(user, EventKind::Subtract, 2))
    .await
    .unwrap();
  s.append_event(NewEvent::new(user, EventKind::Add, 3))
    .await
    .unwrap();

  let filter = EventFilter {
    kind: Some(EventKind::Subtract),
    ..Default::default()
  };
  let page = s.list_events(user, &filter).await.unwrap();
  assert_eq!(page.events.len(), 1);
  assert_eq!(page.events[0].kind, EventKind::Subtract);
}

#[tokio::test]
async fn date_range_bounds_are_inclusive() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  let jan_15 = s
    .apply_event(event_on(user, EventKind::Add, 1, date("2024-01-15")))
    .await
    .unwrap();
  let jan_31 = s
    .apply_event(event_on(user, EventKind::Add, 2, date("2024-01-31")))
    .await
    .unwrap();
  let feb_1 = s
    .apply_event(event_on(user, EventKind::Add, 4, date("2024-02-01")))
    .await
    .unwrap();

  let filter = EventFilter {
    from_date: Some(date("2024-01-01")),
    to_date:   Some(date("2024-01-31")),
    ..Default::default()
  };
  let page = s.list_events(user, &filter).await.unwrap();

  let ids: Vec<Uuid> = page.events.iter().map(|e| e.event_id).collect();
  assert_eq!(ids, vec![jan_15.event_id, jan_31.event_id]);
  assert!(!ids.contains(&feb_1.event_id));
}

#[tokio::test]
async fn events_outside_users_log_are_invisible() {
  let s = store().await;
  let alice = member(&s, "Alice").await;
  let bob = member(&s, "Bob").await;

  s.append_event(NewEvent::new(alice, EventKind::Add, 5))
    .await
    .unwrap();
  s.append_event(NewEvent::new(bob, EventKind::Add, 9))
    .await
    .unwrap();

  let page = s.list_events(alice, &EventFilter::default()).await.unwrap();
  assert_eq!(page.events.len(), 1);
  assert_eq!(page.events[0].user_id, alice);

  // Aggregates are independent.
  assert_eq!(s.get_profile(alice).await.unwrap().unwrap().total_points, 5);
  assert_eq!(s.get_profile(bob).await.unwrap().unwrap().total_points, 9);
}

#[tokio::test]
async fn list_events_for_unknown_user_errors() {
  let s = store().await;

  let ghost = Uuid::new_v4();
  let err = s
    .list_events(ghost, &EventFilter::default())
    .await
    .unwrap_err();
  assert!(matches!(err, crate::Error::ProfileNotFound(id) if id == ghost));
}

// ─── Daily summary ───────────────────────────────────────────────────────────

#[tokio::test]
async fn daily_summary_zero_fills_and_orders_oldest_first() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  let today = Utc::now().date_naive();
  let two_days_ago = today - Duration::days(2);

  s.append_event(NewEvent::new(user, EventKind::Add, 5))
    .await
    .unwrap();
  s.append_event(NewEvent::new(user, EventKind::Subtract, 1))
    .await
    .unwrap();

  s.apply_event(event_on(user, EventKind::Add, 7, two_days_ago))
    .await
    .unwrap();

  let totals = s.daily_summary(user, 3).await.unwrap();
  assert_eq!(totals.len(), 3);
  assert_eq!(totals[0].date, two_days_ago);
  assert_eq!(totals[0].total, 7);
  assert_eq!(totals[1].total, 0);
  assert_eq!(totals[2].date, today);
  assert_eq!(totals[2].total, 4);
}

#[tokio::test]
async fn daily_summary_excludes_events_before_window() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  s.apply_event(event_on(user, EventKind::Add, 50, date("2020-01-01")))
    .await
    .unwrap();

  let totals = s.daily_summary(user, 2).await.unwrap();
  assert_eq!(totals.len(), 2);
  assert!(totals.iter().all(|t| t.total == 0));
}

#[tokio::test]
async fn daily_summary_validates_days() {
  let s = store().await;
  let user = member(&s, "Alice").await;

  for days in [0, 366] {
    let err = s.daily_summary(user, days).await.unwrap_err();
    assert!(matches!(
      err,
      crate::Error::Core(tally_core::Error::InvalidDays(_))
    ));
  }
}

#[tokio::test]
async fn daily_summary_for_unknown_user_errors() {
  let s = store().await;
  let err = s.daily_summary(Uuid::new_v4(), 7).await.unwrap_err();
  assert!(matches!(err, crate::Error::ProfileNotFound(_)));
}

// ─── Concurrency ─────────────────────────────────────────────────────────────

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_appends_lose_no_updates() {
  let s = Arc::new(store().await);
  let user = member(&s, "Alice").await;

  let mut handles = Vec::new();
  for _ in 0..20 {
    let s = Arc::clone(&s);
    handles.push(tokio::spawn(async move {
      s.append_event(NewEvent::new(user, EventKind::Add, 5)).await
    }));
  }
  for handle in handles {
    handle.await.unwrap().unwrap();
  }

  let profile = s.get_profile(user).await.unwrap().unwrap();
  assert_eq!(profile.total_points, 100);

  // Recomputing from the log reproduces the stored aggregate exactly.
  assert_eq!(s.recompute_total(user).await.unwrap(), 100);
}
