//! JSON REST API for the Tally points ledger.
//!
//! Exposes an axum [`Router`] backed by any [`tally_core::store::LedgerStore`].
//! Auth, TLS, and transport concerns are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", tally_api::api_router(store.clone()))
//! ```

pub mod error;
pub mod events;
pub mod profiles;

use std::sync::Arc;

use axum::{
  Router,
  routing::{get, post},
};
use tally_core::store::LedgerStore;

pub use error::ApiError;

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S>(store: Arc<S>) -> Router<()>
where
  S: LedgerStore + Clone + Send + Sync + 'static,
{
  Router::new()
    // Profiles
    .route("/profiles", get(profiles::list::<S>).post(profiles::create::<S>))
    .route("/profiles/{id}", get(profiles::get_one::<S>))
    .route("/profiles/{id}/recompute", post(profiles::recompute::<S>))
    .route("/profiles/{id}/summary", get(profiles::summary::<S>))
    // Events
    .route("/events", get(events::list::<S>).post(events::create::<S>))
    .route("/events/{id}", get(events::get_one::<S>))
    .with_state(store)
}

// ─── Integration tests ────────────────────────────────────────────────────────
