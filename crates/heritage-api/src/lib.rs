//! JSON REST API for the heritage registry.
//!
//! Exposes an axum [`Router`] for the moderated-submission workflow, backed by
//! any [`HeritageStore`] and [`ImageStore`]. Auth, TLS, and transport concerns
//! are the caller's responsibility; the API trusts the `researchExpertId` it
//! is given.
//!
//! # Mounting
//!
//! ```rust,ignore
//! let (notifier, rx) = heritage_api::notifier::channel();
//! let state = AppState::new(store, images, notifier);
//! .nest("/api", heritage_api::api_router(state))
//! ```

pub mod error;
pub mod notifier;
pub mod requests;
pub mod review;
pub mod sites;
pub mod submission;

#[cfg(test)]
mod testing;

use std::sync::Arc;

use axum::{Router, routing::get};
use heritage_core::{media::ImageStore, store::HeritageStore};

pub use error::ApiError;
pub use notifier::Notifier;

pub type Result<T, E = ApiError> = std::result::Result<T, E>;

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all handlers. The submission and review
/// services are implemented as methods on it.
pub struct AppState<S, I> {
  pub store:    Arc<S>,
  pub images:   Arc<I>,
  pub notifier: Notifier,
}

impl<S, I> AppState<S, I> {
  pub fn new(store: Arc<S>, images: Arc<I>, notifier: Notifier) -> Self {
    Self { store, images, notifier }
  }
}

impl<S, I> Clone for AppState<S, I> {
  fn clone(&self) -> Self {
    Self {
      store:    self.store.clone(),
      images:   self.images.clone(),
      notifier: self.notifier.clone(),
    }
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, I>(state: AppState<S, I>) -> Router<()>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  Router::new()
    // Staged proposals
    .route(
      "/research-requests",
      get(requests::list::<S, I>).post(requests::create::<S, I>),
    )
    .route(
      "/research-requests/{id}",
      get(requests::get_one::<S, I>).put(requests::decide::<S, I>),
    )
    .route("/research-requests/{id}/diff", get(requests::diff::<S, I>))
    // Canonical sites
    .route("/sites", get(sites::list::<S, I>))
    .route("/sites/{site_id}", get(sites::get_one::<S, I>))
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
