//! Server wiring for the heritage registry.
//!
//! Combines the JSON API from `heritage-api` with the local image directory,
//! request tracing, and the background tasks (notification dispatcher and
//! expiry janitor) into one runnable service.

pub mod config;
pub mod error;
pub mod images;
pub mod janitor;
pub mod mail;

pub use config::ServerConfig;
pub use error::Error;

use axum::{Router, extract::DefaultBodyLimit};
use heritage_api::{AppState, api_router};
use heritage_core::{media::ImageStore, store::HeritageStore};
use tower_http::{services::ServeDir, trace::TraceLayer};

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the complete HTTP application: the API at the root and uploaded
/// images under `/media`.
pub fn app<S, I>(state: AppState<S, I>, config: &ServerConfig) -> Router
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  Router::new()
    .merge(api_router(state))
    .nest_service("/media", ServeDir::new(&config.media_dir))
    .layer(DefaultBodyLimit::max(config.max_upload_bytes))
    .layer(
      TraceLayer::new_for_http().make_span_with(|request: &axum::http::Request<_>| {
        tracing::info_span!(
          "request",
          method = %request.method(),
          uri = %request.uri(),
        )
      }),
    )
}

// ─── Integration tests ────────────────────────────────────────────────────────
