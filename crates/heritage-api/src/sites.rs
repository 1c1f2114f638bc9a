//! Handlers for `/sites` endpoints: read-only access to the canonical store.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/sites` | Ordered by `site_id` |
//! | `GET`  | `/sites/:site_id` | 404 if not found |

use axum::{
  Json,
  extract::{Path, State},
};
use heritage_core::{media::ImageStore, site::Site, store::HeritageStore};

use crate::{AppState, error::ApiError};

/// `GET /sites`
pub async fn list<S, I>(State(state): State<AppState<S, I>>) -> Result<Json<Vec<Site>>, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  let sites = state.store.list_sites().await.map_err(ApiError::store)?;
  Ok(Json(sites))
}

/// `GET /sites/:site_id`
pub async fn get_one<S, I>(
  State(state): State<AppState<S, I>>,
  Path(site_id): Path<String>,
) -> Result<Json<Site>, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  state
    .store
    .get_site(&site_id)
    .await
    .map_err(ApiError::store)?
    .map(Json)
    .ok_or_else(|| ApiError::NotFound(format!("site {site_id} not found")))
}
