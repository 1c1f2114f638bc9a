//! The `HeritageStore` trait: canonical sites, staged proposals and users.
//!
//! The trait is implemented by storage backends (e.g.
//! `heritage-store-sqlite`). Higher layers depend on this abstraction, not on
//! any concrete backend. Every method is a single atomic operation; no
//! transaction spans more than one call.

use std::future::Future;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
  site::Site,
  staging::{NewTempSite, Review, TempSite},
  user::{NewUser, Role, User},
};

/// Result of [`HeritageStore::upsert_site`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Upserted {
  Inserted,
  Replaced,
}

/// Abstraction over a heritage registry backend.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes (e.g. tokio with `axum`).
pub trait HeritageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Canonical sites ───────────────────────────────────────────────────

  /// Retrieve a site by `site_id`. Returns `None` if not found.
  fn get_site<'a>(
    &'a self,
    site_id: &'a str,
  ) -> impl Future<Output = Result<Option<Site>, Self::Error>> + Send + 'a;

  /// List all canonical sites ordered by `site_id`.
  fn list_sites(
    &self,
  ) -> impl Future<Output = Result<Vec<Site>, Self::Error>> + Send + '_;

  /// Insert the site, or replace the stored document with the same
  /// `site_id`.
  fn upsert_site(
    &self,
    site: Site,
  ) -> impl Future<Output = Result<Upserted, Self::Error>> + Send + '_;

  // ── Staged proposals ──────────────────────────────────────────────────

  /// Persist a new proposal with status `pending` and no expiry.
  fn insert_temp_site(
    &self,
    input: NewTempSite,
  ) -> impl Future<Output = Result<TempSite, Self::Error>> + Send + '_;

  /// Retrieve a proposal by id. Returns `None` if not found.
  fn get_temp_site(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<TempSite>, Self::Error>> + Send + '_;

  /// List proposals, newest first, optionally only those of one submitter.
  fn list_temp_sites(
    &self,
    research_expert_id: Option<Uuid>,
  ) -> impl Future<Output = Result<Vec<TempSite>, Self::Error>> + Send + '_;

  /// Write the review fields of a proposal. Returns the updated record, or
  /// `None` if it no longer exists.
  fn record_review(
    &self,
    id: Uuid,
    review: Review,
  ) -> impl Future<Output = Result<Option<TempSite>, Self::Error>> + Send + '_;

  /// Delete every proposal whose `expires_at` is at or before `now`.
  /// Returns the number of deleted records.
  fn delete_expired(
    &self,
    now: DateTime<Utc>,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + '_;

  // ── Users ─────────────────────────────────────────────────────────────

  fn add_user(
    &self,
    input: NewUser,
  ) -> impl Future<Output = Result<User, Self::Error>> + Send + '_;

  /// Retrieve a user by id. Returns `None` if not found.
  fn get_user(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<User>, Self::Error>> + Send + '_;

  fn list_users_by_role(
    &self,
    role: Role,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + '_;
}
