//! Error types for `heritage-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("site not found: {0}")]
  SiteNotFound(String),

  #[error("invalid submission: {0}")]
  Validation(String),

  #[error("inscription {inscription_id:?} already exists on site {site_id:?}")]
  DuplicateInscription {
    site_id:        String,
    inscription_id: String,
  },

  /// The record was rejected and its uploaded images deleted; publishing it
  /// would leave dead image links on the canonical site.
  #[error("research request {0} was rejected and its uploaded images purged; resubmit it instead")]
  UploadsPurged(Uuid),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// True when the error was caused by the caller's input rather than by
  /// missing records or internal failures.
  pub fn is_validation(&self) -> bool {
    matches!(self, Self::Validation(_) | Self::DuplicateInscription { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
