//! Error type for the server's collaborator backends.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  #[error("invalid storage key: {0:?}")]
  InvalidKey(String),

  #[error("mail webhook request failed: {0}")]
  Webhook(#[from] reqwest::Error),

  #[error("mail webhook answered {0}")]
  WebhookStatus(reqwest::StatusCode),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
