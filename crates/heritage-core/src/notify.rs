//! Notification events and the `Mailer` trait.
//!
//! The workflow never sends mail itself. It emits a [`Notification`] after
//! the state change is persisted; a separate dispatcher resolves recipients
//! and hands rendered [`Email`]s to a [`Mailer`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::staging::{Action, EntryKind, Status};

/// Something reviewers or submitters should hear about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum Notification {
  /// A research expert staged a new proposal; goes to every admin.
  SubmissionReceived {
    temp_site_id:       Uuid,
    research_expert_id: Uuid,
    kind:               EntryKind,
    action:             Action,
    /// The submitted `data`, as received.
    payload:            Value,
  },
  /// A reviewer decided on a proposal; goes to its submitter.
  DecisionRecorded {
    temp_site_id:       Uuid,
    research_expert_id: Uuid,
    site_id:            String,
    site_name:          String,
    status:             Status,
    feedback:           Option<String>,
  },
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Email {
  pub to:      String,
  pub subject: String,
  pub html:    String,
}

/// Abstraction over a transactional mail sender.
pub trait Mailer: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn send(
    &self,
    email: Email,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
