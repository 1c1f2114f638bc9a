//! Users, as far as the review workflow needs them: who to notify, and how
//! to address them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Role {
  User,
  ResearchExpert,
  Admin,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
  pub user_id:    Uuid,
  pub username:   String,
  pub email:      String,
  pub role:       Role,
  pub created_at: DateTime<Utc>,
}

/// Input to [`crate::store::HeritageStore::add_user`].
#[derive(Debug, Clone)]
pub struct NewUser {
  pub username: String,
  pub email:    String,
  pub role:     Role,
}

/// The public projection of a user attached to a staged record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submitter {
  pub user_id:  Uuid,
  pub username: String,
  pub email:    String,
}

impl From<User> for Submitter {
  fn from(u: User) -> Self {
    Self {
      user_id:  u.user_id,
      username: u.username,
      email:    u.email,
    }
  }
}
