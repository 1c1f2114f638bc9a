//! Encoding and decoding helpers between Rust domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings (microseconds, `Z`)
//! so that SQL string comparison orders them correctly. Documents and upload
//! lists are compact JSON. UUIDs are hyphenated lowercase strings. Enum tags
//! use their `strum` snake_case names.

use std::str::FromStr;

use chrono::{DateTime, SecondsFormat, Utc};
use heritage_core::{
  site::Site,
  staging::{ImageRef, TempSite},
  user::User,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

// ─── DateTime<Utc> ────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

// ─── Tags ─────────────────────────────────────────────────────────────────────

pub fn decode_tag<T: FromStr>(column: &'static str, s: &str) -> Result<T> {
  s.parse().map_err(|_| Error::UnknownTag {
    column,
    value: s.to_owned(),
  })
}

// ─── Documents ────────────────────────────────────────────────────────────────

pub fn encode_site(site: &Site) -> Result<String> {
  Ok(serde_json::to_string(site)?)
}

pub fn decode_site(s: &str) -> Result<Site> { Ok(serde_json::from_str(s)?) }

pub fn encode_uploads(uploads: &[ImageRef]) -> Result<String> {
  Ok(serde_json::to_string(uploads)?)
}

pub fn decode_uploads(s: &str) -> Result<Vec<ImageRef>> {
  Ok(serde_json::from_str(s)?)
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Column list matching [`RawTempSite::from_row`].
pub const TEMP_SITE_COLUMNS: &str = "temp_site_id, doc_json, status, action, kind, \
   research_expert_id, admin_feedback, expires_at, uploads, created_at, updated_at";

/// Raw strings read directly from a `temp_sites` row.
pub struct RawTempSite {
  pub temp_site_id:       String,
  pub doc_json:           String,
  pub status:             String,
  pub action:             String,
  pub kind:               String,
  pub research_expert_id: String,
  pub admin_feedback:     Option<String>,
  pub expires_at:         Option<String>,
  pub uploads:            String,
  pub created_at:         String,
  pub updated_at:         String,
}

impl RawTempSite {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      temp_site_id:       row.get(0)?,
      doc_json:           row.get(1)?,
      status:             row.get(2)?,
      action:             row.get(3)?,
      kind:               row.get(4)?,
      research_expert_id: row.get(5)?,
      admin_feedback:     row.get(6)?,
      expires_at:         row.get(7)?,
      uploads:            row.get(8)?,
      created_at:         row.get(9)?,
      updated_at:         row.get(10)?,
    })
  }

  pub fn into_temp_site(self) -> Result<TempSite> {
    Ok(TempSite {
      id:                 decode_uuid(&self.temp_site_id)?,
      site:               decode_site(&self.doc_json)?,
      status:             decode_tag("status", &self.status)?,
      research_expert_id: decode_uuid(&self.research_expert_id)?,
      admin_feedback:     self.admin_feedback,
      action:             decode_tag("action", &self.action)?,
      kind:               decode_tag("kind", &self.kind)?,
      expires_at:         self.expires_at.as_deref().map(decode_dt).transpose()?,
      uploads:            decode_uploads(&self.uploads)?,
      created_at:         decode_dt(&self.created_at)?,
      updated_at:         decode_dt(&self.updated_at)?,
    })
  }
}

/// Raw strings read directly from a `users` row.
pub struct RawUser {
  pub user_id:    String,
  pub username:   String,
  pub email:      String,
  pub role:       String,
  pub created_at: String,
}

impl RawUser {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      user_id:    row.get(0)?,
      username:   row.get(1)?,
      email:      row.get(2)?,
      role:       row.get(3)?,
      created_at: row.get(4)?,
    })
  }

  pub fn into_user(self) -> Result<User> {
    Ok(User {
      user_id:    decode_uuid(&self.user_id)?,
      username:   self.username,
      email:      self.email,
      role:       decode_tag("role", &self.role)?,
      created_at: decode_dt(&self.created_at)?,
    })
  }
}
