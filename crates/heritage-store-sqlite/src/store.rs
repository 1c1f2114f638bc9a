//! [`SqliteStore`]: the SQLite implementation of [`HeritageStore`].

use std::path::Path;

use chrono::{DateTime, SubsecRound as _, Utc};
use rusqlite::OptionalExtension as _;
use uuid::Uuid;

use heritage_core::{
  site::Site,
  staging::{NewTempSite, Review, Status, TempSite},
  store::{HeritageStore, Upserted},
  user::{NewUser, Role, User},
};

use crate::{
  encode::{
    RawTempSite, RawUser, TEMP_SITE_COLUMNS, decode_site, encode_dt, encode_site,
    encode_uploads, encode_uuid,
  },
  schema::SCHEMA,
  Result,
};

/// Store timestamps at the precision they are persisted with, so a record
/// returned from a write equals the same record read back later.
fn now() -> DateTime<Utc> { Utc::now().trunc_subsecs(6) }

// ─── Store ───────────────────────────────────────────────────────────────────

/// A heritage registry backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn query_temp_site(&self, id: Uuid) -> Result<Option<TempSite>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawTempSite> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              &format!(
                "SELECT {TEMP_SITE_COLUMNS} FROM temp_sites WHERE temp_site_id = ?1"
              ),
              rusqlite::params![id_str],
              RawTempSite::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawTempSite::into_temp_site).transpose()
  }
}

// ─── HeritageStore impl ──────────────────────────────────────────────────────

impl HeritageStore for SqliteStore {
  type Error = crate::Error;

  // ── Canonical sites ───────────────────────────────────────────────────────

  async fn get_site(&self, site_id: &str) -> Result<Option<Site>> {
    let site_id = site_id.to_owned();

    let doc: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc_json FROM sites WHERE site_id = ?1",
              rusqlite::params![site_id],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    doc.as_deref().map(decode_site).transpose()
  }

  async fn list_sites(&self) -> Result<Vec<Site>> {
    let docs: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt =
          conn.prepare("SELECT doc_json FROM sites ORDER BY site_id")?;
        let rows = stmt
          .query_map([], |row| row.get(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    docs.iter().map(|d| decode_site(d)).collect()
  }

  async fn upsert_site(&self, site: Site) -> Result<Upserted> {
    let site_id = site.site_id.clone();
    let doc     = encode_site(&site)?;
    let at_str  = encode_dt(now());

    let existed: bool = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let existed = tx
          .query_row(
            "SELECT 1 FROM sites WHERE site_id = ?1",
            rusqlite::params![site_id],
            |_| Ok(true),
          )
          .optional()?
          .unwrap_or(false);
        tx.execute(
          "INSERT INTO sites (site_id, doc_json, created_at, updated_at)
           VALUES (?1, ?2, ?3, ?3)
           ON CONFLICT(site_id) DO UPDATE SET
             doc_json   = excluded.doc_json,
             updated_at = excluded.updated_at",
          rusqlite::params![site_id, doc, at_str],
        )?;
        tx.commit()?;
        Ok(existed)
      })
      .await?;

    Ok(if existed { Upserted::Replaced } else { Upserted::Inserted })
  }

  // ── Staged proposals ──────────────────────────────────────────────────────

  async fn insert_temp_site(&self, input: NewTempSite) -> Result<TempSite> {
    let created = now();
    let temp = TempSite {
      id:                 Uuid::new_v4(),
      site:               input.site,
      status:             Status::Pending,
      research_expert_id: input.research_expert_id,
      admin_feedback:     None,
      action:             input.action,
      kind:               input.kind,
      expires_at:         None,
      uploads:            input.uploads,
      created_at:         created,
      updated_at:         created,
    };

    let id_str        = encode_uuid(temp.id);
    let site_id       = temp.site.site_id.clone();
    let doc           = encode_site(&temp.site)?;
    let status_str    = temp.status.as_ref().to_owned();
    let action_str    = temp.action.as_ref().to_owned();
    let kind_str      = temp.kind.as_ref().to_owned();
    let submitter_str = encode_uuid(temp.research_expert_id);
    let uploads_str   = encode_uploads(&temp.uploads)?;
    let at_str        = encode_dt(created);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO temp_sites (
             temp_site_id, site_id, doc_json, status, action, kind,
             research_expert_id, uploads, created_at, updated_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
          rusqlite::params![
            id_str,
            site_id,
            doc,
            status_str,
            action_str,
            kind_str,
            submitter_str,
            uploads_str,
            at_str,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(temp)
  }

  async fn get_temp_site(&self, id: Uuid) -> Result<Option<TempSite>> {
    self.query_temp_site(id).await
  }

  async fn list_temp_sites(
    &self,
    research_expert_id: Option<Uuid>,
  ) -> Result<Vec<TempSite>> {
    let submitter_str = research_expert_id.map(encode_uuid);

    let raws: Vec<RawTempSite> = self
      .conn
      .call(move |conn| {
        let rows = if let Some(submitter) = submitter_str {
          let mut stmt = conn.prepare(&format!(
            "SELECT {TEMP_SITE_COLUMNS} FROM temp_sites
             WHERE research_expert_id = ?1
             ORDER BY created_at DESC"
          ))?;
          stmt
            .query_map(rusqlite::params![submitter], RawTempSite::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        } else {
          let mut stmt = conn.prepare(&format!(
            "SELECT {TEMP_SITE_COLUMNS} FROM temp_sites ORDER BY created_at DESC"
          ))?;
          stmt
            .query_map([], RawTempSite::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawTempSite::into_temp_site).collect()
  }

  async fn record_review(&self, id: Uuid, review: Review) -> Result<Option<TempSite>> {
    let id_str      = encode_uuid(id);
    let status_str  = review.status.as_ref().to_owned();
    let feedback    = review.admin_feedback;
    let expires_str = review.expires_at.map(encode_dt);
    let at_str      = encode_dt(now());

    let updated: usize = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE temp_sites
           SET status = ?2, admin_feedback = ?3, expires_at = ?4, updated_at = ?5
           WHERE temp_site_id = ?1",
          rusqlite::params![id_str, status_str, feedback, expires_str, at_str],
        )?)
      })
      .await?;

    if updated == 0 {
      return Ok(None);
    }
    self.query_temp_site(id).await
  }

  async fn delete_expired(&self, now: DateTime<Utc>) -> Result<usize> {
    let now_str = encode_dt(now);

    let deleted = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM temp_sites
           WHERE expires_at IS NOT NULL AND expires_at <= ?1",
          rusqlite::params![now_str],
        )?)
      })
      .await?;

    Ok(deleted)
  }

  // ── Users ─────────────────────────────────────────────────────────────────

  async fn add_user(&self, input: NewUser) -> Result<User> {
    let user = User {
      user_id:    Uuid::new_v4(),
      username:   input.username,
      email:      input.email,
      role:       input.role,
      created_at: now(),
    };

    let id_str   = encode_uuid(user.user_id);
    let username = user.username.clone();
    let email    = user.email.clone();
    let role_str = user.role.as_ref().to_owned();
    let at_str   = encode_dt(user.created_at);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO users (user_id, username, email, role, created_at)
           VALUES (?1, ?2, ?3, ?4, ?5)",
          rusqlite::params![id_str, username, email, role_str, at_str],
        )?;
        Ok(())
      })
      .await?;

    Ok(user)
  }

  async fn get_user(&self, id: Uuid) -> Result<Option<User>> {
    let id_str = encode_uuid(id);

    let raw: Option<RawUser> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, username, email, role, created_at
               FROM users WHERE user_id = ?1",
              rusqlite::params![id_str],
              RawUser::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawUser::into_user).transpose()
  }

  async fn list_users_by_role(&self, role: Role) -> Result<Vec<User>> {
    let role_str = role.as_ref().to_owned();

    let raws: Vec<RawUser> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, username, email, role, created_at
           FROM users WHERE role = ?1 ORDER BY username",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![role_str], RawUser::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawUser::into_user).collect()
  }
}
