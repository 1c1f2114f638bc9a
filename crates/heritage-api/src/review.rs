//! Review service: list, inspect and decide staged records.

use std::collections::HashMap;

use chrono::Utc;
use heritage_core::{
  diff::{DiffView, diff_staged},
  media::ImageStore,
  notify::Notification,
  site::Site,
  staging::{Action, Decision, TempSite},
  store::HeritageStore,
  user::Submitter,
};
use serde::Serialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{AppState, Result, error::ApiError};

/// A staged record as listed for reviewers. Modify proposals carry the
/// canonical record they would replace.
#[derive(Debug, Clone, Serialize)]
pub struct ListedRequest {
  #[serde(flatten)]
  pub temp_site:     TempSite,
  #[serde(rename = "originalSite", skip_serializing_if = "Option::is_none")]
  pub original_site: Option<Site>,
}

/// One staged record with its submitter populated.
#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
  #[serde(flatten)]
  pub temp_site: TempSite,
  pub submitter: Option<Submitter>,
}

fn request_not_found(id: Uuid) -> ApiError {
  ApiError::NotFound(format!("research request {id} not found"))
}

impl<S, I> AppState<S, I>
where
  S: HeritageStore,
  I: ImageStore,
{
  /// Staged records, newest first, optionally only one submitter's.
  pub async fn list_requests(
    &self,
    research_expert_id: Option<Uuid>,
  ) -> Result<Vec<ListedRequest>> {
    let temp_sites = self
      .store
      .list_temp_sites(research_expert_id)
      .await
      .map_err(ApiError::store)?;

    let mut originals: HashMap<String, Option<Site>> = HashMap::new();
    let mut listed = Vec::with_capacity(temp_sites.len());
    for temp_site in temp_sites {
      let original_site = match temp_site.action {
        Action::Add => None,
        Action::Modify => {
          let site_id = &temp_site.site.site_id;
          if !originals.contains_key(site_id) {
            let site = self.store.get_site(site_id).await.map_err(ApiError::store)?;
            originals.insert(site_id.clone(), site);
          }
          originals.get(site_id).cloned().flatten()
        }
      };
      listed.push(ListedRequest { temp_site, original_site });
    }
    Ok(listed)
  }

  pub async fn get_request(&self, id: Uuid) -> Result<RequestDetail> {
    let temp_site = self.fetch(id).await?;
    let submitter = self
      .store
      .get_user(temp_site.research_expert_id)
      .await
      .map_err(ApiError::store)?
      .map(Submitter::from);
    Ok(RequestDetail { temp_site, submitter })
  }

  /// Field marks for one staged record against the current canonical site.
  pub async fn diff_request(&self, id: Uuid) -> Result<DiffView> {
    let temp_site = self.fetch(id).await?;
    let original = match temp_site.action {
      Action::Add => None,
      Action::Modify => self
        .store
        .get_site(&temp_site.site.site_id)
        .await
        .map_err(ApiError::store)?,
    };
    Ok(diff_staged(&temp_site, original.as_ref())?)
  }

  /// Apply a reviewer decision.
  ///
  /// Approval upserts the snapshot into the canonical store before the status
  /// is written; a later failure does not undo the upsert. Rejection purges
  /// the images uploaded with the proposal on a best-effort basis, except
  /// those the canonical site already shows.
  pub async fn decide(&self, id: Uuid, decision: Decision) -> Result<TempSite> {
    let temp_site = self.fetch(id).await?;
    if temp_site.status.is_terminal() {
      warn!(
        temp_site_id = %id,
        status = temp_site.status.as_ref(),
        "re-deciding a record that was already decided"
      );
    }

    let canonical = self
      .store
      .get_site(&temp_site.site.site_id)
      .await
      .map_err(ApiError::store)?;
    let plan = temp_site.plan_decision(&decision, canonical.as_ref(), Utc::now())?;

    if let Some(site) = plan.merge {
      let site_id = site.site_id.clone();
      let outcome = self.store.upsert_site(site).await.map_err(ApiError::store)?;
      info!(%site_id, ?outcome, "canonical site updated from research request");
    }

    if !plan.purge_keys.is_empty() {
      let count = plan.purge_keys.len();
      match self.images.delete_many(plan.purge_keys).await {
        Ok(()) => info!(temp_site_id = %id, count, "purged images of rejected request"),
        Err(e) => warn!(temp_site_id = %id, error = %e, "failed to purge images of rejected request"),
      }
    }

    let updated = self
      .store
      .record_review(id, plan.review)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| request_not_found(id))?;

    info!(
      temp_site_id = %id,
      site_id = %updated.site.site_id,
      status = updated.status.as_ref(),
      "research request decided"
    );

    self.notifier.notify(Notification::DecisionRecorded {
      temp_site_id:       updated.id,
      research_expert_id: updated.research_expert_id,
      site_id:            updated.site.site_id.clone(),
      site_name:          updated.site.site_name.clone(),
      status:             updated.status,
      feedback:           updated.admin_feedback.clone(),
    });

    Ok(updated)
  }

  async fn fetch(&self, id: Uuid) -> Result<TempSite> {
    self
      .store
      .get_temp_site(id)
      .await
      .map_err(ApiError::store)?
      .ok_or_else(|| request_not_found(id))
  }
}
