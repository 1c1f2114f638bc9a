//! Staged submissions and the review state machine.
//!
//! A [`TempSite`] is a full post-change snapshot of a site proposed by a
//! research expert. Reviewers move it out of `pending` with a [`Decision`];
//! the pure [`TempSite::plan_decision`] works out what that decision means
//! (status, expiry, canonical merge, image cleanup) and the caller carries
//! out the side effects.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, EnumString};
use uuid::Uuid;

use crate::{Error, Result, site::Site};

/// How long approved and rejected records are kept before the janitor
/// removes them.
pub const RETENTION_DAYS: i64 = 30;

pub fn retention() -> Duration { Duration::days(RETENTION_DAYS) }

// ─── Tags ────────────────────────────────────────────────────────────────────

/// Review status of a staged record.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Default,
  Serialize,
  Deserialize,
  AsRefStr,
  EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Status {
  #[default]
  Pending,
  Approved,
  Rejected,
  /// Re-opened: the submitter is expected to send a corrected proposal.
  NeedsUpdate,
}

impl Status {
  /// Terminal states carry an expiry and are eventually swept.
  pub fn is_terminal(self) -> bool {
    matches!(self, Self::Approved | Self::Rejected)
  }
}

/// Whether the submission proposes a new entry or changes an existing one.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
  Add,
  Modify,
}

/// What the submission is about. Serialised as `type`.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntryKind {
  Site,
  Inscription,
}

// ─── Uploads ─────────────────────────────────────────────────────────────────

/// An image uploaded with a submission. The storage key is recorded at upload
/// time so cleanup never has to reverse-engineer it from the URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
  pub url: String,
  pub key: String,
}

// ─── TempSite ────────────────────────────────────────────────────────────────

/// A staged proposal: the site snapshot plus its review metadata.
///
/// The site fields are flattened so the JSON form is a single document, with
/// the administrative fields alongside the site's own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempSite {
  #[serde(rename = "_id")]
  pub id:                 Uuid,
  #[serde(flatten)]
  pub site:               Site,
  pub status:             Status,
  /// Weak reference to the submitting user.
  pub research_expert_id: Uuid,
  pub admin_feedback:     Option<String>,
  pub action:             Action,
  #[serde(rename = "type")]
  pub kind:               EntryKind,
  /// Set only for terminal states; the janitor deletes the record after it.
  pub expires_at:         Option<DateTime<Utc>>,
  #[serde(default)]
  pub uploads:            Vec<ImageRef>,
  pub created_at:         DateTime<Utc>,
  pub updated_at:         DateTime<Utc>,
}

/// Input to [`crate::store::HeritageStore::insert_temp_site`]. Identity,
/// status and timestamps are assigned by the store.
#[derive(Debug, Clone)]
pub struct NewTempSite {
  pub site:               Site,
  pub research_expert_id: Uuid,
  pub action:             Action,
  pub kind:               EntryKind,
  pub uploads:            Vec<ImageRef>,
}

// ─── Decisions ───────────────────────────────────────────────────────────────

/// The three outcomes a reviewer can choose.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, AsRefStr, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Verdict {
  Approved,
  Rejected,
  NeedsUpdate,
}

impl From<Verdict> for Status {
  fn from(v: Verdict) -> Self {
    match v {
      Verdict::Approved => Status::Approved,
      Verdict::Rejected => Status::Rejected,
      Verdict::NeedsUpdate => Status::NeedsUpdate,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
  pub verdict:  Verdict,
  pub feedback: Option<String>,
}

/// The review fields written back to the staged record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Review {
  pub status:         Status,
  pub admin_feedback: Option<String>,
  pub expires_at:     Option<DateTime<Utc>>,
}

/// Everything a decision implies, computed without touching any backend.
#[derive(Debug, Clone)]
pub struct DecisionPlan {
  pub review:     Review,
  /// The snapshot to upsert into the canonical store (approval only).
  pub merge:      Option<Site>,
  /// Storage keys to delete (rejection only).
  pub purge_keys: Vec<String>,
}

impl TempSite {
  /// Work out the effects of `decision` taken at `now`. `canonical` is the
  /// current record for this site, if any.
  ///
  /// Deciding an already-decided record is allowed, with two limits on
  /// images. Rejection never purges an upload the canonical site references,
  /// so rejecting an approved record leaves the live site intact. Approving
  /// a rejected record whose uploads were purged is refused with
  /// [`Error::UploadsPurged`].
  pub fn plan_decision(
    &self,
    decision: &Decision,
    canonical: Option<&Site>,
    now: DateTime<Utc>,
  ) -> Result<DecisionPlan> {
    let status = Status::from(decision.verdict);
    let expires_at = status.is_terminal().then(|| now + retention());

    let review = Review {
      status,
      admin_feedback: decision.feedback.clone(),
      expires_at,
    };

    let plan = match decision.verdict {
      Verdict::Approved => {
        if self.status == Status::Rejected
          && !self.purgeable_upload_keys(canonical).is_empty()
        {
          return Err(Error::UploadsPurged(self.id));
        }
        DecisionPlan {
          review,
          merge: Some(self.site.clone()),
          purge_keys: Vec::new(),
        }
      }
      Verdict::Rejected => DecisionPlan {
        review,
        merge: None,
        purge_keys: self.purgeable_upload_keys(canonical),
      },
      Verdict::NeedsUpdate => DecisionPlan {
        review,
        merge: None,
        purge_keys: Vec::new(),
      },
    };
    Ok(plan)
  }

  /// Storage keys for every image the snapshot references that was uploaded
  /// with this submission. Images inherited from the canonical site have no
  /// recorded key and are left alone.
  pub fn referenced_upload_keys(&self) -> Vec<String> {
    let by_url: HashMap<&str, &str> = self
      .uploads
      .iter()
      .map(|u| (u.url.as_str(), u.key.as_str()))
      .collect();

    let mut keys: Vec<String> = Vec::new();
    for url in self.site.image_urls() {
      if let Some(key) = by_url.get(url)
        && !keys.iter().any(|k| k == key)
      {
        keys.push((*key).to_owned());
      }
    }
    keys
  }

  /// [`Self::referenced_upload_keys`] minus the uploads `canonical` still
  /// points at.
  fn purgeable_upload_keys(&self, canonical: Option<&Site>) -> Vec<String> {
    let live: HashSet<&str> = canonical.map(|c| c.image_urls().collect()).unwrap_or_default();
    let live_keys: HashSet<&str> = self
      .uploads
      .iter()
      .filter(|u| live.contains(u.url.as_str()))
      .map(|u| u.key.as_str())
      .collect();

    self
      .referenced_upload_keys()
      .into_iter()
      .filter(|k| !live_keys.contains(k.as_str()))
      .collect()
  }
}

#[cfg(test)]
mod tests {
  use chrono::TimeZone;

  use super::*;
  use crate::site::Inscription;

  fn now() -> DateTime<Utc> { Utc.timestamp_opt(1_700_000_000, 0).unwrap() }

  fn temp_site() -> TempSite {
    TempSite {
      id:                 Uuid::new_v4(),
      site:               Site {
        site_id: "ABC0001".into(),
        site_name: "Test Fort".into(),
        gallery: vec!["https://cdn/old.jpg".into(), "https://cdn/new.jpg".into()],
        inscriptions: vec![Inscription {
          inscription_id: "I1".into(),
          image_urls: vec!["https://cdn/ins.jpg".into()],
          ..Default::default()
        }],
        ..Default::default()
      },
      status:             Status::Pending,
      research_expert_id: Uuid::new_v4(),
      admin_feedback:     None,
      action:             Action::Modify,
      kind:               EntryKind::Site,
      expires_at:         None,
      uploads:            vec![
        ImageRef { url: "https://cdn/new.jpg".into(), key: "k-new".into() },
        ImageRef { url: "https://cdn/ins.jpg".into(), key: "k-ins".into() },
      ],
      created_at:         now(),
      updated_at:         now(),
    }
  }

  fn decide(verdict: Verdict, feedback: Option<&str>) -> Decision {
    Decision { verdict, feedback: feedback.map(str::to_owned) }
  }

  #[test]
  fn approval_merges_and_expires_in_thirty_days() {
    let ts = temp_site();
    let plan = ts.plan_decision(&decide(Verdict::Approved, None), None, now()).unwrap();

    assert_eq!(plan.review.status, Status::Approved);
    assert_eq!(plan.review.expires_at, Some(now() + Duration::days(30)));
    assert_eq!(plan.merge.as_ref(), Some(&ts.site));
    assert!(plan.purge_keys.is_empty());
  }

  #[test]
  fn rejection_purges_only_recorded_uploads() {
    let ts = temp_site();
    let plan = ts
      .plan_decision(&decide(Verdict::Rejected, Some("blurry")), None, now())
      .unwrap();

    assert_eq!(plan.review.status, Status::Rejected);
    assert_eq!(plan.review.admin_feedback.as_deref(), Some("blurry"));
    assert_eq!(plan.review.expires_at, Some(now() + Duration::days(30)));
    assert!(plan.merge.is_none());
    assert_eq!(plan.purge_keys, vec!["k-new".to_string(), "k-ins".to_string()]);
  }

  #[test]
  fn needs_update_has_no_expiry_and_clears_previous_one() {
    let mut ts = temp_site();
    ts.status = Status::Rejected;
    ts.expires_at = Some(now());

    let plan = ts
      .plan_decision(&decide(Verdict::NeedsUpdate, Some("add refs")), None, now())
      .unwrap();
    assert_eq!(plan.review.status, Status::NeedsUpdate);
    assert_eq!(plan.review.expires_at, None);
    assert_eq!(plan.review.admin_feedback.as_deref(), Some("add refs"));
    assert!(plan.merge.is_none());
    assert!(plan.purge_keys.is_empty());
  }

  #[test]
  fn rejection_keeps_uploads_the_canonical_site_references() {
    let mut ts = temp_site();
    ts.status = Status::Approved;
    let live = ts.site.clone();

    let plan = ts
      .plan_decision(&decide(Verdict::Rejected, None), Some(&live), now())
      .unwrap();
    assert!(plan.purge_keys.is_empty());
    assert!(plan.merge.is_none());

    // Only the inscription image made it into the canonical record.
    let mut partial = live.clone();
    partial.gallery.retain(|u| u != "https://cdn/new.jpg");
    let plan = ts
      .plan_decision(&decide(Verdict::Rejected, None), Some(&partial), now())
      .unwrap();
    assert_eq!(plan.purge_keys, vec!["k-new".to_string()]);
  }

  #[test]
  fn approving_a_rejected_record_with_purged_uploads_is_refused() {
    let mut ts = temp_site();
    ts.status = Status::Rejected;

    let err = ts
      .plan_decision(&decide(Verdict::Approved, None), None, now())
      .unwrap_err();
    assert!(matches!(err, Error::UploadsPurged(id) if id == ts.id));

    // Nothing was uploaded, so nothing was purged.
    ts.uploads.clear();
    let plan = ts
      .plan_decision(&decide(Verdict::Approved, None), None, now())
      .unwrap();
    assert_eq!(plan.review.status, Status::Approved);
  }

  #[test]
  fn status_strings_round_trip_through_strum() {
    assert_eq!(Status::NeedsUpdate.as_ref(), "needs_update");
    assert_eq!("needs_update".parse::<Status>().unwrap(), Status::NeedsUpdate);
    assert!("pending".parse::<Verdict>().is_err());
  }

  #[test]
  fn json_form_is_flat_with_admin_fields() {
    let ts = temp_site();
    let json = serde_json::to_value(&ts).unwrap();
    assert_eq!(json["site_id"], "ABC0001");
    assert_eq!(json["type"], "site");
    assert_eq!(json["action"], "modify");
    assert_eq!(json["status"], "pending");
    assert!(json.get("researchExpertId").is_some());
    assert!(json.get("_id").is_some());

    let back: TempSite = serde_json::from_value(json).unwrap();
    assert_eq!(back, ts);
  }
}
