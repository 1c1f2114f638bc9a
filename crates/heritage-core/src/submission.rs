//! Turning a research expert's proposal into a staged snapshot.
//!
//! Everything here is pure: the caller fetches the canonical site, uploads
//! images, and persists the resulting [`NewTempSite`].

use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::{
  Error, Result,
  merge::{merge_over, strip_identity},
  site::{Inscription, Site},
  staging::{Action, EntryKind, ImageRef, NewTempSite},
};

/// A proposal as received from a research expert.
#[derive(Debug, Clone)]
pub struct Submission {
  pub kind:               EntryKind,
  pub action:             Action,
  /// Site fields (`type=site`) or inscription fields plus `site_id`
  /// (`type=inscription`).
  pub data:               Value,
  pub research_expert_id: Uuid,
}

impl Submission {
  /// The `site_id` the proposal targets. Required for every flow.
  pub fn site_id(&self) -> Result<&str> {
    self
      .data
      .get("site_id")
      .and_then(Value::as_str)
      .filter(|s| !s.trim().is_empty())
      .ok_or_else(|| Error::Validation("data.site_id is required".into()))
  }

  /// Only brand-new sites can be staged without a canonical record.
  pub fn needs_canonical(&self) -> bool {
    !(self.kind == EntryKind::Site && self.action == Action::Add)
  }

  /// The list that uploaded image URLs are appended to.
  fn image_field(&self) -> &'static str {
    match self.kind {
      EntryKind::Site => "Gallary",
      EntryKind::Inscription => "image_urls",
    }
  }

  /// Append uploaded image URLs to the submitted data, after any URLs the
  /// submitter already listed.
  pub fn attach_images<I>(&mut self, urls: I) -> Result<()>
  where
    I: IntoIterator<Item = String>,
  {
    let field = self.image_field();
    let map = self
      .data
      .as_object_mut()
      .ok_or_else(|| Error::Validation("data must be a JSON object".into()))?;

    let slot = map
      .entry(field)
      .or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
      *slot = Value::Array(Vec::new());
    }
    let list = slot
      .as_array_mut()
      .ok_or_else(|| Error::Validation(format!("data.{field} must be a list")))?;

    list.extend(urls.into_iter().map(Value::String));
    Ok(())
  }

  /// Build the staged snapshot.
  ///
  /// `canonical` must be the current record for [`Self::site_id`] whenever
  /// [`Self::needs_canonical`] holds; a missing one is
  /// [`Error::SiteNotFound`].
  pub fn stage(
    self,
    canonical: Option<&Site>,
    uploads: Vec<ImageRef>,
  ) -> Result<NewTempSite> {
    let site_id = self.site_id()?.to_owned();

    let site = match (self.kind, self.action) {
      (EntryKind::Site, Action::Add) => {
        let mut data = self.data;
        strip_identity(&mut data);
        serde_json::from_value::<Site>(data)
          .map_err(|e| Error::Validation(e.to_string()))?
      }
      (EntryKind::Site, Action::Modify) => {
        let canonical = canonical.ok_or_else(|| Error::SiteNotFound(site_id.clone()))?;
        merge_over(canonical, self.data)?
      }
      (EntryKind::Inscription, action) => {
        let canonical = canonical.ok_or_else(|| Error::SiteNotFound(site_id.clone()))?;
        stage_inscription(canonical, action, self.data)?
      }
    };

    if site.site_id != site_id {
      return Err(Error::Validation(format!(
        "site_id cannot change (was {site_id:?}, got {:?})",
        site.site_id
      )));
    }
    site.validate()?;

    Ok(NewTempSite {
      site,
      research_expert_id: self.research_expert_id,
      action: self.action,
      kind: self.kind,
      uploads,
    })
  }
}

/// Seed a snapshot from the whole canonical site and apply the inscription
/// change to it.
///
/// A `modify` naming an `Inscription_id` the site does not have leaves the
/// inscriptions untouched.
fn stage_inscription(canonical: &Site, action: Action, data: Value) -> Result<Site> {
  let mut fields = match data {
    Value::Object(map) => map,
    _ => return Err(Error::Validation("data must be a JSON object".into())),
  };
  fields.remove("site_id");
  let mut fields = Value::Object(fields);
  strip_identity(&mut fields);

  let mut site = canonical.clone();
  match action {
    Action::Add => {
      let inscription = Inscription::deserialize(&fields)
        .map_err(|e| Error::Validation(e.to_string()))?;
      site.inscriptions.push(inscription);
    }
    Action::Modify => {
      let inscription_id = fields
        .get("Inscription_id")
        .and_then(Value::as_str)
        .ok_or_else(|| Error::Validation("data.Inscription_id is required".into()))?
        .to_owned();
      if let Some(existing) = site.inscription_mut(&inscription_id) {
        *existing = merge_over(existing, fields)?;
      }
    }
  }
  Ok(site)
}

/// Parse the `data` form field. Anything but a JSON object is rejected.
pub fn parse_data(raw: &str) -> Result<Value> {
  let value: Value = serde_json::from_str(raw)
    .map_err(|e| Error::Validation(format!("data is not valid JSON: {e}")))?;
  match value {
    Value::Object(_) => Ok(value),
    _ => Err(Error::Validation("data must be a JSON object".into())),
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;

  fn submission(kind: EntryKind, action: Action, data: Value) -> Submission {
    Submission {
      kind,
      action,
      data,
      research_expert_id: Uuid::new_v4(),
    }
  }

  fn canonical() -> Site {
    Site {
      site_id: "XYZ0002".into(),
      site_name: "Hill Fort".into(),
      period: Some("Medieval".into()),
      gallery: vec!["https://cdn/a.jpg".into()],
      historical_context: crate::site::HistoricalContext {
        ruler_or_dynasty: Some("Yadava".into()),
        approximate_date: Some("1200".into()),
        ..Default::default()
      },
      inscriptions: vec![Inscription {
        inscription_id: "I1".into(),
        description: Some("Stone slab".into()),
        original_script: Some("Brahmi".into()),
        image_urls: vec!["https://cdn/i1.jpg".into()],
        ..Default::default()
      }],
      ..Default::default()
    }
  }

  fn upload(url: &str) -> ImageRef {
    ImageRef { url: url.into(), key: format!("key-of-{url}") }
  }

  #[test]
  fn site_id_is_required() {
    let sub = submission(EntryKind::Site, Action::Add, json!({ "site_name": "x" }));
    assert!(sub.site_id().unwrap_err().is_validation());
  }

  #[test]
  fn add_site_appends_images_after_existing_urls() {
    let mut sub = submission(
      EntryKind::Site,
      Action::Add,
      json!({ "site_id": "ABC0001", "site_name": "Test Fort", "Gallary": ["pre.jpg"] }),
    );
    sub.attach_images(vec!["up.jpg".to_string()]).unwrap();
    let staged = sub.stage(None, vec![upload("up.jpg")]).unwrap();

    assert_eq!(staged.site.site_id, "ABC0001");
    assert_eq!(staged.site.gallery, ["pre.jpg", "up.jpg"]);
    assert_eq!(staged.uploads.len(), 1);
    assert_eq!(staged.action, Action::Add);
    assert_eq!(staged.kind, EntryKind::Site);
  }

  #[test]
  fn add_site_needs_no_canonical() {
    let sub = submission(EntryKind::Site, Action::Add, json!({ "site_id": "NEW1" }));
    assert!(!sub.needs_canonical());
    assert!(sub.stage(None, vec![]).is_ok());
  }

  #[test]
  fn modify_site_is_full_snapshot_with_submitted_fields_winning() {
    let sub = submission(
      EntryKind::Site,
      Action::Modify,
      json!({
        "_id": "mongo-ish",
        "site_id": "XYZ0002",
        "period": "Maratha",
        "historical_context": { "approximate_date": "1670" }
      }),
    );
    let staged = sub.stage(Some(&canonical()), vec![]).unwrap();

    assert_eq!(staged.site.site_name, "Hill Fort");
    assert_eq!(staged.site.period.as_deref(), Some("Maratha"));
    assert_eq!(
      staged.site.historical_context.ruler_or_dynasty.as_deref(),
      Some("Yadava")
    );
    assert_eq!(
      staged.site.historical_context.approximate_date.as_deref(),
      Some("1670")
    );
    assert_eq!(staged.site.inscriptions, canonical().inscriptions);
  }

  #[test]
  fn modify_site_without_canonical_is_not_found() {
    let sub = submission(EntryKind::Site, Action::Modify, json!({ "site_id": "XYZ0002" }));
    assert!(matches!(sub.stage(None, vec![]), Err(Error::SiteNotFound(id)) if id == "XYZ0002"));
  }

  #[test]
  fn add_inscription_appends_to_canonical_snapshot() {
    let mut sub = submission(
      EntryKind::Inscription,
      Action::Add,
      json!({ "site_id": "XYZ0002", "Inscription_id": "I2", "description": "Copper plate" }),
    );
    sub.attach_images(vec!["plate.jpg".to_string()]).unwrap();
    let staged = sub.stage(Some(&canonical()), vec![upload("plate.jpg")]).unwrap();

    assert_eq!(staged.site.inscriptions.len(), 2);
    let added = staged.site.inscriptions.last().unwrap();
    assert_eq!(added.inscription_id, "I2");
    assert_eq!(added.image_urls, ["plate.jpg"]);
    assert_eq!(staged.site.gallery, canonical().gallery);
  }

  #[test]
  fn add_inscription_with_existing_id_is_rejected() {
    let sub = submission(
      EntryKind::Inscription,
      Action::Add,
      json!({ "site_id": "XYZ0002", "Inscription_id": "I1" }),
    );
    let err = sub.stage(Some(&canonical()), vec![]).unwrap_err();
    assert!(matches!(err, Error::DuplicateInscription { .. }));
  }

  #[test]
  fn modify_inscription_replaces_matching_entry_in_place() {
    let sub = submission(
      EntryKind::Inscription,
      Action::Modify,
      json!({ "site_id": "XYZ0002", "Inscription_id": "I1", "original_script": "Devanagari" }),
    );
    let staged = sub.stage(Some(&canonical()), vec![]).unwrap();

    assert_eq!(staged.site.inscriptions.len(), 1);
    let ins = &staged.site.inscriptions[0];
    assert_eq!(ins.original_script.as_deref(), Some("Devanagari"));
    assert_eq!(ins.description.as_deref(), Some("Stone slab"));
  }

  #[test]
  fn modify_unknown_inscription_leaves_list_unchanged() {
    let sub = submission(
      EntryKind::Inscription,
      Action::Modify,
      json!({ "site_id": "XYZ0002", "Inscription_id": "NOPE", "description": "x" }),
    );
    let staged = sub.stage(Some(&canonical()), vec![]).unwrap();
    assert_eq!(staged.site.inscriptions, canonical().inscriptions);
  }

  #[test]
  fn inscription_without_canonical_is_not_found() {
    let sub = submission(
      EntryKind::Inscription,
      Action::Add,
      json!({ "site_id": "GONE", "Inscription_id": "I9" }),
    );
    assert!(matches!(sub.stage(None, vec![]), Err(Error::SiteNotFound(_))));
  }

  #[test]
  fn attach_images_rejects_non_list_field() {
    let mut sub = submission(
      EntryKind::Site,
      Action::Add,
      json!({ "site_id": "S", "Gallary": "oops" }),
    );
    assert!(sub.attach_images(vec!["a".to_string()]).unwrap_err().is_validation());
  }

  #[test]
  fn parse_data_requires_object() {
    assert!(parse_data("[1,2]").unwrap_err().is_validation());
    assert!(parse_data("{not json").unwrap_err().is_validation());
    assert!(parse_data(r#"{"site_id":"S"}"#).is_ok());
  }
}
