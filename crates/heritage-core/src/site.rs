//! Site types: the canonical record of a heritage site.
//!
//! JSON field names follow the established document shape (`Gallary`,
//! `Inscriptions`, `Inscription_id`), so existing clients and stored
//! documents keep working.

use std::collections::{BTreeMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ─── Nested sub-records ──────────────────────────────────────────────────────

/// Geolocation plus administrative location.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Location {
  pub latitude:  Option<f64>,
  pub longitude: Option<f64>,
  pub district:  Option<String>,
  pub state:     Option<String>,
  pub country:   Option<String>,
}

/// Who built or ruled the site, and when.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoricalContext {
  pub ruler_or_dynasty:      Option<String>,
  /// Free text, e.g. "c. 1670 CE" or "12th century".
  pub approximate_date:      Option<String>,
  pub related_figures:       Vec<String>,
  pub cultural_significance: Option<String>,
}

/// The people who vouch for the record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationAuthority {
  pub curators: Vec<String>,
}

/// A bibliographic reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Reference {
  pub title:  String,
  pub author: Option<String>,
  pub year:   Option<String>,
  pub url:    Option<String>,
}

// ─── Inscription ─────────────────────────────────────────────────────────────

/// An inscription embedded in a site. Identified by `Inscription_id`, which
/// is unique within its site.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inscription {
  #[serde(rename = "Inscription_id")]
  pub inscription_id:    String,
  pub image_urls:        Vec<String>,
  pub description:       Option<String>,
  pub original_script:   Option<String>,
  pub language_detected: Option<String>,
  /// Language name → translated text.
  pub translations:      BTreeMap<String, String>,
}

// ─── Site ────────────────────────────────────────────────────────────────────

/// A canonical heritage site, keyed by the human-assigned `site_id`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Site {
  /// Stable identifier, e.g. `"ABC0001"`. Immutable after creation.
  pub site_id:                String,
  pub site_name:              String,
  pub location:               Location,
  pub description:            String,
  /// Heritage classification, e.g. "fort", "cave", "temple".
  pub heritage_type:          Option<String>,
  pub period:                 Option<String>,
  pub historical_context:     HistoricalContext,
  pub verification_authority: VerificationAuthority,
  pub references:             Vec<Reference>,
  #[serde(rename = "Gallary")]
  pub gallery:                Vec<String>,
  #[serde(rename = "Inscriptions")]
  pub inscriptions:           Vec<Inscription>,
}

impl Site {
  /// Check the structural invariants: a non-empty `site_id`, and non-empty,
  /// unique inscription ids.
  pub fn validate(&self) -> Result<()> {
    if self.site_id.trim().is_empty() {
      return Err(Error::Validation("site_id is required".into()));
    }

    let mut seen = HashSet::new();
    for inscription in &self.inscriptions {
      if inscription.inscription_id.trim().is_empty() {
        return Err(Error::Validation(format!(
          "inscription on site {:?} has no Inscription_id",
          self.site_id
        )));
      }
      if !seen.insert(inscription.inscription_id.as_str()) {
        return Err(Error::DuplicateInscription {
          site_id:        self.site_id.clone(),
          inscription_id: inscription.inscription_id.clone(),
        });
      }
    }
    Ok(())
  }

  pub fn inscription_mut(
    &mut self,
    inscription_id: &str,
  ) -> Option<&mut Inscription> {
    self
      .inscriptions
      .iter_mut()
      .find(|i| i.inscription_id == inscription_id)
  }

  /// Every image URL referenced by the site: the gallery first, then each
  /// inscription's images in order.
  pub fn image_urls(&self) -> impl Iterator<Item = &str> + '_ {
    self.gallery.iter().map(String::as_str).chain(
      self
        .inscriptions
        .iter()
        .flat_map(|i| i.image_urls.iter().map(String::as_str)),
    )
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn inscription(id: &str) -> Inscription {
    Inscription {
      inscription_id: id.into(),
      ..Default::default()
    }
  }

  #[test]
  fn json_uses_document_field_names() {
    let site = Site {
      site_id: "ABC0001".into(),
      gallery: vec!["https://img/1.jpg".into()],
      inscriptions: vec![inscription("I1")],
      ..Default::default()
    };
    let json = serde_json::to_value(&site).unwrap();
    assert_eq!(json["Gallary"][0], "https://img/1.jpg");
    assert_eq!(json["Inscriptions"][0]["Inscription_id"], "I1");
  }

  #[test]
  fn missing_fields_take_defaults() {
    let site: Site =
      serde_json::from_str(r#"{"site_id":"ABC0001","site_name":"Fort"}"#)
        .unwrap();
    assert_eq!(site.site_name, "Fort");
    assert!(site.gallery.is_empty());
    assert!(site.historical_context.related_figures.is_empty());
  }

  #[test]
  fn validate_rejects_empty_site_id() {
    let site = Site::default();
    assert!(matches!(site.validate(), Err(Error::Validation(_))));
  }

  #[test]
  fn validate_rejects_duplicate_inscriptions() {
    let site = Site {
      site_id: "ABC0001".into(),
      inscriptions: vec![inscription("I1"), inscription("I1")],
      ..Default::default()
    };
    assert!(matches!(
      site.validate(),
      Err(Error::DuplicateInscription { .. })
    ));
  }

  #[test]
  fn image_urls_cover_gallery_and_inscriptions() {
    let mut ins = inscription("I1");
    ins.image_urls = vec!["b".into(), "c".into()];
    let site = Site {
      site_id: "S".into(),
      gallery: vec!["a".into()],
      inscriptions: vec![ins],
      ..Default::default()
    };
    let urls: Vec<&str> = site.image_urls().collect();
    assert_eq!(urls, ["a", "b", "c"]);
  }
}
