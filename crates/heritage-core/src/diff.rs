//! Review diff: staged snapshot vs canonical record → per-field marks.
//!
//! The output is a rendering instruction, not a patch. Every leaf of the
//! cleaned staged document appears exactly once with a [`Mark`]; a reviewer
//! UI highlights the `new` and `changed` ones.
//!
//! Rules:
//!
//! - `add` + `site`: every leaf is new.
//! - `add` + `inscription`: only the leaves of the last `Inscriptions` entry
//!   (the one being added) are new.
//! - `modify`: each leaf is compared by value with the same path in the
//!   original; a path missing anywhere along the way counts as new.
//!
//! Administrative fields are never traversed. Neither input is modified.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{
  Result,
  site::Site,
  staging::{Action, EntryKind, TempSite},
};

/// Top-level keys that describe the review process, not the site.
pub const ADMIN_FIELDS: &[&str] = &[
  "_id",
  "__v",
  "originalSite",
  "researchExpertId",
  "status",
  "action",
  "type",
  "adminFeedback",
  "expiresAt",
  "createdAt",
  "updatedAt",
  "uploads",
];

const INSCRIPTIONS: &str = "Inscriptions";

// ─── Paths ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
  Key(String),
  Index(usize),
}

/// A path from the document root to a leaf, e.g.
/// `Inscriptions[0].translations.english`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldPath(pub Vec<Segment>);

impl FieldPath {
  fn child(&self, seg: Segment) -> Self {
    let mut segs = self.0.clone();
    segs.push(seg);
    Self(segs)
  }

  pub fn starts_with(&self, prefix: &[Segment]) -> bool {
    self.0.starts_with(prefix)
  }

  /// Resolve this path inside `doc`. `None` as soon as a segment is missing
  /// or the shape does not match.
  pub fn lookup<'a>(&self, doc: &'a Value) -> Option<&'a Value> {
    self.0.iter().try_fold(doc, |cur, seg| match (seg, cur) {
      (Segment::Key(k), Value::Object(map)) => map.get(k),
      (Segment::Index(i), Value::Array(items)) => items.get(*i),
      _ => None,
    })
  }
}

impl fmt::Display for FieldPath {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (n, seg) in self.0.iter().enumerate() {
      match seg {
        Segment::Key(k) if n == 0 => write!(f, "{k}")?,
        Segment::Key(k) => write!(f, ".{k}")?,
        Segment::Index(i) => write!(f, "[{i}]")?,
      }
    }
    Ok(())
  }
}

// ─── Marks ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
  /// Not present in the original (or the whole record is an addition).
  New,
  /// Present in the original with a different value.
  Changed,
  Unchanged,
}

impl Mark {
  pub fn is_highlighted(self) -> bool { !matches!(self, Self::Unchanged) }
}

/// One leaf of the staged document with its mark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMark {
  pub path:  String,
  pub value: Value,
  pub mark:  Mark,
}

/// The complete set of marks for one staged record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiffView {
  pub action: Action,
  #[serde(rename = "type")]
  pub kind:   EntryKind,
  pub fields: Vec<FieldMark>,
}

impl DiffView {
  pub fn highlighted(&self) -> impl Iterator<Item = &FieldMark> + '_ {
    self.fields.iter().filter(|f| f.mark.is_highlighted())
  }

  pub fn mark_of(&self, path: &str) -> Option<Mark> {
    self.fields.iter().find(|f| f.path == path).map(|f| f.mark)
  }
}

// ─── Engine ──────────────────────────────────────────────────────────────────

/// Compute marks for `modified` against `original`.
pub fn diff(
  original: Option<&Value>,
  modified: &Value,
  action: Action,
  kind: EntryKind,
) -> DiffView {
  let mut leaves = Vec::new();
  collect_leaves(modified, FieldPath::default(), true, &mut leaves);

  let fresh_prefix = match (action, kind) {
    (Action::Add, EntryKind::Inscription) => last_inscription_prefix(modified),
    _ => None,
  };

  let fields = leaves
    .into_iter()
    .map(|(path, value)| {
      let mark = match (action, kind) {
        (Action::Add, EntryKind::Site) => Mark::New,
        (Action::Add, EntryKind::Inscription) => match &fresh_prefix {
          Some(prefix) if path.starts_with(prefix) => Mark::New,
          _ => Mark::Unchanged,
        },
        (Action::Modify, _) => compare(original, &path, value),
      };
      FieldMark {
        path: path.to_string(),
        value: value.clone(),
        mark,
      }
    })
    .collect();

  DiffView { action, kind, fields }
}

/// Diff a staged record against its canonical counterpart (if any).
pub fn diff_staged(staged: &TempSite, original: Option<&Site>) -> Result<DiffView> {
  let modified = serde_json::to_value(staged)?;
  let original = original.map(serde_json::to_value).transpose()?;
  Ok(diff(original.as_ref(), &modified, staged.action, staged.kind))
}

fn compare(original: Option<&Value>, path: &FieldPath, value: &Value) -> Mark {
  match original.and_then(|doc| path.lookup(doc)) {
    None => Mark::New,
    Some(old) if old == value => Mark::Unchanged,
    Some(_) => Mark::Changed,
  }
}

fn last_inscription_prefix(doc: &Value) -> Option<Vec<Segment>> {
  let count = doc.get(INSCRIPTIONS)?.as_array()?.len();
  let last = count.checked_sub(1)?;
  Some(vec![Segment::Key(INSCRIPTIONS.into()), Segment::Index(last)])
}

/// Depth-first walk collecting every leaf. Empty containers are leaves.
fn collect_leaves<'a>(
  value: &'a Value,
  path: FieldPath,
  root: bool,
  out: &mut Vec<(FieldPath, &'a Value)>,
) {
  match value {
    Value::Object(map) if !map.is_empty() => {
      for (key, child) in map {
        if root && ADMIN_FIELDS.contains(&key.as_str()) {
          continue;
        }
        collect_leaves(child, path.child(Segment::Key(key.clone())), false, out);
      }
    }
    Value::Array(items) if !items.is_empty() => {
      for (i, child) in items.iter().enumerate() {
        collect_leaves(child, path.child(Segment::Index(i)), false, out);
      }
    }
    _ => out.push((path, value)),
  }
}
