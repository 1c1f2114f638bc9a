//! Plain-text rendering of research requests for the terminal.

use std::fmt::Write as _;

use heritage_core::{
  diff::{DiffView, Mark},
  staging::TempSite,
};
use serde_json::Value;

use crate::client::RequestDetail;

/// One line per request: id, status, type/action, site, creation time.
pub fn request_table(requests: &[TempSite]) -> String {
  let mut out = String::new();
  let _ = writeln!(
    out,
    "{:<36}  {:<12}  {:<18}  {:<12}  {}",
    "ID", "STATUS", "CHANGE", "SITE", "CREATED"
  );
  for t in requests {
    let _ = writeln!(
      out,
      "{:<36}  {:<12}  {:<18}  {:<12}  {}",
      t.id,
      t.status.as_ref(),
      format!("{} {}", t.action.as_ref(), t.kind.as_ref()),
      t.site.site_id,
      t.created_at.format("%Y-%m-%d %H:%M"),
    );
  }
  if requests.is_empty() {
    out.push_str("(no research requests)\n");
  }
  out
}

/// Header block for one request.
pub fn request_summary(detail: &RequestDetail) -> String {
  let t: &TempSite = &detail.temp_site;
  let mut out = String::new();
  let _ = writeln!(out, "Request   {}", t.id);
  let _ = writeln!(out, "Site      {} ({})", t.site.site_name, t.site.site_id);
  let _ = writeln!(out, "Change    {} {}", t.action.as_ref(), t.kind.as_ref());
  let _ = writeln!(out, "Status    {}", t.status.as_ref());
  match &detail.submitter {
    Some(s) => {
      let _ = writeln!(out, "Submitter {} <{}>", s.username, s.email);
    }
    None => {
      let _ = writeln!(out, "Submitter (unknown user {})", t.research_expert_id);
    }
  }
  if let Some(feedback) = &t.admin_feedback {
    let _ = writeln!(out, "Feedback  {feedback}");
  }
  if let Some(expires) = t.expires_at {
    let _ = writeln!(out, "Expires   {}", expires.format("%Y-%m-%d %H:%M UTC"));
  }
  out
}

/// Highlighted fields of a diff: `+` for new, `~` for changed. With
/// `all`, unchanged fields are listed too, indented without a marker.
pub fn diff_listing(view: &DiffView, all: bool) -> String {
  let mut out = String::new();
  let mut shown = 0;
  for field in &view.fields {
    let marker = match field.mark {
      Mark::New => "+",
      Mark::Changed => "~",
      Mark::Unchanged if all => " ",
      Mark::Unchanged => continue,
    };
    shown += 1;
    let _ = writeln!(out, "{marker} {} = {}", field.path, compact(&field.value));
  }
  if shown == 0 {
    out.push_str("(no changes)\n");
  }
  out
}

fn compact(value: &Value) -> String {
  match value {
    Value::String(s) => format!("{s:?}"),
    other => other.to_string(),
  }
}

#[cfg(test)]
mod tests {
  use heritage_core::{
    diff::FieldMark,
    staging::{Action, EntryKind},
  };
  use serde_json::json;

  use super::*;

  fn view() -> DiffView {
    DiffView {
      action: Action::Modify,
      kind:   EntryKind::Site,
      fields: vec![
        FieldMark { path: "site_name".into(), value: json!("Hill Fort"), mark: Mark::Unchanged },
        FieldMark { path: "period".into(), value: json!("Maratha"), mark: Mark::Changed },
        FieldMark { path: "Gallary[1]".into(), value: json!("b.jpg"), mark: Mark::New },
      ],
    }
  }

  #[test]
  fn diff_listing_shows_only_highlights_by_default() {
    let text = diff_listing(&view(), false);
    assert_eq!(text, "~ period = \"Maratha\"\n+ Gallary[1] = \"b.jpg\"\n");
  }

  #[test]
  fn diff_listing_all_includes_unchanged() {
    let text = diff_listing(&view(), true);
    assert!(text.starts_with("  site_name = \"Hill Fort\"\n"));
    assert_eq!(text.lines().count(), 3);
  }

  #[test]
  fn empty_diff_says_so() {
    let mut v = view();
    v.fields.retain(|f| f.mark == Mark::Unchanged);
    assert_eq!(diff_listing(&v, false), "(no changes)\n");
  }

  #[test]
  fn empty_table_says_so() {
    assert!(request_table(&[]).ends_with("(no research requests)\n"));
  }
}
