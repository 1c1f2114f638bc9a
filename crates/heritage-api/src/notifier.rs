//! Notification fan-out.
//!
//! Workflow services push [`Notification`]s onto an unbounded channel after
//! their state change is persisted. A single dispatcher task resolves the
//! recipients from the store, renders the emails and hands them to the
//! [`Mailer`]. Delivery failures are logged and dropped; they never reach the
//! request that caused them.

use std::sync::Arc;

use heritage_core::{
  notify::{Email, Mailer, Notification},
  staging::Status,
  store::HeritageStore,
  user::{Role, User},
};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

// ─── Sender side ─────────────────────────────────────────────────────────────

/// Cheap-to-clone handle used by the workflow to emit notifications.
#[derive(Clone)]
pub struct Notifier {
  tx: mpsc::UnboundedSender<Notification>,
}

pub type NotificationReceiver = mpsc::UnboundedReceiver<Notification>;

/// Create a connected notifier / receiver pair.
pub fn channel() -> (Notifier, NotificationReceiver) {
  let (tx, rx) = mpsc::unbounded_channel();
  (Notifier { tx }, rx)
}

impl Notifier {
  /// Queue a notification. Never fails the caller: if the dispatcher is
  /// gone, the event is logged and dropped.
  pub fn notify(&self, notification: Notification) {
    if let Err(e) = self.tx.send(notification) {
      warn!(event = ?e.0, "notification dispatcher is not running; dropping event");
    }
  }
}

// ─── Dispatcher ──────────────────────────────────────────────────────────────

/// Start the dispatcher in a background task. It runs until every
/// [`Notifier`] is dropped.
pub fn spawn_dispatcher<S, M>(
  store: Arc<S>,
  mailer: Arc<M>,
  mut rx: NotificationReceiver,
) -> tokio::task::JoinHandle<()>
where
  S: HeritageStore + 'static,
  M: Mailer + 'static,
{
  tokio::spawn(async move {
    while let Some(notification) = rx.recv().await {
      let sent = dispatch(store.as_ref(), mailer.as_ref(), &notification).await;
      debug!(sent, "notification dispatched");
    }
    info!("notification dispatcher stopped");
  })
}

/// Deliver one notification. Returns the number of emails successfully
/// handed to the mailer.
pub async fn dispatch<S, M>(store: &S, mailer: &M, notification: &Notification) -> usize
where
  S: HeritageStore,
  M: Mailer,
{
  let emails = match render(store, notification).await {
    Ok(emails) => emails,
    Err(e) => {
      warn!(error = %e, "could not resolve notification recipients");
      return 0;
    }
  };

  let mut sent = 0;
  for email in emails {
    let to = email.to.clone();
    match mailer.send(email).await {
      Ok(()) => sent += 1,
      Err(e) => warn!(%to, error = %e, "failed to send notification email"),
    }
  }
  sent
}

/// Resolve recipients and render the emails for a notification.
async fn render<S>(store: &S, notification: &Notification) -> Result<Vec<Email>, S::Error>
where
  S: HeritageStore,
{
  match notification {
    Notification::SubmissionReceived {
      research_expert_id,
      kind,
      action,
      payload,
      ..
    } => {
      let submitter = store.get_user(*research_expert_id).await?;
      let submitter_label = submitter_label(submitter.as_ref(), research_expert_id);
      let admins = store.list_users_by_role(Role::Admin).await?;
      if admins.is_empty() {
        warn!("no admin users to notify about a new submission");
      }

      let pretty = serde_json::to_string_pretty(payload).unwrap_or_else(|_| payload.to_string());
      let subject = format!(
        "New research request: {} {}",
        action.as_ref(),
        kind.as_ref()
      );
      let html = format!(
        "<h2>New research request</h2>\
         <p><strong>Submitted by:</strong> {}</p>\
         <p><strong>Type:</strong> {}</p>\
         <p><strong>Action:</strong> {}</p>\
         <pre>{}</pre>",
        escape_html(&submitter_label),
        kind.as_ref(),
        action.as_ref(),
        escape_html(&pretty),
      );

      Ok(
        admins
          .into_iter()
          .map(|admin| Email {
            to:      admin.email,
            subject: subject.clone(),
            html:    html.clone(),
          })
          .collect(),
      )
    }

    Notification::DecisionRecorded {
      research_expert_id,
      site_id,
      site_name,
      status,
      feedback,
      ..
    } => {
      let Some(submitter) = store.get_user(*research_expert_id).await? else {
        warn!(%research_expert_id, "submitter no longer exists; skipping decision email");
        return Ok(Vec::new());
      };

      let display_name = if site_name.is_empty() { site_id } else { site_name };
      let mut html = format!(
        "<h2>Your research request was reviewed</h2>\
         <p><strong>Site:</strong> {} ({})</p>\
         <p><strong>Status:</strong> {}</p>",
        escape_html(display_name),
        escape_html(site_id),
        status_label(*status),
      );
      if let Some(feedback) = feedback.as_deref().filter(|f| !f.is_empty()) {
        html.push_str(&format!(
          "<p><strong>Feedback:</strong> {}</p>",
          escape_html(feedback)
        ));
      }

      Ok(vec![Email {
        to: submitter.email,
        subject: format!("Research request {}: {display_name}", status_label(*status)),
        html,
      }])
    }
  }
}

fn submitter_label(user: Option<&User>, id: &uuid::Uuid) -> String {
  match user {
    Some(u) => format!("{} <{}>", u.username, u.email),
    None => format!("unknown user {id}"),
  }
}

fn status_label(status: Status) -> &'static str {
  match status {
    Status::Pending => "pending",
    Status::Approved => "approved",
    Status::Rejected => "rejected",
    Status::NeedsUpdate => "needs update",
  }
}

fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for c in s.chars() {
    match c {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

#[cfg(test)]
mod tests {
  use heritage_core::{
    staging::{Action, EntryKind},
    user::NewUser,
  };
  use heritage_store_sqlite::SqliteStore;
  use serde_json::json;
  use uuid::Uuid;

  use super::*;
  use crate::testing::RecordingMailer;

  async fn store_with_users() -> (SqliteStore, User) {
    let store = SqliteStore::open_in_memory().await.unwrap();
    for name in ["root", "curator"] {
      store
        .add_user(NewUser {
          username: name.into(),
          email:    format!("{name}@example.org"),
          role:     Role::Admin,
        })
        .await
        .unwrap();
    }
    let expert = store
      .add_user(NewUser {
        username: "asha".into(),
        email:    "asha@example.org".into(),
        role:     Role::ResearchExpert,
      })
      .await
      .unwrap();
    (store, expert)
  }

  #[tokio::test]
  async fn submission_goes_to_every_admin() {
    let (store, expert) = store_with_users().await;
    let mailer = RecordingMailer::default();

    let sent = dispatch(&store, &mailer, &Notification::SubmissionReceived {
      temp_site_id:       Uuid::new_v4(),
      research_expert_id: expert.user_id,
      kind:               EntryKind::Site,
      action:             Action::Add,
      payload:            json!({ "site_id": "ABC0001", "site_name": "<Fort>" }),
    })
    .await;

    assert_eq!(sent, 2);
    let outbox = mailer.sent();
    let mut to: Vec<&str> = outbox.iter().map(|e| e.to.as_str()).collect();
    to.sort();
    assert_eq!(to, ["curator@example.org", "root@example.org"]);
    assert!(outbox[0].html.contains("asha"));
    assert!(outbox[0].html.contains("&lt;Fort&gt;"), "payload must be escaped");
    assert_eq!(outbox[0].subject, "New research request: add site");
  }

  #[tokio::test]
  async fn decision_goes_to_submitter_with_feedback() {
    let (store, expert) = store_with_users().await;
    let mailer = RecordingMailer::default();

    let sent = dispatch(&store, &mailer, &Notification::DecisionRecorded {
      temp_site_id:       Uuid::new_v4(),
      research_expert_id: expert.user_id,
      site_id:            "ABC0001".into(),
      site_name:          "Test Fort".into(),
      status:             Status::Rejected,
      feedback:           Some("Needs citations".into()),
    })
    .await;

    assert_eq!(sent, 1);
    let outbox = mailer.sent();
    assert_eq!(outbox[0].to, "asha@example.org");
    assert!(outbox[0].html.contains("rejected"));
    assert!(outbox[0].html.contains("Needs citations"));
    assert!(outbox[0].subject.contains("Test Fort"));
  }

  #[tokio::test]
  async fn decision_for_missing_submitter_sends_nothing() {
    let (store, _) = store_with_users().await;
    let mailer = RecordingMailer::default();

    let sent = dispatch(&store, &mailer, &Notification::DecisionRecorded {
      temp_site_id:       Uuid::new_v4(),
      research_expert_id: Uuid::new_v4(),
      site_id:            "ABC0001".into(),
      site_name:          String::new(),
      status:             Status::Approved,
      feedback:           None,
    })
    .await;
    assert_eq!(sent, 0);
    assert!(mailer.sent().is_empty());
  }

  #[tokio::test]
  async fn mailer_failures_are_counted_not_propagated() {
    let (store, expert) = store_with_users().await;
    let mailer = RecordingMailer::failing();

    let sent = dispatch(&store, &mailer, &Notification::DecisionRecorded {
      temp_site_id:       Uuid::new_v4(),
      research_expert_id: expert.user_id,
      site_id:            "ABC0001".into(),
      site_name:          "Fort".into(),
      status:             Status::Approved,
      feedback:           None,
    })
    .await;
    assert_eq!(sent, 0);
  }

  #[tokio::test]
  async fn notify_without_dispatcher_does_not_panic() {
    let (notifier, rx) = channel();
    drop(rx);
    notifier.notify(Notification::DecisionRecorded {
      temp_site_id:       Uuid::new_v4(),
      research_expert_id: Uuid::new_v4(),
      site_id:            "S".into(),
      site_name:          "S".into(),
      status:             Status::Approved,
      feedback:           None,
    });
  }

  #[test]
  fn escape_html_covers_markup_characters() {
    assert_eq!(escape_html(r#"<a href="x">&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&amp;&#39;&lt;/a&gt;");
  }
}
