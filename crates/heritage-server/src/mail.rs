//! Mailers: a webhook sender for production and a log-only fallback.

use std::time::Duration;

use heritage_core::notify::{Email, Mailer};
use reqwest::Client;
use serde::Serialize;
use tracing::info;

use crate::error::{Error, Result};

// ─── Log ─────────────────────────────────────────────────────────────────────

/// Writes each email to the log instead of sending it.
#[derive(Debug, Clone)]
pub struct LogMailer {
  from: String,
}

impl LogMailer {
  pub fn new(from: impl Into<String>) -> Self { Self { from: from.into() } }
}

impl Mailer for LogMailer {
  type Error = Error;

  async fn send(&self, email: Email) -> Result<()> {
    info!(
      from = %self.from,
      to = %email.to,
      subject = %email.subject,
      "email (not sent: no mail webhook configured)"
    );
    Ok(())
  }
}

// ─── Webhook ─────────────────────────────────────────────────────────────────

/// JSON body posted to the mail webhook.
#[derive(Debug, Serialize)]
struct WebhookMessage<'a> {
  from:    &'a str,
  to:      &'a str,
  subject: &'a str,
  html:    &'a str,
}

/// Posts each email as JSON to a transactional-mail HTTP endpoint.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Debug, Clone)]
pub struct WebhookMailer {
  client: Client,
  url:    String,
  from:   String,
}

impl WebhookMailer {
  pub fn new(url: impl Into<String>, from: impl Into<String>) -> Result<Self> {
    let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
    Ok(Self {
      client,
      url: url.into(),
      from: from.into(),
    })
  }
}

impl Mailer for WebhookMailer {
  type Error = Error;

  async fn send(&self, email: Email) -> Result<()> {
    let resp = self
      .client
      .post(&self.url)
      .json(&WebhookMessage {
        from:    &self.from,
        to:      &email.to,
        subject: &email.subject,
        html:    &email.html,
      })
      .send()
      .await?;

    if !resp.status().is_success() {
      return Err(Error::WebhookStatus(resp.status()));
    }
    Ok(())
  }
}

// ─── Selection ───────────────────────────────────────────────────────────────

/// The mailer chosen from configuration.
#[derive(Debug, Clone)]
pub enum ConfiguredMailer {
  Log(LogMailer),
  Webhook(WebhookMailer),
}

impl ConfiguredMailer {
  pub fn from_config(webhook_url: Option<&str>, from: &str) -> Result<Self> {
    Ok(match webhook_url.filter(|u| !u.trim().is_empty()) {
      Some(url) => Self::Webhook(WebhookMailer::new(url, from)?),
      None => Self::Log(LogMailer::new(from)),
    })
  }
}

impl Mailer for ConfiguredMailer {
  type Error = Error;

  async fn send(&self, email: Email) -> Result<()> {
    match self {
      Self::Log(m) => m.send(email).await,
      Self::Webhook(m) => m.send(email).await,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn email() -> Email {
    Email {
      to:      "admin@example.org".into(),
      subject: "New research request".into(),
      html:    "<p>hi</p>".into(),
    }
  }

  #[tokio::test]
  async fn log_mailer_always_succeeds() {
    LogMailer::new("registry@example.org")
      .send(email())
      .await
      .unwrap();
  }

  #[test]
  fn blank_webhook_url_falls_back_to_log() {
    let m = ConfiguredMailer::from_config(Some("  "), "registry@example.org").unwrap();
    assert!(matches!(m, ConfiguredMailer::Log(_)));
    let m = ConfiguredMailer::from_config(None, "registry@example.org").unwrap();
    assert!(matches!(m, ConfiguredMailer::Log(_)));
    let m = ConfiguredMailer::from_config(Some("http://127.0.0.1:9/send"), "r@x").unwrap();
    assert!(matches!(m, ConfiguredMailer::Webhook(_)));
  }

  #[tokio::test]
  async fn unreachable_webhook_is_an_error() {
    // Port 9 (discard) is not listening on loopback in test environments.
    let m = WebhookMailer::new("http://127.0.0.1:9/send", "registry@example.org").unwrap();
    assert!(m.send(email()).await.is_err());
  }

  #[test]
  fn webhook_body_shape() {
    let e = email();
    let body = serde_json::to_value(WebhookMessage {
      from:    "registry@example.org",
      to:      &e.to,
      subject: &e.subject,
      html:    &e.html,
    })
    .unwrap();
    assert_eq!(body["to"], "admin@example.org");
    assert_eq!(body["from"], "registry@example.org");
    assert_eq!(body["html"], "<p>hi</p>");
  }
}
