//! Async HTTP client wrapping the heritage JSON API.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result, anyhow};
use heritage_core::{
  diff::DiffView,
  site::Site,
  staging::{Action, EntryKind, TempSite, Verdict},
  user::Submitter,
};
use reqwest::{Client, Response, multipart};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use uuid::Uuid;

/// Connection settings for the heritage API.
#[derive(Debug, Clone)]
pub struct ApiConfig {
  pub base_url: String,
}

/// One research request with its submitter.
#[derive(Debug, Clone, Deserialize)]
pub struct RequestDetail {
  #[serde(flatten)]
  pub temp_site: TempSite,
  pub submitter: Option<Submitter>,
}

#[derive(Debug, Deserialize)]
struct RequestResponse {
  message:   String,
  #[serde(rename = "tempSite")]
  temp_site: TempSite,
}

#[derive(Debug, Serialize)]
struct DecideBody<'a> {
  status:         &'a str,
  #[serde(rename = "adminFeedback", skip_serializing_if = "Option::is_none")]
  admin_feedback: Option<&'a str>,
}

/// A proposal to send with [`ApiClient::submit`].
#[derive(Debug, Clone)]
pub struct NewRequest {
  pub kind:               EntryKind,
  pub action:             Action,
  pub data:               Value,
  pub research_expert_id: Uuid,
  pub images:             Vec<std::path::PathBuf>,
}

/// Async HTTP client for the heritage JSON REST API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
  }

  // ── Research requests ─────────────────────────────────────────────────────

  /// `GET /research-requests[?researchExpertId=<id>]`. The `originalSite`
  /// enrichment is not needed for the table and is ignored.
  pub async fn list_requests(&self, research_expert_id: Option<Uuid>) -> Result<Vec<TempSite>> {
    let mut req = self.client.get(self.url("/research-requests"));
    if let Some(id) = research_expert_id {
      req = req.query(&[("researchExpertId", id.to_string())]);
    }
    let resp = req.send().await.context("GET /research-requests failed")?;
    decode(resp, "GET /research-requests").await
  }

  /// `GET /research-requests/:id`
  pub async fn get_request(&self, id: Uuid) -> Result<RequestDetail> {
    let path = format!("/research-requests/{id}");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    decode(resp, &format!("GET {path}")).await
  }

  /// `GET /research-requests/:id/diff`
  pub async fn get_diff(&self, id: Uuid) -> Result<DiffView> {
    let path = format!("/research-requests/{id}/diff");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    decode(resp, &format!("GET {path}")).await
  }

  /// `PUT /research-requests/:id`
  pub async fn decide(
    &self,
    id: Uuid,
    verdict: Verdict,
    feedback: Option<&str>,
  ) -> Result<(String, TempSite)> {
    let path = format!("/research-requests/{id}");
    let resp = self
      .client
      .put(self.url(&path))
      .json(&DecideBody {
        status:         verdict.as_ref(),
        admin_feedback: feedback,
      })
      .send()
      .await
      .with_context(|| format!("PUT {path} failed"))?;
    let body: RequestResponse = decode(resp, &format!("PUT {path}")).await?;
    Ok((body.message, body.temp_site))
  }

  /// `POST /research-requests` (multipart)
  pub async fn submit(&self, request: NewRequest) -> Result<(String, TempSite)> {
    let mut form = multipart::Form::new()
      .text("type", request.kind.as_ref().to_owned())
      .text("action", request.action.as_ref().to_owned())
      .text("data", request.data.to_string())
      .text("researchExpertId", request.research_expert_id.to_string());

    for path in &request.images {
      form = form.part("images", image_part(path).await?);
    }

    let resp = self
      .client
      .post(self.url("/research-requests"))
      .multipart(form)
      .send()
      .await
      .context("POST /research-requests failed")?;
    let body: RequestResponse = decode(resp, "POST /research-requests").await?;
    Ok((body.message, body.temp_site))
  }

  // ── Sites ─────────────────────────────────────────────────────────────────

  /// `GET /sites/:site_id`
  pub async fn get_site(&self, site_id: &str) -> Result<Site> {
    let path = format!("/sites/{site_id}");
    let resp = self
      .client
      .get(self.url(&path))
      .send()
      .await
      .with_context(|| format!("GET {path} failed"))?;
    decode(resp, &format!("GET {path}")).await
  }
}

async fn image_part(path: &Path) -> Result<multipart::Part> {
  let bytes = tokio::fs::read(path)
    .await
    .with_context(|| format!("reading image {}", path.display()))?;
  let file_name = path
    .file_name()
    .map(|n| n.to_string_lossy().into_owned())
    .unwrap_or_else(|| "image".to_owned());
  let mime = match path
    .extension()
    .and_then(|e| e.to_str())
    .map(str::to_ascii_lowercase)
    .as_deref()
  {
    Some("jpg" | "jpeg") => "image/jpeg",
    Some("png") => "image/png",
    Some("gif") => "image/gif",
    Some("webp") => "image/webp",
    _ => "application/octet-stream",
  };
  multipart::Part::bytes(bytes)
    .file_name(file_name)
    .mime_str(mime)
    .context("building image part")
}

/// Decode a successful JSON response, or turn the API's `{"message"}` error
/// body into an error.
async fn decode<T: DeserializeOwned>(resp: Response, what: &str) -> Result<T> {
  let status = resp.status();
  if !status.is_success() {
    let message = resp
      .json::<Value>()
      .await
      .ok()
      .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_owned))
      .unwrap_or_default();
    return Err(anyhow!("{what} → {status}: {message}"));
  }
  resp
    .json()
    .await
    .with_context(|| format!("deserialising {what} response"))
}
