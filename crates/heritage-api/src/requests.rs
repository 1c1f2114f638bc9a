//! Handlers for `/research-requests` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/research-requests` | Optional `?researchExpertId=<uuid>` |
//! | `POST` | `/research-requests` | Multipart: `type`, `action`, `data`, `researchExpertId`, `images[]` |
//! | `GET`  | `/research-requests/:id` | Record plus `submitter`; 404 if not found |
//! | `GET`  | `/research-requests/:id/diff` | Field marks against the canonical site |
//! | `PUT`  | `/research-requests/:id` | Body: `{"status":"approved","adminFeedback":"..."}` |

use axum::{
  Json,
  extract::{Multipart, Path, Query, State, multipart::Field},
  http::StatusCode,
  response::IntoResponse,
};
use heritage_core::{
  diff::DiffView,
  media::{ImageStore, Upload},
  staging::{Action, Decision, EntryKind, TempSite, Verdict},
  store::HeritageStore,
  submission::{Submission, parse_data},
};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::{
  AppState,
  error::ApiError,
  review::{ListedRequest, RequestDetail},
};

/// Response body for writes: a human-readable message plus the record.
#[derive(Debug, Serialize)]
pub struct RequestResponse {
  pub message:   &'static str,
  #[serde(rename = "tempSite")]
  pub temp_site: TempSite,
}

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(rename = "researchExpertId")]
  pub research_expert_id: Option<Uuid>,
}

/// `GET /research-requests[?researchExpertId=<uuid>]`
pub async fn list<S, I>(
  State(state): State<AppState<S, I>>,
  Query(params): Query<ListParams>,
) -> Result<Json<Vec<ListedRequest>>, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  Ok(Json(state.list_requests(params.research_expert_id).await?))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// `POST /research-requests` (multipart)
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  multipart: Multipart,
) -> Result<impl IntoResponse, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  let (submission, images) = read_submission(multipart).await?;
  let temp_site = state.submit(submission, images).await?;
  Ok((
    StatusCode::CREATED,
    Json(RequestResponse {
      message: "Research request submitted",
      temp_site,
    }),
  ))
}

/// Collect the multipart fields into a [`Submission`] and its images.
async fn read_submission(mut multipart: Multipart) -> Result<(Submission, Vec<Upload>), ApiError> {
  let mut kind = None;
  let mut action = None;
  let mut data = None;
  let mut research_expert_id = None;
  let mut images = Vec::new();

  while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
    let name = field.name().unwrap_or_default().to_owned();
    match name.as_str() {
      "type" => kind = Some(text(field).await?),
      "action" => action = Some(text(field).await?),
      "data" => data = Some(text(field).await?),
      "researchExpertId" => research_expert_id = Some(text(field).await?),
      "images" | "images[]" => {
        let file_name = field.file_name().map(str::to_owned);
        let content_type = field.content_type().map(str::to_owned);
        let data = field.bytes().await.map_err(bad_multipart)?;
        if data.is_empty() {
          debug!(?file_name, "skipping empty image part");
          continue;
        }
        images.push(Upload { file_name, content_type, data });
      }
      other => debug!(field = other, "ignoring unknown multipart field"),
    }
  }

  let kind: EntryKind = parse_tag("type", required("type", kind)?)?;
  let action: Action = parse_tag("action", required("action", action)?)?;
  let data = parse_data(&required("data", data)?)?;
  let research_expert_id = required("researchExpertId", research_expert_id)?;
  let research_expert_id = Uuid::parse_str(research_expert_id.trim()).map_err(|_| {
    ApiError::BadRequest(format!("researchExpertId {research_expert_id:?} is not a valid id"))
  })?;

  Ok((
    Submission {
      kind,
      action,
      data,
      research_expert_id,
    },
    images,
  ))
}

async fn text(field: Field<'_>) -> Result<String, ApiError> {
  field.text().await.map_err(bad_multipart)
}

fn bad_multipart(e: axum::extract::multipart::MultipartError) -> ApiError {
  ApiError::BadRequest(format!("malformed multipart body: {e}"))
}

fn required(name: &str, value: Option<String>) -> Result<String, ApiError> {
  value
    .filter(|v| !v.trim().is_empty())
    .ok_or_else(|| ApiError::BadRequest(format!("{name} is required")))
}

fn parse_tag<T: std::str::FromStr>(name: &str, value: String) -> Result<T, ApiError> {
  value
    .trim()
    .parse()
    .map_err(|_| ApiError::BadRequest(format!("invalid {name}: {value:?}")))
}

// ─── Get one ──────────────────────────────────────────────────────────────────

/// `GET /research-requests/:id`
pub async fn get_one<S, I>(
  State(state): State<AppState<S, I>>,
  Path(id): Path<Uuid>,
) -> Result<Json<RequestDetail>, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  Ok(Json(state.get_request(id).await?))
}

// ─── Diff ─────────────────────────────────────────────────────────────────────

/// `GET /research-requests/:id/diff`
pub async fn diff<S, I>(
  State(state): State<AppState<S, I>>,
  Path(id): Path<Uuid>,
) -> Result<Json<DiffView>, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  Ok(Json(state.diff_request(id).await?))
}

// ─── Decide ───────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct DecideBody {
  pub status:         String,
  #[serde(rename = "adminFeedback", default)]
  pub admin_feedback: Option<String>,
}

/// `PUT /research-requests/:id` with body `{"status":"rejected","adminFeedback":"..."}`
pub async fn decide<S, I>(
  State(state): State<AppState<S, I>>,
  Path(id): Path<Uuid>,
  Json(body): Json<DecideBody>,
) -> Result<Json<RequestResponse>, ApiError>
where
  S: HeritageStore + 'static,
  I: ImageStore + 'static,
{
  let verdict: Verdict = body.status.parse().map_err(|_| {
    ApiError::BadRequest(format!(
      "status must be one of approved, rejected, needs_update (got {:?})",
      body.status
    ))
  })?;

  let temp_site = state
    .decide(id, Decision {
      verdict,
      feedback: body.admin_feedback,
    })
    .await?;

  Ok(Json(RequestResponse {
    message: "Research request updated",
    temp_site,
  }))
}
