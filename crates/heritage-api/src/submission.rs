//! Submission service: turn a research expert's proposal into a staged
//! record.

use futures::future::join_all;
use heritage_core::{
  media::{ImageStore, Upload},
  notify::Notification,
  staging::{ImageRef, TempSite},
  store::HeritageStore,
  submission::Submission,
};
use tracing::{info, warn};

use crate::{AppState, Result, error::ApiError};

impl<S, I> AppState<S, I>
where
  S: HeritageStore,
  I: ImageStore,
{
  /// Stage `submission` with its `images` and notify the admins.
  ///
  /// The canonical site is checked before anything is uploaded, so a proposal
  /// for a missing site never leaves stray images behind. Images uploaded for
  /// a proposal that then fails validation or persistence are purged again.
  pub async fn submit(
    &self,
    mut submission: Submission,
    images: Vec<Upload>,
  ) -> Result<TempSite> {
    let site_id = submission.site_id()?.to_owned();

    let canonical = if submission.needs_canonical() {
      let site = self
        .store
        .get_site(&site_id)
        .await
        .map_err(ApiError::store)?;
      Some(site.ok_or_else(|| ApiError::NotFound(format!("site {site_id} not found")))?)
    } else {
      None
    };

    let uploads = self.upload_all(images).await?;
    let payload = submission.data.clone();
    let kind = submission.kind;
    let action = submission.action;
    let research_expert_id = submission.research_expert_id;

    let staged = submission
      .attach_images(uploads.iter().map(|u| u.url.clone()))
      .and_then(|()| submission.stage(canonical.as_ref(), uploads.clone()));
    let staged = match staged {
      Ok(staged) => staged,
      Err(e) => {
        self.purge(&uploads).await;
        return Err(e.into());
      }
    };

    let temp = match self.store.insert_temp_site(staged).await {
      Ok(temp) => temp,
      Err(e) => {
        self.purge(&uploads).await;
        return Err(ApiError::store(e));
      }
    };

    info!(
      temp_site_id = %temp.id,
      %site_id,
      kind = kind.as_ref(),
      action = action.as_ref(),
      images = uploads.len(),
      "research request staged"
    );

    self.notifier.notify(Notification::SubmissionReceived {
      temp_site_id: temp.id,
      research_expert_id,
      kind,
      action,
      payload,
    });

    Ok(temp)
  }

  /// Upload every image concurrently. One failure fails the batch, and the
  /// images that did upload are purged again.
  async fn upload_all(&self, images: Vec<Upload>) -> Result<Vec<ImageRef>> {
    if images.is_empty() {
      return Ok(Vec::new());
    }
    let count = images.len();
    let results = join_all(images.into_iter().map(|image| self.images.upload(image))).await;

    let mut uploaded = Vec::with_capacity(count);
    let mut failure = None;
    for result in results {
      match result {
        Ok(image) => uploaded.push(image),
        Err(e) if failure.is_none() => failure = Some(e),
        Err(e) => warn!(error = %e, "further image upload failed"),
      }
    }

    match failure {
      None => Ok(uploaded),
      Some(e) => {
        warn!(error = %e, count, succeeded = uploaded.len(), "image upload failed");
        self.purge(&uploaded).await;
        Err(ApiError::upstream(e))
      }
    }
  }

  /// Best-effort removal of images uploaded for a proposal that was not
  /// staged.
  async fn purge(&self, uploads: &[ImageRef]) {
    if uploads.is_empty() {
      return;
    }
    let keys = uploads.iter().map(|u| u.key.clone()).collect();
    if let Err(e) = self.images.delete_many(keys).await {
      warn!(error = %e, "failed to purge images of an unstaged submission");
    }
  }
}
