//! [`LocalImageStore`]: an [`ImageStore`] that keeps images in a directory
//! served under `/media`.

use std::path::{Path, PathBuf};

use heritage_core::{
  media::{ImageStore, Upload},
  staging::ImageRef,
};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Images on local disk, one file per upload.
///
/// Keys are random so two submissions of the same picture never share a
/// file; deleting one never affects the other.
#[derive(Debug, Clone)]
pub struct LocalImageStore {
  root:     PathBuf,
  base_url: String,
}

impl LocalImageStore {
  /// `base_url` is the public server URL; image URLs are
  /// `{base_url}/media/{key}`.
  pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
    Self {
      root:     root.into(),
      base_url: base_url.trim_end_matches('/').to_owned(),
    }
  }

  pub fn root(&self) -> &Path { &self.root }

  fn path_for(&self, key: &str) -> Result<PathBuf> {
    if !is_valid_key(key) {
      return Err(Error::InvalidKey(key.to_owned()));
    }
    Ok(self.root.join(key))
  }
}

/// Keys are flat file names: no separators, no leading dot.
fn is_valid_key(key: &str) -> bool {
  !key.is_empty()
    && !key.starts_with('.')
    && key
      .chars()
      .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
}

/// A short lowercase extension from the file name, else from the content
/// type.
fn extension(upload: &Upload) -> Option<String> {
  let from_name = upload
    .file_name
    .as_deref()
    .and_then(|n| Path::new(n).extension())
    .and_then(|e| e.to_str())
    .filter(|e| (1..=5).contains(&e.len()) && e.chars().all(|c| c.is_ascii_alphanumeric()))
    .map(str::to_ascii_lowercase);

  from_name.or_else(|| {
    let ext = match upload.content_type.as_deref()? {
      "image/jpeg" => "jpg",
      "image/png" => "png",
      "image/gif" => "gif",
      "image/webp" => "webp",
      "image/svg+xml" => "svg",
      _ => return None,
    };
    Some(ext.to_owned())
  })
}

impl ImageStore for LocalImageStore {
  type Error = Error;

  async fn upload(&self, upload: Upload) -> Result<ImageRef> {
    let id = Uuid::new_v4().simple();
    let key = match extension(&upload) {
      Some(ext) => format!("{id}.{ext}"),
      None => id.to_string(),
    };

    tokio::fs::create_dir_all(&self.root).await?;
    tokio::fs::write(self.root.join(&key), &upload.data).await?;
    debug!(%key, bytes = upload.data.len(), "image stored");

    Ok(ImageRef {
      url: format!("{}/media/{key}", self.base_url),
      key,
    })
  }

  async fn delete_many(&self, keys: Vec<String>) -> Result<()> {
    for key in keys {
      let path = match self.path_for(&key) {
        Ok(path) => path,
        Err(e) => {
          warn!(error = %e, "refusing to delete image");
          continue;
        }
      };
      match tokio::fs::remove_file(&path).await {
        Ok(()) => debug!(%key, "image deleted"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
      }
    }
    Ok(())
  }
}
