//! The `ImageStore` trait: object storage for submitted images.

use std::future::Future;

use bytes::Bytes;

use crate::staging::ImageRef;

/// One image received with a submission.
#[derive(Debug, Clone)]
pub struct Upload {
  pub file_name:    Option<String>,
  pub content_type: Option<String>,
  pub data:         Bytes,
}

/// Abstraction over the object storage that hosts site images.
pub trait ImageStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Store one image and return its public URL together with the key needed
  /// to delete it later.
  fn upload(
    &self,
    upload: Upload,
  ) -> impl Future<Output = Result<ImageRef, Self::Error>> + Send + '_;

  /// Delete images by storage key. Unknown keys are ignored.
  fn delete_many(
    &self,
    keys: Vec<String>,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
