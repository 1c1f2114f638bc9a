//! In-memory collaborators for tests.

use std::{
  collections::HashMap,
  sync::{
    Mutex,
    atomic::{AtomicUsize, Ordering},
  },
};

use bytes::Bytes;
use heritage_core::{
  media::{ImageStore, Upload},
  notify::{Email, Mailer},
  staging::ImageRef,
};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct TestError(pub String);

// ─── Images ──────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryImageStore {
  objects:      Mutex<HashMap<String, Bytes>>,
  next:         AtomicUsize,
  fail_uploads: bool,
  /// Fail only the upload with this sequence number.
  fail_at:      Option<usize>,
  fail_deletes: bool,
}

impl MemoryImageStore {
  pub fn failing_uploads() -> Self {
    Self { fail_uploads: true, ..Default::default() }
  }

  pub fn failing_upload_at(n: usize) -> Self {
    Self { fail_at: Some(n), ..Default::default() }
  }

  pub fn failing_deletes() -> Self {
    Self { fail_deletes: true, ..Default::default() }
  }

  pub fn stored_count(&self) -> usize {
    self.objects.lock().unwrap().len()
  }
}

impl ImageStore for MemoryImageStore {
  type Error = TestError;

  async fn upload(&self, upload: Upload) -> Result<ImageRef, TestError> {
    let n = self.next.fetch_add(1, Ordering::SeqCst);
    if self.fail_uploads || self.fail_at == Some(n) {
      return Err(TestError("image store unavailable".into()));
    }
    let key = format!("img-{n}");
    self.objects.lock().unwrap().insert(key.clone(), upload.data);
    Ok(ImageRef {
      url: format!("https://media.test/{key}"),
      key,
    })
  }

  async fn delete_many(&self, keys: Vec<String>) -> Result<(), TestError> {
    if self.fail_deletes {
      return Err(TestError("image store unavailable".into()));
    }
    let mut objects = self.objects.lock().unwrap();
    for key in keys {
      objects.remove(&key);
    }
    Ok(())
  }
}

// ─── Mail ────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingMailer {
  outbox: Mutex<Vec<Email>>,
  fail:   bool,
}

impl RecordingMailer {
  pub fn failing() -> Self {
    Self { fail: true, ..Default::default() }
  }

  pub fn sent(&self) -> Vec<Email> { self.outbox.lock().unwrap().clone() }
}

impl Mailer for RecordingMailer {
  type Error = TestError;

  async fn send(&self, email: Email) -> Result<(), TestError> {
    if self.fail {
      return Err(TestError("smtp down".into()));
    }
    self.outbox.lock().unwrap().push(email);
    Ok(())
  }
}
