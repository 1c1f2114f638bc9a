//! Recursive deep merge of JSON documents.
//!
//! Precedence is always patch over base:
//!
//! - objects merge key by key, recursively;
//! - arrays and scalars in the patch replace the base value wholesale;
//! - an explicit `null` in the patch removes the key from the base, so the
//!   typed field falls back to its default.
//!
//! Nested siblings the patch does not mention are kept.

use serde::{Serialize, de::DeserializeOwned};
use serde_json::Value;

use crate::{Error, Result};

/// Identity fields that never survive into a merged snapshot.
pub const IDENTITY_FIELDS: &[&str] = &["_id", "__v"];

/// Merge `patch` into `base` in place.
pub fn deep_merge(base: &mut Value, patch: Value) {
  match (base, patch) {
    (Value::Object(base_map), Value::Object(patch_map)) => {
      for (key, patch_val) in patch_map {
        if patch_val.is_null() {
          base_map.remove(&key);
          continue;
        }
        match base_map.get_mut(&key) {
          Some(base_val) => deep_merge(base_val, patch_val),
          None => {
            base_map.insert(key, patch_val);
          }
        }
      }
    }
    (base, patch) => *base = patch,
  }
}

/// Remove [`IDENTITY_FIELDS`] from the top level of an object.
pub fn strip_identity(value: &mut Value) {
  if let Value::Object(map) = value {
    for field in IDENTITY_FIELDS {
      map.remove(*field);
    }
  }
}

/// Merge `patch` over a serialised copy of `base` and read the result back
/// as `T`. A patch that does not fit `T` is a validation error.
pub fn merge_over<T>(base: &T, patch: Value) -> Result<T>
where
  T: Serialize + DeserializeOwned,
{
  let mut doc = serde_json::to_value(base)?;
  deep_merge(&mut doc, patch);
  strip_identity(&mut doc);
  serde_json::from_value(doc).map_err(|e| Error::Validation(e.to_string()))
}
