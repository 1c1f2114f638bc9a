//! Core types and trait definitions for the heritage registry.
//!
//! This crate is deliberately free of HTTP and database dependencies. It
//! holds the canonical and staged record types, the review state machine,
//! the deep merge and diff engines, and the collaborator traits that the
//! storage, media and mail backends implement.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod diff;
pub mod error;
pub mod media;
pub mod merge;
pub mod notify;
pub mod site;
pub mod staging;
pub mod store;
pub mod submission;
pub mod user;

pub use error::{Error, Result};
