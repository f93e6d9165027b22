#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

//! Declarative container image builds.
//!
//! A [`BuildConfig`] describes an image: where it lives, which version it is, which files make up its
//! build context and which extra tags point at it. [`ImageBuildTask`] turns that description into calls
//! against an [`Engine`], and removes stale tags of the same repository on request.

pub use cleanup::{cleanup_candidates, CleanupPlan, CleanupResult};
pub use config::BuildConfig;
pub use context::{resolve_build_context, BuildContext};
pub use engine::{BuildRequest, Engine, LocalImage};
pub use errors::Error;
pub use reference::{compute_reference, ImageReference};
pub use task::{BuildResult, ImageBuildTask, CONTEXT_DIGEST_LABEL};

pub mod cleanup;
pub mod config;
pub mod context;
pub mod engine;
mod errors;
pub mod reference;
pub mod task;

#[cfg(test)]
mod memory;
