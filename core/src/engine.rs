use serde::Deserialize;
use std::{collections::BTreeMap, path::Path};

use crate::reference::ImageReference;

/// Errors that can occur when talking to the container engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Could not connect to the container engine. Is the daemon running?")]
	NotRunning,

	#[error("The provided image could not be found.")]
	NotFound,

	#[error("`{command}` exited with code {code}: {message}")]
	Failed {
		command: &'static str,
		code: i32,
		message: String,
	},

	#[error("Failed to run command: {0}")]
	Spawn(#[from] std::io::Error),

	#[error("Failed to parse output from command: {0}")]
	ToString(#[from] std::string::FromUtf8Error),

	#[error("Failed to parse output from command: {0}")]
	Deserialize(#[from] serde_json::Error),
}

/// Everything the engine needs to build one image.
#[derive(Debug, Clone, Copy)]
pub struct BuildRequest<'a> {
	pub reference: &'a ImageReference,
	pub dockerfile: &'a Path,
	pub context_dir: &'a Path,
	pub build_args: &'a BTreeMap<String, String>,
	pub labels: &'a BTreeMap<String, String>,
	pub pull: bool,
	pub no_cache: bool,
}

/// An image in the engine's local store, as listed by `docker image ls`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LocalImage {
	#[serde(rename = "Repository")]
	pub repository: String,
	#[serde(rename = "Tag")]
	pub tag: String,
	#[serde(rename = "ID")]
	pub id: String,
}

impl LocalImage {
	/// Dangling images are listed with a `<none>` tag and can only be addressed by ID.
	#[must_use]
	pub fn is_tagged(&self) -> bool {
		self.tag != "<none>"
	}

	#[must_use]
	pub fn reference(&self) -> String {
		format!("{}:{}", self.repository, self.tag)
	}
}

/// The operations an image build task needs from a container engine.
///
/// Every call blocks until the engine is done. Implementations don't coordinate with other processes touching
/// the same image store.
pub trait Engine {
	/// Build an image and tag it with `request.reference`.
	///
	/// # Errors
	///
	/// Returns [`Error::Failed`] with the engine's exit code if the build fails.
	fn build(&self, request: &BuildRequest<'_>) -> Result<(), Error>;

	/// Point `target` at the image currently tagged `source`.
	///
	/// # Errors
	///
	/// Returns an error if the engine rejects the tag.
	fn tag(&self, source: &ImageReference, target: &ImageReference) -> Result<(), Error>;

	/// List every locally stored image of `repository` (a `registry/name` without tag).
	///
	/// # Errors
	///
	/// Returns an error if the engine cannot be queried or its output cannot be parsed.
	fn list_images(&self, repository: &str) -> Result<Vec<LocalImage>, Error>;

	/// Remove a single `registry/name:tag` from the local store.
	///
	/// # Errors
	///
	/// Returns [`Error::NotFound`] if the reference no longer exists, or another error if the engine refuses.
	fn remove_image(&self, reference: &str) -> Result<(), Error>;

	/// Push a reference to its registry.
	///
	/// # Errors
	///
	/// Returns [`Error::Failed`] with the engine's exit code if the push fails.
	fn push(&self, reference: &ImageReference) -> Result<(), Error>;
}
