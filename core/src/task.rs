use std::{
	collections::{BTreeMap, BTreeSet},
	path::{Path, PathBuf},
};

use crate::{
	cleanup::{cleanup_candidates, CleanupResult},
	config::{parse_extra_tags, BuildConfig},
	context::{resolve_build_context, BuildContext},
	engine::{self, BuildRequest, Engine},
	errors::Error,
	reference::{compute_reference, ImageReference},
};

/// Label carrying the SHA-256 of the build context an image was built from.
pub const CONTEXT_DIGEST_LABEL: &str = "imgtask.context.digest";

/// What a successful build produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildResult {
	pub reference: ImageReference,
	/// Extra references applied after the build, in alias order.
	pub tags: Vec<ImageReference>,
	pub context_files: usize,
	pub context_digest: String,
}

/// Builds, tags, pushes and cleans up the image described by a [`BuildConfig`].
///
/// Build and cleanup are independent: cleanup never assumes a build ran in the same process.
#[derive(Debug)]
pub struct ImageBuildTask<E> {
	engine: E,
}

impl<E: Engine> ImageBuildTask<E> {
	pub const fn new(engine: E) -> Self {
		Self { engine }
	}

	pub const fn engine(&self) -> &E {
		&self.engine
	}

	/// Validate the configuration, resolve the build context under `root`, then build and tag the image.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] or [`Error::EmptyContext`] before the engine is touched, and
	/// [`Error::BuildFailed`] if the engine fails to build or tag.
	pub fn execute_build(&self, config: &BuildConfig, root: &Path) -> Result<BuildResult, Error> {
		compute_reference(config)?;
		config.extra_tag_references()?;
		dockerfile_path(config, root)?;

		let context = resolve_build_context(root, &config.include)?;
		tracing::info!(
			"Resolved {} file(s) for the build context under {}",
			context.len(),
			root.display()
		);

		self.build(config, &context, &config.extra_tags)
	}

	/// Build the image from an already resolved context and apply `extra_tags` to it.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] for a malformed configuration or extra tag, and
	/// [`Error::BuildFailed`] with the engine's exit code and output if building or tagging fails.
	pub fn build(
		&self,
		config: &BuildConfig,
		context: &BuildContext,
		extra_tags: &BTreeMap<String, String>,
	) -> Result<BuildResult, Error> {
		let reference = compute_reference(config)?;
		let aliases = parse_extra_tags(extra_tags)?;
		let dockerfile = dockerfile_path(config, context.root())?;

		let context_digest = context.digest()?;
		tracing::info!("Building {reference} from context {context_digest}");
		for file in context.files() {
			tracing::debug!("  {}", file.display());
		}

		let mut labels = config.labels.clone();
		labels.insert(CONTEXT_DIGEST_LABEL.to_string(), context_digest.clone());

		let staging = context.stage()?;
		self.engine
			.build(&BuildRequest {
				reference: &reference,
				dockerfile: &dockerfile,
				context_dir: staging.path(),
				build_args: &config.build_args,
				labels: &labels,
				pull: config.pull,
				no_cache: config.no_cache,
			})
			.map_err(build_failed)?;
		drop(staging);

		let mut tags = Vec::with_capacity(aliases.len());
		for (alias, target) in aliases {
			self.engine
				.tag(&reference, &target)
				.map_err(build_failed)?;

			tracing::info!("Tagged {reference} as {target} ({alias})");
			tags.push(target);
		}

		Ok(BuildResult {
			reference,
			tags,
			context_files: context.len(),
			context_digest,
		})
	}

	/// Remove every local tag of `registry/repo_name` except `current_tag` and `keep`.
	///
	/// Every removal is attempted even if an earlier one fails. A reference that disappeared in the meantime
	/// counts as neither removed nor failed, so running this twice in a row is harmless.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] if the repository or tag is malformed, and
	/// [`Error::CleanupPartialFailure`] listing what was and wasn't removed if any removal fails.
	pub fn cleanup_local_images(
		&self,
		registry: &str,
		repo_name: &str,
		current_tag: &str,
		keep: &BTreeSet<String>,
	) -> Result<CleanupResult, Error> {
		let current = ImageReference::new(registry, repo_name, current_tag)?;
		let repository = current.repository();

		let images = self.engine.list_images(&repository)?;
		let plan = cleanup_candidates(&images, current_tag, keep);
		tracing::debug!(
			"Found {} local tag(s) of {repository}, {} to remove",
			images.len(),
			plan.remove.len()
		);

		let mut removed = Vec::new();
		let mut failed = Vec::new();

		for reference in plan.remove {
			match self.engine.remove_image(&reference) {
				Ok(()) => {
					tracing::info!("Removed {reference}");
					removed.push(reference);
				},
				Err(engine::Error::NotFound) => {
					tracing::debug!("{reference} was already gone");
				},
				Err(e) => {
					tracing::warn!("Failed to remove {reference}: {e}");
					failed.push((reference, e.to_string()));
				},
			}
		}

		if !failed.is_empty() {
			return Err(Error::CleanupPartialFailure { removed, failed });
		}

		Ok(CleanupResult {
			removed,
			kept: plan.keep,
		})
	}

	/// Clean up the configured repository, keeping the current version and its retained aliases.
	///
	/// # Errors
	///
	/// See [`ImageBuildTask::cleanup_local_images`].
	pub fn clean(&self, config: &BuildConfig) -> Result<CleanupResult, Error> {
		let reference = compute_reference(config)?;
		let keep = config.retained_tags(&reference)?;

		self.cleanup_local_images(&reference.registry, &reference.repo, &reference.tag, &keep)
	}

	/// Push the current reference followed by every extra tag.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] for a malformed configuration, and [`Error::PushFailed`] for the first
	/// reference the engine fails to push.
	pub fn push(&self, config: &BuildConfig) -> Result<Vec<ImageReference>, Error> {
		let reference = compute_reference(config)?;
		let references = std::iter::once(reference)
			.chain(config.extra_tag_references()?.into_iter().map(|(_, r)| r))
			.collect::<Vec<_>>();

		for reference in &references {
			tracing::info!("Pushing {reference}");

			self.engine.push(reference).map_err(|e| match e {
				engine::Error::Failed { code, message, .. } => Error::PushFailed {
					reference: reference.to_string(),
					exit_code: code,
					message,
				},
				other => Error::Engine(other),
			})?;
		}

		Ok(references)
	}
}

fn build_failed(error: engine::Error) -> Error {
	match error {
		engine::Error::Failed { code, message, .. } => Error::BuildFailed {
			exit_code: code,
			message,
		},
		other => Error::Engine(other),
	}
}

fn dockerfile_path(config: &BuildConfig, root: &Path) -> Result<PathBuf, Error> {
	let path = root.join(&config.dockerfile);

	if !path.is_file() {
		return Err(Error::invalid(
			"dockerfile",
			config.dockerfile.to_string_lossy(),
			format!("no such file under {}", root.display()),
		));
	}

	Ok(path)
}
