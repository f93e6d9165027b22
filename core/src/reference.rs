use std::{fmt, str::FromStr};

use crate::{config::BuildConfig, errors::Error};

/// Docker rejects tags longer than this.
const MAX_TAG_LENGTH: usize = 128;

/// A fully-qualified `registry/name:tag` image reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ImageReference {
	pub registry: String,
	pub repo: String,
	pub tag: String,
}

impl ImageReference {
	/// Create a reference from its three segments.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] if any segment is empty or contains characters that are not allowed in it.
	pub fn new(
		registry: impl Into<String>,
		repo: impl Into<String>,
		tag: impl Into<String>,
	) -> Result<Self, Error> {
		let reference = Self {
			registry: registry.into(),
			repo: repo.into(),
			tag: tag.into(),
		};

		validate_registry(&reference.registry)?;
		validate_repo(&reference.repo)?;
		validate_tag("tag", &reference.tag)?;

		Ok(reference)
	}

	/// The `registry/name` part of the reference, without the tag.
	#[must_use]
	pub fn repository(&self) -> String {
		format!("{}/{}", self.registry, self.repo)
	}

	/// Whether both references name the same `registry/name`.
	#[must_use]
	pub fn same_repository(&self, other: &Self) -> bool {
		self.registry.eq_ignore_ascii_case(&other.registry) && self.repo == other.repo
	}
}

impl fmt::Display for ImageReference {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}/{}:{}", self.registry, self.repo, self.tag)
	}
}

impl FromStr for ImageReference {
	type Err = Error;

	fn from_str(reference: &str) -> Result<Self, Self::Err> {
		if reference.chars().any(char::is_whitespace) {
			return Err(Error::invalid(
				"reference",
				reference,
				"must not contain whitespace",
			));
		}

		let (name, tag) = split_tag(reference).ok_or_else(|| {
			Error::invalid("reference", reference, "expected the form registry/name:tag")
		})?;

		let (registry, repo) = name.split_once('/').ok_or_else(|| {
			Error::invalid("reference", reference, "expected the form registry/name:tag")
		})?;

		Self::new(registry, repo, tag).map_err(|e| match e {
			Error::InvalidConfig { reason, .. } => Error::invalid("reference", reference, reason),
			other => other,
		})
	}
}

/// Compute the `registry/repoName:vVersion` reference a configuration builds.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the registry, repository name or version is empty or malformed.
pub fn compute_reference(config: &BuildConfig) -> Result<ImageReference, Error> {
	if config.version.is_empty() {
		return Err(Error::invalid("version", "", "must not be empty"));
	}
	validate_tag("version", &config.version)?;

	ImageReference::new(
		&config.registry,
		&config.repo_name,
		format!("v{}", config.version),
	)
	.map_err(|e| match e {
		Error::InvalidConfig {
			field,
			value,
			reason,
		} if field == "tag" => Error::invalid("version", value, reason),
		other => other,
	})
}

/// Split `name:tag` at the last colon, unless that colon belongs to a registry port (`localhost:5000/app`).
fn split_tag(reference: &str) -> Option<(&str, &str)> {
	let pos = reference.rfind(':')?;
	let tag = &reference[pos + 1..];

	if tag.contains('/') {
		return None;
	}

	Some((&reference[..pos], tag))
}

fn validate_registry(registry: &str) -> Result<(), Error> {
	if registry.is_empty() {
		return Err(Error::invalid("registry", registry, "must not be empty"));
	}

	let (host, port) = match registry.split_once(':') {
		Some((host, port)) => (host, Some(port)),
		None => (registry, None),
	};

	if host.is_empty() {
		return Err(Error::invalid("registry", registry, "host must not be empty"));
	}

	if let Some(c) = host
		.chars()
		.find(|c| !(c.is_ascii_alphanumeric() || *c == '.' || *c == '-'))
	{
		return Err(Error::invalid(
			"registry",
			registry,
			format!("invalid character {c:?}"),
		));
	}

	if host.starts_with(['.', '-']) || host.ends_with(['.', '-']) {
		return Err(Error::invalid(
			"registry",
			registry,
			"host must not start or end with '.' or '-'",
		));
	}

	if let Some(port) = port {
		if port.is_empty() || !port.chars().all(|c| c.is_ascii_digit()) {
			return Err(Error::invalid("registry", registry, "port must be numeric"));
		}
	}

	Ok(())
}

fn validate_repo(repo: &str) -> Result<(), Error> {
	if repo.is_empty() {
		return Err(Error::invalid("repo_name", repo, "must not be empty"));
	}

	for component in repo.split('/') {
		if component.is_empty() {
			return Err(Error::invalid(
				"repo_name",
				repo,
				"path components must not be empty",
			));
		}

		if let Some(c) = component.chars().find(|c| {
			!(c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '_' | '-'))
		}) {
			return Err(Error::invalid(
				"repo_name",
				repo,
				format!("invalid character {c:?}"),
			));
		}

		let is_alphanumeric = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit();
		if !component.starts_with(is_alphanumeric) || !component.ends_with(is_alphanumeric) {
			return Err(Error::invalid(
				"repo_name",
				repo,
				"path components must start and end with a lowercase letter or digit",
			));
		}

		if let Some(separator) = component
			.split(is_alphanumeric)
			.filter(|run| !run.is_empty())
			.find(|run| !is_separator(run))
		{
			return Err(Error::invalid(
				"repo_name",
				repo,
				format!("invalid separator {separator:?}, expected '.', '_', '__' or a run of '-'"),
			));
		}
	}

	Ok(())
}

fn is_separator(run: &str) -> bool {
	matches!(run, "." | "_" | "__") || run.chars().all(|c| c == '-')
}

fn validate_tag(field: &str, tag: &str) -> Result<(), Error> {
	if tag.is_empty() {
		return Err(Error::invalid(field, tag, "must not be empty"));
	}

	if tag.len() > MAX_TAG_LENGTH {
		return Err(Error::invalid(
			field,
			tag,
			format!("tag is {} characters long, max {MAX_TAG_LENGTH}", tag.len()),
		));
	}

	if tag.starts_with(['.', '-']) {
		return Err(Error::invalid(field, tag, "must not start with '.' or '-'"));
	}

	if let Some(c) = tag
		.chars()
		.find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')))
	{
		return Err(Error::invalid(field, tag, format!("invalid character {c:?}")));
	}

	Ok(())
}
