use imgtask_core::{BuildConfig, Error};
use std::path::{Path, PathBuf};

/// Values from the command line or environment that win over the configuration file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
	pub registry: Option<String>,
	pub version: Option<String>,
}

/// Load the task configuration and apply overrides.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load(path: &Path, overrides: Overrides) -> Result<BuildConfig, Error> {
	let config = BuildConfig::load(path)?;

	if let Some(version) = &overrides.version {
		tracing::debug!("Overriding version {:?} with {version:?}", config.version);
	}

	Ok(BuildConfig {
		registry: overrides.registry.unwrap_or(config.registry),
		version: overrides.version.unwrap_or(config.version),
		..config
	})
}

/// The directory patterns and the dockerfile are resolved against: `root` if given, otherwise the directory
/// holding the configuration file.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] if the directory does not exist.
pub fn resolve_root(config_path: &Path, root: Option<&Path>) -> Result<PathBuf, Error> {
	let root = root.map_or_else(
		|| {
			config_path
				.parent()
				.filter(|parent| !parent.as_os_str().is_empty())
				.unwrap_or_else(|| Path::new("."))
				.to_path_buf()
		},
		Path::to_path_buf,
	);

	if !root.is_dir() {
		return Err(Error::InvalidConfig {
			field: "root".to_string(),
			value: root.display().to_string(),
			reason: "not a directory".to_string(),
		});
	}

	Ok(root.canonicalize()?)
}
