use serde::Deserialize;
use std::{
	collections::{BTreeMap, BTreeSet},
	fs,
	path::{Path, PathBuf},
};

use crate::{errors::Error, reference::ImageReference};

/// Everything needed to build, tag and clean up one image.
///
/// Read once at startup and never mutated afterwards; command-line overrides are applied by building a new
/// value with struct update syntax.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BuildConfig {
	pub registry: String,
	pub repo_name: String,
	pub version: String,

	/// Path of the Dockerfile, relative to the build root.
	#[serde(default = "default_dockerfile")]
	pub dockerfile: PathBuf,

	/// Glob patterns, relative to the build root, selecting the files sent as build context.
	#[serde(default)]
	pub include: Vec<String>,

	/// Additional references pointing at the built image, keyed by alias (e.g. `Debug`).
	#[serde(default)]
	pub extra_tags: BTreeMap<String, String>,

	/// Tags of this repository that cleanup must never remove.
	#[serde(default)]
	pub keep_tags: BTreeSet<String>,

	#[serde(default)]
	pub build_args: BTreeMap<String, String>,

	#[serde(default)]
	pub labels: BTreeMap<String, String>,

	/// Always attempt to pull a newer version of the base image.
	#[serde(default)]
	pub pull: bool,

	#[serde(default)]
	pub no_cache: bool,
}

fn default_dockerfile() -> PathBuf {
	PathBuf::from("Dockerfile")
}

impl Default for BuildConfig {
	fn default() -> Self {
		Self {
			registry: String::new(),
			repo_name: String::new(),
			version: String::new(),
			dockerfile: default_dockerfile(),
			include: Vec::new(),
			extra_tags: BTreeMap::new(),
			keep_tags: BTreeSet::new(),
			build_args: BTreeMap::new(),
			labels: BTreeMap::new(),
			pull: false,
			no_cache: false,
		}
	}
}

impl BuildConfig {
	/// Load a configuration from a TOML file.
	///
	/// # Errors
	///
	/// Returns [`Error::ConfigFile`] if the file cannot be read or is not a valid configuration.
	pub fn load(path: &Path) -> Result<Self, Error> {
		let content = fs::read_to_string(path).map_err(|e| Error::ConfigFile {
			path: path.to_path_buf(),
			message: e.to_string(),
		})?;

		Self::from_toml(&content).map_err(|message| Error::ConfigFile {
			path: path.to_path_buf(),
			message,
		})
	}

	fn from_toml(content: &str) -> Result<Self, String> {
		let deserializer = toml::de::Deserializer::new(content);
		let mut unknown = Vec::new();

		let config: Self = serde_ignored::deserialize(deserializer, |path| {
			unknown.push(path.to_string());
		})
		.map_err(|e| e.to_string())?;

		for key in unknown {
			tracing::warn!("Ignoring unknown configuration key `{key}`");
		}

		Ok(config)
	}

	/// Parse every `extra_tags` entry into a reference, in alias order.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] naming the alias if any entry is not a valid `registry/name:tag`.
	pub fn extra_tag_references(&self) -> Result<Vec<(String, ImageReference)>, Error> {
		parse_extra_tags(&self.extra_tags)
	}

	/// The tags of `reference`'s repository that cleanup keeps: the current tag, every `keep_tags` entry, and
	/// the tag of each extra tag that points into the same repository.
	///
	/// # Errors
	///
	/// Returns [`Error::InvalidConfig`] if an extra tag cannot be parsed.
	pub fn retained_tags(&self, reference: &ImageReference) -> Result<BTreeSet<String>, Error> {
		let mut retained = self.keep_tags.clone();
		retained.insert(reference.tag.clone());

		for (alias, target) in self.extra_tag_references()? {
			if target.same_repository(reference) {
				tracing::debug!("Keeping tag {} of alias {alias}", target.tag);
				retained.insert(target.tag);
			}
		}

		Ok(retained)
	}
}

pub(crate) fn parse_extra_tags(
	extra_tags: &BTreeMap<String, String>,
) -> Result<Vec<(String, ImageReference)>, Error> {
	extra_tags
		.iter()
		.map(|(alias, literal)| {
			literal
				.parse::<ImageReference>()
				.map(|reference| (alias.clone(), reference))
				.map_err(|e| e.in_field(format!("extra_tags.{alias}")))
		})
		.collect()
}

#[cfg(test)]
mod tests {
	use super::*;
	use indoc::indoc;
	use map_macro::{btree_map, btree_set};

	#[test]
	fn parses_full_configuration() {
		let config = BuildConfig::from_toml(indoc! {r#"
			registry = "example.com"
			repo_name = "es-setup"
			version = "1.2.3"
			dockerfile = "docker/es/Dockerfile"
			include = ["docker/es/*", "index/**"]
			keep_tags = ["stable"]
			pull = true

			[extra_tags]
			Debug = "example.com/es-setup:debug"

			[build_args]
			ES_VERSION = "8.11.0"

			[labels]
			"org.opencontainers.image.title" = "es-setup"
		"#})
		.unwrap();

		assert_eq!(
			config,
			BuildConfig {
				registry: "example.com".to_string(),
				repo_name: "es-setup".to_string(),
				version: "1.2.3".to_string(),
				dockerfile: PathBuf::from("docker/es/Dockerfile"),
				include: vec!["docker/es/*".to_string(), "index/**".to_string()],
				extra_tags: btree_map! {
					"Debug".to_string() => "example.com/es-setup:debug".to_string(),
				},
				keep_tags: btree_set! { "stable".to_string() },
				build_args: btree_map! {
					"ES_VERSION".to_string() => "8.11.0".to_string(),
				},
				labels: btree_map! {
					"org.opencontainers.image.title".to_string() => "es-setup".to_string(),
				},
				pull: true,
				no_cache: false,
			}
		);
	}

	#[test]
	fn optional_fields_default() {
		let config = BuildConfig::from_toml(indoc! {r#"
			registry = "example.com"
			repo_name = "es-setup"
			version = "1.2.3"
		"#})
		.unwrap();

		assert_eq!(config.dockerfile, PathBuf::from("Dockerfile"));
		assert!(config.include.is_empty());
		assert!(config.extra_tags.is_empty());
		assert!(!config.pull);
	}

	#[test]
	fn missing_required_field_is_an_error() {
		let error = BuildConfig::from_toml(indoc! {r#"
			registry = "example.com"
			version = "1.2.3"
		"#})
		.unwrap_err();

		assert!(error.contains("repo_name"), "{error}");
	}

	#[test]
	fn load_reports_the_path() {
		let missing = Path::new("/definitely/not/here/imgtask.toml");

		match BuildConfig::load(missing) {
			Err(Error::ConfigFile { path, .. }) => assert_eq!(path, missing),
			other => panic!("expected ConfigFile error, got {other:?}"),
		}
	}

	#[test]
	fn invalid_extra_tag_names_its_alias() {
		let config = BuildConfig {
			extra_tags: btree_map! { "Debug".to_string() => "es-setup debug".to_string() },
			..BuildConfig::default()
		};

		match config.extra_tag_references() {
			Err(Error::InvalidConfig { field, .. }) => assert_eq!(field, "extra_tags.Debug"),
			other => panic!("expected InvalidConfig, got {other:?}"),
		}
	}

	#[test]
	fn retained_tags_include_current_keep_and_same_repo_aliases() {
		let config = BuildConfig {
			registry: "example.com".to_string(),
			repo_name: "es-setup".to_string(),
			version: "1.2.3".to_string(),
			extra_tags: btree_map! {
				"Debug".to_string() => "example.com/es-setup:debug".to_string(),
				"Mirror".to_string() => "mirror.example.com/es-setup:latest".to_string(),
			},
			keep_tags: btree_set! { "stable".to_string() },
			..BuildConfig::default()
		};
		let reference = crate::compute_reference(&config).unwrap();

		assert_eq!(
			config.retained_tags(&reference).unwrap(),
			btree_set! { "debug".to_string(), "stable".to_string(), "v1.2.3".to_string() }
		);
	}
}
