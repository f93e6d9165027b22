use glob::{MatchOptions, Pattern};
use sha2::{Digest, Sha256};
use std::{
	collections::BTreeSet,
	fs,
	path::{Component, Path, PathBuf},
};
use tempfile::TempDir;

use crate::errors::Error;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
	case_sensitive: true,
	require_literal_separator: true,
	require_literal_leading_dot: false,
};

/// The files sent to the engine for a single build.
///
/// Paths are relative to `root` and kept in lexicographic order, so iterating, hashing and logging the context
/// is reproducible. A context is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
	root: PathBuf,
	files: BTreeSet<PathBuf>,
}

impl BuildContext {
	#[must_use]
	pub fn root(&self) -> &Path {
		&self.root
	}

	pub fn files(&self) -> impl Iterator<Item = &Path> {
		self.files.iter().map(PathBuf::as_path)
	}

	#[must_use]
	pub fn len(&self) -> usize {
		self.files.len()
	}

	#[must_use]
	pub fn is_empty(&self) -> bool {
		self.files.is_empty()
	}

	#[must_use]
	pub fn contains(&self, path: impl AsRef<Path>) -> bool {
		self.files.contains(path.as_ref())
	}

	/// SHA-256 over every file's relative path and contents, in context order, as lowercase hex.
	///
	/// # Errors
	///
	/// Returns an error if any file can no longer be read.
	pub fn digest(&self) -> Result<String, Error> {
		let mut hasher = Sha256::new();

		for file in &self.files {
			let contents = fs::read(self.root.join(file))?;

			hasher.update(file.to_string_lossy().as_bytes());
			hasher.update([0u8]);
			hasher.update((contents.len() as u64).to_be_bytes());
			hasher.update(&contents);
		}

		Ok(hex::encode(hasher.finalize()))
	}

	/// Copy exactly the context files into a fresh temporary directory, preserving their relative layout.
	///
	/// The directory is removed when the returned handle is dropped.
	///
	/// # Errors
	///
	/// Returns an error if the directory cannot be created or a file cannot be copied.
	pub fn stage(&self) -> Result<TempDir, Error> {
		let staging = tempfile::Builder::new()
			.prefix("imgtask-context-")
			.tempdir()?;

		for file in &self.files {
			let destination = staging.path().join(file);

			if let Some(parent) = destination.parent() {
				fs::create_dir_all(parent)?;
			}

			fs::copy(self.root.join(file), &destination)?;
		}

		tracing::debug!(
			"Staged {} file(s) into {}",
			self.files.len(),
			staging.path().display()
		);

		Ok(staging)
	}
}

/// Expand every include pattern against `root` and union the matches.
///
/// `*` never crosses a `/`; `**` spans any number of directories. Only regular files (or symlinks to them)
/// are included, and directories are walked without following symlinks.
///
/// # Errors
///
/// Returns [`Error::InvalidConfig`] for a malformed, absolute or root-escaping pattern, and
/// [`Error::EmptyContext`] if no pattern matched any file.
pub fn resolve_build_context(root: &Path, patterns: &[String]) -> Result<BuildContext, Error> {
	let compiled = patterns
		.iter()
		.map(|pattern| compile(pattern))
		.collect::<Result<Vec<_>, _>>()?;

	let mut candidates = Vec::new();
	walk(root, Path::new(""), &mut candidates)?;

	let mut files = BTreeSet::new();
	for (pattern, compiled) in patterns.iter().zip(&compiled) {
		let before = files.len();

		files.extend(
			candidates
				.iter()
				.filter(|path| compiled.matches_path_with(path, MATCH_OPTIONS))
				.cloned(),
		);

		tracing::debug!(
			"Pattern {pattern:?} added {} file(s) to the build context",
			files.len() - before
		);
	}

	if files.is_empty() {
		return Err(Error::EmptyContext {
			root: root.to_path_buf(),
			patterns: patterns.to_vec(),
		});
	}

	Ok(BuildContext {
		root: root.to_path_buf(),
		files,
	})
}

fn compile(pattern: &str) -> Result<Pattern, Error> {
	let path = Path::new(pattern);

	if pattern.is_empty() {
		return Err(Error::invalid("include", pattern, "must not be empty"));
	}

	if path.has_root() {
		return Err(Error::invalid(
			"include",
			pattern,
			"must be relative to the build root",
		));
	}

	if path.components().any(|c| matches!(c, Component::ParentDir)) {
		return Err(Error::invalid(
			"include",
			pattern,
			"must not escape the build root",
		));
	}

	Pattern::new(pattern.trim_start_matches("./"))
		.map_err(|e| Error::invalid("include", pattern, e.to_string()))
}

/// Collect every file below `dir`, as paths relative to the walk's root.
fn walk(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) -> Result<(), Error> {
	for entry in fs::read_dir(root.join(relative))? {
		let entry = entry?;
		let file_type = entry.file_type()?;
		let path = relative.join(entry.file_name());

		if file_type.is_dir() {
			walk(root, &path, files)?;
		} else if file_type.is_file() || (file_type.is_symlink() && entry.path().is_file()) {
			files.push(path);
		}
	}

	Ok(())
}
