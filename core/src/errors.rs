use std::path::PathBuf;

use crate::engine;

/// Errors returned by [`ImageBuildTask`](crate::ImageBuildTask) and the functions it is built from.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("Invalid configuration for `{field}` ({value:?}): {reason}")]
	InvalidConfig {
		field: String,
		value: String,
		reason: String,
	},

	#[error("Failed to load configuration from {}: {message}", .path.display())]
	ConfigFile { path: PathBuf, message: String },

	#[error("No files under {} matched the include patterns {patterns:?}", .root.display())]
	EmptyContext { root: PathBuf, patterns: Vec<String> },

	#[error("Image build failed with exit code {exit_code}: {message}")]
	BuildFailed { exit_code: i32, message: String },

	#[error("Failed to push {reference} (exit code {exit_code}): {message}")]
	PushFailed {
		reference: String,
		exit_code: i32,
		message: String,
	},

	#[error("Cleanup removed {} image(s) but failed to remove {}", .removed.len(), .failed.len())]
	CleanupPartialFailure {
		removed: Vec<String>,
		failed: Vec<(String, String)>,
	},

	#[error(transparent)]
	Engine(#[from] engine::Error),

	#[error("IO error: {0}")]
	Io(#[from] std::io::Error),
}

impl Error {
	pub(crate) fn invalid(
		field: impl Into<String>,
		value: impl Into<String>,
		reason: impl Into<String>,
	) -> Self {
		Self::InvalidConfig {
			field: field.into(),
			value: value.into(),
			reason: reason.into(),
		}
	}

	/// Re-attribute a configuration error to another field, keeping every other error as-is.
	#[must_use]
	pub(crate) fn in_field(self, field: impl Into<String>) -> Self {
		match self {
			Self::InvalidConfig { value, reason, .. } => Self::InvalidConfig {
				field: field.into(),
				value,
				reason,
			},
			other => other,
		}
	}

	/// The process exit code a command-line caller should report for this error.
	#[must_use]
	pub const fn exit_code(&self) -> u8 {
		match self {
			Self::InvalidConfig { .. } | Self::ConfigFile { .. } => 2,
			Self::EmptyContext { .. } => 3,
			Self::BuildFailed { .. } | Self::PushFailed { .. } => 4,
			Self::CleanupPartialFailure { .. } => 5,
			Self::Engine(_) | Self::Io(_) => 1,
		}
	}
}
