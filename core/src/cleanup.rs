use std::collections::BTreeSet;

use crate::engine::LocalImage;

/// Which local references a cleanup removes and which it leaves alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupPlan {
	pub remove: Vec<String>,
	pub keep: Vec<String>,
}

/// Outcome of a cleanup run where every removal succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CleanupResult {
	pub removed: Vec<String>,
	pub kept: Vec<String>,
}

impl CleanupResult {
	#[must_use]
	pub fn removed_count(&self) -> usize {
		self.removed.len()
	}
}

/// Split a repository's local images into references to remove and references to keep.
///
/// Everything except `current_tag` and the tags in `keep` is removed. Dangling (`<none>`) entries are skipped
/// entirely since they cannot be addressed by tag. Both lists are sorted and free of duplicates.
#[must_use]
pub fn cleanup_candidates(
	images: &[LocalImage],
	current_tag: &str,
	keep: &BTreeSet<String>,
) -> CleanupPlan {
	let (kept, removed): (BTreeSet<_>, BTreeSet<_>) = images
		.iter()
		.filter(|image| image.is_tagged())
		.map(|image| (image.tag == current_tag || keep.contains(&image.tag), image.reference()))
		.partition(|(retained, _)| *retained);

	CleanupPlan {
		remove: removed.into_iter().map(|(_, reference)| reference).collect(),
		keep: kept.into_iter().map(|(_, reference)| reference).collect(),
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use map_macro::btree_set;

	fn image(tag: &str) -> LocalImage {
		LocalImage {
			repository: "example.com/es-setup".to_string(),
			tag: tag.to_string(),
			id: format!("id-{tag}"),
		}
	}

	#[test]
	fn removes_everything_but_current_and_kept_tags() {
		let images = [image("v1.2.3"), image("v1.2.2"), image("debug"), image("v1.0.0")];

		let plan = cleanup_candidates(&images, "v1.2.3", &btree_set! { "debug".to_string() });

		assert_eq!(
			plan,
			CleanupPlan {
				remove: vec![
					"example.com/es-setup:v1.0.0".to_string(),
					"example.com/es-setup:v1.2.2".to_string(),
				],
				keep: vec![
					"example.com/es-setup:debug".to_string(),
					"example.com/es-setup:v1.2.3".to_string(),
				],
			}
		);
	}

	#[test]
	fn skips_dangling_images_and_duplicates() {
		let images = [image("<none>"), image("v1"), image("v1"), image("v2")];

		let plan = cleanup_candidates(&images, "v2", &BTreeSet::new());

		assert_eq!(plan.remove, ["example.com/es-setup:v1"]);
		assert_eq!(plan.keep, ["example.com/es-setup:v2"]);
	}

	#[test]
	fn nothing_to_do_for_an_empty_store() {
		assert_eq!(
			cleanup_candidates(&[], "v1", &BTreeSet::new()),
			CleanupPlan::default()
		);
	}
}
