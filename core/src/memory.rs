//! An in-process image store used to exercise the task without a container engine.

use std::{
	cell::{Cell, RefCell},
	collections::{BTreeMap, BTreeSet},
	fs,
	path::{Path, PathBuf},
};

use crate::{
	engine::{BuildRequest, Engine, Error, LocalImage},
	reference::ImageReference,
};

#[derive(Debug, Default)]
pub struct MemoryEngine {
	/// `registry/name:tag` → image ID.
	images: RefCell<BTreeMap<String, String>>,
	builds: Cell<usize>,
	staged: RefCell<Vec<PathBuf>>,
	labels: RefCell<BTreeMap<String, String>>,
	pushed: RefCell<Vec<String>>,
	build_failure: Option<(i32, String)>,
	undeletable: BTreeSet<String>,
}

impl MemoryEngine {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn failing_builds(code: i32, message: &str) -> Self {
		Self {
			build_failure: Some((code, message.to_string())),
			..Self::default()
		}
	}

	pub fn with_undeletable(mut self, reference: &str) -> Self {
		self.undeletable.insert(reference.to_string());
		self
	}

	pub fn with_image(self, reference: &str) -> Self {
		let id = format!("sha256:{}", self.images.borrow().len());
		self.images.borrow_mut().insert(reference.to_string(), id);
		self
	}

	pub fn contains(&self, reference: &str) -> bool {
		self.images.borrow().contains_key(reference)
	}

	pub fn references(&self) -> Vec<String> {
		self.images.borrow().keys().cloned().collect()
	}

	pub fn builds(&self) -> usize {
		self.builds.get()
	}

	pub fn staged(&self) -> Vec<PathBuf> {
		self.staged.borrow().clone()
	}

	pub fn labels(&self) -> BTreeMap<String, String> {
		self.labels.borrow().clone()
	}

	pub fn pushed(&self) -> Vec<String> {
		self.pushed.borrow().clone()
	}
}

fn list_files(root: &Path, relative: &Path, files: &mut Vec<PathBuf>) {
	for entry in fs::read_dir(root.join(relative)).unwrap() {
		let entry = entry.unwrap();
		let path = relative.join(entry.file_name());

		if entry.file_type().unwrap().is_dir() {
			list_files(root, &path, files);
		} else {
			files.push(path);
		}
	}
}

impl Engine for MemoryEngine {
	fn build(&self, request: &BuildRequest<'_>) -> Result<(), Error> {
		self.builds.set(self.builds.get() + 1);

		if let Some((code, message)) = &self.build_failure {
			return Err(Error::Failed {
				command: "build",
				code: *code,
				message: message.clone(),
			});
		}

		assert!(request.dockerfile.is_file(), "dockerfile must exist");

		let mut staged = Vec::new();
		list_files(request.context_dir, Path::new(""), &mut staged);
		staged.sort();
		*self.staged.borrow_mut() = staged;
		*self.labels.borrow_mut() = request.labels.clone();

		let id = format!("sha256:build-{}", self.builds.get());
		self.images
			.borrow_mut()
			.insert(request.reference.to_string(), id);

		Ok(())
	}

	fn tag(&self, source: &ImageReference, target: &ImageReference) -> Result<(), Error> {
		let id = self
			.images
			.borrow()
			.get(&source.to_string())
			.cloned()
			.ok_or(Error::NotFound)?;

		self.images.borrow_mut().insert(target.to_string(), id);
		Ok(())
	}

	fn list_images(&self, repository: &str) -> Result<Vec<LocalImage>, Error> {
		Ok(self
			.images
			.borrow()
			.iter()
			.filter_map(|(reference, id)| {
				let (name, tag) = reference.rsplit_once(':')?;

				(name == repository).then(|| LocalImage {
					repository: name.to_string(),
					tag: tag.to_string(),
					id: id.clone(),
				})
			})
			.collect())
	}

	fn remove_image(&self, reference: &str) -> Result<(), Error> {
		if self.undeletable.contains(reference) {
			return Err(Error::Failed {
				command: "image rm",
				code: 1,
				message: format!("conflict: unable to remove {reference}: image is in use"),
			});
		}

		self.images
			.borrow_mut()
			.remove(reference)
			.map(drop)
			.ok_or(Error::NotFound)
	}

	fn push(&self, reference: &ImageReference) -> Result<(), Error> {
		if !self.contains(&reference.to_string()) {
			return Err(Error::Failed {
				command: "push",
				code: 1,
				message: format!("An image does not exist locally with the tag: {reference}"),
			});
		}

		self.pushed.borrow_mut().push(reference.to_string());
		Ok(())
	}
}
