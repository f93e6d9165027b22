use clap::Args;
use imgtask_core::{BuildConfig, ImageBuildTask};
use std::path::PathBuf;

use crate::{
	config::{self, Overrides},
	docker::Docker,
};

#[derive(Debug, Args)]
pub struct GlobalArgs {
	/// Path to the task configuration file
	#[clap(short, long, global = true, env = "IMGTASK_CONFIG", default_value = "imgtask.toml")]
	pub config: PathBuf,

	/// Directory include patterns and the dockerfile are resolved against [default: the config file's directory]
	#[clap(long, global = true, env = "IMGTASK_ROOT")]
	pub root: Option<PathBuf>,

	/// Override the configured registry
	#[clap(long, global = true, env = "IMGTASK_REGISTRY")]
	pub registry: Option<String>,

	/// Override the configured image version
	#[clap(long, global = true, env = "IMGTASK_VERSION")]
	pub image_version: Option<String>,

	/// Container engine binary to invoke
	#[clap(long, global = true, env = "IMGTASK_ENGINE", default_value = "docker")]
	pub engine: String,

	/// Log debug output
	#[clap(short, long, global = true)]
	pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct Context {
	pub root: PathBuf,
	pub config: BuildConfig,
	engine: String,
}

impl Context {
	/// Create a new context
	///
	/// # Errors
	///
	/// This function will return an error if the configuration cannot be loaded or the build root does not exist.
	pub fn new(args: &GlobalArgs) -> Result<Self, imgtask_core::Error> {
		let config = config::load(
			&args.config,
			Overrides {
				registry: args.registry.clone(),
				version: args.image_version.clone(),
			},
		)?;
		let root = config::resolve_root(&args.config, args.root.as_deref())?;

		tracing::debug!("Using build root {}", root.display());

		Ok(Self {
			root,
			config,
			engine: args.engine.clone(),
		})
	}

	/// Wrap the configured container engine in a task. The engine is contacted on first use.
	#[must_use]
	pub fn task(&self) -> ImageBuildTask<Docker> {
		ImageBuildTask::new(Docker::new(&self.engine))
	}
}
