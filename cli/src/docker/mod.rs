mod builder;

use imgtask_core::{
	engine::{BuildRequest, Engine, Error, LocalImage},
	ImageReference,
};
use std::{
	cell::Cell,
	process::{Command, ExitStatus, Stdio},
};

/// A wrapper around the docker CLI, or any engine with a compatible command line (e.g. podman).
///
/// The daemon is checked once, right before the first engine call, so configuration errors surface without it.
#[derive(Debug, Clone)]
pub struct Docker {
	program: String,
	connected: Cell<bool>,
}

impl Docker {
	pub fn new(program: impl Into<String>) -> Self {
		Self {
			program: program.into(),
			connected: Cell::new(false),
		}
	}

	fn command(&self) -> Command {
		Command::new(&self.program)
	}

	/// Check if the docker daemon is running.
	///
	/// # Errors
	///
	/// Returns an error if the docker daemon is not running.
	pub fn check_connection(&self) -> Result<(), Error> {
		let status = self
			.command()
			.arg("info")
			.stdout(Stdio::null())
			.stderr(Stdio::null())
			.status()?;

		if !status.success() {
			return Err(Error::NotRunning);
		}

		Ok(())
	}

	fn ensure_connected(&self) -> Result<(), Error> {
		if !self.connected.get() {
			self.check_connection()?;
			self.connected.set(true);
		}

		Ok(())
	}

	/// Run a short command to completion and return its stdout.
	fn capture(&self, command: &'static str, cmd: &mut Command) -> Result<String, Error> {
		tracing::debug!("Running {cmd:?}");
		let output = cmd.stdin(Stdio::null()).output()?;

		if !output.status.success() {
			let stderr = String::from_utf8(output.stderr)?;

			if stderr.contains("No such image") {
				return Err(Error::NotFound);
			}

			return Err(Error::Failed {
				command,
				code: exit_code(output.status),
				message: stderr.trim().to_string(),
			});
		}

		Ok(String::from_utf8(output.stdout)?)
	}
}

impl Engine for Docker {
	fn build(&self, request: &BuildRequest<'_>) -> Result<(), Error> {
		self.ensure_connected()?;
		self.stream("build", self.build_command(request))
	}

	fn tag(&self, source: &ImageReference, target: &ImageReference) -> Result<(), Error> {
		self.ensure_connected()?;
		self.capture(
			"tag",
			self.command()
				.arg("tag")
				.arg(source.to_string())
				.arg(target.to_string()),
		)?;

		Ok(())
	}

	fn list_images(&self, repository: &str) -> Result<Vec<LocalImage>, Error> {
		self.ensure_connected()?;
		let stdout = self.capture(
			"image ls",
			self.command()
				.args(["image", "ls", "--format", "{{json .}}"])
				.arg(repository),
		)?;

		parse_image_list(&stdout)
	}

	fn remove_image(&self, reference: &str) -> Result<(), Error> {
		self.ensure_connected()?;
		self.capture(
			"image rm",
			self.command().args(["image", "rm"]).arg(reference),
		)?;

		Ok(())
	}

	fn push(&self, reference: &ImageReference) -> Result<(), Error> {
		self.ensure_connected()?;
		let mut cmd = self.command();
		cmd.arg("push").arg(reference.to_string());

		self.stream("push", cmd)
	}
}

/// Parse the one-JSON-object-per-line output of `docker image ls --format '{{json .}}'`.
fn parse_image_list(stdout: &str) -> Result<Vec<LocalImage>, Error> {
	stdout
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(|line| serde_json::from_str(line).map_err(Error::from))
		.collect()
}

/// Exit code of a finished child, using the shell's `128 + signal` convention when it was killed.
fn exit_code(status: ExitStatus) -> i32 {
	if let Some(code) = status.code() {
		return code;
	}

	#[cfg(unix)]
	{
		use std::os::unix::process::ExitStatusExt;

		if let Some(signal) = status.signal() {
			return 128 + signal;
		}
	}

	1
}
