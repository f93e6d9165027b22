use imgtask_core::engine::{BuildRequest, Error};
use std::{
	collections::VecDeque,
	io::{self, BufRead, BufReader, Read, Write},
	process::{Command, Stdio},
};

use super::{exit_code, Docker};

/// How many trailing lines of engine output are kept for error messages.
const TAIL_LINES: usize = 20;

impl Docker {
	pub(super) fn build_command(&self, request: &BuildRequest<'_>) -> Command {
		let mut cmd = self.command();

		cmd.arg("build")
			.arg("--file")
			.arg(request.dockerfile)
			.arg("--tag")
			.arg(request.reference.to_string());

		if request.pull {
			cmd.arg("--pull");
		}

		if request.no_cache {
			cmd.arg("--no-cache");
		}

		for (key, value) in request.build_args {
			cmd.arg("--build-arg").arg(format!("{key}={value}"));
		}

		for (key, value) in request.labels {
			cmd.arg("--label").arg(format!("{key}={value}"));
		}

		cmd.arg(request.context_dir).env("DOCKER_BUILDKIT", "1");

		cmd
	}

	/// Run a long command, passing its output through while keeping the tail of stderr for error reporting.
	///
	/// The child shares our process group, so an interrupt from the terminal reaches it as well.
	pub(super) fn stream(&self, command: &'static str, cmd: Command) -> Result<(), Error> {
		stream_to(command, cmd, &mut io::stderr())
	}
}

fn stream_to(
	command: &'static str,
	mut cmd: Command,
	writer: &mut impl Write,
) -> Result<(), Error> {
	tracing::debug!("Running {cmd:?}");

	let mut child = cmd
		.stdin(Stdio::null())
		.stdout(Stdio::inherit())
		.stderr(Stdio::piped())
		.spawn()?;

	let tail = child
		.stderr
		.take()
		.map_or_else(|| Ok(String::new()), |stderr| relay(stderr, writer));

	// Reap the child even when relaying its output failed.
	let status = child.wait()?;
	let tail = tail?;

	if !status.success() {
		return Err(Error::Failed {
			command,
			code: exit_code(status),
			message: tail,
		});
	}

	Ok(())
}

/// Copy `reader` to `writer` line by line and return the last [`TAIL_LINES`] lines.
fn relay(reader: impl Read, writer: &mut impl Write) -> io::Result<String> {
	let mut tail = VecDeque::with_capacity(TAIL_LINES);

	for line in BufReader::new(reader).split(b'\n') {
		let line = String::from_utf8_lossy(&line?).trim_end().to_string();
		writeln!(writer, "{line}")?;

		if tail.len() == TAIL_LINES {
			tail.pop_front();
		}
		tail.push_back(line);
	}

	Ok(Vec::from(tail).join("\n"))
}

#[cfg(test)]
mod tests {
	use super::*;
	use imgtask_core::ImageReference;
	use std::{collections::BTreeMap, path::Path};

	#[test]
	fn build_command_passes_every_option() {
		let reference: ImageReference = "example.com/es-setup:v1.2.3".parse().unwrap();
		let build_args = BTreeMap::from([("ES_VERSION".to_string(), "8.11.0".to_string())]);
		let labels = BTreeMap::from([("imgtask.context.digest".to_string(), "abc".to_string())]);

		let cmd = Docker::new("docker").build_command(&BuildRequest {
			reference: &reference,
			dockerfile: Path::new("/src/docker/es/Dockerfile"),
			context_dir: Path::new("/tmp/imgtask-context-x"),
			build_args: &build_args,
			labels: &labels,
			pull: true,
			no_cache: false,
		});

		let args = cmd
			.get_args()
			.map(|arg| arg.to_string_lossy().into_owned())
			.collect::<Vec<_>>();

		assert_eq!(cmd.get_program(), "docker");
		assert_eq!(
			args,
			[
				"build",
				"--file",
				"/src/docker/es/Dockerfile",
				"--tag",
				"example.com/es-setup:v1.2.3",
				"--pull",
				"--build-arg",
				"ES_VERSION=8.11.0",
				"--label",
				"imgtask.context.digest=abc",
				"/tmp/imgtask-context-x",
			]
		);
	}

	#[test]
	fn relay_keeps_only_the_tail() {
		let input = (1..=TAIL_LINES + 5)
			.map(|i| format!("line {i}"))
			.collect::<Vec<_>>()
			.join("\n");
		let mut echoed = Vec::new();

		let tail = relay(input.as_bytes(), &mut echoed).unwrap();

		assert_eq!(String::from_utf8(echoed).unwrap().lines().count(), TAIL_LINES + 5);
		assert!(tail.starts_with("line 6\n"));
		assert!(tail.ends_with(&format!("line {}", TAIL_LINES + 5)));
		assert_eq!(tail.lines().count(), TAIL_LINES);
	}

	#[cfg(unix)]
	#[test]
	fn failed_stream_carries_exit_code_and_stderr() {
		let docker = Docker::new("sh");
		let mut cmd = Command::new("sh");
		cmd.args(["-c", "echo 'step 1/2' >&2; echo 'failed to solve' >&2; exit 17"]);

		match docker.stream("build", cmd) {
			Err(Error::Failed {
				command,
				code,
				message,
			}) => {
				assert_eq!(command, "build");
				assert_eq!(code, 17);
				assert_eq!(message, "step 1/2\nfailed to solve");
			},
			other => panic!("expected Failed, got {other:?}"),
		}
	}

	#[cfg(unix)]
	#[test]
	fn relay_failure_is_reported_after_the_child_exits() {
		struct Closed;

		impl Write for Closed {
			fn write(&mut self, _: &[u8]) -> io::Result<usize> {
				Err(io::Error::from(io::ErrorKind::BrokenPipe))
			}

			fn flush(&mut self) -> io::Result<()> {
				Ok(())
			}
		}

		let mut cmd = Command::new("sh");
		cmd.args(["-c", "echo 'step 1/2' >&2; exit 17"]);

		match stream_to("build", cmd, &mut Closed) {
			Err(Error::Spawn(e)) => assert_eq!(e.kind(), io::ErrorKind::BrokenPipe),
			other => panic!("expected the relay error, got {other:?}"),
		}
	}
}
