use imgtask_core::Error;
use tracing_subscriber::EnvFilter;

/// Send logs to stderr, filtered by `RUST_LOG` when set.
pub fn init_logging(verbose: bool) {
	let default = if verbose {
		"imgtask=debug,imgtask_core=debug"
	} else {
		"imgtask=info,imgtask_core=info"
	};

	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)))
		.with_writer(std::io::stderr)
		.with_target(false)
		.init();
}

#[must_use]
pub fn exit_code(error: &anyhow::Error) -> u8 {
	error.downcast_ref::<Error>().map_or(1, Error::exit_code)
}

pub fn report(error: &anyhow::Error) {
	eprintln!("Error: {error:#}");

	if let Some(Error::CleanupPartialFailure { removed, failed }) = error.downcast_ref::<Error>() {
		for reference in removed {
			eprintln!("  removed {reference}");
		}

		for (reference, reason) in failed {
			eprintln!("  failed  {reference}: {reason}");
		}
	}
}
