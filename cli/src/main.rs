#![warn(clippy::all, clippy::pedantic, clippy::nursery)]

use clap::Parser;
use context::{Context, GlobalArgs};
use std::process::ExitCode;

mod commands;
mod config;
mod context;
mod docker;
mod helpers;

#[derive(Debug, Parser)]
#[clap(name = "imgtask", version, about)]
struct Cli {
	#[clap(flatten)]
	global: GlobalArgs,

	#[clap(subcommand)]
	command: commands::Command,
}

fn main() -> ExitCode {
	let cli = Cli::parse();
	helpers::init_logging(cli.global.verbose);

	match run(&cli) {
		Ok(()) => ExitCode::SUCCESS,
		Err(error) => {
			helpers::report(&error);
			ExitCode::from(helpers::exit_code(&error))
		},
	}
}

fn run(cli: &Cli) -> anyhow::Result<()> {
	let ctx = Context::new(&cli.global)?;

	commands::exec(&ctx, &cli.command)
}
