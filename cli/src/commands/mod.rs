use clap::Subcommand;

use crate::Context;

#[derive(Debug, Subcommand)]
pub enum Command {
	/// Build the image from its include patterns and apply its extra tags
	Build,

	/// Remove local tags of the image's repository, keeping the current version and its aliases
	Clean,

	/// Push the image and its extra tags through the container engine
	Push {
		/// Build the image before pushing it
		#[clap(long)]
		build: bool,
	},

	/// Print the image reference and resolved build context without contacting the engine
	Show,
}

mod build;
mod clean;
mod push;
mod show;

pub fn exec(ctx: &Context, command: &Command) -> anyhow::Result<()> {
	match command {
		Command::Build => build::handle(ctx),
		Command::Clean => clean::handle(ctx),
		Command::Push { build } => push::handle(ctx, *build),
		Command::Show => show::handle(ctx),
	}
}
