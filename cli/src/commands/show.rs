use anyhow::Result;
use imgtask_core::{compute_reference, resolve_build_context};

use crate::Context;

pub fn handle(ctx: &Context) -> Result<()> {
	let reference = compute_reference(&ctx.config)?;
	let aliases = ctx.config.extra_tag_references()?;
	let context = resolve_build_context(&ctx.root, &ctx.config.include)?;

	println!("reference  {reference}");
	for (alias, target) in &aliases {
		println!("tag        {target} ({alias})");
	}
	println!("dockerfile {}", ctx.config.dockerfile.display());
	println!("root       {}", ctx.root.display());
	println!("digest     {}", context.digest()?);
	println!("files      {}", context.len());
	for file in context.files() {
		println!("  {}", file.display());
	}

	Ok(())
}
