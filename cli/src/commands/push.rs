use anyhow::Result;

use crate::Context;

pub fn handle(ctx: &Context, build: bool) -> Result<()> {
	let task = ctx.task();

	if build {
		let result = task.execute_build(&ctx.config, &ctx.root)?;
		println!("Image built as {}", result.reference);
	}

	for reference in task.push(&ctx.config)? {
		println!("Image '{reference}' pushed");
	}

	Ok(())
}
