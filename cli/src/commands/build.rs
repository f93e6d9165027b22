use anyhow::Result;

use crate::Context;

pub fn handle(ctx: &Context) -> Result<()> {
	let task = ctx.task();
	let result = task.execute_build(&ctx.config, &ctx.root)?;

	println!("Image built as {}", result.reference);
	for tag in &result.tags {
		println!("Tagged as {tag}");
	}

	Ok(())
}
