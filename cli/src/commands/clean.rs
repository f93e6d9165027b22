use anyhow::Result;

use crate::Context;

pub fn handle(ctx: &Context) -> Result<()> {
	let task = ctx.task();
	let result = task.clean(&ctx.config)?;

	for reference in &result.removed {
		println!("Removed {reference}");
	}

	println!(
		"Removed {} image(s), kept {}",
		result.removed_count(),
		result.kept.len()
	);

	Ok(())
}
