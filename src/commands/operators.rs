use anyhow::Result;

use crate::Context;
use crate::operators::standard_registry;
use crate::ui;

pub fn run(ctx: &Context) -> Result<()> {
    let registry = standard_registry(&ctx.config);

    if !ctx.quiet {
        ui::header("Available Operators");
    }
    for line in registry.available_operators() {
        println!("{line}");
    }
    Ok(())
}
