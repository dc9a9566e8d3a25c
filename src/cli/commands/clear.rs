//! Clear command - delete every store in this application's namespace

use crate::cli::args::ClearArgs;
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::ui::{self, UiContext};
use console::style;
use tracing::debug;

/// Execute the clear command
pub async fn execute(args: ClearArgs, config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect().with_auto_yes(args.yes);
    let storage = super::storage(config);
    let identity = config.identity();

    let targets: Vec<String> = storage
        .keys()
        .await?
        .into_iter()
        .filter(|name| identity.owns(name))
        .collect();

    if targets.is_empty() {
        println!("No cache stores to clear.");
        return Ok(());
    }

    println!("This will remove {} cache store(s):", targets.len());
    for name in &targets {
        println!("  {} {}", style("•").red(), name);
    }
    println!();

    if !ui::confirm(&ctx, "Remove these stores?", false).await? {
        println!("Aborted.");
        return Ok(());
    }

    let mut removed = 0;
    for name in &targets {
        debug!("Removing store: {}", name);
        if storage.delete(name).await? {
            removed += 1;
        }
    }

    ui::step_ok(&ctx, &format!("Cleared {} store(s)", removed));
    Ok(())
}
