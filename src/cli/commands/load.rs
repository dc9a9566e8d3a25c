//! Load command - fetch and instantiate the binary module with progress

use crate::cli::args::LoadArgs;
use crate::config::Config;
use crate::error::PrecacheResult;
use crate::loader::{ModuleLoader, ProgressReporter};
use crate::ui::{TerminalSurface, UiContext};

/// Execute the load command
pub async fn execute(args: LoadArgs, config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let module = args.module.unwrap_or_else(|| config.loader.module.clone());
    let host = super::attached_host(config).await?;

    let label = module.rsplit('/').next().unwrap_or(module.as_str());
    let reporter = ProgressReporter::new(TerminalSurface::new(&ctx, label));

    ModuleLoader::new(&host, &module).load(&reporter).await?;
    Ok(())
}
