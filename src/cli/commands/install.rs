//! Install command - provision and activate this build's store

use crate::config::Config;
use crate::error::PrecacheResult;
use crate::host::LifecycleHost;
use crate::ui::{self, TaskSpinner, UiContext};

/// Execute the install command
pub async fn execute(config: &Config) -> PrecacheResult<()> {
    let ctx = UiContext::detect();
    let network = super::network(config)?;
    let controller = super::controller(config, super::storage(config), network.clone())?;
    let identity = controller.identity().clone();
    let assets = controller.manifest().len();

    ui::intro(&ctx, "precache install");
    ui::key_value(&ctx, "Origin", &config.origin.base_url);
    ui::key_value(&ctx, "Store", &identity.name());

    let mut host = LifecycleHost::new(network);
    let mut spinner = TaskSpinner::new(&ctx);
    spinner.start(&format!("Provisioning {} assets...", assets));

    if let Err(e) = host.install(controller).await {
        spinner.stop_error("Provisioning failed");
        return Err(e);
    }
    spinner.stop(&format!("Cached {} assets", assets));

    let report = host.activate().await?;
    for name in &report.deleted {
        ui::step_ok_detail(&ctx, "Removed stale store", name);
    }
    for (name, reason) in &report.failed {
        ui::step_warn_hint(&ctx, &format!("Could not remove {}", name), reason);
    }

    if report.is_clean() {
        ui::outro_success(&ctx, &format!("{} is active", identity));
    } else {
        ui::outro_warn(
            &ctx,
            &format!("{} is active; some stale stores remain", identity),
        );
    }

    Ok(())
}
