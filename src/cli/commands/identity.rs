//! Identity command - print this build's store name

use crate::config::Config;
use crate::error::PrecacheResult;

/// Execute the identity command
pub fn execute(config: &Config) -> PrecacheResult<()> {
    println!("{}", config.identity());
    Ok(())
}
