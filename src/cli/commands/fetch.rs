//! Fetch command - answer one request cache-first

use crate::cli::args::FetchArgs;
use crate::config::Config;
use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::Request;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

/// Execute the fetch command
pub async fn execute(args: FetchArgs, config: &Config) -> PrecacheResult<()> {
    let host = super::attached_host(config).await?;
    let request = Request::new(&args.method, args.path.as_str());

    let response = host.fetch(&request).await?;
    if !response.is_success() {
        warn!("{} {} returned HTTP {}", request.method, request.path, response.status);
    }

    match args.output {
        Some(path) => {
            tokio::fs::write(&path, &response.body)
                .await
                .map_err(|e| PrecacheError::io(format!("writing {}", path.display()), e))?;
            info!("Wrote {} bytes to {}", response.body.len(), path.display());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout
                .write_all(&response.body)
                .await
                .map_err(|e| PrecacheError::io("writing response to stdout", e))?;
            stdout
                .flush()
                .await
                .map_err(|e| PrecacheError::io("flushing stdout", e))?;
        }
    }

    Ok(())
}
