//! Interactive prompts with CI/non-interactive fallback

use super::context::UiContext;
use crate::error::{PrecacheError, PrecacheResult};

/// Prompt for confirmation, returns default if non-interactive or auto-yes
pub async fn confirm(ctx: &UiContext, message: &str, default: bool) -> PrecacheResult<bool> {
    if ctx.auto_yes() {
        return Ok(true);
    }

    if !ctx.is_interactive() {
        return Ok(default);
    }

    let message = message.to_string();
    let result = tokio::task::spawn_blocking(move || {
        cliclack::confirm(&message).initial_value(default).interact()
    })
    .await
    .map_err(|e| PrecacheError::Internal(format!("Prompt task failed: {}", e)))?;

    result.map_err(|e| PrecacheError::io("reading confirmation", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn confirm_auto_yes() {
        let ctx = UiContext::non_interactive().with_auto_yes(true);
        assert!(confirm(&ctx, "Delete?", false).await.unwrap());
    }

    #[tokio::test]
    async fn confirm_non_interactive_uses_default() {
        let ctx = UiContext::non_interactive();
        assert!(!confirm(&ctx, "Delete?", false).await.unwrap());
        assert!(confirm(&ctx, "Delete?", true).await.unwrap());
    }
}
