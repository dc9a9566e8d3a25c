//! UI module for consistent CLI output
//!
//! Uses `cliclack` for interactive output and `indicatif` for the module
//! load bar, with automatic fallback to plain output in CI/non-interactive
//! environments.

mod context;
mod output;
mod progress;
mod prompts;
mod theme;

pub use context::UiContext;
pub use output::{
    intro, key_value, outro_success, outro_warn, remark, step_ok, step_ok_detail, step_warn_hint,
};
pub use progress::{TaskSpinner, TerminalSurface};
pub use prompts::confirm;
pub use theme::{init_theme, PrecacheTheme};
