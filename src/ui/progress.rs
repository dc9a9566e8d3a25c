//! Progress indicators with CI fallback

use super::context::UiContext;
use crate::loader::ProgressSurface;
use console::style;
use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

/// A task spinner with CI fallback
pub struct TaskSpinner {
    spinner: Option<cliclack::ProgressBar>,
    interactive: bool,
}

impl TaskSpinner {
    /// Create a new spinner (nothing is shown until `start`)
    pub fn new(ctx: &UiContext) -> Self {
        Self {
            spinner: None,
            interactive: ctx.use_fancy_output(),
        }
    }

    /// Start the spinner with a message
    pub fn start(&mut self, message: &str) {
        if self.interactive {
            let spinner = cliclack::spinner();
            spinner.start(message);
            self.spinner = Some(spinner);
        } else {
            println!("{} {}", style("...").dim(), message);
        }
    }

    /// Stop with success message
    pub fn stop(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop(message);
        } else if self.interactive {
            println!("{} {}", style("✓").green(), message);
        } else {
            println!("{} {}", style("[OK]").green(), message);
        }
    }

    /// Stop with error message
    pub fn stop_error(&mut self, message: &str) {
        if let Some(spinner) = self.spinner.take() {
            spinner.error(message);
        } else if self.interactive {
            println!("{} {}", style("✗").red(), message);
        } else {
            println!("{} {}", style("[FAIL]").red(), message);
        }
    }
}

/// Terminal rendering of module load progress.
///
/// An indicatif bar in interactive mode; in CI, plain lines at every
/// quarter of the download plus each status change.
pub struct TerminalSurface {
    bar: Option<ProgressBar>,
    label: String,
    visible: AtomicBool,
    last_quarter: AtomicU8,
}

impl TerminalSurface {
    /// Create a hidden surface for the module named `label`
    pub fn new(ctx: &UiContext, label: &str) -> Self {
        let bar = if ctx.use_fancy_output() {
            let bar = ProgressBar::with_draw_target(Some(100), ProgressDrawTarget::hidden());
            bar.set_style(
                ProgressStyle::default_bar()
                    .template("  {spinner:.blue} Loading {prefix}  {bar:20.blue/dim} {pos:>3}% {msg:.dim}  {elapsed:.dim}")
                    .unwrap_or_else(|_| ProgressStyle::default_bar())
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏ ")
                    .progress_chars("━╸─"),
            );
            bar.set_prefix(label.to_string());
            Some(bar)
        } else {
            None
        };

        Self {
            bar,
            label: label.to_string(),
            visible: AtomicBool::new(false),
            last_quarter: AtomicU8::new(0),
        }
    }

    /// Whether the indicator is currently shown
    pub fn is_visible(&self) -> bool {
        self.visible.load(Ordering::Relaxed)
    }
}

impl ProgressSurface for TerminalSurface {
    fn show(&self) {
        self.visible.store(true, Ordering::Relaxed);
        self.last_quarter.store(0, Ordering::Relaxed);
        if let Some(ref bar) = self.bar {
            bar.set_draw_target(ProgressDrawTarget::stderr());
            bar.enable_steady_tick(std::time::Duration::from_millis(120));
        } else {
            println!("Loading {}...", self.label);
        }
    }

    fn hide(&self) {
        self.visible.store(false, Ordering::Relaxed);
        if let Some(ref bar) = self.bar {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }

    fn set_percent(&self, percent: u8) {
        if let Some(ref bar) = self.bar {
            bar.set_position(u64::from(percent));
            return;
        }

        let quarter = percent / 25;
        if quarter > self.last_quarter.fetch_max(quarter, Ordering::Relaxed) {
            println!("  {}%", percent);
        }
    }

    fn set_status(&self, text: &str) {
        match self.bar {
            Some(ref bar) if self.is_visible() => bar.set_message(text.to_string()),
            _ => println!("  {}", text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spinner_non_interactive() {
        let ctx = UiContext::non_interactive();
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start("Provisioning...");
        spinner.stop("Done");
    }

    #[test]
    fn surface_tracks_visibility() {
        let ctx = UiContext::non_interactive();
        let surface = TerminalSurface::new(&ctx, "app_bg.wasm");
        assert!(!surface.is_visible());

        surface.show();
        assert!(surface.is_visible());
        surface.set_percent(30);
        surface.set_percent(100);
        surface.set_status("Ready");

        surface.hide();
        assert!(!surface.is_visible());
    }
}
