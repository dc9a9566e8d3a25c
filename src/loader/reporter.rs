//! Load progress hooks and the reporter that renders them

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Download progress reported by the loader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Bytes received so far
    pub current: u64,
    /// Expected total bytes, 0 when unknown
    pub total: u64,
}

impl ProgressEvent {
    /// Rounded percentage, or `None` when the total is unknown
    pub fn percentage(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let pct = (self.current as f64 / self.total as f64 * 100.0).round();
        Some(pct.clamp(0.0, 100.0) as u8)
    }
}

/// Callbacks a module loader invokes while fetching and instantiating
pub trait LoaderHooks {
    /// Loading began
    fn on_start(&self);
    /// Bytes arrived
    fn on_progress(&self, event: ProgressEvent);
    /// Download finished, instantiation follows
    fn on_complete(&self);
    /// Module is instantiated and ready
    fn on_success(&self);
    /// Something in the sequence failed
    fn on_failure(&self, error: &str);
}

/// UI handles the reporter drives
pub trait ProgressSurface {
    /// Reveal the progress indicator
    fn show(&self);
    /// Hide the progress indicator
    fn hide(&self);
    /// Update the percentage display
    fn set_percent(&self, percent: u8);
    /// Replace the status text
    fn set_status(&self, text: &str);
}

/// Translates loader hooks into surface updates
///
/// Failure and success are exclusive per load: once `on_failure` fired, a
/// later `on_success` is ignored until the next `on_start`.
pub struct ProgressReporter<S> {
    surface: S,
    failed: AtomicBool,
}

impl<S: ProgressSurface> ProgressReporter<S> {
    pub fn new(surface: S) -> Self {
        Self {
            surface,
            failed: AtomicBool::new(false),
        }
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }
}

impl<S: ProgressSurface> LoaderHooks for ProgressReporter<S> {
    fn on_start(&self) {
        self.failed.store(false, Ordering::Relaxed);
        self.surface.show();
        self.surface.set_status("Downloading module...");
    }

    fn on_progress(&self, event: ProgressEvent) {
        if let Some(pct) = event.percentage() {
            self.surface.set_percent(pct);
        }
    }

    fn on_complete(&self) {
        self.surface.set_status("Download complete, instantiating...");
    }

    fn on_success(&self) {
        if self.failed.load(Ordering::Relaxed) {
            return;
        }
        self.surface.set_status("Ready");
        self.surface.hide();
    }

    fn on_failure(&self, error: &str) {
        self.failed.store(true, Ordering::Relaxed);
        self.surface.hide();
        self.surface.set_status(&format!("Failed to load module: {}", error));
    }
}
