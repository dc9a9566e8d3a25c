//! Lifecycle host
//!
//! Bridges install/activate/fetch events to controller phase methods and
//! enforces the hand-over rules between versions: at most one active
//! controller, a candidate only takes over after provisioning finished, and
//! a failed install never disturbs the version already serving.

use crate::controller::{CacheController, ControllerState, ReconcileReport};
use crate::error::{PrecacheError, PrecacheResult};
use crate::fetch::{Fetcher, Request, Response};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lifecycle events delivered by the runtime
#[derive(Debug, Clone)]
pub enum LifecycleEvent {
    /// Provision the waiting candidate
    Install,
    /// Promote the waiting candidate
    Activate,
    /// Answer one request
    Fetch(Request),
}

/// Result of dispatching a [`LifecycleEvent`]
#[derive(Debug)]
pub enum EventOutcome {
    Installed,
    Activated(ReconcileReport),
    Responded(Response),
}

/// Owns the active controller and at most one candidate
pub struct LifecycleHost {
    network: Arc<dyn Fetcher>,
    active: Option<CacheController>,
    candidate: Option<CacheController>,
}

impl LifecycleHost {
    /// Create a host with no controllers; requests go to `network`
    pub fn new(network: Arc<dyn Fetcher>) -> Self {
        Self {
            network,
            active: None,
            candidate: None,
        }
    }

    /// The controller currently intercepting requests
    pub fn active(&self) -> Option<&CacheController> {
        self.active.as_ref()
    }

    /// A provisioned or pending controller waiting to take over
    pub fn candidate(&self) -> Option<&CacheController> {
        self.candidate.as_ref()
    }

    /// Register a new controller as the install candidate
    ///
    /// Replaces any earlier candidate that has not activated yet.
    pub fn register(&mut self, controller: CacheController) {
        if let Some(previous) = self.candidate.replace(controller) {
            debug!("Discarding waiting candidate {}", previous.identity());
        }
    }

    /// Provision a controller; on success it waits to be activated.
    ///
    /// On failure the candidate is discarded and the active controller, if
    /// any, keeps serving.
    pub async fn install(&mut self, controller: CacheController) -> PrecacheResult<()> {
        self.register(controller);
        self.dispatch(LifecycleEvent::Install).await.map(|_| ())
    }

    /// Promote the installed candidate and retire the previous controller
    pub async fn activate(&mut self) -> PrecacheResult<ReconcileReport> {
        match self.dispatch(LifecycleEvent::Activate).await? {
            EventOutcome::Activated(report) => Ok(report),
            _ => Err(PrecacheError::Internal("unexpected activation outcome".into())),
        }
    }

    /// Install and immediately activate a controller
    pub async fn deploy(&mut self, controller: CacheController) -> PrecacheResult<ReconcileReport> {
        self.install(controller).await?;
        self.activate().await
    }

    /// Adopt a controller whose store an earlier run already provisioned
    pub async fn resume(&mut self, mut controller: CacheController) -> PrecacheResult<()> {
        controller.resume().await?;
        self.retire_active();
        self.active = Some(controller);
        Ok(())
    }

    /// Route a request through the active controller, or straight to the
    /// network when none is active
    pub async fn fetch(&self, request: &Request) -> PrecacheResult<Response> {
        match &self.active {
            Some(controller) => controller.intercept(request).await,
            None => {
                debug!("No active controller, passing {} through", request.path);
                self.network.fetch(request).await
            }
        }
    }

    /// Dispatch one lifecycle event
    pub async fn dispatch(&mut self, event: LifecycleEvent) -> PrecacheResult<EventOutcome> {
        match event {
            LifecycleEvent::Install => {
                let mut candidate = self.candidate.take().ok_or(PrecacheError::NothingInstalled)?;
                if let Err(e) = candidate.provision().await {
                    if let Some(active) = &self.active {
                        warn!("Install failed, {} keeps serving", active.identity());
                    }
                    return Err(e);
                }
                self.candidate = Some(candidate);
                Ok(EventOutcome::Installed)
            }
            LifecycleEvent::Activate => {
                let ready = self
                    .candidate
                    .as_ref()
                    .is_some_and(|c| c.state() == ControllerState::Installed);
                if !ready {
                    return Err(PrecacheError::NothingInstalled);
                }
                let mut next = self.candidate.take().ok_or(PrecacheError::NothingInstalled)?;

                let report = match next.activate().await {
                    Ok(report) => report,
                    Err(e) => {
                        self.candidate = Some(next);
                        return Err(e);
                    }
                };
                self.retire_active();
                info!("{} is now serving", next.identity());
                self.active = Some(next);
                Ok(EventOutcome::Activated(report))
            }
            LifecycleEvent::Fetch(request) => self.fetch(&request).await.map(EventOutcome::Responded),
        }
    }

    fn retire_active(&mut self) {
        if let Some(mut previous) = self.active.take() {
            previous.supersede();
        }
    }
}
