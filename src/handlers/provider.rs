use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::models::error::ProviderError;
use crate::models::location::Coordinate;
use crate::models::updates::{AuthorizationStatus, ProviderEvent};

/// Source of the device's real position, supplied by the host platform.
pub trait RealLocationProvider: Send + Sync {
    /// Fire-and-forget; the outcome arrives later as an authorization change event.
    fn request_authorization(&self);

    fn authorization_status(&self) -> AuthorizationStatus;

    /// Best-effort last known fix.
    fn current_coordinate(&self) -> Option<Coordinate>;

    /// Hands the provider the channel it pushes asynchronous events into.
    fn start_updates(&self, sink: ProviderEventSink);
}

/// Push side of the provider event channel; usable from any thread without blocking.
#[derive(Debug, Clone)]
pub struct ProviderEventSink {
    tx: mpsc::UnboundedSender<ProviderEvent>,
}

impl ProviderEventSink {
    pub(crate) fn new(tx: mpsc::UnboundedSender<ProviderEvent>) -> Self {
        Self { tx }
    }

    /// Returns `false` once the store has shut down.
    pub fn push(&self, event: ProviderEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn position_updated(&self, coordinate: Coordinate) -> bool {
        self.push(ProviderEvent::PositionUpdated(coordinate))
    }

    pub fn failed(&self, error: ProviderError) -> bool {
        self.push(ProviderEvent::Failed(error))
    }

    pub fn authorization_changed(&self, status: AuthorizationStatus) -> bool {
        self.push(ProviderEvent::AuthorizationChanged(status))
    }
}

#[derive(Default)]
struct SimulatedState {
    status: AuthorizationStatus,
    fix: Option<Coordinate>,
    sink: Option<ProviderEventSink>,
}

/// In-process provider with a scripted position and authorization status.
#[derive(Default)]
pub struct SimulatedProvider {
    state: Mutex<SimulatedState>,
}

impl SimulatedProvider {
    pub fn new(status: AuthorizationStatus, fix: Option<Coordinate>) -> Self {
        Self {
            state: Mutex::new(SimulatedState {
                status,
                fix,
                sink: None,
            }),
        }
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn sink(&self) -> Option<ProviderEventSink> {
        self.state().sink.clone()
    }

    pub fn set_authorization(&self, status: AuthorizationStatus) {
        self.state().status = status;
        if let Some(sink) = self.sink() {
            sink.authorization_changed(status);
        }
    }

    /// Records a new fix and pushes it to the store.
    pub fn move_to(&self, coordinate: Coordinate) {
        self.state().fix = Some(coordinate);
        if let Some(sink) = self.sink() {
            sink.position_updated(coordinate);
        }
    }

    pub fn fail(&self, error: ProviderError) {
        if let Some(sink) = self.sink() {
            sink.failed(error);
        }
    }
}

impl RealLocationProvider for SimulatedProvider {
    fn request_authorization(&self) {
        if self.authorization_status() == AuthorizationStatus::NotDetermined {
            info!("Simulated provider granting when-in-use authorization");
            self.set_authorization(AuthorizationStatus::AuthorizedWhenInUse);
        }
    }

    fn authorization_status(&self) -> AuthorizationStatus {
        self.state().status
    }

    fn current_coordinate(&self) -> Option<Coordinate> {
        let state = self.state();
        if state.status.is_authorized() {
            state.fix
        } else {
            None
        }
    }

    fn start_updates(&self, sink: ProviderEventSink) {
        debug!("Simulated provider attached to store");
        self.state().sink = Some(sink);
    }
}
