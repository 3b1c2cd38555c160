use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::mpsc;
use tracing::debug;

use crate::models::error::ProviderError;
use crate::models::location::LocationRecord;
use crate::models::updates::{AuthorizationStatus, Notification};

/// Receives store notifications. Called from the store task, so implementations must not block.
pub trait LocationObserver: Send + Sync {
    fn location_updated(&self, location: &LocationRecord);
    fn provider_failed(&self, error: &ProviderError);
    fn authorization_changed(&self, status: AuthorizationStatus);
}

impl LocationObserver for mpsc::UnboundedSender<Notification> {
    fn location_updated(&self, location: &LocationRecord) {
        self.send(Notification::LocationUpdated(location.clone())).ok();
    }

    fn provider_failed(&self, error: &ProviderError) {
        self.send(Notification::ProviderFailed(error.clone())).ok();
    }

    fn authorization_changed(&self, status: AuthorizationStatus) {
        self.send(Notification::AuthorizationChanged(status)).ok();
    }
}

struct Registration {
    id: u64,
    observer: Arc<dyn LocationObserver>,
}

type Slot = Mutex<Option<Registration>>;

fn lock(slot: &Slot) -> MutexGuard<'_, Option<Registration>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Holds at most one observer; a new subscription replaces the previous one.
#[derive(Clone, Default)]
pub struct SubscriptionHub {
    slot: Arc<Slot>,
    next_id: Arc<AtomicU64>,
}

impl SubscriptionHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, observer: Arc<dyn LocationObserver>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        if lock(&self.slot).replace(Registration { id, observer }).is_some() {
            debug!("Replaced previous location subscriber");
        }
        Subscription {
            id,
            slot: Arc::downgrade(&self.slot),
        }
    }

    pub fn has_subscriber(&self) -> bool {
        lock(&self.slot).is_some()
    }

    /// Delivers to the current observer, or drops the notification if there is none.
    pub fn publish(&self, notification: &Notification) {
        // Call outside the lock so the observer may resubscribe or unsubscribe.
        let observer = lock(&self.slot).as_ref().map(|r| r.observer.clone());
        let Some(observer) = observer else {
            return;
        };
        match notification {
            Notification::LocationUpdated(location) => observer.location_updated(location),
            Notification::ProviderFailed(error) => observer.provider_failed(error),
            Notification::AuthorizationChanged(status) => observer.authorization_changed(*status),
        }
    }
}

/// Registration handle; dropping it releases the observer if it is still the registered one.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    slot: Weak<Slot>,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn is_active(&self) -> bool {
        let Some(slot) = self.slot.upgrade() else {
            return false;
        };
        let registration = lock(&slot);
        registration.as_ref().is_some_and(|r| r.id == self.id)
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(slot) = self.slot.upgrade() {
            let mut registration = lock(&slot);
            if registration.as_ref().is_some_and(|r| r.id == self.id) {
                *registration = None;
            }
        }
    }
}
