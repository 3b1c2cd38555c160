use crate::models::error::ProviderError;
use crate::models::location::{Coordinate, LocationRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorizationStatus {
    #[default]
    NotDetermined,
    Restricted,
    Denied,
    AuthorizedWhenInUse,
    AuthorizedAlways,
}

impl AuthorizationStatus {
    pub fn is_authorized(self) -> bool {
        matches!(
            self,
            AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways
        )
    }
}

// Provider -> store

#[derive(Debug, Clone, PartialEq)]
pub enum ProviderEvent {
    PositionUpdated(Coordinate),
    Failed(ProviderError),
    AuthorizationChanged(AuthorizationStatus),
}

// Store -> subscriber

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    LocationUpdated(LocationRecord),
    ProviderFailed(ProviderError),
    AuthorizationChanged(AuthorizationStatus),
}
