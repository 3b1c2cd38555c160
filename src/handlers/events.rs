use tokio::sync::oneshot;

use crate::models::location::{LocationRecord, OverrideState};
use crate::models::updates::AuthorizationStatus;

/// Requests served by the store actor, each answered on its own reply channel.
pub enum Command {
    SetVirtualLocation {
        location: LocationRecord,
        reply: oneshot::Sender<()>,
    },
    DisableVirtualLocation {
        reply: oneshot::Sender<()>,
    },
    CurrentState {
        reply: oneshot::Sender<OverrideState>,
    },
    CurrentLocation {
        reply: oneshot::Sender<Option<LocationRecord>>,
    },
    HistoricalLocations {
        reply: oneshot::Sender<Vec<LocationRecord>>,
    },
    RemoveFromHistory {
        location: LocationRecord,
        reply: oneshot::Sender<bool>,
    },
    ClearHistory {
        reply: oneshot::Sender<()>,
    },
    FavoriteLocations {
        reply: oneshot::Sender<Vec<LocationRecord>>,
    },
    AddToFavorites {
        location: LocationRecord,
        reply: oneshot::Sender<bool>,
    },
    RemoveFromFavorites {
        location: LocationRecord,
        reply: oneshot::Sender<usize>,
    },
    ToggleFavorite {
        location: LocationRecord,
        reply: oneshot::Sender<bool>,
    },
    IsFavorited {
        location: LocationRecord,
        reply: oneshot::Sender<bool>,
    },
    RequestAuthorization {
        reply: oneshot::Sender<AuthorizationStatus>,
    },
    Flush {
        reply: oneshot::Sender<()>,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Command::SetVirtualLocation { .. } => "SetVirtualLocation",
            Command::DisableVirtualLocation { .. } => "DisableVirtualLocation",
            Command::CurrentState { .. } => "CurrentState",
            Command::CurrentLocation { .. } => "CurrentLocation",
            Command::HistoricalLocations { .. } => "HistoricalLocations",
            Command::RemoveFromHistory { .. } => "RemoveFromHistory",
            Command::ClearHistory { .. } => "ClearHistory",
            Command::FavoriteLocations { .. } => "FavoriteLocations",
            Command::AddToFavorites { .. } => "AddToFavorites",
            Command::RemoveFromFavorites { .. } => "RemoveFromFavorites",
            Command::ToggleFavorite { .. } => "ToggleFavorite",
            Command::IsFavorited { .. } => "IsFavorited",
            Command::RequestAuthorization { .. } => "RequestAuthorization",
            Command::Flush { .. } => "Flush",
        }
    }
}
