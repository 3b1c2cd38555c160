use std::sync::Arc;

use tokio::select;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, trace, warn};

use crate::handlers::events::Command;
use crate::handlers::persistence_writer::PersistJob;
use crate::handlers::provider::RealLocationProvider;
use crate::handlers::subscription::SubscriptionHub;
use crate::models::location::{
    Coordinate, LocationRecord, OverrideState, LIVE_LOCATION_NAME, REAL_LOCATION_NAME,
};
use crate::models::location_log::{FavoritesSet, HistoryLog};
use crate::models::updates::{AuthorizationStatus, Notification, ProviderEvent};

/// Single owner of the override state, history and favorites.
///
/// UI commands and provider events are handled one at a time by this task, so
/// no caller can observe a partially applied mutation.
pub struct StoreActor {
    commands: mpsc::Receiver<Command>,
    provider_events: mpsc::UnboundedReceiver<ProviderEvent>,
    provider: Arc<dyn RealLocationProvider>,
    hub: SubscriptionHub,
    writer: mpsc::Sender<PersistJob>,
    history_key: Arc<str>,
    favorites_key: Arc<str>,
    state: OverrideState,
    history: HistoryLog,
    favorites: FavoritesSet,
}

pub struct StoreParts {
    pub provider: Arc<dyn RealLocationProvider>,
    pub hub: SubscriptionHub,
    pub writer: mpsc::Sender<PersistJob>,
    pub history_key: Arc<str>,
    pub favorites_key: Arc<str>,
    pub history: HistoryLog,
    pub favorites: FavoritesSet,
}

impl StoreActor {
    pub fn new(
        commands: mpsc::Receiver<Command>,
        provider_events: mpsc::UnboundedReceiver<ProviderEvent>,
        parts: StoreParts,
    ) -> Self {
        Self {
            commands,
            provider_events,
            provider: parts.provider,
            hub: parts.hub,
            writer: parts.writer,
            history_key: parts.history_key,
            favorites_key: parts.favorites_key,
            state: OverrideState::Disabled,
            history: parts.history,
            favorites: parts.favorites,
        }
    }

    pub async fn run_actor(mut self) {
        enum Message {
            Command(Command),
            Provider(ProviderEvent),
            ProviderClosed,
        }
        let mut provider_open = true;
        loop {
            let message = select! {
                command = self.commands.recv() => command.map(Message::Command),
                event = self.provider_events.recv(), if provider_open => {
                    Some(event.map_or(Message::ProviderClosed, Message::Provider))
                }
            };

            match message {
                Some(Message::Command(command)) => {
                    trace!("Handling {}", command.name());
                    self.handle_command(command).await;
                }
                Some(Message::Provider(event)) => self.handle_provider_event(event),
                Some(Message::ProviderClosed) => {
                    debug!("Provider event channel closed");
                    provider_open = false;
                }
                None => {
                    info!("Location store channel closed");
                    return;
                }
            }
        }
    }

    async fn handle_command(&mut self, command: Command) {
        match command {
            Command::SetVirtualLocation { location, reply } => {
                self.set_virtual_location(location.clone()).await;
                self.hub.publish(&Notification::LocationUpdated(location));
                reply.send(()).ok();
            }
            Command::DisableVirtualLocation { reply } => {
                if self.state.is_active() {
                    info!("Virtual location disabled");
                }
                self.state = OverrideState::Disabled;
                reply.send(()).ok();
            }
            Command::CurrentState { reply } => {
                reply.send(self.state.clone()).ok();
            }
            Command::CurrentLocation { reply } => {
                reply.send(self.current_location()).ok();
            }
            Command::HistoricalLocations { reply } => {
                reply.send(self.history.newest_first()).ok();
            }
            Command::RemoveFromHistory { location, reply } => {
                let removed = self.history.remove(&location);
                if removed {
                    self.persist_history().await;
                }
                reply.send(removed).ok();
            }
            Command::ClearHistory { reply } => {
                self.history.clear();
                self.persist_history().await;
                reply.send(()).ok();
            }
            Command::FavoriteLocations { reply } => {
                reply.send(self.favorites.to_vec()).ok();
            }
            Command::AddToFavorites { location, reply } => {
                let added = self.favorites.add(location);
                if added {
                    self.persist_favorites().await;
                }
                reply.send(added).ok();
            }
            Command::RemoveFromFavorites { location, reply } => {
                let removed = self.favorites.remove(&location);
                self.persist_favorites().await;
                reply.send(removed).ok();
            }
            Command::ToggleFavorite { location, reply } => {
                let favorited = if self.favorites.remove(&location) > 0 {
                    false
                } else {
                    self.favorites.add(location)
                };
                self.persist_favorites().await;
                reply.send(favorited).ok();
            }
            Command::IsFavorited { location, reply } => {
                reply.send(self.favorites.contains(&location)).ok();
            }
            Command::RequestAuthorization { reply } => {
                reply.send(self.request_authorization()).ok();
            }
            Command::Flush { reply } => self.flush(reply).await,
        }
    }

    async fn set_virtual_location(&mut self, location: LocationRecord) {
        info!(
            "Virtual location set: {} ({}, {})",
            location.name(),
            location.latitude(),
            location.longitude()
        );
        self.state = OverrideState::Overridden(location.clone());
        if let Some(evicted) = self.history.insert(location) {
            debug!("History full, evicted {}", evicted.name());
        }
        self.persist_history().await;
        self.persist_favorites().await;
    }

    fn current_location(&self) -> Option<LocationRecord> {
        match &self.state {
            OverrideState::Overridden(location) => Some(location.clone()),
            OverrideState::Disabled => {
                let coordinate = self.provider.current_coordinate()?;
                real_position(coordinate, REAL_LOCATION_NAME)
            }
        }
    }

    fn request_authorization(&self) -> AuthorizationStatus {
        let status = self.provider.authorization_status();
        match status {
            AuthorizationStatus::NotDetermined => self.provider.request_authorization(),
            AuthorizationStatus::Denied | AuthorizationStatus::Restricted => {
                warn!("Location access is {:?}; the user must enable it in settings", status)
            }
            AuthorizationStatus::AuthorizedWhenInUse | AuthorizationStatus::AuthorizedAlways => {}
        }
        status
    }

    fn handle_provider_event(&mut self, event: ProviderEvent) {
        match event {
            ProviderEvent::PositionUpdated(coordinate) => {
                if self.state.is_active() {
                    trace!("Ignoring real position while {}", self.state.state_name());
                    return;
                }
                if let Some(location) = real_position(coordinate, LIVE_LOCATION_NAME) {
                    self.hub.publish(&Notification::LocationUpdated(location));
                }
            }
            ProviderEvent::Failed(error) => {
                warn!("Location provider failed: {}", error);
                self.hub.publish(&Notification::ProviderFailed(error));
            }
            ProviderEvent::AuthorizationChanged(status) => {
                info!("Location authorization changed to {:?}", status);
                self.hub.publish(&Notification::AuthorizationChanged(status));
            }
        }
    }

    async fn persist_history(&self) {
        let records = self.history.oldest_first();
        self.enqueue(PersistJob::Save {
            key: self.history_key.clone(),
            records,
        })
        .await;
    }

    async fn persist_favorites(&self) {
        let records = self.favorites.to_vec();
        self.enqueue(PersistJob::Save {
            key: self.favorites_key.clone(),
            records,
        })
        .await;
    }

    async fn flush(&self, reply: oneshot::Sender<()>) {
        if let Err(mpsc::error::SendError(PersistJob::Flush(reply))) =
            self.writer.send(PersistJob::Flush(reply)).await
        {
            // Nothing can be pending on a stopped writer.
            reply.send(()).ok();
        }
    }

    async fn enqueue(&self, job: PersistJob) {
        if self.writer.send(job).await.is_err() {
            warn!("Persistence writer is gone, dropping snapshot");
        }
    }
}

/// Provider fixes that could not be stored and reloaded are treated as no fix.
fn real_position(coordinate: Coordinate, name: &str) -> Option<LocationRecord> {
    match LocationRecord::placeholder(coordinate, name) {
        Ok(location) => Some(location),
        Err(e) => {
            warn!("Discarding provider position: {}", e);
            None
        }
    }
}
