use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::info;

use crate::config::StoreConfig;
use crate::handlers::events::Command;
use crate::handlers::persistence::{BlobStore, PersistenceAdapter};
use crate::handlers::persistence_writer::PersistenceWriter;
use crate::handlers::provider::{ProviderEventSink, RealLocationProvider};
use crate::handlers::store_actor::{StoreActor, StoreParts};
use crate::handlers::subscription::{LocationObserver, Subscription, SubscriptionHub};
use crate::models::error::StoreError;
use crate::models::location::{LocationRecord, OverrideState};
use crate::models::location_log::{FavoritesSet, HistoryLog};
use crate::models::presets::preset_locations;
use crate::models::updates::AuthorizationStatus;

/// Handle to the location state manager.
///
/// Cloning is cheap; every clone talks to the same store task. The task stops
/// once the last handle is dropped, after which queued snapshots are still
/// written out by the persistence writer.
#[derive(Clone)]
pub struct LocationStore {
    commands: mpsc::Sender<Command>,
    hub: SubscriptionHub,
    provider_events: ProviderEventSink,
}

impl LocationStore {
    /// Loads persisted history and favorites and starts the store task.
    ///
    /// Missing or unreadable collections start empty; opening never fails.
    pub async fn open(
        config: &StoreConfig,
        blobs: Arc<dyn BlobStore>,
        provider: Arc<dyn RealLocationProvider>,
    ) -> Self {
        let adapter = PersistenceAdapter::new(blobs, config.encoding);
        let history = HistoryLog::from_records(
            adapter.load(&config.history_key).await,
            config.history_capacity,
        );
        let favorites = FavoritesSet::from_records(adapter.load(&config.favorites_key).await);
        info!(
            "Loaded {} historical and {} favorite locations",
            history.len(),
            favorites.len()
        );

        let writer = PersistenceWriter::spawn(adapter, config.command_buffer);
        let (commands, commands_rx) = mpsc::channel(config.command_buffer.max(1));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let provider_events = ProviderEventSink::new(events_tx);
        let hub = SubscriptionHub::new();

        let actor = StoreActor::new(
            commands_rx,
            events_rx,
            StoreParts {
                provider: provider.clone(),
                hub: hub.clone(),
                writer,
                history_key: Arc::from(config.history_key.as_str()),
                favorites_key: Arc::from(config.favorites_key.as_str()),
                history,
                favorites,
            },
        );
        tokio::spawn(actor.run_actor());
        provider.start_updates(provider_events.clone());

        Self {
            commands,
            hub,
            provider_events,
        }
    }

    async fn request<T>(&self, command: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, StoreError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(command(reply))
            .await
            .map_err(|_| StoreError::Closed)?;
        response.await.map_err(|_| StoreError::Closed)
    }

    /// Reports `location` instead of the real position and records it in history.
    pub async fn set_virtual_location(&self, location: LocationRecord) -> Result<(), StoreError> {
        self.request(|reply| Command::SetVirtualLocation { location, reply }).await
    }

    /// Returns to the real position. Calling it while disabled does nothing.
    pub async fn disable_virtual_location(&self) -> Result<(), StoreError> {
        self.request(|reply| Command::DisableVirtualLocation { reply }).await
    }

    pub async fn current_state(&self) -> Result<OverrideState, StoreError> {
        self.request(|reply| Command::CurrentState { reply }).await
    }

    /// The override if one is active, else the provider's last fix, else `None`.
    pub async fn current_location(&self) -> Result<Option<LocationRecord>, StoreError> {
        self.request(|reply| Command::CurrentLocation { reply }).await
    }

    /// History snapshot, most recent first.
    pub async fn historical_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        self.request(|reply| Command::HistoricalLocations { reply }).await
    }

    pub async fn remove_from_history(&self, location: LocationRecord) -> Result<bool, StoreError> {
        self.request(|reply| Command::RemoveFromHistory { location, reply }).await
    }

    pub async fn clear_history(&self) -> Result<(), StoreError> {
        self.request(|reply| Command::ClearHistory { reply }).await
    }

    /// Favorites snapshot in the order they were added.
    pub async fn favorite_locations(&self) -> Result<Vec<LocationRecord>, StoreError> {
        self.request(|reply| Command::FavoriteLocations { reply }).await
    }

    /// Returns `false` if a favorite with the same name already existed.
    pub async fn add_to_favorites(&self, location: LocationRecord) -> Result<bool, StoreError> {
        self.request(|reply| Command::AddToFavorites { location, reply }).await
    }

    /// Returns how many favorites were removed; zero is not an error.
    pub async fn remove_from_favorites(&self, location: LocationRecord) -> Result<usize, StoreError> {
        self.request(|reply| Command::RemoveFromFavorites { location, reply }).await
    }

    /// Returns whether `location` is a favorite afterwards.
    pub async fn toggle_favorite(&self, location: LocationRecord) -> Result<bool, StoreError> {
        self.request(|reply| Command::ToggleFavorite { location, reply }).await
    }

    pub async fn is_favorited(&self, location: LocationRecord) -> Result<bool, StoreError> {
        self.request(|reply| Command::IsFavorited { location, reply }).await
    }

    pub fn preset_locations(&self) -> &'static [LocationRecord] {
        preset_locations()
    }

    /// Asks for location access if it was never requested, and returns the status seen before asking.
    pub async fn request_location_permission(&self) -> Result<AuthorizationStatus, StoreError> {
        self.request(|reply| Command::RequestAuthorization { reply }).await
    }

    /// Waits until every snapshot queued so far has been written.
    pub async fn flush(&self) -> Result<(), StoreError> {
        self.request(|reply| Command::Flush { reply }).await
    }

    pub fn subscribe(&self, observer: Arc<dyn LocationObserver>) -> Subscription {
        self.hub.subscribe(observer)
    }

    pub fn provider_events(&self) -> ProviderEventSink {
        self.provider_events.clone()
    }
}
