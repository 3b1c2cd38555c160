use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::time::timeout;

use virtual_location::{
    AuthorizationStatus, BlobStore, Coordinate, Encoding, FileBlobStore, LocationRecord, LocationStore,
    MemoryBlobStore, Notification, OverrideState, PersistenceError, ProviderError, RealLocationProvider, SimulatedProvider,
    StoreConfig, LIVE_LOCATION_NAME, REAL_LOCATION_NAME,
};

fn location(name: &str, latitude: f64, longitude: f64) -> LocationRecord {
    LocationRecord::new(Coordinate::new(latitude, longitude), name, "").unwrap()
}

fn names(locations: &[LocationRecord]) -> Vec<&str> {
    locations.iter().map(LocationRecord::name).collect()
}

async fn open_with(
    blobs: Arc<dyn BlobStore>,
    provider: Arc<SimulatedProvider>,
) -> LocationStore {
    LocationStore::open(&StoreConfig::default(), blobs, provider).await
}

async fn open() -> (LocationStore, Arc<SimulatedProvider>) {
    let provider = Arc::new(SimulatedProvider::default());
    let store = open_with(Arc::new(MemoryBlobStore::new()), provider.clone()).await;
    (store, provider)
}

async fn next(rx: &mut mpsc::UnboundedReceiver<Notification>) -> Notification {
    timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for notification")
        .expect("notification channel closed")
}

/// Storage that is never readable or writable, like a full or read-only disk.
#[derive(Default)]
struct FailingBlobStore {
    writes: AtomicUsize,
}

#[async_trait]
impl BlobStore for FailingBlobStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, PersistenceError> {
        Err(PersistenceError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only"),
        })
    }

    async fn put(&self, key: &str, _blob: Vec<u8>) -> Result<(), PersistenceError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        Err(PersistenceError::Io {
            key: key.to_string(),
            source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        })
    }
}

#[tokio::test]
async fn set_then_favorite_then_set_again() {
    let (store, _) = open().await;
    let tiananmen = location("Tiananmen Square", 39.9042, 116.4074);
    let bund = location("The Bund", 31.2304, 121.4737);

    store.set_virtual_location(tiananmen.clone()).await.unwrap();
    assert_eq!(names(&store.historical_locations().await.unwrap()), vec!["Tiananmen Square"]);

    store.add_to_favorites(tiananmen.clone()).await.unwrap();
    assert_eq!(names(&store.favorite_locations().await.unwrap()), vec!["Tiananmen Square"]);

    store.set_virtual_location(bund.clone()).await.unwrap();
    assert_eq!(
        names(&store.historical_locations().await.unwrap()),
        vec!["The Bund", "Tiananmen Square"]
    );
    assert_eq!(store.current_location().await.unwrap(), Some(bund));
    assert_eq!(store.favorite_locations().await.unwrap(), vec![tiananmen]);
}

#[tokio::test]
async fn current_location_follows_override_state() {
    let (store, _) = open().await;
    let eiffel = location("Eiffel Tower", 48.8584, 2.2945);
    assert_eq!(store.current_state().await.unwrap(), OverrideState::Disabled);

    store.set_virtual_location(eiffel.clone()).await.unwrap();
    assert_eq!(store.current_location().await.unwrap(), Some(eiffel.clone()));
    assert_eq!(
        store.current_state().await.unwrap(),
        OverrideState::Overridden(eiffel.clone())
    );

    store.disable_virtual_location().await.unwrap();
    store.disable_virtual_location().await.unwrap();
    assert_eq!(store.current_state().await.unwrap(), OverrideState::Disabled);
    assert_eq!(store.current_location().await.unwrap(), None);
    // Disabling leaves history untouched.
    assert_eq!(store.historical_locations().await.unwrap(), vec![eiffel]);
}

#[tokio::test]
async fn falls_back_to_real_position_when_disabled() {
    let fix = Coordinate::new(51.5007, -0.1246);
    let provider = Arc::new(SimulatedProvider::new(AuthorizationStatus::AuthorizedWhenInUse, Some(fix)));
    let store = open_with(Arc::new(MemoryBlobStore::new()), provider).await;

    let real = store.current_location().await.unwrap().unwrap();
    assert_eq!(real.name(), REAL_LOCATION_NAME);
    assert_eq!(real.address(), "");
    assert_eq!(real.coordinate(), fix);

    let tower = location("Tokyo Tower", 35.6762, 139.6503);
    store.set_virtual_location(tower.clone()).await.unwrap();
    assert_eq!(store.current_location().await.unwrap(), Some(tower));
}

#[tokio::test]
async fn unauthorized_provider_yields_nothing() {
    let fix = Coordinate::new(1.0, 1.0);
    let provider = Arc::new(SimulatedProvider::new(AuthorizationStatus::Denied, Some(fix)));
    let store = open_with(Arc::new(MemoryBlobStore::new()), provider).await;

    assert_eq!(store.current_location().await.unwrap(), None);
}

#[tokio::test]
async fn out_of_range_provider_fix_is_never_recorded() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let bad_fix = Coordinate::new(91.0, 0.0);
    let provider = Arc::new(SimulatedProvider::new(AuthorizationStatus::AuthorizedAlways, Some(bad_fix)));
    let store = open_with(blobs.clone(), provider.clone()).await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = store.subscribe(Arc::new(tx));

    assert_eq!(store.current_location().await.unwrap(), None);

    // The bad live position is dropped, so the failure pushed after it arrives first.
    provider.move_to(Coordinate::new(0.0, 200.0));
    provider.fail(ProviderError::LocationUnknown);
    assert_eq!(next(&mut rx).await, Notification::ProviderFailed(ProviderError::LocationUnknown));

    let good = location("Good", 10.0, 10.0);
    store.set_virtual_location(good.clone()).await.unwrap();
    assert_eq!(next(&mut rx).await, Notification::LocationUpdated(good.clone()));
    store.flush().await.unwrap();
    drop(store);

    let reopened = open_with(blobs, Arc::new(SimulatedProvider::default())).await;
    assert_eq!(reopened.historical_locations().await.unwrap(), vec![good]);
    assert_eq!(reopened.favorite_locations().await.unwrap(), Vec::<LocationRecord>::new());
}

#[tokio::test]
async fn favorites_are_idempotent_and_removal_tolerates_absence() {
    let (store, _) = open().await;
    let lake = location("West Lake", 30.2741, 120.1551);

    assert!(store.add_to_favorites(lake.clone()).await.unwrap());
    assert!(store.is_favorited(lake.clone()).await.unwrap());
    assert!(!store.add_to_favorites(location("West Lake", 0.0, 0.0)).await.unwrap());
    assert_eq!(store.favorite_locations().await.unwrap().len(), 1);

    assert_eq!(store.remove_from_favorites(location("Nowhere", 0.0, 0.0)).await.unwrap(), 0);
    assert_eq!(store.favorite_locations().await.unwrap().len(), 1);

    assert_eq!(store.remove_from_favorites(lake.clone()).await.unwrap(), 1);
    assert!(!store.is_favorited(lake).await.unwrap());
}

#[tokio::test]
async fn toggle_flips_membership() {
    let (store, _) = open().await;
    let harbour = location("Victoria Harbour", 22.3193, 114.1694);

    assert!(store.toggle_favorite(harbour.clone()).await.unwrap());
    assert!(store.is_favorited(harbour.clone()).await.unwrap());
    assert!(!store.toggle_favorite(harbour.clone()).await.unwrap());
    assert!(store.favorite_locations().await.unwrap().is_empty());
}

#[tokio::test]
async fn history_is_bounded_and_deduplicated() {
    let (store, _) = open().await;
    for i in 0..51 {
        store
            .set_virtual_location(location(&format!("place-{i}"), 0.0, i as f64))
            .await
            .unwrap();
    }

    let history = store.historical_locations().await.unwrap();
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].name(), "place-50");
    assert_eq!(history[49].name(), "place-1");
    assert!(history.iter().all(|l| l.name() != "place-0"));

    store.set_virtual_location(location("place-10", 10.0, 10.0)).await.unwrap();
    let history = store.historical_locations().await.unwrap();
    assert_eq!(history.len(), 50);
    assert_eq!(history[0].name(), "place-10");
    assert_eq!(history[0].latitude(), 10.0);
    assert_eq!(history.iter().filter(|l| l.name() == "place-10").count(), 1);
}

#[tokio::test]
async fn history_can_be_pruned_and_cleared() {
    let (store, _) = open().await;
    store.set_virtual_location(location("A", 1.0, 1.0)).await.unwrap();
    store.set_virtual_location(location("B", 2.0, 2.0)).await.unwrap();

    assert!(store.remove_from_history(location("A", 0.0, 0.0)).await.unwrap());
    assert!(!store.remove_from_history(location("A", 0.0, 0.0)).await.unwrap());
    assert_eq!(names(&store.historical_locations().await.unwrap()), vec!["B"]);

    store.clear_history().await.unwrap();
    assert!(store.historical_locations().await.unwrap().is_empty());
    // Clearing history keeps the active override.
    assert!(store.current_state().await.unwrap().is_active());
}

#[tokio::test]
async fn persisted_collections_survive_reopen() {
    let blobs: Arc<dyn BlobStore> = Arc::new(MemoryBlobStore::new());
    let store = open_with(blobs.clone(), Arc::new(SimulatedProvider::default())).await;

    store.set_virtual_location(location("Times Square", 40.7589, -73.9851)).await.unwrap();
    store.set_virtual_location(location("Eiffel Tower", 48.8584, 2.2945)).await.unwrap();
    store.add_to_favorites(location("Tokyo Tower", 35.6762, 139.6503)).await.unwrap();
    store.add_to_favorites(location("West Lake", 30.2741, 120.1551)).await.unwrap();
    store.flush().await.unwrap();

    let history = store.historical_locations().await.unwrap();
    let favorites = store.favorite_locations().await.unwrap();
    drop(store);

    let reopened = open_with(blobs, Arc::new(SimulatedProvider::default())).await;
    assert_eq!(reopened.historical_locations().await.unwrap(), history);
    assert_eq!(reopened.favorite_locations().await.unwrap(), favorites);
    // The override itself is not persisted.
    assert_eq!(reopened.current_state().await.unwrap(), OverrideState::Disabled);
}

#[tokio::test]
async fn malformed_favorites_do_not_block_startup() {
    let blobs = Arc::new(MemoryBlobStore::new());
    let history = vec![location("The Bund", 31.2304, 121.4737)];
    blobs
        .put("HistoricalLocations", Encoding::Json.encode(&history).unwrap())
        .await
        .unwrap();
    blobs
        .put("FavoriteLocations", b"[{\"name\": 42}".to_vec())
        .await
        .unwrap();

    let store = open_with(blobs, Arc::new(SimulatedProvider::default())).await;
    assert_eq!(store.historical_locations().await.unwrap(), history);
    assert!(store.favorite_locations().await.unwrap().is_empty());
}

#[tokio::test]
async fn storage_failures_do_not_reach_callers() {
    let blobs = Arc::new(FailingBlobStore::default());
    let store = open_with(blobs.clone(), Arc::new(SimulatedProvider::default())).await;
    assert!(store.historical_locations().await.unwrap().is_empty());

    let pagoda = location("Giant Wild Goose Pagoda", 34.3416, 108.9398);
    let lake = location("West Lake", 30.2741, 120.1551);
    store.set_virtual_location(pagoda.clone()).await.unwrap();
    store.set_virtual_location(lake.clone()).await.unwrap();
    assert!(store.add_to_favorites(pagoda.clone()).await.unwrap());
    store.flush().await.unwrap();

    assert!(blobs.writes.load(Ordering::SeqCst) > 0);
    assert_eq!(store.historical_locations().await.unwrap(), vec![lake.clone(), pagoda.clone()]);
    assert_eq!(store.favorite_locations().await.unwrap(), vec![pagoda.clone()]);
    assert!(store.is_favorited(pagoda).await.unwrap());
    assert_eq!(store.current_location().await.unwrap(), Some(lake));
}

#[tokio::test]
async fn file_store_round_trip_with_message_pack() {
    let dir = tempfile::tempdir().unwrap();
    let config = StoreConfig {
        data_dir: dir.path().to_path_buf(),
        encoding: Encoding::MessagePack,
        ..StoreConfig::default()
    };
    let blobs = Arc::new(FileBlobStore::new(config.data_dir.clone()));

    let store = LocationStore::open(&config, blobs.clone(), Arc::new(SimulatedProvider::default())).await;
    store.set_virtual_location(location("Giant Wild Goose Pagoda", 34.3416, 108.9398)).await.unwrap();
    store.add_to_favorites(location("Giant Wild Goose Pagoda", 34.3416, 108.9398)).await.unwrap();
    store.flush().await.unwrap();
    let history = store.historical_locations().await.unwrap();
    drop(store);

    assert!(dir.path().join("HistoricalLocations.blob").exists());
    assert!(dir.path().join("FavoriteLocations.blob").exists());

    let reopened = LocationStore::open(&config, blobs, Arc::new(SimulatedProvider::default())).await;
    assert_eq!(reopened.historical_locations().await.unwrap(), history);
    assert_eq!(names(&reopened.favorite_locations().await.unwrap()), vec!["Giant Wild Goose Pagoda"]);
}

#[tokio::test]
async fn subscriber_sees_overrides_and_live_positions() {
    let (store, provider) = open().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = store.subscribe(Arc::new(tx));
    provider.set_authorization(AuthorizationStatus::AuthorizedAlways);
    assert_eq!(
        next(&mut rx).await,
        Notification::AuthorizationChanged(AuthorizationStatus::AuthorizedAlways)
    );

    let live = Coordinate::new(10.0, 20.0);
    provider.move_to(live);
    match next(&mut rx).await {
        Notification::LocationUpdated(record) => {
            assert_eq!(record.name(), LIVE_LOCATION_NAME);
            assert_eq!(record.coordinate(), live);
        }
        other => panic!("unexpected {other:?}"),
    }

    let bund = location("The Bund", 31.2304, 121.4737);
    store.set_virtual_location(bund.clone()).await.unwrap();
    assert_eq!(next(&mut rx).await, Notification::LocationUpdated(bund));

    // Real positions are ignored while overridden; failures still come through in order.
    provider.move_to(Coordinate::new(11.0, 21.0));
    provider.fail(ProviderError::Network);
    assert_eq!(next(&mut rx).await, Notification::ProviderFailed(ProviderError::Network));

    store.disable_virtual_location().await.unwrap();
    provider.move_to(Coordinate::new(12.0, 22.0));
    match next(&mut rx).await {
        Notification::LocationUpdated(record) => assert_eq!(record.coordinate(), Coordinate::new(12.0, 22.0)),
        other => panic!("unexpected {other:?}"),
    }
}

#[tokio::test]
async fn dropped_subscription_stops_delivery() {
    let (store, provider) = open().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = store.subscribe(Arc::new(tx));
    subscription.unsubscribe();

    provider.fail(ProviderError::LocationUnknown);
    store.set_virtual_location(location("Spot", 1.0, 1.0)).await.unwrap();
    // Sender was released with the subscription, so the channel is closed and empty.
    assert_eq!(rx.recv().await, None);
}

#[tokio::test]
async fn permission_request_reports_prior_status() {
    let (store, provider) = open().await;
    let (tx, mut rx) = mpsc::unbounded_channel();
    let _subscription = store.subscribe(Arc::new(tx));

    assert_eq!(
        store.request_location_permission().await.unwrap(),
        AuthorizationStatus::NotDetermined
    );
    assert_eq!(
        next(&mut rx).await,
        Notification::AuthorizationChanged(AuthorizationStatus::AuthorizedWhenInUse)
    );

    provider.set_authorization(AuthorizationStatus::Denied);
    next(&mut rx).await;
    assert_eq!(
        store.request_location_permission().await.unwrap(),
        AuthorizationStatus::Denied
    );
    assert_eq!(provider.authorization_status(), AuthorizationStatus::Denied);
}

#[tokio::test]
async fn presets_are_exposed_unchanged() {
    let (store, _) = open().await;
    let presets = store.preset_locations();
    assert_eq!(presets.len(), 8);
    assert_eq!(presets[0].name(), "Tiananmen Square");
    assert_eq!(presets, store.preset_locations());
}

#[tokio::test]
async fn concurrent_callers_do_not_lose_updates() {
    let (store, _) = open().await;
    let calls = (0..40).map(|i| {
        let store = store.clone();
        async move {
            let spot = location(&format!("spot-{i}"), 0.0, i as f64);
            store.set_virtual_location(spot.clone()).await.unwrap();
            store.add_to_favorites(spot).await.unwrap();
        }
    });
    futures::future::join_all(calls).await;

    assert_eq!(store.historical_locations().await.unwrap().len(), 40);
    assert_eq!(store.favorite_locations().await.unwrap().len(), 40);
}
