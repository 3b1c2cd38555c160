//! Virtual location state manager.
//!
//! [`LocationStore`] owns the location currently reported in place of the
//! device position, a bounded history of past overrides and a favorites list,
//! and persists both lists through a [`BlobStore`].

pub mod config;
pub mod handlers;
pub mod models;

pub use config::StoreConfig;
pub use handlers::persistence::{BlobStore, Encoding, FileBlobStore, MemoryBlobStore, PersistenceAdapter};
pub use handlers::provider::{ProviderEventSink, RealLocationProvider, SimulatedProvider};
pub use handlers::store::LocationStore;
pub use handlers::subscription::{LocationObserver, Subscription, SubscriptionHub};
pub use models::error::{ConfigError, PersistenceError, ProviderError, RecordError, StoreError};
pub use models::location::{Coordinate, LocationRecord, OverrideState, LIVE_LOCATION_NAME, REAL_LOCATION_NAME};
pub use models::presets::preset_locations;
pub use models::updates::{AuthorizationStatus, Notification, ProviderEvent};
