use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::error::RecordError;

/// Name given to the real device position returned by `current_location`.
pub const REAL_LOCATION_NAME: &str = "Current Real Location";

/// Name given to live provider positions forwarded to the subscriber.
pub const LIVE_LOCATION_NAME: &str = "Current Location";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    fn validate(&self) -> Result<(), RecordError> {
        if !self.latitude.is_finite() || !(-90.0..=90.0).contains(&self.latitude) {
            return Err(RecordError::LatitudeOutOfRange(self.latitude));
        }
        if !self.longitude.is_finite() || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(RecordError::LongitudeOutOfRange(self.longitude));
        }
        Ok(())
    }
}

/// One location the user can report in place of the device position.
///
/// Records are immutable once built. Two records describe "the same location"
/// when their names are byte-equal (see [`LocationRecord::same_location`]);
/// `PartialEq` compares every field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "StoredRecord")]
pub struct LocationRecord {
    latitude: f64,
    longitude: f64,
    name: String,
    address: String,
    captured_at: DateTime<Utc>,
}

impl LocationRecord {
    pub fn new(
        coordinate: Coordinate,
        name: impl Into<String>,
        address: impl Into<String>,
    ) -> Result<Self, RecordError> {
        Self::with_captured_at(coordinate, name, address, Utc::now())
    }

    pub fn with_captured_at(
        coordinate: Coordinate,
        name: impl Into<String>,
        address: impl Into<String>,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, RecordError> {
        let name = name.into();
        if name.is_empty() {
            return Err(RecordError::EmptyName);
        }
        coordinate.validate()?;
        Ok(Self::from_parts(coordinate, name, address.into(), captured_at))
    }

    /// Builds a record from parts already known to be valid.
    pub(crate) fn from_parts(
        coordinate: Coordinate,
        name: String,
        address: String,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude: coordinate.latitude,
            longitude: coordinate.longitude,
            name,
            address,
            captured_at,
        }
    }

    /// Synthesizes a record for a provider position under a placeholder name.
    pub(crate) fn placeholder(coordinate: Coordinate, name: &str) -> Result<Self, RecordError> {
        coordinate.validate()?;
        Ok(Self::from_parts(coordinate, name.to_string(), String::new(), Utc::now()))
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    pub fn coordinate(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn captured_at(&self) -> DateTime<Utc> {
        self.captured_at
    }

    /// Identity test: names match exactly, coordinates and address are ignored.
    pub fn same_location(&self, other: &LocationRecord) -> bool {
        self.name == other.name
    }
}

/// Wire form of a record; decoding goes through the same validation as `new`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredRecord {
    latitude: f64,
    longitude: f64,
    name: String,
    #[serde(default)]
    address: String,
    captured_at: DateTime<Utc>,
}

impl TryFrom<StoredRecord> for LocationRecord {
    type Error = RecordError;

    fn try_from(stored: StoredRecord) -> Result<Self, Self::Error> {
        LocationRecord::with_captured_at(
            Coordinate::new(stored.latitude, stored.longitude),
            stored.name,
            stored.address,
            stored.captured_at,
        )
    }
}

/// Whether a virtual location currently replaces the device position.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum OverrideState {
    #[default]
    Disabled,
    Overridden(LocationRecord),
}

impl OverrideState {
    pub fn is_active(&self) -> bool {
        matches!(self, OverrideState::Overridden(_))
    }

    pub fn override_location(&self) -> Option<&LocationRecord> {
        match self {
            OverrideState::Disabled => None,
            OverrideState::Overridden(location) => Some(location),
        }
    }

    pub fn state_name(&self) -> &'static str {
        match self {
            OverrideState::Disabled => "Disabled",
            OverrideState::Overridden(_) => "Overridden",
        }
    }
}
