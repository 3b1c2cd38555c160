use chrono::Utc;
use once_cell::sync::Lazy;

use crate::models::location::{Coordinate, LocationRecord};

static PRESET_LOCATIONS: Lazy<Vec<LocationRecord>> = Lazy::new(|| {
    [
        ("Tiananmen Square", 39.9042, 116.4074, "Tiananmen Square, Dongcheng District, Beijing"),
        ("The Bund", 31.2304, 121.4737, "Zhongshan East 1st Road, Huangpu District, Shanghai"),
        ("Victoria Harbour", 22.3193, 114.1694, "Central, Hong Kong SAR"),
        ("Giant Wild Goose Pagoda", 34.3416, 108.9398, "Yanta District, Xi'an, Shaanxi"),
        ("West Lake", 30.2741, 120.1551, "Xihu District, Hangzhou, Zhejiang"),
        ("Times Square", 40.7589, -73.9851, "Manhattan, New York City"),
        ("Eiffel Tower", 48.8584, 2.2945, "Paris, France"),
        ("Tokyo Tower", 35.6762, 139.6503, "Minato, Tokyo, Japan"),
    ]
    .into_iter()
    .map(|(name, latitude, longitude, address)| {
        let captured_at = Utc::now();
        LocationRecord::from_parts(
            Coordinate::new(latitude, longitude),
            name.to_string(),
            address.to_string(),
            captured_at,
        )
    })
    .collect()
});

/// Fixed landmark catalog offered to location pickers.
pub fn preset_locations() -> &'static [LocationRecord] {
    &PRESET_LOCATIONS
}
