pub mod error;
pub mod location;
pub mod location_log;
pub mod presets;
pub mod updates;
