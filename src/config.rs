use std::env;
use std::path::PathBuf;

use crate::handlers::persistence::Encoding;
use crate::models::error::ConfigError;
use crate::models::location_log::DEFAULT_HISTORY_CAPACITY;

pub const DEFAULT_HISTORY_KEY: &str = "HistoricalLocations";
pub const DEFAULT_FAVORITES_KEY: &str = "FavoriteLocations";

#[derive(Debug, Clone, PartialEq)]
pub struct StoreConfig {
    /// Directory used by the file-backed blob store.
    pub data_dir: PathBuf,
    pub history_key: String,
    pub favorites_key: String,
    pub history_capacity: usize,
    pub encoding: Encoding,
    /// Bound of the command and persistence queues.
    pub command_buffer: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./location-data"),
            history_key: DEFAULT_HISTORY_KEY.to_string(),
            favorites_key: DEFAULT_FAVORITES_KEY.to_string(),
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            encoding: Encoding::Json,
            command_buffer: 64,
        }
    }
}

impl StoreConfig {
    /// Reads `LOCATION_*` environment variables, falling back to defaults for unset ones.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let history_key = lookup("LOCATION_HISTORY_KEY").unwrap_or(defaults.history_key);
        let favorites_key = lookup("LOCATION_FAVORITES_KEY").unwrap_or(defaults.favorites_key);
        if history_key == favorites_key {
            return Err(ConfigError::Invalid {
                var: "LOCATION_FAVORITES_KEY",
                value: favorites_key,
                reason: "must differ from LOCATION_HISTORY_KEY",
            });
        }

        Ok(Self {
            data_dir: lookup("LOCATION_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.data_dir),
            history_key,
            favorites_key,
            history_capacity: positive(&lookup, "LOCATION_HISTORY_CAPACITY")?
                .unwrap_or(defaults.history_capacity),
            encoding: match lookup("LOCATION_STORE_ENCODING") {
                Some(value) => value.parse().map_err(|_| ConfigError::Invalid {
                    var: "LOCATION_STORE_ENCODING",
                    value,
                    reason: "expected json or msgpack",
                })?,
                None => defaults.encoding,
            },
            command_buffer: positive(&lookup, "LOCATION_COMMAND_BUFFER")?
                .unwrap_or(defaults.command_buffer),
        })
    }
}

fn positive(lookup: &impl Fn(&str) -> Option<String>, var: &'static str) -> Result<Option<usize>, ConfigError> {
    let Some(value) = lookup(var) else {
        return Ok(None);
    };
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::Invalid {
            var,
            value,
            reason: "expected a positive integer",
        }),
    }
}
