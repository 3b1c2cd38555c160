//! Console front end for the virtual location store.
//!
//! Run with
//! ```not_rust
//! RUST_LOG=virtual_location=debug cargo run
//! ```
//! Set `SIMULATED_FIX=lat,lon` to give the simulated provider a real position.

mod console;

use std::env;
use std::sync::Arc;

use anyhow::Context;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use virtual_location::{
    AuthorizationStatus, Coordinate, FileBlobStore, LocationObserver, LocationRecord, LocationStore,
    ProviderError, SimulatedProvider, StoreConfig,
};

use crate::console::{parse_command, ConsoleCommand, HELP};

struct LogObserver;

impl LocationObserver for LogObserver {
    fn location_updated(&self, location: &LocationRecord) {
        info!("Location update: {}", describe(location));
    }

    fn provider_failed(&self, error: &ProviderError) {
        info!("Provider failure: {}", error);
    }

    fn authorization_changed(&self, status: AuthorizationStatus) {
        info!("Authorization is now {:?}", status);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "virtual_location=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = StoreConfig::from_env().context("invalid store configuration")?;
    info!("Storing locations in {}", config.data_dir.display());

    let fix = match env::var("SIMULATED_FIX") {
        Ok(value) => Some(parse_fix(&value).with_context(|| format!("invalid SIMULATED_FIX {value:?}"))?),
        Err(_) => None,
    };
    let provider = Arc::new(SimulatedProvider::new(AuthorizationStatus::NotDetermined, fix));
    let blobs = Arc::new(FileBlobStore::new(config.data_dir.clone()));
    let store = LocationStore::open(&config, blobs, provider).await;
    let _subscription = store.subscribe(Arc::new(LogObserver));

    println!("{HELP}");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_command(&line) {
            Ok(ConsoleCommand::Quit) => break,
            Ok(command) => run(&store, command).await?,
            Err(e) => println!("{e}"),
        }
    }

    store.flush().await?;
    Ok(())
}

async fn run(store: &LocationStore, command: ConsoleCommand) -> anyhow::Result<()> {
    match command {
        ConsoleCommand::Set(location) => store.set_virtual_location(location).await?,
        ConsoleCommand::Off => store.disable_virtual_location().await?,
        ConsoleCommand::Current => match store.current_location().await? {
            Some(location) => println!("{}", describe(&location)),
            None => println!("no location available"),
        },
        ConsoleCommand::History => print_list(&store.historical_locations().await?),
        ConsoleCommand::Forget(name) => {
            if !store.remove_from_history(by_name(&name)?).await? {
                println!("{name} is not in history");
            }
        }
        ConsoleCommand::Clear => store.clear_history().await?,
        ConsoleCommand::Favorites => print_list(&store.favorite_locations().await?),
        ConsoleCommand::Favorite(name) => match find(store, &name).await? {
            Some(location) => {
                if !store.add_to_favorites(location).await? {
                    println!("{name} is already a favorite");
                }
            }
            None => println!("no known location named {name}"),
        },
        ConsoleCommand::Unfavorite(name) => {
            store.remove_from_favorites(by_name(&name)?).await?;
        }
        ConsoleCommand::Toggle(name) => match find(store, &name).await? {
            Some(location) => {
                let favorited = store.toggle_favorite(location).await?;
                println!("{name} {}", if favorited { "starred" } else { "unstarred" });
            }
            None => println!("no known location named {name}"),
        },
        ConsoleCommand::Presets => print_list(store.preset_locations()),
        ConsoleCommand::Permission => {
            let status = store.request_location_permission().await?;
            println!("authorization was {status:?}");
        }
        ConsoleCommand::Help => println!("{HELP}"),
        ConsoleCommand::Quit => {}
    }
    Ok(())
}

/// Identity is the name alone, so removal only needs a record carrying it.
fn by_name(name: &str) -> anyhow::Result<LocationRecord> {
    Ok(LocationRecord::new(Coordinate::new(0.0, 0.0), name, "")?)
}

async fn find(store: &LocationStore, name: &str) -> anyhow::Result<Option<LocationRecord>> {
    let current = store.current_state().await?.override_location().cloned();
    let known = current
        .into_iter()
        .chain(store.historical_locations().await?)
        .chain(store.favorite_locations().await?)
        .chain(store.preset_locations().iter().cloned())
        .find(|location| location.name() == name);
    Ok(known)
}

fn parse_fix(value: &str) -> anyhow::Result<Coordinate> {
    let (lat, lon) = value.split_once(',').context("expected lat,lon")?;
    Ok(Coordinate::new(lat.trim().parse()?, lon.trim().parse()?))
}

fn describe(location: &LocationRecord) -> String {
    let mut text = format!(
        "{} ({:.4}, {:.4})",
        location.name(),
        location.latitude(),
        location.longitude()
    );
    if !location.address().is_empty() {
        text.push_str(" - ");
        text.push_str(location.address());
    }
    text
}

fn print_list(locations: &[LocationRecord]) {
    if locations.is_empty() {
        println!("(empty)");
    }
    for (i, location) in locations.iter().enumerate() {
        println!("{:>3}. {}", i + 1, describe(location));
    }
}
