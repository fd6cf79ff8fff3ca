use std::{sync::Arc, time::Duration};

use anyhow::{Context, anyhow};
use clap::{Args, Parser, Subcommand};
use forecast_core::{
    Config, Coordinates, DeviceLocation, ForecastClient, ForecastController, PreferenceStore,
    Snapshot, Updates,
    provider::client_from_config,
    settings::{SettingsOutcome, disable_location_fetch, enable_location_fetch},
};
use tracing::warn;

use crate::output;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather forecast for a city or your location")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key.
    Configure,

    /// Change stored preferences and print the result.
    Settings {
        /// City to fetch the forecast for.
        #[arg(long)]
        city: Option<String>,

        #[arg(long, conflicts_with = "light")]
        dark: bool,

        #[arg(long)]
        light: bool,

        /// Fetch by device location instead of city name.
        #[arg(long, conflicts_with = "by_city")]
        by_location: bool,

        #[arg(long)]
        by_city: bool,

        /// Grant location permission without supplying a position.
        #[arg(long)]
        allow_location: bool,

        #[command(flatten)]
        position: PositionArgs,
    },

    /// Fetch and print the forecast once.
    Show {
        #[command(flatten)]
        position: PositionArgs,
    },

    /// Keep printing the forecast as preferences or location change.
    Watch {
        #[command(flatten)]
        position: PositionArgs,

        /// How often to re-read the preference file, in seconds.
        #[arg(long, default_value_t = 2)]
        poll_secs: u64,
    },
}

/// Device position, standing in for a platform location fix.
#[derive(Debug, Args)]
pub struct PositionArgs {
    #[arg(long, requires = "lon", allow_hyphen_values = true)]
    lat: Option<f64>,

    #[arg(long, requires = "lat", allow_hyphen_values = true)]
    lon: Option<f64>,
}

impl PositionArgs {
    fn position(&self) -> Option<Coordinates> {
        self.lat.zip(self.lon).map(|(lat, lon)| Coordinates::new(lat, lon))
    }

    /// Supplying a position is what grants location permission here.
    fn location(&self) -> DeviceLocation {
        match self.position() {
            Some(position) => DeviceLocation::with_fixed_position(position),
            None => DeviceLocation::new(false),
        }
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Settings {
                city,
                dark,
                light,
                by_location,
                by_city,
                allow_location,
                position,
            } => {
                let store = open_store(&config).await?;

                if let Some(city) = city {
                    store.update(|p| p.city_name = city).await?;
                }
                if dark || light {
                    store.update(|p| p.is_dark_theme = dark).await?;
                }
                if by_location {
                    let location = position.location();
                    location.set_permission(allow_location || position.position().is_some());
                    if let SettingsOutcome::Refused(advisory) =
                        enable_location_fetch(&store, &location).await?
                    {
                        eprintln!("{}", advisory.message());
                    }
                }
                if by_city {
                    disable_location_fetch(&store).await?;
                }

                print!("{}", output::render_preferences(&store.current()));
                println!("Stored in {}", store.path().display());
                Ok(())
            }
            Command::Show { position } => show(&config, position).await,
            Command::Watch { position, poll_secs } => watch(&config, position, poll_secs).await,
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = inquire::Password::new("OpenWeather API key:")
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;

    if api_key.trim().is_empty() {
        return Err(anyhow!("API key must not be empty"));
    }

    config.set_api_key(api_key.trim().to_string());
    config.save()?;

    println!("Saved to {}", Config::config_file_path()?.display());
    Ok(())
}

async fn open_store(config: &Config) -> anyhow::Result<PreferenceStore> {
    Ok(PreferenceStore::open(config.preferences_path()?).await)
}

fn start(
    config: &Config,
    store: &PreferenceStore,
    position: &PositionArgs,
) -> anyhow::Result<ForecastController> {
    let client: Arc<dyn ForecastClient> = Arc::from(client_from_config(config)?);
    let location = Arc::new(position.location());

    Ok(ForecastController::spawn(store.observe(), location, client))
}

async fn next_settled(updates: &mut Updates<Snapshot>) -> Option<Snapshot> {
    while let Some(snapshot) = updates.next().await {
        if !snapshot.is_loading() {
            return Some(snapshot);
        }
    }
    None
}

async fn show(config: &Config, position: PositionArgs) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let controller = start(config, &store, &position)?;
    let mut updates = controller.subscribe();

    let snapshot = next_settled(&mut updates).await;
    controller.shutdown().await;

    let snapshot = snapshot.ok_or_else(|| anyhow!("Forecast controller stopped unexpectedly"))?;
    print!("{}", output::render_snapshot(&snapshot));

    if snapshot.state.is_failed() && snapshot.forecast().is_none() {
        return Err(anyhow!("Could not load the forecast"));
    }
    Ok(())
}

async fn watch(config: &Config, position: PositionArgs, poll_secs: u64) -> anyhow::Result<()> {
    let store = open_store(config).await?;
    let controller = start(config, &store, &position)?;
    let mut updates = controller.subscribe();
    let mut poll = tokio::time::interval(Duration::from_secs(poll_secs.max(1)));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,

            snapshot = next_settled(&mut updates) => match snapshot {
                Some(snapshot) => print!("{}", output::render_snapshot(&snapshot)),
                None => break,
            },

            _ = poll.tick() => {
                if let Err(err) = store.reload().await {
                    warn!(error = %err, "failed to re-read preferences");
                }
            }
        }
    }

    controller.shutdown().await;
    Ok(())
}
