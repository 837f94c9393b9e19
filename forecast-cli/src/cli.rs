use std::sync::Arc;

use anyhow::{Context, anyhow};
use clap::{Parser, Subcommand};
use forecast_core::{
    Config, Coordinates, Dashboard, DashboardSettings, FileStore, FixedPosition,
    OpenWeatherProvider, UnitSystem, WeatherError,
};
use inquire::{Password, PasswordDisplayMode, Select};

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "forecast", version, about = "Weather dashboard in your terminal")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the OpenWeather API key and preferred units.
    Configure,

    /// Show current conditions and the 5-day forecast for a city.
    Show {
        /// City name, e.g. "London".
        city: String,

        /// "metric" or "imperial"; defaults to the configured units.
        #[arg(long, value_parser = parse_units)]
        units: Option<UnitSystem>,

        /// Expand one forecast day (1 = today).
        #[arg(long)]
        day: Option<usize>,
    },

    /// Show the weather at a coordinate, as a device position would.
    Here {
        #[arg(long, allow_hyphen_values = true)]
        lat: f64,

        #[arg(long, allow_hyphen_values = true)]
        lon: f64,

        #[arg(long, value_parser = parse_units)]
        units: Option<UnitSystem>,

        #[arg(long)]
        day: Option<usize>,
    },

    /// List places matching a partial name; `--pick` loads one of them.
    Suggest {
        text: String,

        /// 1-based index into the printed list.
        #[arg(long)]
        pick: Option<usize>,

        #[arg(long, value_parser = parse_units)]
        units: Option<UnitSystem>,
    },

    /// List recent searches; `--pick` loads one of them.
    Recent {
        #[arg(long)]
        pick: Option<usize>,

        #[arg(long, value_parser = parse_units)]
        units: Option<UnitSystem>,
    },
}

fn parse_units(value: &str) -> Result<UnitSystem, String> {
    UnitSystem::try_from(value).map_err(|e| e.to_string())
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = Config::load()?;

        match self.command {
            Command::Configure => configure(config),
            Command::Show { city, units, day } => {
                let dash = open_dashboard(&config, units, FixedPosition::unavailable())?;
                dash.search(&city).await.map_err(explain)?;
                show(&dash, day).await
            }
            Command::Here { lat, lon, units, day } => {
                let position = FixedPosition::new(Coordinates { lat, lon });
                let dash = open_dashboard(&config, units, position)?;
                dash.locate().await.map_err(explain)?;
                show(&dash, day).await
            }
            Command::Suggest { text, pick, units } => {
                let dash = open_dashboard(&config, units, FixedPosition::unavailable())?;
                dash.type_query(&text).await;
                let state = dash.snapshot().await;

                match pick {
                    None => {
                        print!("{}", render::places("Suggestions", state.suggestions()));
                        Ok(())
                    }
                    Some(n) => {
                        let location = nth(state.suggestions(), n)?.clone();
                        dash.pick(location).await.map_err(explain)?;
                        show(&dash, None).await
                    }
                }
            }
            Command::Recent { pick, units } => {
                let dash = open_dashboard(&config, units, FixedPosition::unavailable())?;
                let state = dash.snapshot().await;

                match pick {
                    None => {
                        print!("{}", render::places("Recent searches", state.recent().as_slice()));
                        Ok(())
                    }
                    Some(n) => {
                        let location = nth(state.recent().as_slice(), n)?.clone();
                        dash.pick(location).await.map_err(explain)?;
                        show(&dash, None).await
                    }
                }
            }
        }
    }
}

fn configure(mut config: Config) -> anyhow::Result<()> {
    let api_key = Password::new("OpenWeather API key:")
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    config.set_api_key(api_key);

    let units = Select::new("Preferred units:", vec![UnitSystem::Metric, UnitSystem::Imperial])
        .with_starting_cursor(usize::from(config.units == UnitSystem::Imperial))
        .prompt()
        .context("Failed to read units")?;
    config.units = units;

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn open_dashboard(
    config: &Config,
    units: Option<UnitSystem>,
    position: FixedPosition,
) -> anyhow::Result<Dashboard> {
    let api_key = config.resolve_api_key().ok_or(WeatherError::MissingApiKey)?;

    let mut settings = DashboardSettings::from(config);
    if let Some(units) = units {
        settings.unit = units;
    }

    // A one-shot invocation has no further keystrokes to wait for.
    settings.debounce = std::time::Duration::ZERO;

    let store = FileStore::new(Config::data_dir()?);
    tracing::debug!(dir = %store.dir().display(), "using data directory");

    Ok(Dashboard::new(
        Arc::new(OpenWeatherProvider::new(api_key)),
        Arc::new(position),
        Arc::new(store),
        settings,
    ))
}

async fn show(dash: &Dashboard, day: Option<usize>) -> anyhow::Result<()> {
    if let Some(n) = day {
        let state = dash.snapshot().await;
        let date = nth(state.forecast().days(), n)?.date;
        dash.select_day(date).await;
    }

    print!("{}", render::dashboard(&dash.snapshot().await));
    Ok(())
}

fn nth<T>(items: &[T], n: usize) -> anyhow::Result<&T> {
    n.checked_sub(1)
        .and_then(|i| items.get(i))
        .ok_or_else(|| anyhow!("No entry #{n}; choose between 1 and {}.", items.len()))
}

fn explain(err: WeatherError) -> anyhow::Error {
    match err {
        WeatherError::LocationNotFound(_) => anyhow!("City not found. Please try another city."),
        WeatherError::GeolocationUnavailable(_) => {
            anyhow!("Geolocation is not available. Please search for a city.")
        }
        other => anyhow::Error::new(other).context("Failed to fetch weather data"),
    }
}
