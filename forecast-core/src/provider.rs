use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::{Result, WeatherError},
    model::{Coordinates, CurrentWeather, ForecastSample, Location, UnitSystem},
};

pub mod openweather;

pub use openweather::OpenWeatherProvider;

/// Geocoding and weather data source.
#[async_trait]
pub trait WeatherProvider: Send + Sync + Debug {
    /// Places matching `query`, best match first, at most `limit` entries.
    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<Location>>;

    async fn reverse_geocode(&self, at: Coordinates) -> Result<Option<Location>>;

    async fn current_weather(&self, at: Coordinates, unit: UnitSystem) -> Result<CurrentWeather>;

    /// 3-hour samples in ascending time order.
    async fn forecast(&self, at: Coordinates, unit: UnitSystem) -> Result<Vec<ForecastSample>>;
}

/// Device position lookup; may be declined or unsupported.
#[async_trait]
pub trait PositionSource: Send + Sync + Debug {
    async fn current_position(&self) -> Result<Coordinates>;
}

/// Position supplied up front by the host, e.g. from command-line flags.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedPosition(Option<Coordinates>);

impl FixedPosition {
    pub fn new(at: Coordinates) -> Self {
        Self(Some(at))
    }

    pub fn unavailable() -> Self {
        Self(None)
    }
}

#[async_trait]
impl PositionSource for FixedPosition {
    async fn current_position(&self) -> Result<Coordinates> {
        self.0.ok_or_else(|| {
            WeatherError::GeolocationUnavailable("no position was supplied".to_string())
        })
    }
}
