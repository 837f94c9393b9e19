//! Core library for the `forecast` dashboard.
//!
//! This crate defines:
//! - Forecast aggregation (3-hour samples folded into calendar days)
//! - Presentation helpers (themes, animations, compass and comfort labels)
//! - The dashboard state machine and its async controller
//! - Collaborator seams for the weather provider, device position and storage
//! - Configuration & credentials handling
//!
//! It is used by `forecast-cli`, but any host that can render the state can
//! drive it.

pub mod aggregate;
pub mod config;
pub mod dashboard;
pub mod display;
pub mod error;
pub mod model;
pub mod provider;
pub mod state;
pub mod storage;

pub use aggregate::{DayAggregate, ForecastSeries, TempRange, aggregate, aggregate_in};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardSettings};
pub use error::{FailureReason, WeatherError};
pub use model::{Condition, Coordinates, CurrentWeather, ForecastSample, Location, UnitSystem, Wind};
pub use provider::{FixedPosition, OpenWeatherProvider, PositionSource, WeatherProvider};
pub use state::{DashboardState, Phase, QueryTarget};
pub use storage::{FileStore, KeyValueStore, MemoryStore, RecentSearches};
