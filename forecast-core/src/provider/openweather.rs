use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    error::{Result, WeatherError},
    model::{Condition, Coordinates, CurrentWeather, ForecastSample, Location, UnitSystem, Wind},
};

use super::WeatherProvider;

const DEFAULT_BASE_URL: &str = "https://api.openweathermap.org";

/// OpenWeatherMap free tier: direct/reverse geocoding, current weather and
/// the 5 day / 3 hour forecast.
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    api_key: String,
    base_url: String,
    http: Client,
}

impl OpenWeatherProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    /// Points the client at another host serving the same API.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        what: &str,
        query: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);
        tracing::debug!(%url, what, "requesting OpenWeather");

        let res = self
            .http
            .get(&url)
            .query(query)
            .query(&[("appid", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                WeatherError::Network(format!("Failed to send request to OpenWeather ({what}): {e}"))
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| {
            WeatherError::Network(format!("Failed to read OpenWeather {what} response body: {e}"))
        })?;

        if !status.is_success() {
            return Err(WeatherError::Network(format!(
                "OpenWeather {what} request failed with status {status}: {}",
                truncate_body(&body),
            )));
        }

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::Network(format!("Failed to parse OpenWeather {what} JSON: {e}"))
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<Location>> {
        let places: Vec<OwPlace> = self
            .get_json(
                "/geo/1.0/direct",
                "geocoding",
                &[("q", query.to_string()), ("limit", limit.to_string())],
            )
            .await?;

        Ok(places.into_iter().map(Location::from).collect())
    }

    async fn reverse_geocode(&self, at: Coordinates) -> Result<Option<Location>> {
        let places: Vec<OwPlace> = self
            .get_json(
                "/geo/1.0/reverse",
                "reverse geocoding",
                &[
                    ("lat", at.lat.to_string()),
                    ("lon", at.lon.to_string()),
                    ("limit", "1".to_string()),
                ],
            )
            .await?;

        Ok(places.into_iter().next().map(Location::from))
    }

    async fn current_weather(&self, at: Coordinates, unit: UnitSystem) -> Result<CurrentWeather> {
        let parsed: OwCurrentResponse = self
            .get_json("/data/2.5/weather", "current weather", &weather_query(at, unit))
            .await?;

        Ok(parsed.into())
    }

    async fn forecast(&self, at: Coordinates, unit: UnitSystem) -> Result<Vec<ForecastSample>> {
        let parsed: OwForecastResponse = self
            .get_json("/data/2.5/forecast", "forecast", &weather_query(at, unit))
            .await?;

        Ok(parsed.list.into_iter().map(ForecastSample::from).collect())
    }
}

fn weather_query(at: Coordinates, unit: UnitSystem) -> [(&'static str, String); 3] {
    [
        ("lat", at.lat.to_string()),
        ("lon", at.lon.to_string()),
        ("units", unit.as_str().to_string()),
    ]
}

#[derive(Debug, Deserialize)]
struct OwPlace {
    name: String,
    #[serde(default)]
    country: String,
    state: Option<String>,
    lat: f64,
    lon: f64,
}

impl From<OwPlace> for Location {
    fn from(p: OwPlace) -> Self {
        Location {
            name: p.name,
            country: p.country,
            state: p.state,
            lat: p.lat,
            lon: p.lon,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
    feels_like: f64,
    pressure: f64,
    humidity: u8,
}

#[derive(Debug, Deserialize)]
struct OwWeather {
    id: u16,
    main: String,
    description: String,
    icon: String,
}

impl From<OwWeather> for Condition {
    fn from(w: OwWeather) -> Self {
        Condition {
            id: w.id,
            main: w.main,
            description: w.description,
            icon: w.icon,
        }
    }
}

fn first_condition(weather: Vec<OwWeather>) -> Condition {
    weather.into_iter().next().map(Condition::from).unwrap_or_default()
}

#[derive(Debug, Deserialize)]
struct OwWind {
    speed: f64,
    #[serde(default)]
    deg: f64,
    gust: Option<f64>,
}

impl From<OwWind> for Wind {
    fn from(w: OwWind) -> Self {
        Wind { speed: w.speed, deg: w.deg, gust: w.gust }
    }
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct OwSys {
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwCurrentResponse {
    name: String,
    coord: OwCoord,
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    visibility: Option<u32>,
    sys: OwSys,
    #[serde(default)]
    timezone: i32,
}

impl From<OwCurrentResponse> for CurrentWeather {
    fn from(r: OwCurrentResponse) -> Self {
        CurrentWeather {
            location_name: r.name,
            coordinates: Coordinates { lat: r.coord.lat, lon: r.coord.lon },
            dt: r.dt,
            temp: r.main.temp,
            feels_like: r.main.feels_like,
            humidity: r.main.humidity,
            pressure: r.main.pressure,
            wind: r.wind.into(),
            visibility: r.visibility,
            condition: first_condition(r.weather),
            sunrise: r.sys.sunrise,
            sunset: r.sys.sunset,
            timezone_offset: r.timezone,
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastEntry {
    dt: i64,
    main: OwMain,
    weather: Vec<OwWeather>,
    wind: OwWind,
    visibility: Option<u32>,
    pop: Option<f64>,
}

impl From<OwForecastEntry> for ForecastSample {
    fn from(e: OwForecastEntry) -> Self {
        ForecastSample {
            dt: e.dt,
            temp: e.main.temp,
            feels_like: e.main.feels_like,
            humidity: e.main.humidity,
            pressure: e.main.pressure,
            wind: e.wind.into(),
            visibility: e.visibility,
            pop: e.pop,
            condition: first_condition(e.weather),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    list: Vec<OwForecastEntry>,
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CURRENT: &str = r#"{
        "coord": {"lon": -0.1257, "lat": 51.5085},
        "weather": [{"id": 500, "main": "Rain", "description": "light rain", "icon": "10d"}],
        "main": {"temp": 17.2, "feels_like": 16.9, "temp_min": 15.0, "temp_max": 18.3,
                 "pressure": 1009, "humidity": 78},
        "visibility": 10000,
        "wind": {"speed": 4.6, "deg": 230},
        "dt": 1717243200,
        "sys": {"country": "GB", "sunrise": 1717213500, "sunset": 1717272900},
        "timezone": 3600,
        "name": "London"
    }"#;

    const FORECAST: &str = r#"{
        "cod": "200",
        "list": [
            {"dt": 1717200000,
             "main": {"temp": 12.1, "feels_like": 11.5, "pressure": 1011, "humidity": 81},
             "weather": [{"id": 803, "main": "Clouds", "description": "broken clouds", "icon": "04n"}],
             "wind": {"speed": 2.1, "deg": 200, "gust": 3.9},
             "visibility": 10000, "pop": 0.12, "dt_txt": "2024-06-01 00:00:00"},
            {"dt": 1717210800,
             "main": {"temp": 11.4, "feels_like": 10.9, "pressure": 1012, "humidity": 85},
             "weather": [],
             "wind": {"speed": 1.8, "deg": 190},
             "dt_txt": "2024-06-01 03:00:00"}
        ],
        "city": {"name": "London", "country": "GB"}
    }"#;

    #[test]
    fn maps_current_weather() {
        let parsed: OwCurrentResponse = serde_json::from_str(CURRENT).unwrap();
        let current = CurrentWeather::from(parsed);

        assert_eq!(current.location_name, "London");
        assert_eq!(current.condition.icon, "10d");
        assert_eq!(current.pressure, 1009.0);
        assert_eq!(current.wind.deg, 230.0);
        assert_eq!(current.wind.gust, None);
        assert_eq!(current.visibility, Some(10_000));
        assert_eq!(current.timezone_offset, 3600);
        assert!((current.coordinates.lat - 51.5085).abs() < 1e-9);
    }

    #[test]
    fn maps_forecast_samples_in_order() {
        let parsed: OwForecastResponse = serde_json::from_str(FORECAST).unwrap();
        let samples: Vec<ForecastSample> = parsed.list.into_iter().map(Into::into).collect();

        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].dt, 1_717_200_000);
        assert_eq!(samples[0].pop, Some(0.12));
        assert_eq!(samples[0].wind.gust, Some(3.9));
        assert_eq!(samples[0].condition.main, "Clouds");

        assert_eq!(samples[1].pop, None);
        assert_eq!(samples[1].visibility, None);
        assert_eq!(samples[1].condition, Condition::default());
    }

    #[test]
    fn maps_geocoding_places() {
        let raw = r#"[
            {"name": "London", "local_names": {"en": "London"}, "lat": 51.5073, "lon": -0.1276,
             "country": "GB", "state": "England"},
            {"name": "London", "lat": 42.9836, "lon": -81.2497, "country": "CA"}
        ]"#;
        let places: Vec<OwPlace> = serde_json::from_str(raw).unwrap();
        let locations: Vec<Location> = places.into_iter().map(Into::into).collect();

        assert_eq!(locations[0].state.as_deref(), Some("England"));
        assert_eq!(locations[1].country, "CA");
        assert_eq!(locations[1].state, None);
    }

    #[test]
    fn base_url_is_normalised() {
        let provider = OpenWeatherProvider::new("KEY".into()).with_base_url("http://localhost:9000/");
        assert_eq!(provider.base_url, "http://localhost:9000");
    }

    #[test]
    fn truncate_body_respects_char_boundaries() {
        let long = "é".repeat(300);
        let out = truncate_body(&long);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 203);
        assert_eq!(truncate_body("short"), "short");
    }
}
