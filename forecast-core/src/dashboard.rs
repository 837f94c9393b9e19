//! The dashboard controller: owns the presentation state and drives the
//! injected collaborators.

use std::{sync::Arc, time::Duration};

use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::{
    aggregate::aggregate,
    config::Config,
    error::{Result, WeatherError},
    model::{Location, UnitSystem},
    provider::{PositionSource, WeatherProvider},
    state::{DashboardState, FetchOutcome, QueryTarget},
    storage::{KeyValueStore, RecentSearches},
};

const UNKNOWN_LOCATION: &str = "Unknown Location";

#[derive(Debug, Clone, Copy)]
pub struct DashboardSettings {
    pub unit: UnitSystem,
    pub debounce: Duration,
    pub suggestion_limit: u8,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for DashboardSettings {
    fn from(config: &Config) -> Self {
        Self {
            unit: config.units,
            debounce: config.suggestion_debounce(),
            suggestion_limit: config.suggestion_limit,
        }
    }
}

/// State is locked only around synchronous transitions, never across an
/// await, so overlapping calls interleave freely and tickets decide which
/// result is shown.
#[derive(Debug)]
pub struct Dashboard {
    provider: Arc<dyn WeatherProvider>,
    locator: Arc<dyn PositionSource>,
    store: Arc<dyn KeyValueStore>,
    settings: DashboardSettings,
    state: Mutex<DashboardState>,
}

impl Dashboard {
    pub fn new(
        provider: Arc<dyn WeatherProvider>,
        locator: Arc<dyn PositionSource>,
        store: Arc<dyn KeyValueStore>,
        settings: DashboardSettings,
    ) -> Self {
        let recent = RecentSearches::load(store.as_ref());
        Self {
            provider,
            locator,
            store,
            settings,
            state: Mutex::new(DashboardState::new(settings.unit, recent)),
        }
    }

    /// Copy of the current presentation state for rendering.
    pub async fn snapshot(&self) -> DashboardState {
        self.state.lock().await.clone()
    }

    /// Submits a typed city name.
    pub async fn search(&self, name: &str) -> Result<()> {
        let name = name.trim();
        if name.is_empty() {
            return Ok(());
        }
        self.load(QueryTarget::Name(name.to_string())).await
    }

    /// Loads a place picked from the suggestions or the recent searches.
    pub async fn pick(&self, location: Location) -> Result<()> {
        self.load(QueryTarget::Suggestion(location)).await
    }

    /// Loads the device's position. When the position is unavailable a
    /// notice is recorded and the dashboard stays usable.
    pub async fn locate(&self) -> Result<()> {
        match self.locator.current_position().await {
            Ok(at) => self.load(QueryTarget::Position(at)).await,
            Err(e) => {
                tracing::warn!(error = %e, "geolocation unavailable");
                self.state
                    .lock()
                    .await
                    .set_notice("Geolocation is not available. Please search for a city.");
                Err(e)
            }
        }
    }

    /// Switches metric/imperial, re-fetching whatever is loaded or loading.
    pub async fn toggle_unit(&self) -> Result<()> {
        let reload = self.state.lock().await.toggle_unit();
        match reload {
            Some(target) => self.load(target).await,
            None => Ok(()),
        }
    }

    pub async fn select_day(&self, date: NaiveDate) -> bool {
        self.state.lock().await.select_day(date)
    }

    pub async fn clear_selection(&self) {
        self.state.lock().await.clear_selection();
    }

    pub async fn dismiss_suggestions(&self) {
        self.state.lock().await.dismiss_suggestions();
    }

    /// Handles a keystroke in the search box. The lookup runs once the text
    /// has been quiet for the debounce interval; returns `true` when this
    /// call's suggestions were applied.
    pub async fn type_query(&self, text: &str) -> bool {
        let Some(ticket) = self.state.lock().await.query_changed(text) else {
            return false;
        };

        tokio::time::sleep(self.settings.debounce).await;
        if !self.state.lock().await.is_latest_lookup(ticket) {
            return false;
        }

        let found = match self.provider.geocode(text.trim(), self.settings.suggestion_limit).await {
            Ok(found) => found,
            Err(e) => {
                tracing::warn!(error = %e, query = text, "suggestion lookup failed");
                Vec::new()
            }
        };

        self.state.lock().await.suggestions_resolved(ticket, found)
    }

    async fn load(&self, target: QueryTarget) -> Result<()> {
        let (ticket, unit) = {
            let mut state = self.state.lock().await;
            (state.submit_query(&target), state.unit())
        };

        let result = self.fetch(target, unit).await;

        let mut state = self.state.lock().await;
        match result {
            Ok(outcome) => {
                if state.fetch_succeeded(ticket, outcome) {
                    state.recent().save(self.store.as_ref());
                }
                Ok(())
            }
            Err(e) => {
                tracing::debug!(error = %e, "fetch failed");
                state.fetch_failed(ticket, &e);
                Err(e)
            }
        }
    }

    async fn fetch(&self, target: QueryTarget, unit: UnitSystem) -> Result<FetchOutcome> {
        let (location, remember) = match target {
            QueryTarget::Name(name) => {
                let found = self.provider.geocode(&name, 1).await?;
                let first = found
                    .into_iter()
                    .next()
                    .ok_or_else(|| WeatherError::LocationNotFound(name.clone()))?;
                (Location { name, ..first }, false)
            }
            QueryTarget::Suggestion(location) => (location, true),
            QueryTarget::Reload(location) => (location, false),
            QueryTarget::Position(at) => match self.provider.reverse_geocode(at).await? {
                Some(found) => (Location { lat: at.lat, lon: at.lon, ..found }, true),
                None => (
                    Location {
                        name: UNKNOWN_LOCATION.to_string(),
                        country: String::new(),
                        state: None,
                        lat: at.lat,
                        lon: at.lon,
                    },
                    false,
                ),
            },
        };

        let at = location.coordinates();
        let (current, samples) = tokio::try_join!(
            self.provider.current_weather(at, unit),
            self.provider.forecast(at, unit),
        )?;

        Ok(FetchOutcome {
            location,
            current,
            forecast: aggregate(&samples),
            remember,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use crate::{
        error::FailureReason,
        model::{Condition, Coordinates, CurrentWeather, ForecastSample, Wind},
        provider::FixedPosition,
        state::Phase,
        storage::{MemoryStore, RECENT_SEARCHES_KEY},
    };

    // 2024-06-01T12:00:00Z
    const NOON: i64 = 1_717_243_200;

    fn place(name: &str, country: &str, lat: f64) -> Location {
        Location {
            name: name.into(),
            country: country.into(),
            state: None,
            lat,
            lon: 0.0,
        }
    }

    /// Canned provider; lookups for names starting with "Slow" take longer
    /// and every forecast takes 100ms.
    #[derive(Debug, Default)]
    struct FakeProvider {
        geocode_calls: AtomicUsize,
        forecast_calls: AtomicUsize,
        fail_weather: bool,
    }

    #[async_trait]
    impl WeatherProvider for FakeProvider {
        async fn geocode(&self, query: &str, limit: u8) -> Result<Vec<Location>> {
            self.geocode_calls.fetch_add(1, Ordering::SeqCst);
            let delay = if query.starts_with("Slow") { 500 } else { 100 };
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let known = [
                place("London", "GB", 51.5),
                place("London", "CA", 42.9),
                place("Longyearbyen", "SJ", 78.2),
                place("Slowtown", "US", 10.0),
            ];
            Ok(known
                .into_iter()
                .filter(|l| l.name.starts_with(query))
                .take(usize::from(limit))
                .collect())
        }

        async fn reverse_geocode(&self, at: Coordinates) -> Result<Option<Location>> {
            if at.lat > 80.0 {
                return Ok(None);
            }
            Ok(Some(place("Camden", "GB", 51.54)))
        }

        async fn current_weather(
            &self,
            at: Coordinates,
            unit: UnitSystem,
        ) -> Result<CurrentWeather> {
            if self.fail_weather {
                return Err(WeatherError::Network("connection reset".into()));
            }
            Ok(CurrentWeather {
                location_name: "Somewhere".into(),
                coordinates: at,
                dt: NOON,
                temp: base_temp(unit),
                feels_like: 19.0,
                humidity: 55,
                pressure: 1015.0,
                wind: Wind { speed: 3.0, deg: 90.0, gust: None },
                visibility: Some(10_000),
                condition: Condition {
                    id: 800,
                    main: "Clear".into(),
                    description: "clear sky".into(),
                    icon: "01d".into(),
                },
                sunrise: NOON - 7 * 3600,
                sunset: NOON + 8 * 3600,
                timezone_offset: 0,
            })
        }

        async fn forecast(
            &self,
            _at: Coordinates,
            unit: UnitSystem,
        ) -> Result<Vec<ForecastSample>> {
            self.forecast_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(100)).await;
            let base = base_temp(unit);
            Ok((0..8)
                .map(|i| ForecastSample {
                    dt: NOON + i * 3 * 3600,
                    temp: base + i as f64,
                    feels_like: base,
                    humidity: 60,
                    pressure: 1012.0,
                    wind: Wind::default(),
                    visibility: None,
                    pop: Some(0.1),
                    condition: Condition::default(),
                })
                .collect())
        }
    }

    fn base_temp(unit: UnitSystem) -> f64 {
        match unit {
            UnitSystem::Metric => 20.0,
            UnitSystem::Imperial => 68.0,
        }
    }

    fn dashboard_with(
        provider: Arc<FakeProvider>,
        locator: FixedPosition,
        store: Arc<MemoryStore>,
    ) -> Dashboard {
        Dashboard::new(provider, Arc::new(locator), store, DashboardSettings::default())
    }

    fn dashboard(provider: Arc<FakeProvider>) -> Dashboard {
        dashboard_with(provider, FixedPosition::unavailable(), Arc::new(MemoryStore::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn search_by_name_loads_without_remembering() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        dash.search("London").await.unwrap();

        let state = dash.snapshot().await;
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.location().unwrap().country, "GB");
        assert!(!state.forecast().is_empty());
        assert!(state.recent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_city_fails_with_not_found() {
        let dash = dashboard(Arc::new(FakeProvider::default()));

        let err = dash.search("Atlantis").await.unwrap_err();

        assert!(matches!(err, WeatherError::LocationNotFound(_)));
        assert_eq!(dash.snapshot().await.phase(), Phase::Failed(FailureReason::NotFound));
    }

    #[tokio::test(start_paused = true)]
    async fn provider_outage_fails_with_network_reason() {
        let provider = Arc::new(FakeProvider { fail_weather: true, ..Default::default() });
        let dash = dashboard(provider);

        assert!(dash.search("London").await.is_err());
        assert_eq!(dash.snapshot().await.phase(), Phase::Failed(FailureReason::Network));
    }

    #[tokio::test(start_paused = true)]
    async fn blank_search_is_ignored() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        dash.search("   ").await.unwrap();

        assert_eq!(dash.snapshot().await.phase(), Phase::Idle);
        assert_eq!(provider.geocode_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn picking_a_suggestion_persists_recent_searches() {
        let store = Arc::new(MemoryStore::new());
        let dash = dashboard_with(
            Arc::new(FakeProvider::default()),
            FixedPosition::unavailable(),
            store.clone(),
        );

        dash.pick(place("London", "CA", 42.9)).await.unwrap();

        let saved = store.get(RECENT_SEARCHES_KEY).unwrap().expect("recent searches saved");
        assert!(saved.contains("\"country\":\"CA\""));

        let reopened = dashboard_with(
            Arc::new(FakeProvider::default()),
            FixedPosition::unavailable(),
            store,
        );
        assert_eq!(reopened.snapshot().await.recent().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn geolocation_pick_is_remembered() {
        let dash = dashboard_with(
            Arc::new(FakeProvider::default()),
            FixedPosition::new(Coordinates { lat: 51.55, lon: -0.14 }),
            Arc::new(MemoryStore::new()),
        );

        dash.locate().await.unwrap();

        let state = dash.snapshot().await;
        assert_eq!(state.phase(), Phase::Loaded);
        let location = state.location().unwrap();
        assert_eq!(location.name, "Camden");
        assert_eq!(location.lat, 51.55);
        assert_eq!(state.recent().as_slice()[0].name, "Camden");
    }

    #[tokio::test(start_paused = true)]
    async fn position_without_a_place_name_is_unknown_location() {
        let dash = dashboard_with(
            Arc::new(FakeProvider::default()),
            FixedPosition::new(Coordinates { lat: 85.0, lon: 0.0 }),
            Arc::new(MemoryStore::new()),
        );

        dash.locate().await.unwrap();

        let state = dash.snapshot().await;
        assert_eq!(state.location().unwrap().name, "Unknown Location");
        assert!(state.recent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn geolocation_refusal_is_not_fatal() {
        let dash = dashboard(Arc::new(FakeProvider::default()));

        let err = dash.locate().await.unwrap_err();

        assert!(matches!(err, WeatherError::GeolocationUnavailable(_)));
        let state = dash.snapshot().await;
        assert_eq!(state.phase(), Phase::Idle);
        assert!(state.notice().unwrap().contains("Geolocation"));
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_twice_refetches_twice_and_restores_unit() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());
        dash.search("London").await.unwrap();
        let before = provider.forecast_calls.load(Ordering::SeqCst);

        dash.toggle_unit().await.unwrap();
        let state = dash.snapshot().await;
        assert_eq!(state.unit(), UnitSystem::Imperial);
        assert_eq!(state.forecast().today().unwrap().temp.min, 68.0);

        dash.toggle_unit().await.unwrap();
        assert_eq!(dash.snapshot().await.unit(), UnitSystem::Metric);
        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst) - before, 2);
        assert!(dash.snapshot().await.recent().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_twice_during_a_reload_refetches_twice() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());
        dash.search("London").await.unwrap();
        let before = provider.forecast_calls.load(Ordering::SeqCst);

        let (first, second) = tokio::join!(dash.toggle_unit(), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            dash.toggle_unit().await
        });
        first.unwrap();
        second.unwrap();

        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst) - before, 2);
        let state = dash.snapshot().await;
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.unit(), UnitSystem::Metric);
        assert_eq!(state.current().unwrap().temp, 20.0);
        assert_eq!(state.forecast().today().unwrap().temp.min, 20.0);
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_during_a_search_fetches_in_the_new_unit() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        let (searched, toggled) = tokio::join!(dash.search("London"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            dash.toggle_unit().await
        });
        searched.unwrap();
        toggled.unwrap();

        let state = dash.snapshot().await;
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.unit(), UnitSystem::Imperial);
        assert_eq!(state.current().unwrap().temp, 68.0);
        assert_eq!(state.forecast().today().unwrap().temp.min, 68.0);
        assert_eq!(state.location().unwrap().name, "London");
    }

    #[tokio::test(start_paused = true)]
    async fn second_search_in_flight_wins_over_the_first() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        let (slow, fast) = tokio::join!(dash.search("Slowtown"), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            dash.search("Longyearbyen").await
        });
        slow.unwrap();
        fast.unwrap();

        let state = dash.snapshot().await;
        assert_eq!(state.phase(), Phase::Loaded);
        assert_eq!(state.location().unwrap().name, "Longyearbyen");
    }

    #[tokio::test(start_paused = true)]
    async fn toggling_without_location_only_flips_preference() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        dash.toggle_unit().await.unwrap();

        assert_eq!(dash.snapshot().await.unit(), UnitSystem::Imperial);
        assert_eq!(provider.forecast_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn select_day_goes_through_the_state_machine() {
        let dash = dashboard(Arc::new(FakeProvider::default()));
        dash.search("London").await.unwrap();
        let today = dash.snapshot().await.forecast().today().unwrap().date;

        assert!(dash.select_day(today).await);
        assert_eq!(dash.snapshot().await.selected_date(), Some(today));

        dash.clear_selection().await;
        assert_eq!(dash.snapshot().await.selected_date(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn keystrokes_within_debounce_issue_one_lookup() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        let (first, second) = tokio::join!(dash.type_query("Lo"), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            dash.type_query("Lon").await
        });

        assert!(!first);
        assert!(second);
        assert_eq!(provider.geocode_calls.load(Ordering::SeqCst), 1);
        assert_eq!(dash.snapshot().await.suggestions().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_earlier_lookup_does_not_overwrite_later_one() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        // "Slow" resolves 500ms after its debounce; "London" is issued once
        // that lookup is already in flight and resolves first.
        let (slow, london) = tokio::join!(dash.type_query("Slow"), async {
            tokio::time::sleep(Duration::from_millis(350)).await;
            dash.type_query("London").await
        });

        assert!(!slow);
        assert!(london);
        assert_eq!(provider.geocode_calls.load(Ordering::SeqCst), 2);

        let state = dash.snapshot().await;
        assert!(state.suggestions().iter().all(|l| l.name == "London"));
        assert_eq!(state.suggestions().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn short_text_clears_without_lookup() {
        let provider = Arc::new(FakeProvider::default());
        let dash = dashboard(provider.clone());

        assert!(!dash.type_query("L").await);
        assert_eq!(provider.geocode_calls.load(Ordering::SeqCst), 0);
    }
}
