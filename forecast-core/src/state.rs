//! Presentation state: what the dashboard currently shows and which
//! in-flight requests are still allowed to change it.
//!
//! Every transition is synchronous. Asynchronous work is represented by a
//! ticket handed out when the request is issued; a result is applied only
//! when its ticket is the newest one issued in its category, so a slow early
//! request can never overwrite a faster later one.

use chrono::NaiveDate;
use serde::Serialize;

use crate::{
    aggregate::{DayAggregate, ForecastSeries},
    display::{Animation, Theme, classify_animation, classify_theme},
    error::{FailureReason, WeatherError},
    model::{Coordinates, CurrentWeather, Location, UnitSystem},
    storage::RecentSearches,
};

/// Minimum query length before suggestions are looked up.
pub const MIN_SUGGESTION_QUERY: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", content = "reason", rename_all = "kebab-case")]
pub enum Phase {
    Idle,
    Loading,
    Loaded,
    Failed(FailureReason),
}

/// What a primary fetch was asked to load.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryTarget {
    /// Free-text city name typed by the user.
    Name(String),
    /// A place picked from the suggestion list.
    Suggestion(Location),
    /// Coordinates reported by the device.
    Position(Coordinates),
    /// The already loaded place, fetched again (e.g. with another unit).
    Reload(Location),
}

/// Data produced by a successful primary fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchOutcome {
    pub location: Location,
    pub current: CurrentWeather,
    pub forecast: ForecastSeries,
    /// Whether `location` should be added to the recent searches.
    pub remember: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SuggestTicket(u64);

#[derive(Debug, Clone, Copy, Default)]
struct Sequencer {
    issued: u64,
}

impl Sequencer {
    fn issue(&mut self) -> u64 {
        self.issued += 1;
        self.issued
    }

    fn is_latest(&self, seq: u64) -> bool {
        seq == self.issued
    }
}

#[derive(Debug, Clone)]
pub struct DashboardState {
    phase: Phase,
    unit: UnitSystem,
    query: String,
    location: Option<Location>,
    current: Option<CurrentWeather>,
    forecast: ForecastSeries,
    selected: Option<NaiveDate>,
    theme: Theme,
    animation: Option<Animation>,
    suggestions: Vec<Location>,
    recent: RecentSearches,
    notice: Option<String>,
    /// Target of the fetch currently in flight.
    pending: Option<QueryTarget>,
    fetches: Sequencer,
    lookups: Sequencer,
}

impl DashboardState {
    pub fn new(unit: UnitSystem, recent: RecentSearches) -> Self {
        Self {
            phase: Phase::Idle,
            unit,
            query: String::new(),
            location: None,
            current: None,
            forecast: ForecastSeries::default(),
            selected: None,
            theme: Theme::default(),
            animation: None,
            suggestions: Vec::new(),
            recent,
            notice: None,
            pending: None,
            fetches: Sequencer::default(),
            lookups: Sequencer::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn unit(&self) -> UnitSystem {
        self.unit
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn location(&self) -> Option<&Location> {
        self.location.as_ref()
    }

    pub fn current(&self) -> Option<&CurrentWeather> {
        self.current.as_ref()
    }

    pub fn forecast(&self) -> &ForecastSeries {
        &self.forecast
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn animation(&self) -> Option<Animation> {
        self.animation
    }

    pub fn suggestions(&self) -> &[Location] {
        &self.suggestions
    }

    pub fn recent(&self) -> &RecentSearches {
        &self.recent
    }

    /// Non-fatal message for the host to show, e.g. geolocation refusal.
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    /// Banner text for a failed fetch.
    pub fn error_message(&self) -> Option<&'static str> {
        match self.phase {
            Phase::Failed(reason) => Some(reason.message()),
            _ => None,
        }
    }

    pub fn selected_date(&self) -> Option<NaiveDate> {
        self.selected
    }

    pub fn selected_day(&self) -> Option<&DayAggregate> {
        self.selected.and_then(|date| self.forecast.day(date))
    }

    /// Starts a primary fetch. Any fetch issued earlier becomes stale.
    pub fn submit_query(&mut self, target: &QueryTarget) -> FetchTicket {
        let ticket = FetchTicket(self.fetches.issue());
        self.phase = Phase::Loading;
        self.notice = None;
        match target {
            QueryTarget::Name(name) => self.query = name.clone(),
            QueryTarget::Suggestion(location) => {
                self.query = location.label();
                self.dismiss_suggestions();
            }
            QueryTarget::Position(_) | QueryTarget::Reload(_) => {}
        }
        self.pending = Some(target.clone());
        tracing::debug!(ticket = ticket.0, ?target, unit = %self.unit, "fetch issued");
        ticket
    }

    pub fn is_latest_fetch(&self, ticket: FetchTicket) -> bool {
        self.fetches.is_latest(ticket.0)
    }

    /// Applies a fetch result. Returns `true` when the recent searches
    /// changed and should be persisted.
    pub fn fetch_succeeded(&mut self, ticket: FetchTicket, outcome: FetchOutcome) -> bool {
        if !self.is_latest_fetch(ticket) {
            tracing::debug!(ticket = ticket.0, "dropping stale fetch result");
            return false;
        }

        let FetchOutcome { location, current, forecast, remember } = outcome;

        self.pending = None;
        self.theme = classify_theme(&current.condition.icon);
        self.animation = classify_animation(&current.condition.icon);
        self.query = location.label();
        self.selected = None;
        self.forecast = forecast;
        self.current = Some(current);
        self.phase = Phase::Loaded;

        if remember {
            self.recent.remember(location.clone());
        }
        self.location = Some(location);

        remember
    }

    /// Records a failed fetch; the previously loaded snapshot is discarded.
    pub fn fetch_failed(&mut self, ticket: FetchTicket, error: &WeatherError) {
        if !self.is_latest_fetch(ticket) {
            tracing::debug!(ticket = ticket.0, "dropping stale fetch failure");
            return;
        }

        self.phase = Phase::Failed(error.failure_reason());
        self.pending = None;
        self.location = None;
        self.current = None;
        self.forecast = ForecastSeries::default();
        self.selected = None;
    }

    /// Flips the unit. Returns what has to be fetched again in the new
    /// unit: the loaded place, or the target of a fetch still in flight
    /// (whose result would otherwise arrive in the old unit).
    pub fn toggle_unit(&mut self) -> Option<QueryTarget> {
        self.unit = self.unit.toggled();

        match (&self.phase, &self.location) {
            (Phase::Loading, _) => self.pending.clone(),
            (Phase::Loaded, Some(location)) => Some(QueryTarget::Reload(location.clone())),
            _ => None,
        }
    }

    /// Expands `date`, or collapses it when it is already expanded. Dates
    /// that are not part of the loaded forecast are ignored.
    pub fn select_day(&mut self, date: NaiveDate) -> bool {
        if self.phase != Phase::Loaded || self.forecast.day(date).is_none() {
            return false;
        }

        self.selected = if self.selected == Some(date) { None } else { Some(date) };
        true
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Records typed text. Returns a ticket when the text is long enough to
    /// look up suggestions; shorter text clears them and supersedes any
    /// lookup still in flight.
    pub fn query_changed(&mut self, text: &str) -> Option<SuggestTicket> {
        self.query = text.to_string();
        let seq = self.lookups.issue();

        if text.trim().chars().count() < MIN_SUGGESTION_QUERY {
            self.suggestions.clear();
            return None;
        }

        Some(SuggestTicket(seq))
    }

    pub fn is_latest_lookup(&self, ticket: SuggestTicket) -> bool {
        self.lookups.is_latest(ticket.0)
    }

    /// Applies suggestions if no newer lookup has been issued since.
    pub fn suggestions_resolved(&mut self, ticket: SuggestTicket, found: Vec<Location>) -> bool {
        if !self.is_latest_lookup(ticket) {
            tracing::debug!(ticket = ticket.0, "dropping stale suggestions");
            return false;
        }

        self.suggestions = found;
        true
    }

    /// Hides suggestions and invalidates pending lookups.
    pub fn dismiss_suggestions(&mut self) {
        self.lookups.issue();
        self.suggestions.clear();
    }

    pub fn set_notice(&mut self, notice: impl Into<String>) {
        self.notice = Some(notice.into());
    }
}
