//! Folding 3-hour forecast samples into calendar-day summaries.

use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

use crate::model::{Condition, ForecastSample};

/// Number of days kept in a [`ForecastSeries`].
pub const MAX_FORECAST_DAYS: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: f64,
    pub max: f64,
}

/// Summary of every sample that falls on one local calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DayAggregate {
    pub date: NaiveDate,
    /// Timestamp of the first sample of the day.
    pub dt: i64,
    pub temp: TempRange,
    /// Condition of the earliest sample; never replaced by later ones.
    pub condition: Condition,
    /// Highest precipitation probability seen during the day.
    pub pop: f64,
    pub hourly: Vec<ForecastSample>,
}

impl DayAggregate {
    fn start(date: NaiveDate, sample: &ForecastSample) -> Self {
        Self {
            date,
            dt: sample.dt,
            temp: TempRange { min: sample.temp, max: sample.temp },
            condition: sample.condition.clone(),
            pop: sample.pop.unwrap_or(0.0),
            hourly: vec![sample.clone()],
        }
    }

    fn absorb(&mut self, sample: &ForecastSample) {
        self.temp.max = self.temp.max.max(sample.temp);
        self.temp.min = self.temp.min.min(sample.temp);
        self.pop = self.pop.max(sample.pop.unwrap_or(0.0));
        self.hourly.push(sample.clone());
    }

    /// The sample shown in the expanded day view.
    pub fn representative(&self) -> Option<&ForecastSample> {
        self.hourly.first()
    }
}

/// Up to [`MAX_FORECAST_DAYS`] days, ascending, the first one being "today".
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastSeries(Vec<DayAggregate>);

impl ForecastSeries {
    pub fn days(&self) -> &[DayAggregate] {
        &self.0
    }

    pub fn today(&self) -> Option<&DayAggregate> {
        self.0.first()
    }

    pub fn day(&self, date: NaiveDate) -> Option<&DayAggregate> {
        self.0.iter().find(|d| d.date == date)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DayAggregate> {
        self.0.iter()
    }

    /// The next `count` samples across day boundaries, in day order.
    pub fn upcoming(&self, count: usize) -> impl Iterator<Item = &ForecastSample> {
        self.0.iter().flat_map(|d| d.hourly.iter()).take(count)
    }
}

impl<'a> IntoIterator for &'a ForecastSeries {
    type Item = &'a DayAggregate;
    type IntoIter = std::slice::Iter<'a, DayAggregate>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Groups samples by the host's local calendar date.
pub fn aggregate(samples: &[ForecastSample]) -> ForecastSeries {
    aggregate_in(samples, &Local)
}

/// Groups samples by calendar date in `tz`.
///
/// Days are emitted in ascending date order and capped at
/// [`MAX_FORECAST_DAYS`]; later days are dropped. Within a day, samples keep
/// their input order.
pub fn aggregate_in<Tz: TimeZone>(samples: &[ForecastSample], tz: &Tz) -> ForecastSeries {
    let mut days: Vec<DayAggregate> = Vec::new();

    for sample in samples {
        let Some(date) = local_date(sample.dt, tz) else {
            tracing::debug!(dt = sample.dt, "skipping forecast sample with invalid timestamp");
            continue;
        };

        match days.iter_mut().find(|d| d.date == date) {
            Some(day) => day.absorb(sample),
            None => days.push(DayAggregate::start(date, sample)),
        }
    }

    days.sort_by_key(|d| d.date);
    days.truncate(MAX_FORECAST_DAYS);
    ForecastSeries(days)
}

fn local_date<Tz: TimeZone>(ts: i64, tz: &Tz) -> Option<NaiveDate> {
    DateTime::from_timestamp(ts, 0).map(|utc| utc.with_timezone(tz).date_naive())
}
