//! Pure view helpers: themes, animations, labels and date formatting.

use chrono::{DateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Background theme chosen from the current condition icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Theme {
    #[default]
    Day,
    Night,
    Clear,
    Cloudy,
    Rain,
    Storm,
    Snow,
    Mist,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Day => "day",
            Theme::Night => "night",
            Theme::Clear => "clear",
            Theme::Cloudy => "cloudy",
            Theme::Rain => "rain",
            Theme::Storm => "storm",
            Theme::Snow => "snow",
            Theme::Mist => "mist",
        }
    }
}

/// Foreground animation for a condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Animation {
    Clear,
    Cloudy,
    Rain,
    Storm,
    Snow,
    Mist,
}

impl Animation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Animation::Clear => "clear",
            Animation::Cloudy => "cloudy",
            Animation::Rain => "rain",
            Animation::Storm => "storm",
            Animation::Snow => "snow",
            Animation::Mist => "mist",
        }
    }
}

/// Icon codes look like `10d`: a two-digit condition group followed by a
/// `d`/`n` day-night flag.
fn condition_group(icon: &str) -> Option<&str> {
    icon.get(..2)
}

fn is_night(icon: &str) -> bool {
    icon.get(2..3) == Some("n")
}

pub fn classify_theme(icon: &str) -> Theme {
    if is_night(icon) {
        return Theme::Night;
    }

    match condition_group(icon) {
        Some("01") => Theme::Clear,
        Some("02") => Theme::Day,
        Some("03" | "04") => Theme::Cloudy,
        Some("09" | "10") => Theme::Rain,
        Some("11") => Theme::Storm,
        Some("13") => Theme::Snow,
        Some("50") => Theme::Mist,
        _ => Theme::Day,
    }
}

pub fn classify_animation(icon: &str) -> Option<Animation> {
    match condition_group(icon)? {
        "01" => Some(Animation::Clear),
        "02" | "03" | "04" => Some(Animation::Cloudy),
        "09" | "10" => Some(Animation::Rain),
        "11" => Some(Animation::Storm),
        "13" => Some(Animation::Snow),
        "50" => Some(Animation::Mist),
        _ => None,
    }
}

const COMPASS: [&str; 16] = [
    "N", "NNE", "NE", "ENE", "E", "ESE", "SE", "SSE", "S", "SSW", "SW", "WSW", "W", "WNW", "NW",
    "NNW",
];

/// 16-point compass label; sectors are 22.5° wide and centred on each point.
pub fn wind_compass_label(degrees: f64) -> &'static str {
    let sector = (degrees.rem_euclid(360.0) / 22.5).round() as usize;
    COMPASS[sector % COMPASS.len()]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Good,
    Caution,
    Warning,
}

/// A label plus how alarming the host should render it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Rating {
    pub label: &'static str,
    pub severity: Severity,
}

impl Rating {
    const fn new(label: &'static str, severity: Severity) -> Self {
        Self { label, severity }
    }
}

/// Driest and most humid extremes are checked before the warm-and-humid rule.
pub fn comfort_level(humidity: u8, temperature_c: f64) -> Rating {
    if humidity < 30 {
        Rating::new("Very Dry", Severity::Caution)
    } else if humidity > 85 {
        Rating::new("Very Humid", Severity::Warning)
    } else if humidity > 70 && temperature_c > 20.0 {
        Rating::new("Humid", Severity::Caution)
    } else {
        Rating::new("Comfortable", Severity::Good)
    }
}

pub fn pressure_label(hpa: f64) -> &'static str {
    if hpa < 1000.0 {
        "Low pressure"
    } else if hpa > 1020.0 {
        "High pressure"
    } else {
        "Normal pressure"
    }
}

pub fn visibility_label(metres: u32) -> &'static str {
    match metres {
        10_000.. => "Excellent",
        5_000.. => "Good",
        2_000.. => "Moderate",
        _ => "Poor",
    }
}

pub fn visibility_km(metres: u32) -> String {
    format!("{:.1} km", f64::from(metres) / 1000.0)
}

/// Share of daylight already elapsed at `now`, as a percentage in `0..=100`.
pub fn daylight_progress(now: i64, sunrise: i64, sunset: i64) -> f64 {
    let span = sunset - sunrise;
    if span <= 0 {
        return if now >= sunset { 100.0 } else { 0.0 };
    }
    ((now - sunrise) as f64 / span as f64 * 100.0).clamp(0.0, 100.0)
}

fn in_zone<Tz: TimeZone>(ts: i64, tz: &Tz) -> Option<DateTime<Tz>> {
    DateTime::from_timestamp(ts, 0).map(|utc| utc.with_timezone(tz))
}

/// "Sat"
pub fn weekday_short<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    in_zone(ts, tz).map(|d| d.format("%a").to_string()).unwrap_or_default()
}

/// "Saturday, June 1, 2024"
pub fn full_date<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    in_zone(ts, tz)
        .map(|d| d.format("%A, %B %-d, %Y").to_string())
        .unwrap_or_default()
}

/// "02:30 PM"
pub fn clock_time<Tz: TimeZone>(ts: i64, tz: &Tz) -> String
where
    Tz::Offset: std::fmt::Display,
{
    in_zone(ts, tz).map(|d| d.format("%I:%M %p").to_string()).unwrap_or_default()
}
