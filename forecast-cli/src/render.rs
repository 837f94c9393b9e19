use std::fmt::Write;

/// Forecast slots in the "next 24 hours" strip (3 hours each).
const NEXT_HOURS_SLOTS: usize = 8;

use chrono::{FixedOffset, Local, Offset, Utc};
use forecast_core::{
    DashboardState, DayAggregate, Location, Phase, UnitSystem,
    display::{
        clock_time, comfort_level, daylight_progress, full_date, pressure_label, visibility_km,
        visibility_label, weekday_short, wind_compass_label,
    },
    model::{CurrentWeather, Wind},
};

pub fn dashboard(state: &DashboardState) -> String {
    let mut out = String::new();

    if let Some(notice) = state.notice() {
        let _ = writeln!(out, "! {notice}");
    }
    if let Some(message) = state.error_message() {
        let _ = writeln!(out, "! {message}");
    }
    if state.phase() != Phase::Loaded {
        return out;
    }

    let unit = state.unit();
    if let Some(current) = state.current() {
        let title = state.location().map(Location::label).unwrap_or_default();
        current_section(&mut out, &title, current, unit);
    }

    let _ = writeln!(out, "\nNext 24 hours");
    for sample in state.forecast().upcoming(NEXT_HOURS_SLOTS) {
        let _ = writeln!(
            out,
            "  {} {}  {:>6}  {}",
            weekday_short(sample.dt, &Local),
            clock_time(sample.dt, &Local),
            temperature(sample.temp, unit),
            sample.condition.description,
        );
    }

    let _ = writeln!(out, "\n{}-day forecast", state.forecast().len());
    for day in state.forecast() {
        let marker = if state.selected_date() == Some(day.date) { '>' } else { ' ' };
        let _ = writeln!(
            out,
            "{marker} {:<4}{:>6} / {:<6} {:<20} rain {:>3.0}%",
            weekday_short(day.dt, &Local),
            temperature(day.temp.min, unit),
            temperature(day.temp.max, unit),
            day.condition.description,
            day.pop * 100.0,
        );
    }

    if let Some(day) = state.selected_day() {
        day_section(&mut out, day, unit);
    }

    out
}

fn current_section(out: &mut String, title: &str, current: &CurrentWeather, unit: UnitSystem) {
    let zone = FixedOffset::east_opt(current.timezone_offset).unwrap_or(Utc.fix());

    let _ = writeln!(out, "{title}");
    let _ = writeln!(out, "{}", full_date(current.dt, &zone));
    let _ = writeln!(
        out,
        "  {}  {} (feels like {})",
        temperature(current.temp, unit),
        current.condition.description,
        temperature(current.feels_like, unit),
    );

    let comfort = comfort_level(current.humidity, unit.to_celsius(current.temp));
    let _ = writeln!(out, "  Humidity {}% ({})", current.humidity, comfort.label);
    let _ = writeln!(out, "  Wind {}", wind(&current.wind, unit));
    let _ = writeln!(
        out,
        "  Pressure {:.0} hPa ({})",
        current.pressure,
        pressure_label(current.pressure)
    );
    if let Some(metres) = current.visibility {
        let _ = writeln!(
            out,
            "  Visibility {} ({})",
            visibility_km(metres),
            visibility_label(metres)
        );
    }

    let progress = daylight_progress(Utc::now().timestamp(), current.sunrise, current.sunset);
    let _ = writeln!(
        out,
        "  Sunrise {} / Sunset {} ({progress:.0}% of daylight elapsed)",
        clock_time(current.sunrise, &zone),
        clock_time(current.sunset, &zone),
    );
}

fn day_section(out: &mut String, day: &DayAggregate, unit: UnitSystem) {
    let _ = writeln!(out, "\n{}", full_date(day.dt, &Local));

    for sample in &day.hourly {
        let _ = writeln!(
            out,
            "  {}  {:>6}  {:<20} rain {:>3.0}%  wind {}",
            clock_time(sample.dt, &Local),
            temperature(sample.temp, unit),
            sample.condition.description,
            sample.pop.unwrap_or(0.0) * 100.0,
            wind(&sample.wind, unit),
        );
    }

    let Some(first) = day.representative() else {
        return;
    };
    let comfort = comfort_level(first.humidity, unit.to_celsius(first.temp));
    let _ = writeln!(out, "  Humidity {}% ({})", first.humidity, comfort.label);
    let _ = writeln!(
        out,
        "  Pressure {:.0} hPa ({})",
        first.pressure,
        pressure_label(first.pressure)
    );
    if let Some(metres) = first.visibility {
        let _ = writeln!(
            out,
            "  Visibility {} ({})",
            visibility_km(metres),
            visibility_label(metres)
        );
    }
}

fn temperature(value: f64, unit: UnitSystem) -> String {
    format!("{:.0}{}", value, unit.temperature_symbol())
}

fn wind(wind: &Wind, unit: UnitSystem) -> String {
    let mut text = format!(
        "{:.0} {} {}",
        wind.speed,
        unit.speed_symbol(),
        wind_compass_label(wind.deg)
    );
    if let Some(gust) = wind.gust {
        let _ = write!(text, " (gusts {gust:.0})");
    }
    text
}

pub fn places(title: &str, places: &[Location]) -> String {
    if places.is_empty() {
        return format!("{title}: none\n");
    }

    let mut out = format!("{title}:\n");
    for (i, place) in places.iter().enumerate() {
        let region = place.state.as_deref().map(|s| format!("{s}, ")).unwrap_or_default();
        let _ = writeln!(out, "  {}. {} ({region}{})", i + 1, place.name, place.country);
    }
    out
}
