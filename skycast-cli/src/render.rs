//! Human-friendly rendering of controller snapshots.

use chrono::NaiveDate;
use skycast_core::{CurrentConditions, DailySummary, WeatherSnapshot};

/// Whole degrees, halves rounded up (`-3.5` is `-3°C`).
pub fn format_temp(temp: f64) -> String {
    // floor(x + 0.5) never yields -0, so -0.4 prints as 0
    let rounded = (temp + 0.5).floor();
    format!("{rounded:.0}°C")
}

pub fn format_wind(speed: f64) -> String {
    format!("{speed} km/h")
}

pub fn format_visibility(meters: u32) -> String {
    format!("{:.1} km", f64::from(meters) / 1000.0)
}

/// English day and month names regardless of the lookup language.
pub fn format_day(date: NaiveDate) -> String {
    date.format("%a, %b %-d").to_string()
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn render_current(current: &CurrentConditions) -> String {
    let heading = match &current.country {
        Some(country) => format!("{}, {country}", current.location),
        None => current.location.clone(),
    };

    let mut lines = vec![
        heading,
        format!(
            "{}  {} (feels like {})",
            format_temp(current.temperature),
            capitalize(&current.condition.description),
            format_temp(current.feels_like),
        ),
        format!("  Humidity    {}%", current.humidity),
        format!("  Wind        {}", format_wind(current.wind_speed)),
    ];
    if let Some(visibility) = current.visibility_m {
        lines.push(format!("  Visibility  {}", format_visibility(visibility)));
    }

    lines.join("\n")
}

pub fn render_daily(daily: &[DailySummary]) -> String {
    daily
        .iter()
        .map(|day| {
            format!(
                "{:<12} {:>5} / {:<5} {}",
                format_day(day.date),
                format_temp(day.temperature_min),
                format_temp(day.temperature_max),
                capitalize(&day.condition.description),
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Everything the snapshot has data for; errors are reported by the caller.
pub fn render(snapshot: &WeatherSnapshot) -> String {
    let mut sections = Vec::new();

    if let Some(current) = &snapshot.current.data {
        sections.push(render_current(current));
    }

    let daily = snapshot.daily();
    if !daily.is_empty() {
        sections.push(format!("Forecast\n{}", render_daily(&daily)));
    }

    if sections.is_empty() && snapshot.loading() {
        sections.push("Loading weather data...".to_string());
    }

    sections.join("\n\n")
}
