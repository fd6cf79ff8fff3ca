//! Human-friendly rendering of controller snapshots.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset};
use forecast_core::{ForecastResponse, ForecastState, Preferences, Snapshot};

pub fn render_preferences(prefs: &Preferences) -> String {
    format!(
        "City:              {}\nTheme:             {}\nFetch by location: {}\n",
        prefs.city_name,
        if prefs.is_dark_theme { "dark" } else { "light" },
        if prefs.fetch_by_location { "on" } else { "off" },
    )
}

pub fn render_snapshot(snapshot: &Snapshot) -> String {
    let mut out = String::new();

    if let Some(advisory) = snapshot.advisory {
        let _ = writeln!(out, "! {}", advisory.message());
    }
    if let ForecastState::Failed(_) = snapshot.state {
        let _ = writeln!(out, "! Could not load the forecast");
    }
    if let Some(forecast) = snapshot.forecast() {
        out.push_str(&render_forecast(forecast));
    }
    out
}

pub fn render_forecast(forecast: &ForecastResponse) -> String {
    let mut out = String::new();
    let city = &forecast.city;

    let _ = writeln!(out, "{}, {}", city.name, city.country);

    if let Some(now) = forecast.current() {
        let condition = now.condition().map(|c| c.description.as_str()).unwrap_or("Unknown");

        let _ = writeln!(out, "  {}°  {condition}", degrees(now.main.temp));
        let _ = writeln!(
            out,
            "  {}° / {}°   Feels like {}°",
            degrees(now.main.temp_max),
            degrees(now.main.temp_min),
            degrees(now.main.feels_like),
        );
        let _ = writeln!(out, "  Wind {:.1} m/s", now.wind.speed);
        let _ = writeln!(out, "  Humidity {}%", now.main.humidity);
        if let Some(icon) = now.icon_url() {
            let _ = writeln!(out, "  Icon {icon}");
        }
    }

    if let (Some(sunrise), Some(sunset)) =
        (local_time(city.sunrise, city.timezone), local_time(city.sunset, city.timezone))
    {
        let _ = writeln!(
            out,
            "  Sunrise {}  Sunset {}",
            sunrise.format("%H:%M"),
            sunset.format("%H:%M"),
        );
    }

    out.push('\n');
    for entry in &forecast.list {
        let condition = entry.condition().map(|c| c.main.as_str()).unwrap_or("");
        let _ = writeln!(
            out,
            "  {} {}  {:>4}°  {condition}",
            entry.date_label(),
            entry.time_label(),
            degrees(entry.main.temp),
        );
    }

    let _ = writeln!(out, "\nRadar: {}", forecast.radar_url());
    out
}

fn degrees(celsius: f64) -> i64 {
    celsius.round() as i64
}

/// Epoch seconds shown in the city's own offset.
fn local_time(epoch: i64, offset_secs: i32) -> Option<DateTime<FixedOffset>> {
    if epoch == 0 {
        return None;
    }
    let offset = FixedOffset::east_opt(offset_secs)?;
    DateTime::from_timestamp(epoch, 0).map(|utc| utc.with_timezone(&offset))
}
