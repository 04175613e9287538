//! Terminal output for fetched weather, forecasts, events and favorites.

use std::fmt::Write as _;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};
use skydesk_core::{
    CalendarEvent, ForecastCache, ForecastSummary, LocationDetails, Units, WeatherBundle,
    describe::{AqiLevel, condition_glyph, moon_phase, wind_direction},
    forecast::{DayOutlook, daily_outlook},
    model::AirQuality,
    store::Favorite,
};

pub fn print_weather(bundle: &WeatherBundle, details: &LocationDetails, units: Units) {
    print!("{}", render_weather(bundle, details, units));
}

pub fn print_forecast(label: &str, date: NaiveDate, summary: Option<&ForecastSummary>) {
    println!("{}", render_forecast(label, date, summary));
}

pub fn print_event(event: &CalendarEvent) {
    println!("{}", render_event(event, None, None));
}

/// Events without a stored forecast are looked up in `cache` when given.
/// With `now`, pending reminder times are shown too.
pub fn print_events(
    events: &[&CalendarEvent],
    cache: Option<&ForecastCache>,
    now: Option<NaiveDateTime>,
) {
    if events.is_empty() {
        println!("No events.");
        return;
    }
    for event in events {
        println!("{}", render_event(event, cache, now));
    }
}

pub fn print_favorites(favorites: &[Favorite]) {
    if favorites.is_empty() {
        println!("No favorite places yet.");
        return;
    }
    for fav in favorites {
        println!("{:<16} {:<24} {}", fav.id, fav.name, fav.coordinates);
    }
}

fn render_weather(bundle: &WeatherBundle, details: &LocationDetails, units: Units) -> String {
    let mut out = String::new();
    let unit = units.temperature_unit();
    let current = &bundle.current;

    let mut place = details.name.clone();
    if let Some(country) = details.country.as_deref().filter(|c| !c.is_empty()) {
        let _ = write!(place, ", {country}");
    }
    let _ = writeln!(out, "{place} ({})", details.coordinates);
    let _ = write!(out, "Timezone ~{}", details.timezone.name);
    if let Some(elevation) = details.elevation {
        let _ = write!(out, ", elevation {elevation:.0} m");
    }
    out.push('\n');

    if let Some(weather) = current.primary_weather() {
        let icon = weather.icon.as_deref().unwrap_or_default();
        let text = weather.description.as_deref().or(weather.main.as_deref()).unwrap_or_default();
        let _ = writeln!(out, "\n{} {text}", condition_glyph(icon));
    }
    if let Some(main) = &current.main {
        if let Some(temp) = main.temp {
            let _ = write!(out, "Temperature: {temp:.1}{unit}");
            if let Some(feels) = main.feels_like {
                let _ = write!(out, " (feels like {feels:.1}{unit})");
            }
            out.push('\n');
        }
        if let Some(humidity) = main.humidity {
            let _ = writeln!(out, "Humidity: {humidity:.0}%");
        }
        if let Some(pressure) = main.pressure {
            let _ = writeln!(out, "Pressure: {pressure:.0} hPa");
        }
    }
    if let Some(wind) = &current.wind {
        if let Some(speed) = wind.speed {
            let _ = write!(out, "Wind: {speed:.1} {}", wind_unit(units));
            if let Some(deg) = wind.deg {
                let _ = write!(out, " {}", wind_direction(deg));
            }
            out.push('\n');
        }
    }
    if let Some(sys) = &current.sys {
        if let (Some(rise), Some(set)) = (sys.sunrise.and_then(local_time), sys.sunset.and_then(local_time)) {
            let _ = writeln!(out, "Sunrise {rise}, sunset {set}");
        }
    }

    if let Some(one_call) = &bundle.one_call {
        if let Some(uvi) = one_call.current.as_ref().and_then(|c| c.uvi) {
            let _ = writeln!(out, "UV index: {uvi:.1}");
        }
        if let Some(phase) = one_call.daily.first().and_then(|d| d.moon_phase) {
            let _ = writeln!(out, "Moon: {}", moon_phase(phase));
        }
        for alert in &one_call.alerts {
            let _ = writeln!(
                out,
                "Alert: {} ({})",
                alert.event.as_deref().unwrap_or("Weather alert"),
                alert.sender_name.as_deref().unwrap_or("unknown sender")
            );
        }
    }

    if let Some(air) = &bundle.air_quality {
        out.push('\n');
        out.push_str(&render_air_quality(air));
    }

    let outlook = daily_outlook(&bundle.forecast, &Local);
    if !outlook.is_empty() {
        out.push('\n');
        out.push_str(&render_outlook(&outlook, unit));
    }

    out
}

fn render_air_quality(air: &AirQuality) -> String {
    let level = AqiLevel::from_index(air.aqi);
    let mut out = format!("Air quality: {} ({}). {}\n", level.label(), air.aqi, level.description());

    let c = &air.components;
    let readings = [("PM2.5", c.pm2_5), ("PM10", c.pm10), ("O3", c.o3), ("NO2", c.no2)];
    let parts: Vec<String> = readings
        .iter()
        .filter_map(|(name, value)| value.map(|v| format!("{name} {v:.1}")))
        .collect();
    if !parts.is_empty() {
        let _ = writeln!(out, "  {} μg/m³", parts.join(", "));
    }
    out
}

fn render_outlook(outlook: &[DayOutlook], unit: &str) -> String {
    let mut out = String::from("Outlook\n");
    for day in outlook {
        let _ = writeln!(
            out,
            "  {}  {} {:>4}{unit} / {:>4}{unit}  {:>3}%  {}",
            day.date.format("%a %d %b"),
            condition_glyph(&day.icon),
            day.temp_min,
            day.temp_max,
            day.pop,
            day.condition
        );
    }
    out
}

fn render_forecast(label: &str, date: NaiveDate, summary: Option<&ForecastSummary>) -> String {
    let Some(f) = summary else {
        return format!("{label}, {date}: Forecast unavailable");
    };
    format!(
        "{label}, {date}: {} {}° / {}° {}, {}% precipitation ({} data)",
        condition_glyph(&f.icon),
        f.temp_min,
        f.temp_max,
        if f.description.is_empty() { &f.condition } else { &f.description },
        f.pop,
        f.source
    )
}

fn render_event(
    event: &CalendarEvent,
    cache: Option<&ForecastCache>,
    now: Option<NaiveDateTime>,
) -> String {
    let mut out = format!("[{}] {}", event.id, event.date);
    if let Some(time) = event.time {
        let _ = write!(out, " {}", time.format("%H:%M"));
    }
    let _ = write!(out, "  {}", event.title);
    if let Some(location) = event.location.as_deref().filter(|l| !l.is_empty()) {
        let _ = write!(out, " @ {location}");
    }
    if event.reminder {
        out.push_str(" (reminder)");
    }
    if let Some(remind) = now.and_then(|now| event.reminder_at(now)) {
        let _ = write!(out, "\n    reminder at {}", remind.format("%Y-%m-%d %H:%M"));
    }
    let _ = write!(out, "\n    {}", event.forecast_or_resolve(cache).badge());
    if let Some(description) = event.description.as_deref().filter(|d| !d.is_empty()) {
        let _ = write!(out, "\n    {}", description.replace('\n', "\n    "));
    }
    out
}

fn wind_unit(units: Units) -> &'static str {
    match units {
        Units::Imperial => "mph",
        Units::Metric | Units::Standard => "m/s",
    }
}

fn local_time(timestamp: i64) -> Option<String> {
    DateTime::from_timestamp(timestamp, 0).map(|dt| dt.with_timezone(&Local).format("%H:%M").to_string())
}
