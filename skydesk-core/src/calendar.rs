//! Personal calendar events and their weather badges.

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    error::StoreError,
    fetch::LocationDetails,
    forecast,
    model::{CurrentConditions, ForecastCache, ForecastSummary},
};

/// Events without a time are reminded about as if they started at 09:00.
const DEFAULT_REMINDER_TIME: (u32, u32) = (9, 0);
const REMINDER_LEAD_MINUTES: i64 = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    #[default]
    Personal,
    Weather,
}

/// Forecast attached to an event. Serialized either as the summary itself or
/// as `{ "unavailable": true }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ForecastRepr", into = "ForecastRepr")]
pub enum EventForecast {
    Available(ForecastSummary),
    Unavailable,
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum ForecastRepr {
    Available(ForecastSummary),
    Unavailable { unavailable: bool },
}

impl From<ForecastRepr> for EventForecast {
    fn from(repr: ForecastRepr) -> Self {
        match repr {
            ForecastRepr::Available(summary) => EventForecast::Available(summary),
            ForecastRepr::Unavailable { .. } => EventForecast::Unavailable,
        }
    }
}

impl From<EventForecast> for ForecastRepr {
    fn from(forecast: EventForecast) -> Self {
        match forecast {
            EventForecast::Available(summary) => ForecastRepr::Available(summary),
            EventForecast::Unavailable => ForecastRepr::Unavailable { unavailable: true },
        }
    }
}

impl From<Option<ForecastSummary>> for EventForecast {
    fn from(summary: Option<ForecastSummary>) -> Self {
        summary.map_or(EventForecast::Unavailable, EventForecast::Available)
    }
}

impl EventForecast {
    /// Short text shown next to an event.
    pub fn badge(&self) -> String {
        match self {
            EventForecast::Available(f) => {
                let text = if f.description.is_empty() { &f.condition } else { &f.description };
                format!("{}° / {}° {}", f.temp_min, f.temp_max, text).trim_end().to_string()
            }
            EventForecast::Unavailable => "Forecast unavailable".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub date: NaiveDate,
    #[serde(default)]
    pub time: Option<NaiveTime>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub reminder: bool,
    #[serde(rename = "type", default)]
    pub kind: EventKind,
    pub created: DateTime<Utc>,
    #[serde(rename = "weatherForecast", default, skip_serializing_if = "Option::is_none")]
    pub forecast: Option<EventForecast>,
}

impl CalendarEvent {
    pub fn new(title: impl Into<String>, date: NaiveDate) -> Self {
        Self {
            id: String::new(),
            title: title.into(),
            date,
            time: None,
            location: None,
            description: None,
            reminder: false,
            kind: EventKind::Personal,
            created: Utc::now(),
            forecast: None,
        }
    }

    pub fn validate(&self) -> Result<(), StoreError> {
        if self.title.trim().is_empty() {
            return Err(StoreError::InvalidEvent("title is required".into()));
        }
        Ok(())
    }

    /// Resolve and store the forecast for the event's day. A day without
    /// forecast data is recorded as unavailable rather than left empty.
    pub fn attach_forecast(&mut self, cache: &ForecastCache) {
        self.attach_forecast_in(cache, &Local);
    }

    pub fn attach_forecast_in<Tz: TimeZone>(&mut self, cache: &ForecastCache, tz: &Tz) {
        let forecast = EventForecast::from(forecast::resolve_in(cache, self.date, tz));
        tracing::debug!(event = %self.title, badge = %forecast.badge(), "forecast attached");
        self.forecast = Some(forecast);
    }

    /// The stored forecast, or a fresh lookup when none was attached yet.
    pub fn forecast_or_resolve(&self, cache: Option<&ForecastCache>) -> EventForecast {
        self.forecast_or_resolve_in(cache, &Local)
    }

    pub fn forecast_or_resolve_in<Tz: TimeZone>(
        &self,
        cache: Option<&ForecastCache>,
        tz: &Tz,
    ) -> EventForecast {
        match (&self.forecast, cache) {
            (Some(forecast), _) => forecast.clone(),
            (None, Some(cache)) => forecast::resolve_in(cache, self.date, tz).into(),
            (None, None) => EventForecast::Unavailable,
        }
    }

    pub fn starts_at(&self) -> NaiveDateTime {
        let (h, m) = DEFAULT_REMINDER_TIME;
        let time = self.time.or_else(|| NaiveTime::from_hms_opt(h, m, 0)).unwrap_or_default();
        self.date.and_time(time)
    }

    /// When to remind about the event, if a reminder is wanted and the event
    /// is still ahead of `now`.
    pub fn reminder_at(&self, now: NaiveDateTime) -> Option<NaiveDateTime> {
        if !self.reminder {
            return None;
        }
        let start = self.starts_at();
        if start <= now {
            return None;
        }
        let remind = start - TimeDelta::minutes(REMINDER_LEAD_MINUTES);
        Some(remind.max(now + TimeDelta::seconds(1)))
    }
}

/// Events on or after `today`, soonest first.
pub fn upcoming(events: &[CalendarEvent], today: NaiveDate, limit: usize) -> Vec<&CalendarEvent> {
    let mut ahead: Vec<&CalendarEvent> = events.iter().filter(|e| e.date >= today).collect();
    ahead.sort_by_key(|e| e.starts_at());
    ahead.truncate(limit);
    ahead
}

/// A calendar entry recording the weather at a place on a given day.
pub fn weather_event(
    details: &LocationDetails,
    current: &CurrentConditions,
    date: NaiveDate,
    cache: &ForecastCache,
) -> CalendarEvent {
    let weather = current.primary_weather();
    let condition = weather.and_then(|w| w.main.as_deref()).unwrap_or("Unknown");
    let description = weather.and_then(|w| w.description.as_deref()).unwrap_or_default();

    let mut full_name = details.name.clone();
    for part in [&details.state, &details.country].into_iter().flatten() {
        full_name.push_str(", ");
        full_name.push_str(part);
    }

    let mut notes = Vec::new();
    if let Some(temp) = current.main.as_ref().and_then(|m| m.temp) {
        notes.push(format!("Temperature: {temp}°"));
    }
    notes.push(format!("Condition: {description}"));
    if let Some(elevation) = details.elevation {
        notes.push(format!("Elevation: {elevation}m"));
    }
    notes.push(format!(
        "Coordinates: {:.4}, {:.4}",
        details.coordinates.lat, details.coordinates.lon
    ));

    let mut event = CalendarEvent::new(format!("Weather: {condition} in {}", details.name), date);
    event.id = format!("weather-{}", Utc::now().timestamp_millis());
    event.time = NaiveTime::from_hms_opt(12, 0, 0);
    event.location = Some(full_name);
    event.description = Some(notes.join("\n"));
    event.kind = EventKind::Weather;
    event.attach_forecast(cache);
    event
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::TimezoneEstimate;
    use crate::model::{
        Coordinates, DailyForecastEntry, ForecastSource, SampleReadings, TempRange,
        WeatherDescriptor,
    };

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn daily_cache() -> ForecastCache {
        ForecastCache::new(
            Some(vec![DailyForecastEntry {
                dt: Some(date(2024, 6, 10).and_hms_opt(11, 0, 0).unwrap().and_utc().timestamp()),
                temp: Some(TempRange { min: Some(10.0), max: Some(22.0), ..Default::default() }),
                weather: vec![WeatherDescriptor {
                    main: Some("Clouds".into()),
                    description: Some("broken clouds".into()),
                    icon: Some("04d".into()),
                }],
                pop: Some(0.2),
                ..Default::default()
            }]),
            None,
        )
    }

    #[test]
    fn attach_forecast_marks_missing_days_unavailable() {
        let cache = daily_cache();

        let mut covered = CalendarEvent::new("Picnic", date(2024, 6, 10));
        covered.attach_forecast_in(&cache, &Utc);
        assert_eq!(covered.forecast.as_ref().unwrap().badge(), "10° / 22° broken clouds");

        let mut outside = CalendarEvent::new("Concert", date(2024, 7, 1));
        outside.attach_forecast_in(&cache, &Utc);
        assert_eq!(outside.forecast, Some(EventForecast::Unavailable));
        assert_eq!(outside.forecast.unwrap().badge(), "Forecast unavailable");
    }

    #[test]
    fn stored_forecast_wins_over_lookup() {
        let cache = daily_cache();

        let mut imported = CalendarEvent::new("Picnic", date(2024, 6, 10));
        assert_eq!(imported.forecast_or_resolve_in(None, &Utc), EventForecast::Unavailable);
        assert_eq!(
            imported.forecast_or_resolve_in(Some(&cache), &Utc).badge(),
            "10° / 22° broken clouds"
        );

        imported.forecast = Some(EventForecast::Unavailable);
        assert_eq!(
            imported.forecast_or_resolve_in(Some(&cache), &Utc),
            EventForecast::Unavailable
        );
    }

    #[test]
    fn unavailable_forecast_serializes_as_marker() {
        let value = serde_json::to_value(EventForecast::Unavailable).unwrap();
        assert_eq!(value, serde_json::json!({ "unavailable": true }));

        let back: EventForecast = serde_json::from_value(value).unwrap();
        assert_eq!(back, EventForecast::Unavailable);
    }

    #[test]
    fn available_forecast_reads_back_summary() {
        let json = serde_json::json!({
            "source": "daily", "date": "2024-06-10", "tempMin": 10, "tempMax": 22,
            "condition": "Clouds", "description": "broken clouds", "pop": 20, "icon": "04d"
        });

        let forecast: EventForecast = serde_json::from_value(json).unwrap();
        match forecast {
            EventForecast::Available(summary) => {
                assert_eq!(summary.source, ForecastSource::Daily);
                assert_eq!(summary.pop, 20);
            }
            EventForecast::Unavailable => panic!("expected a summary"),
        }
    }

    #[test]
    fn badge_falls_back_to_condition() {
        let summary = ForecastSummary {
            source: ForecastSource::ThreeHour,
            date: date(2024, 6, 11),
            temp_min: 11,
            temp_max: 16,
            condition: "Clear".into(),
            description: String::new(),
            pop: 30,
            icon: "01n".into(),
        };
        assert_eq!(EventForecast::Available(summary).badge(), "11° / 16° Clear");
    }

    #[test]
    fn validate_requires_title() {
        let event = CalendarEvent::new("  ", date(2024, 6, 10));
        assert!(matches!(event.validate(), Err(StoreError::InvalidEvent(_))));
    }

    #[test]
    fn reminder_fires_fifteen_minutes_early() {
        let mut event = CalendarEvent::new("Standup", date(2024, 6, 10));
        event.reminder = true;
        let now = date(2024, 6, 10).and_hms_opt(7, 0, 0).unwrap();

        assert_eq!(event.reminder_at(now), date(2024, 6, 10).and_hms_opt(8, 45, 0));

        let close = date(2024, 6, 10).and_hms_opt(8, 50, 0).unwrap();
        assert_eq!(event.reminder_at(close), Some(close + TimeDelta::seconds(1)));

        let after = date(2024, 6, 10).and_hms_opt(10, 0, 0).unwrap();
        assert_eq!(event.reminder_at(after), None);
    }

    #[test]
    fn upcoming_sorts_and_limits() {
        let events = vec![
            CalendarEvent::new("late", date(2024, 6, 20)),
            CalendarEvent::new("past", date(2024, 6, 1)),
            CalendarEvent::new("soon", date(2024, 6, 11)),
            CalendarEvent::new("today", date(2024, 6, 10)),
        ];

        let next: Vec<&str> = upcoming(&events, date(2024, 6, 10), 2)
            .into_iter()
            .map(|e| e.title.as_str())
            .collect();
        assert_eq!(next, ["today", "soon"]);
    }

    #[test]
    fn weather_event_describes_place() {
        let details = LocationDetails {
            coordinates: Coordinates::new(52.2297, 21.0122),
            name: "Warsaw".into(),
            country: Some("PL".into()),
            state: Some("Masovia".into()),
            timezone: TimezoneEstimate::from_longitude(21.0122),
            elevation: Some(100.0),
        };
        let current = CurrentConditions {
            main: Some(SampleReadings { temp: Some(18.5), ..Default::default() }),
            weather: vec![WeatherDescriptor {
                main: Some("Clear".into()),
                description: Some("clear sky".into()),
                icon: Some("01d".into()),
            }],
            ..Default::default()
        };

        let event = weather_event(&details, &current, date(2030, 1, 1), &ForecastCache::default());

        assert_eq!(event.title, "Weather: Clear in Warsaw");
        assert_eq!(event.kind, EventKind::Weather);
        assert_eq!(event.location.as_deref(), Some("Warsaw, Masovia, PL"));
        assert!(event.description.unwrap().contains("Elevation: 100m"));
        assert_eq!(event.forecast, Some(EventForecast::Unavailable));
        assert!(event.id.starts_with("weather-"));
    }
}
