//! Concurrent fetch flows over a [`WeatherSource`].
//!
//! Two join strategies are used and the choice is part of each flow's contract:
//! [`join_all`] aborts the whole group on the first failure, while [`settle`]
//! lets every task finish and degrades a failed one to an absent field.

use std::future::Future;

use chrono::{DateTime, Local, NaiveDate, TimeZone, Utc};
use serde::Serialize;

use crate::{
    forecast,
    model::{
        AirQuality, Coordinates, CurrentConditions, ForecastCache, ForecastSample,
        ForecastSummary, OneCallData,
    },
    provider::WeatherSource,
};

/// Outcome of a best-effort task.
#[derive(Debug)]
pub enum Settled<T> {
    Fulfilled(T),
    Rejected(anyhow::Error),
}

impl<T> Settled<T> {
    pub fn is_fulfilled(&self) -> bool {
        matches!(self, Settled::Fulfilled(_))
    }

    /// Keep the value, or log the failure and drop it.
    pub fn into_option(self, label: &str) -> Option<T> {
        match self {
            Settled::Fulfilled(value) => Some(value),
            Settled::Rejected(err) => {
                tracing::warn!("{label} unavailable: {err:#}");
                None
            }
        }
    }
}

/// Run a task to completion without letting its failure escape.
pub async fn settle<T, F>(task: F) -> Settled<T>
where
    F: Future<Output = anyhow::Result<T>>,
{
    match task.await {
        Ok(value) => Settled::Fulfilled(value),
        Err(err) => Settled::Rejected(err),
    }
}

/// Run both tasks concurrently; the first failure fails the pair.
pub async fn join_all<A, B, FA, FB>(a: FA, b: FB) -> anyhow::Result<(A, B)>
where
    FA: Future<Output = anyhow::Result<A>>,
    FB: Future<Output = anyhow::Result<B>>,
{
    tokio::try_join!(a, b)
}

/// Everything known about the weather at one point.
#[derive(Debug, Clone, Serialize)]
pub struct WeatherBundle {
    pub coordinates: Coordinates,
    pub current: CurrentConditions,
    pub forecast: Vec<ForecastSample>,
    pub one_call: Option<OneCallData>,
    pub air_quality: Option<AirQuality>,
    pub fetched_at: DateTime<Utc>,
}

impl WeatherBundle {
    pub fn forecast_cache(&self) -> ForecastCache {
        ForecastCache::new(
            self.one_call.as_ref().map(|oc| oc.daily.clone()),
            Some(self.forecast.clone()),
        )
    }

    /// Forecast summary for `date` from this bundle's series, local time.
    pub fn forecast_for(&self, date: NaiveDate) -> Option<ForecastSummary> {
        self.forecast_for_in(date, &Local)
    }

    pub fn forecast_for_in<Tz: TimeZone>(&self, date: NaiveDate, tz: &Tz) -> Option<ForecastSummary> {
        forecast::resolve_in(&self.forecast_cache(), date, tz)
    }
}

/// Current conditions and the 3-hour forecast are required; air quality and
/// the One Call detail are each optional.
pub async fn fetch_bundle(source: &dyn WeatherSource, at: Coordinates) -> anyhow::Result<WeatherBundle> {
    tracing::info!(%at, "fetching weather");

    let (required, air_quality, one_call) = tokio::join!(
        join_all(source.current(at), source.forecast(at)),
        settle(source.air_quality(at)),
        settle(source.one_call(at)),
    );
    let (current, forecast) = required?;

    Ok(WeatherBundle {
        coordinates: at,
        current,
        forecast,
        one_call: one_call.into_option("One Call forecast"),
        air_quality: air_quality.into_option("air quality"),
        fetched_at: Utc::now(),
    })
}

/// Forecast data for calendar lookups. Never fails: a series that could not be
/// fetched is simply absent from the cache.
pub async fn fetch_forecast_cache(source: &dyn WeatherSource, at: Coordinates) -> ForecastCache {
    let (three_hour, one_call) =
        tokio::join!(settle(source.forecast(at)), settle(source.one_call(at)));

    let cache = ForecastCache::new(
        one_call.into_option("daily forecast").map(|oc| oc.daily),
        three_hour.into_option("3-hour forecast"),
    );
    tracing::info!(
        daily = cache.daily.as_ref().map_or(0, Vec::len),
        three_hour = cache.three_hour.as_ref().map_or(0, Vec::len),
        "forecast cache ready"
    );
    cache
}

/// UTC offset guessed from longitude, 15° per hour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimezoneEstimate {
    pub name: String,
    pub offset_seconds: i32,
}

impl TimezoneEstimate {
    pub fn from_longitude(lon: f64) -> Self {
        let hours = (lon / 15.0).round().clamp(-12.0, 12.0) as i32;
        let sign = if hours >= 0 { "+" } else { "" };
        Self { name: format!("UTC{sign}{hours}"), offset_seconds: hours * 3600 }
    }
}

/// What the map shows for a clicked point.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocationDetails {
    pub coordinates: Coordinates,
    pub name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub timezone: TimezoneEstimate,
    pub elevation: Option<f64>,
}

/// Every field is fetched best-effort; a failed lookup only blanks that field.
pub async fn location_details(source: &dyn WeatherSource, at: Coordinates) -> LocationDetails {
    let (place, elevation) =
        tokio::join!(settle(source.reverse_geocode(at)), settle(source.elevation(at)));

    let place = place.into_option("place name").flatten();
    let elevation = elevation.into_option("elevation").flatten();

    let (name, country, state) = match place {
        Some(p) => (p.name, p.country, p.state),
        None => (format!("{:.4}, {:.4}", at.lat, at.lon), None, None),
    };

    LocationDetails {
        coordinates: at,
        name,
        country,
        state,
        timezone: TimezoneEstimate::from_longitude(at.lon),
        elevation,
    }
}
