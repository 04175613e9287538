use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, de::DeserializeOwned};

use crate::{
    config::{Config, Units},
    model::{
        AirQuality, Coordinates, CurrentConditions, DailyForecastEntry, ForecastSample,
        HourlyForecastEntry, OneCallCurrent, OneCallData, Place, Pollutants, WeatherAlert,
    },
};

use super::WeatherSource;

pub const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";
pub const OPEN_ELEVATION_BASE_URL: &str = "https://api.open-elevation.com";

/// Client for the OpenWeather REST APIs (weather, forecast, One Call,
/// air pollution, geocoding) plus the open-elevation lookup.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    api_key: String,
    units: Units,
    language: String,
    base_url: String,
    elevation_url: String,
    http: Client,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, units: Units, language: String) -> Self {
        Self {
            api_key,
            units,
            language,
            base_url: OPENWEATHER_BASE_URL.to_string(),
            elevation_url: OPEN_ELEVATION_BASE_URL.to_string(),
            http: Client::new(),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config.require_api_key()?;
        Ok(Self::new(api_key.to_owned(), config.units, config.language.clone()))
    }

    /// Point the client at other hosts, e.g. a mock server.
    pub fn with_base_urls(mut self, base_url: &str, elevation_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self.elevation_url = elevation_url.trim_end_matches('/').to_string();
        self
    }

    fn coordinate_query(&self, at: Coordinates, localized: bool) -> Vec<(&'static str, String)> {
        let mut query = vec![
            ("lat", at.lat.to_string()),
            ("lon", at.lon.to_string()),
            ("appid", self.api_key.clone()),
        ];
        if localized {
            query.push(("units", self.units.as_str().to_string()));
            query.push(("lang", self.language.clone()));
        }
        query
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, String)],
        what: &str,
    ) -> Result<T> {
        let res = self
            .http
            .get(url)
            .query(query)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {what}"))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .with_context(|| format!("Failed to read {what} response body"))?;

        if !status.is_success() {
            return Err(anyhow!(
                "{what} request failed with status {}: {}",
                status,
                truncate_body(&body),
            ));
        }

        serde_json::from_str(&body).with_context(|| format!("Failed to parse {what} JSON"))
    }
}

#[derive(Debug, Deserialize)]
struct OwForecastResponse {
    #[serde(default)]
    list: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OwOneCallResponse {
    current: Option<OneCallCurrent>,
    #[serde(default)]
    hourly: Vec<serde_json::Value>,
    #[serde(default)]
    daily: Vec<serde_json::Value>,
    #[serde(default)]
    alerts: Vec<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
struct OwAqiMain {
    aqi: u8,
}

#[derive(Debug, Deserialize)]
struct OwAirEntry {
    main: OwAqiMain,
    #[serde(default)]
    components: Pollutants,
}

#[derive(Debug, Deserialize)]
struct OwAirResponse {
    #[serde(default)]
    list: Vec<OwAirEntry>,
}

#[derive(Debug, Deserialize)]
struct OwLocalNames {
    en: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OwGeoEntry {
    name: String,
    local_names: Option<OwLocalNames>,
    lat: f64,
    lon: f64,
    country: Option<String>,
    state: Option<String>,
}

impl From<OwGeoEntry> for Place {
    fn from(entry: OwGeoEntry) -> Self {
        let name = entry
            .local_names
            .and_then(|n| n.en)
            .filter(|n| !n.is_empty())
            .unwrap_or(entry.name);

        Place {
            name,
            country: entry.country,
            state: entry.state,
            coordinates: Coordinates::new(entry.lat, entry.lon),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ElevationResult {
    elevation: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ElevationResponse {
    #[serde(default)]
    results: Vec<ElevationResult>,
}

#[async_trait]
impl WeatherSource for OpenWeatherClient {
    async fn current(&self, at: Coordinates) -> Result<CurrentConditions> {
        let url = format!("{}/data/2.5/weather", self.base_url);
        self.get_json(&url, &self.coordinate_query(at, true), "OpenWeather current weather")
            .await
    }

    async fn forecast(&self, at: Coordinates) -> Result<Vec<ForecastSample>> {
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let parsed: OwForecastResponse = self
            .get_json(&url, &self.coordinate_query(at, true), "OpenWeather forecast")
            .await?;

        Ok(lenient_list(parsed.list, "forecast sample"))
    }

    async fn one_call(&self, at: Coordinates) -> Result<OneCallData> {
        let url = format!("{}/data/2.5/onecall", self.base_url);
        let mut query = self.coordinate_query(at, true);
        query.push(("exclude", "minutely".to_string()));

        let parsed: OwOneCallResponse = self.get_json(&url, &query, "OpenWeather One Call").await?;

        Ok(OneCallData {
            current: parsed.current,
            hourly: lenient_list::<HourlyForecastEntry>(parsed.hourly, "hourly entry"),
            daily: lenient_list::<DailyForecastEntry>(parsed.daily, "daily entry"),
            alerts: lenient_list::<WeatherAlert>(parsed.alerts, "weather alert"),
        })
    }

    async fn air_quality(&self, at: Coordinates) -> Result<AirQuality> {
        let url = format!("{}/data/2.5/air_pollution", self.base_url);
        let parsed: OwAirResponse = self
            .get_json(&url, &self.coordinate_query(at, false), "OpenWeather air pollution")
            .await?;

        let entry = parsed
            .list
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("OpenWeather air pollution response contained no data"))?;

        Ok(AirQuality { aqi: entry.main.aqi, components: entry.components })
    }

    async fn reverse_geocode(&self, at: Coordinates) -> Result<Option<Place>> {
        let url = format!("{}/geo/1.0/reverse", self.base_url);
        let mut query = self.coordinate_query(at, false);
        query.push(("limit", "1".to_string()));

        let parsed: Vec<OwGeoEntry> =
            self.get_json(&url, &query, "OpenWeather reverse geocoding").await?;

        Ok(parsed.into_iter().next().map(Place::from))
    }

    async fn geocode(&self, query: &str) -> Result<Option<Place>> {
        let url = format!("{}/geo/1.0/direct", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.clone()),
        ];

        let parsed: Vec<OwGeoEntry> = self.get_json(&url, &params, "OpenWeather geocoding").await?;

        Ok(parsed.into_iter().next().map(Place::from))
    }

    async fn elevation(&self, at: Coordinates) -> Result<Option<f64>> {
        let url = format!("{}/api/v1/lookup", self.elevation_url);
        let params = [("locations", format!("{},{}", at.lat, at.lon))];

        let parsed: ElevationResponse = self.get_json(&url, &params, "open-elevation").await?;

        Ok(parsed.results.into_iter().next().and_then(|r| r.elevation))
    }
}

/// Decode list items one by one, dropping the ones that don't fit the shape.
fn lenient_list<T: DeserializeOwned>(items: Vec<serde_json::Value>, what: &str) -> Vec<T> {
    let total = items.len();
    let parsed: Vec<T> = items
        .into_iter()
        .filter_map(|item| match serde_json::from_value(item) {
            Ok(value) => Some(value),
            Err(err) => {
                tracing::debug!("skipping malformed {what}: {err}");
                None
            }
        })
        .collect();

    if parsed.len() < total {
        tracing::warn!("dropped {} of {total} malformed {what} items", total - parsed.len());
    }
    parsed
}

fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
