use crate::{
    Config,
    model::{AirQuality, Coordinates, CurrentConditions, ForecastSample, OneCallData, Place},
    provider::openweather::OpenWeatherClient,
};
use async_trait::async_trait;
use std::fmt::Debug;

pub mod openweather;

/// Remote weather, geocoding and elevation data for a coordinate pair.
#[async_trait]
pub trait WeatherSource: Send + Sync + Debug {
    async fn current(&self, at: Coordinates) -> anyhow::Result<CurrentConditions>;

    /// 5-day forecast in 3-hour steps.
    async fn forecast(&self, at: Coordinates) -> anyhow::Result<Vec<ForecastSample>>;

    /// Hourly and 7-day daily forecast.
    async fn one_call(&self, at: Coordinates) -> anyhow::Result<OneCallData>;

    async fn air_quality(&self, at: Coordinates) -> anyhow::Result<AirQuality>;

    async fn reverse_geocode(&self, at: Coordinates) -> anyhow::Result<Option<Place>>;

    async fn geocode(&self, query: &str) -> anyhow::Result<Option<Place>>;

    async fn elevation(&self, at: Coordinates) -> anyhow::Result<Option<f64>>;
}

/// Construct the weather source described by the config.
pub fn source_from_config(config: &Config) -> anyhow::Result<Box<dyn WeatherSource>> {
    let client = OpenWeatherClient::from_config(config)?;
    Ok(Box::new(client))
}
