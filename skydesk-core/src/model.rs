use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A point on the map, in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

impl Coordinates {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

impl fmt::Display for Coordinates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}°, {:.2}°", self.lat, self.lon)
    }
}

/// One entry of OpenWeather's `weather` array.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherDescriptor {
    pub main: Option<String>,
    pub description: Option<String>,
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SampleReadings {
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub temp_min: Option<f64>,
    pub temp_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub speed: Option<f64>,
    pub deg: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Clouds {
    pub all: Option<f64>,
}

/// A 3-hour forecast sample from the 5-day forecast endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastSample {
    pub dt: Option<i64>,
    pub main: Option<SampleReadings>,
    #[serde(default)]
    pub weather: Vec<WeatherDescriptor>,
    pub wind: Option<Wind>,
    pub clouds: Option<Clouds>,
    pub pop: Option<f64>,
}

impl ForecastSample {
    pub fn timestamp(&self) -> Option<i64> {
        self.dt
    }

    pub fn temperature(&self) -> Option<f64> {
        self.main.as_ref().and_then(|m| m.temp).filter(|t| t.is_finite())
    }

    /// Precipitation probability in `[0, 1]`; missing values count as zero.
    pub fn precipitation_probability(&self) -> f64 {
        self.pop.filter(|p| p.is_finite()).unwrap_or(0.0)
    }

    pub fn primary_weather(&self) -> Option<&WeatherDescriptor> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TempRange {
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub day: Option<f64>,
    pub night: Option<f64>,
}

/// One day of the 7-day daily forecast.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyForecastEntry {
    pub dt: Option<i64>,
    pub temp: Option<TempRange>,
    #[serde(default)]
    pub weather: Vec<WeatherDescriptor>,
    pub pop: Option<f64>,
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
    pub moon_phase: Option<f64>,
    pub humidity: Option<f64>,
    pub wind_speed: Option<f64>,
    pub uvi: Option<f64>,
}

impl DailyForecastEntry {
    pub fn timestamp(&self) -> Option<i64> {
        self.dt
    }

    /// `(min, max)` when both ends of the range are present.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let temp = self.temp.as_ref()?;
        match (temp.min, temp.max) {
            (Some(min), Some(max)) if min.is_finite() && max.is_finite() => Some((min, max)),
            _ => None,
        }
    }

    pub fn precipitation_probability(&self) -> f64 {
        self.pop.filter(|p| p.is_finite()).unwrap_or(0.0)
    }

    pub fn primary_weather(&self) -> Option<&WeatherDescriptor> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HourlyForecastEntry {
    pub dt: Option<i64>,
    pub temp: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub dew_point: Option<f64>,
    pub uvi: Option<f64>,
    #[serde(default)]
    pub weather: Vec<WeatherDescriptor>,
    pub wind_speed: Option<f64>,
    pub wind_deg: Option<f64>,
    pub clouds: Option<f64>,
    pub pop: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneCallCurrent {
    pub uvi: Option<f64>,
    pub dew_point: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeatherAlert {
    pub sender_name: Option<String>,
    pub event: Option<String>,
    pub start: Option<i64>,
    pub end: Option<i64>,
    pub description: Option<String>,
}

/// Response of the One Call endpoint: hourly and 7-day daily detail.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OneCallData {
    pub current: Option<OneCallCurrent>,
    #[serde(default)]
    pub hourly: Vec<HourlyForecastEntry>,
    #[serde(default)]
    pub daily: Vec<DailyForecastEntry>,
    #[serde(default)]
    pub alerts: Vec<WeatherAlert>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SunTimes {
    pub sunrise: Option<i64>,
    pub sunset: Option<i64>,
}

/// Current-conditions snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    pub dt: Option<i64>,
    #[serde(default)]
    pub name: String,
    pub main: Option<SampleReadings>,
    #[serde(default)]
    pub weather: Vec<WeatherDescriptor>,
    pub wind: Option<Wind>,
    pub clouds: Option<Clouds>,
    pub visibility: Option<f64>,
    pub sys: Option<SunTimes>,
}

impl CurrentConditions {
    pub fn primary_weather(&self) -> Option<&WeatherDescriptor> {
        self.weather.first()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pollutants {
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

/// Air-quality index (1 = good .. 5 = very poor) with pollutant concentrations in μg/m³.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AirQuality {
    pub aqi: u8,
    pub components: Pollutants,
}

/// A resolved place name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    pub country: Option<String>,
    pub state: Option<String>,
    pub coordinates: Coordinates,
}

impl Place {
    pub fn display_name(&self) -> String {
        match self.country.as_deref().filter(|c| !c.is_empty()) {
            Some(country) => format!("{}, {}", self.name, country),
            None => self.name.clone(),
        }
    }
}

/// Forecast data available to the resolver. Either series may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForecastCache {
    pub daily: Option<Vec<DailyForecastEntry>>,
    pub three_hour: Option<Vec<ForecastSample>>,
}

impl ForecastCache {
    pub fn new(
        daily: Option<Vec<DailyForecastEntry>>,
        three_hour: Option<Vec<ForecastSample>>,
    ) -> Self {
        Self { daily, three_hour }
    }

    pub fn is_empty(&self) -> bool {
        self.daily.as_ref().is_none_or(Vec::is_empty)
            && self.three_hour.as_ref().is_none_or(Vec::is_empty)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ForecastSource {
    Daily,
    ThreeHour,
}

impl ForecastSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            ForecastSource::Daily => "daily",
            ForecastSource::ThreeHour => "threeHour",
        }
    }
}

impl fmt::Display for ForecastSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-day forecast summary produced by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ForecastSummary {
    pub source: ForecastSource,
    pub date: NaiveDate,
    pub temp_min: i32,
    pub temp_max: i32,
    pub condition: String,
    pub description: String,
    /// Precipitation probability in percent, `0..=100`.
    pub pop: u8,
    pub icon: String,
}
