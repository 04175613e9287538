//! Export of fetched weather data as JSON, CSV or a plain-text report.

use std::fmt::Write as _;

use anyhow::{Context, Result, anyhow};
use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::Serialize;

use crate::{
    describe::{AqiLevel, wind_direction},
    fetch::{LocationDetails, WeatherBundle},
};

const DATA_SOURCE: &str = "OpenWeatherMap API";
const HOURLY_LIMIT: usize = 48;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExportOptions {
    pub current: bool,
    pub forecast: bool,
    pub hourly: bool,
    pub air_quality: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { current: true, forecast: true, hourly: false, air_quality: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Json,
    Csv,
    Txt,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Csv => "csv",
            ExportFormat::Txt => "txt",
        }
    }
}

impl TryFrom<&str> for ExportFormat {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "json" => Ok(ExportFormat::Json),
            "csv" => Ok(ExportFormat::Csv),
            "txt" | "text" => Ok(ExportFormat::Txt),
            _ => Err(anyhow!("Unknown export format '{value}'. Supported formats: json, csv, txt.")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportLocation {
    pub name: String,
    pub safe_name: String,
    pub lat: f64,
    pub lon: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentExport {
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub temperature_min: Option<f64>,
    pub temperature_max: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub visibility: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloudiness: Option<f64>,
    pub weather_condition: Option<String>,
    pub weather_description: Option<String>,
    pub sunrise: Option<DateTime<Utc>>,
    pub sunset: Option<DateTime<Utc>>,
    pub uv_index: Option<f64>,
    pub dew_point: Option<f64>,
}

impl CurrentExport {
    fn rows(&self) -> Vec<(&'static str, String, &'static str)> {
        vec![
            ("temperature", opt(self.temperature), "°C"),
            ("feels_like", opt(self.feels_like), "°C"),
            ("temperature_min", opt(self.temperature_min), "°C"),
            ("temperature_max", opt(self.temperature_max), "°C"),
            ("pressure", opt(self.pressure), "hPa"),
            ("humidity", opt(self.humidity), "%"),
            ("visibility", opt(self.visibility), "m"),
            ("wind_speed", opt(self.wind_speed), "m/s"),
            ("wind_direction", opt(self.wind_direction), "°"),
            ("cloudiness", opt(self.cloudiness), "%"),
            ("weather_condition", opt(self.weather_condition.as_ref()), ""),
            ("weather_description", opt(self.weather_description.as_ref()), ""),
            ("sunrise", opt(self.sunrise.map(|t| t.to_rfc3339())), ""),
            ("sunset", opt(self.sunset.map(|t| t.to_rfc3339())), ""),
            ("uv_index", opt(self.uv_index), "index"),
            ("dew_point", opt(self.dew_point), "°C"),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ForecastRow {
    pub datetime: Option<DateTime<Utc>>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub weather_condition: Option<String>,
    pub weather_description: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloudiness: Option<f64>,
    pub precipitation_probability: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct HourlyRow {
    pub datetime: Option<DateTime<Utc>>,
    pub temperature: Option<f64>,
    pub feels_like: Option<f64>,
    pub pressure: Option<f64>,
    pub humidity: Option<f64>,
    pub dew_point: Option<f64>,
    pub uv_index: Option<f64>,
    pub weather_condition: Option<String>,
    pub weather_description: Option<String>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub cloudiness: Option<f64>,
    pub precipitation_probability: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AirQualityExport {
    pub aqi_index: u8,
    pub aqi_level: String,
    pub co: Option<f64>,
    pub no: Option<f64>,
    pub no2: Option<f64>,
    pub o3: Option<f64>,
    pub so2: Option<f64>,
    pub pm2_5: Option<f64>,
    pub pm10: Option<f64>,
    pub nh3: Option<f64>,
}

impl AirQualityExport {
    fn rows(&self) -> Vec<(&'static str, String, &'static str)> {
        vec![
            ("aqi_index", self.aqi_index.to_string(), "index"),
            ("aqi_level", self.aqi_level.clone(), ""),
            ("co", opt(self.co), "μg/m³"),
            ("no", opt(self.no), "μg/m³"),
            ("no2", opt(self.no2), "μg/m³"),
            ("o3", opt(self.o3), "μg/m³"),
            ("so2", opt(self.so2), "μg/m³"),
            ("pm2_5", opt(self.pm2_5), "μg/m³"),
            ("pm10", opt(self.pm10), "μg/m³"),
            ("nh3", opt(self.nh3), "μg/m³"),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportDocument {
    pub location: ExportLocation,
    pub export_date: DateTime<Utc>,
    pub data_source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_weather: Option<CurrentExport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub forecast_5day: Option<Vec<ForecastRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hourly_forecast: Option<Vec<HourlyRow>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub air_quality: Option<AirQualityExport>,
}

/// Collect the selected sections of `bundle`. Sections whose data was not
/// fetched are left out.
pub fn prepare_export(
    bundle: &WeatherBundle,
    location: &LocationDetails,
    options: ExportOptions,
    now: DateTime<Utc>,
) -> ExportDocument {
    let one_call = bundle.one_call.as_ref();

    let current_weather = options.current.then(|| {
        let c = &bundle.current;
        let main = c.main.clone().unwrap_or_default();
        let wind = c.wind.clone().unwrap_or_default();
        let weather = c.primary_weather().cloned().unwrap_or_default();
        let oc_current = one_call.and_then(|oc| oc.current.as_ref());
        CurrentExport {
            temperature: main.temp,
            feels_like: main.feels_like,
            temperature_min: main.temp_min,
            temperature_max: main.temp_max,
            pressure: main.pressure,
            humidity: main.humidity,
            visibility: c.visibility,
            wind_speed: wind.speed,
            wind_direction: wind.deg,
            cloudiness: c.clouds.as_ref().and_then(|cl| cl.all),
            weather_condition: weather.main,
            weather_description: weather.description,
            sunrise: c.sys.as_ref().and_then(|s| s.sunrise).and_then(to_utc),
            sunset: c.sys.as_ref().and_then(|s| s.sunset).and_then(to_utc),
            uv_index: oc_current.and_then(|oc| oc.uvi),
            dew_point: oc_current.and_then(|oc| oc.dew_point),
        }
    });

    let forecast_5day = options.forecast.then(|| {
        bundle
            .forecast
            .iter()
            .map(|s| {
                let main = s.main.clone().unwrap_or_default();
                let wind = s.wind.clone().unwrap_or_default();
                let weather = s.primary_weather().cloned().unwrap_or_default();
                ForecastRow {
                    datetime: s.dt.and_then(to_utc),
                    temperature: main.temp,
                    feels_like: main.feels_like,
                    pressure: main.pressure,
                    humidity: main.humidity,
                    weather_condition: weather.main,
                    weather_description: weather.description,
                    wind_speed: wind.speed,
                    wind_direction: wind.deg,
                    cloudiness: s.clouds.as_ref().and_then(|c| c.all),
                    precipitation_probability: s.pop,
                }
            })
            .collect()
    });

    let hourly_forecast = one_call.filter(|_| options.hourly).map(|oc| {
        oc.hourly
            .iter()
            .take(HOURLY_LIMIT)
            .map(|h| {
                let weather = h.weather.first().cloned().unwrap_or_default();
                HourlyRow {
                    datetime: h.dt.and_then(to_utc),
                    temperature: h.temp,
                    feels_like: h.feels_like,
                    pressure: h.pressure,
                    humidity: h.humidity,
                    dew_point: h.dew_point,
                    uv_index: h.uvi,
                    weather_condition: weather.main,
                    weather_description: weather.description,
                    wind_speed: h.wind_speed,
                    wind_direction: h.wind_deg,
                    cloudiness: h.clouds,
                    precipitation_probability: h.pop,
                }
            })
            .collect()
    });

    let air_quality = bundle.air_quality.as_ref().filter(|_| options.air_quality).map(|aq| {
        let c = &aq.components;
        AirQualityExport {
            aqi_index: aq.aqi,
            aqi_level: AqiLevel::from_index(aq.aqi).label().to_string(),
            co: c.co,
            no: c.no,
            no2: c.no2,
            o3: c.o3,
            so2: c.so2,
            pm2_5: c.pm2_5,
            pm10: c.pm10,
            nh3: c.nh3,
        }
    });

    ExportDocument {
        location: ExportLocation {
            name: location.name.clone(),
            safe_name: sanitize_location_name(&location.name),
            lat: location.coordinates.lat,
            lon: location.coordinates.lon,
        },
        export_date: now,
        data_source: DATA_SOURCE.to_string(),
        current_weather,
        forecast_5day,
        hourly_forecast,
        air_quality,
    }
}

pub fn render(document: &ExportDocument, format: ExportFormat) -> Result<String> {
    match format {
        ExportFormat::Json => {
            serde_json::to_string_pretty(document).context("Failed to serialize export to JSON")
        }
        ExportFormat::Csv => Ok(render_csv(document)),
        ExportFormat::Txt => Ok(render_txt(document)),
    }
}

/// `weather-data-<place>-<date>.json|csv` or `weather-report-<place>-<date>.txt`.
pub fn export_file_name(location_name: &str, format: ExportFormat, date: NaiveDate) -> String {
    let stem = match format {
        ExportFormat::Txt => "weather-report",
        ExportFormat::Json | ExportFormat::Csv => "weather-data",
    };
    format!(
        "{stem}-{}-{}.{}",
        sanitize_location_name(location_name),
        date.format("%Y-%m-%d"),
        format.extension()
    )
}

/// ASCII-only name usable in file names: Cyrillic is transliterated, Latin
/// diacritics are stripped, everything else non-alphanumeric is dropped.
pub fn sanitize_location_name(name: &str) -> String {
    let mut ascii = String::with_capacity(name.len());
    for ch in name.chars() {
        match transliterate(ch) {
            Some(replacement) => ascii.push_str(replacement),
            None => ascii.push(ch),
        }
    }

    let kept: String = ascii
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == ' ')
        .collect();

    let mut out = String::with_capacity(kept.len());
    for word in kept.split_whitespace() {
        if !out.is_empty() {
            out.push('-');
        }
        out.push_str(word);
    }

    let mut collapsed = String::with_capacity(out.len());
    for c in out.chars() {
        if c == '-' && collapsed.ends_with('-') {
            continue;
        }
        collapsed.push(c);
    }

    if collapsed.is_empty() { "location".to_string() } else { collapsed }
}

fn transliterate(ch: char) -> Option<&'static str> {
    let s = match ch {
        'А' => "A", 'Б' => "B", 'В' => "V", 'Г' => "G", 'Д' => "D", 'Е' | 'Ё' | 'Э' => "E",
        'Ж' => "ZH", 'З' => "Z", 'И' | 'Й' => "I", 'К' => "K", 'Л' => "L", 'М' => "M",
        'Н' => "N", 'О' => "O", 'П' => "P", 'Р' => "R", 'С' => "S", 'Т' => "T", 'У' => "U",
        'Ф' => "F", 'Х' => "KH", 'Ц' => "TS", 'Ч' => "CH", 'Ш' => "SH", 'Щ' => "SHCH",
        'Ы' => "Y", 'Ю' => "YU", 'Я' => "YA", 'Ь' | 'Ъ' | 'ь' | 'ъ' => "",
        'а' => "a", 'б' => "b", 'в' => "v", 'г' => "g", 'д' => "d", 'е' | 'ё' | 'э' => "e",
        'ж' => "zh", 'з' => "z", 'и' | 'й' => "i", 'к' => "k", 'л' => "l", 'м' => "m",
        'н' => "n", 'о' => "o", 'п' => "p", 'р' => "r", 'с' => "s", 'т' => "t", 'у' => "u",
        'ф' => "f", 'х' => "kh", 'ц' => "ts", 'ч' => "ch", 'ш' => "sh", 'щ' => "shch",
        'ы' => "y", 'ю' => "yu", 'я' => "ya",
        'Ą' | 'À' | 'Á' | 'Â' | 'Ã' | 'Ä' | 'Å' => "A",
        'ą' | 'à' | 'á' | 'â' | 'ã' | 'ä' | 'å' => "a",
        'Ć' | 'Ç' | 'Č' => "C", 'ć' | 'ç' | 'č' => "c",
        'Ę' | 'È' | 'É' | 'Ê' | 'Ë' | 'Ě' => "E", 'ę' | 'è' | 'é' | 'ê' | 'ë' | 'ě' => "e",
        'Ì' | 'Í' | 'Î' | 'Ï' => "I", 'ì' | 'í' | 'î' | 'ï' => "i",
        'Ł' => "L", 'ł' => "l",
        'Ń' | 'Ñ' | 'Ň' => "N", 'ń' | 'ñ' | 'ň' => "n",
        'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => "O", 'ó' | 'ò' | 'ô' | 'õ' | 'ö' => "o",
        'Ř' => "R", 'ř' => "r",
        'Ś' | 'Š' => "S", 'ś' | 'š' => "s", 'ß' => "ss",
        'Ù' | 'Ú' | 'Û' | 'Ü' | 'Ů' => "U", 'ù' | 'ú' | 'û' | 'ü' | 'ů' => "u",
        'Ý' => "Y", 'ý' | 'ÿ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z", 'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(s)
}

fn render_csv(doc: &ExportDocument) -> String {
    let mut out = String::new();

    if let Some(current) = &doc.current_weather {
        out.push_str("Current weather\nParameter,Value,Unit\n");
        for (key, value, unit) in current.rows() {
            push_csv_row(&mut out, &[&csv_label(key), &value, unit]);
        }
        out.push('\n');
    }

    if let Some(rows) = &doc.forecast_5day {
        out.push_str("Forecast\n");
        out.push_str(
            "Date and time,Temperature (°C),Feels like (°C),Pressure (hPa),Humidity (%),\
             Condition,Description,Wind speed (m/s),Wind direction (°),Cloudiness (%),\
             Precipitation probability (%)\n",
        );
        for row in rows {
            let pop = (row.precipitation_probability.unwrap_or(0.0) * 100.0).round();
            push_csv_row(
                &mut out,
                &[
                    &opt(row.datetime.map(|t| t.to_rfc3339())),
                    &opt(row.temperature),
                    &opt(row.feels_like),
                    &opt(row.pressure),
                    &opt(row.humidity),
                    &opt(row.weather_condition.as_ref()),
                    &opt(row.weather_description.as_ref()),
                    &opt(row.wind_speed),
                    &opt(row.wind_direction),
                    &opt(row.cloudiness),
                    &pop.to_string(),
                ],
            );
        }
        out.push('\n');
    }

    if let Some(aq) = &doc.air_quality {
        out.push_str("Air quality\nParameter,Value,Unit\n");
        for (key, value, unit) in aq.rows() {
            push_csv_row(&mut out, &[&csv_label(key), &value, unit]);
        }
    }

    out
}

fn render_txt(doc: &ExportDocument) -> String {
    let mut out = String::new();
    let exported = doc.export_date.with_timezone(&Local);

    let _ = writeln!(out, "WEATHER REPORT\n==============\n");
    let _ = writeln!(out, "Location: {}", doc.location.name);
    let _ = writeln!(out, "Coordinates: {:.4}°, {:.4}°", doc.location.lat, doc.location.lon);
    let _ = writeln!(out, "Exported: {}", exported.format("%Y-%m-%d %H:%M"));
    let _ = writeln!(out, "Data source: {}\n", doc.data_source);

    if let Some(c) = &doc.current_weather {
        let _ = writeln!(out, "CURRENT WEATHER\n---------------");
        let _ = writeln!(
            out,
            "Temperature: {}°C (feels like {}°C)",
            opt(c.temperature),
            opt(c.feels_like)
        );
        let _ = writeln!(
            out,
            "Conditions: {} - {}",
            opt(c.weather_condition.as_ref()),
            opt(c.weather_description.as_ref())
        );
        let _ = writeln!(out, "Pressure: {} hPa", opt(c.pressure));
        let _ = writeln!(out, "Humidity: {}%", opt(c.humidity));
        if let Some(speed) = c.wind_speed {
            let direction = c.wind_direction.map(wind_direction).unwrap_or_default();
            let _ = writeln!(out, "Wind: {:.1} km/h, {direction}", speed * 3.6);
        }
        let _ = writeln!(out, "Cloudiness: {}%", opt(c.cloudiness));
        if let Some(visibility) = c.visibility {
            let _ = writeln!(out, "Visibility: {:.1} km", visibility / 1000.0);
        }
        if let Some(uvi) = c.uv_index {
            let _ = writeln!(out, "UV index: {uvi}");
        }
        if let Some(sunrise) = c.sunrise {
            let _ = writeln!(out, "Sunrise: {}", sunrise.with_timezone(&Local).format("%H:%M"));
        }
        if let Some(sunset) = c.sunset {
            let _ = writeln!(out, "Sunset: {}", sunset.with_timezone(&Local).format("%H:%M"));
        }
        out.push('\n');
    }

    if let Some(aq) = &doc.air_quality {
        let _ = writeln!(out, "AIR QUALITY\n===========");
        let _ = writeln!(out, "AQI level: {} ({}/5)", aq.aqi_level, aq.aqi_index);
        for (label, value) in [
            ("PM2.5", aq.pm2_5),
            ("PM10", aq.pm10),
            ("NO₂", aq.no2),
            ("O₃", aq.o3),
            ("SO₂", aq.so2),
            ("CO", aq.co),
        ] {
            if let Some(v) = value {
                let _ = writeln!(out, "{label}: {v:.1} μg/m³");
            }
        }
        out.push('\n');
    }

    if let Some(rows) = &doc.forecast_5day {
        let _ = writeln!(out, "5-DAY FORECAST\n==============");
        // One line per day: every eighth 3-hour sample.
        for row in rows.iter().take(40).step_by(8) {
            let day = row
                .datetime
                .map(|t| t.with_timezone(&Local).format("%Y-%m-%d").to_string())
                .unwrap_or_default();
            let _ = writeln!(
                out,
                "{day} - {}: {}°C",
                opt(row.weather_condition.as_ref()),
                opt(row.temperature)
            );
        }
    }

    out
}

fn to_utc(ts: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(ts, 0)
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn csv_label(key: &str) -> String {
    key.replace('_', " ").to_uppercase()
}

fn push_csv_row(out: &mut String, fields: &[&str]) {
    let quoted: Vec<String> =
        fields.iter().map(|f| format!("\"{}\"", f.replace('"', "\"\""))).collect();
    out.push_str(&quoted.join(","));
    out.push('\n');
}
