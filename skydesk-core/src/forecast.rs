//! Forecast lookup for a single calendar day.
//!
//! Two differently-shaped sources feed the lookup: the 7-day daily series
//! (one entry per day, with a temperature range) and the 5-day series of
//! 3-hour samples. Daily data wins whenever it covers the requested day;
//! otherwise the 3-hour samples of that day are aggregated. Days are compared
//! as local calendar days.

use std::collections::BTreeMap;

use chrono::{Local, NaiveDate, TimeZone};
use serde::Serialize;

use crate::model::{
    DailyForecastEntry, ForecastCache, ForecastSample, ForecastSource, ForecastSummary,
};

/// Resolve the forecast for `target` using the local time zone.
///
/// Returns `None` when neither series covers the day.
pub fn resolve(cache: &ForecastCache, target: NaiveDate) -> Option<ForecastSummary> {
    resolve_in(cache, target, &Local)
}

/// Same as [`resolve`], with day boundaries taken in `tz`.
pub fn resolve_in<Tz: TimeZone>(
    cache: &ForecastCache,
    target: NaiveDate,
    tz: &Tz,
) -> Option<ForecastSummary> {
    if let Some(daily) = cache.daily.as_deref() {
        tracing::debug!(days = daily.len(), %target, "checking daily forecast");
        if let Some(summary) = from_daily(daily, target, tz) {
            return Some(summary);
        }
    }

    if let Some(samples) = cache.three_hour.as_deref() {
        tracing::debug!(samples = samples.len(), %target, "checking 3-hour forecast");
        let grouped = group_by_day(samples, tz);
        if let Some(bucket) = grouped.get(&target) {
            return from_bucket(bucket, target);
        }
    }

    tracing::debug!(%target, "no forecast covers the requested date");
    None
}

/// Calendar day of a unix timestamp in `tz`.
pub fn day_identity<Tz: TimeZone>(timestamp: i64, tz: &Tz) -> Option<NaiveDate> {
    tz.timestamp_opt(timestamp, 0)
        .single()
        .map(|dt| dt.date_naive())
}

/// Partition samples into calendar days, keeping source order inside each day.
///
/// Samples without a timestamp or temperature are left out.
pub fn group_by_day<'a, Tz: TimeZone>(
    samples: &'a [ForecastSample],
    tz: &Tz,
) -> BTreeMap<NaiveDate, Vec<&'a ForecastSample>> {
    let mut grouped: BTreeMap<NaiveDate, Vec<&ForecastSample>> = BTreeMap::new();

    for sample in samples {
        let Some(day) = sample.timestamp().and_then(|ts| day_identity(ts, tz)) else {
            tracing::debug!(?sample.dt, "skipping sample with unusable timestamp");
            continue;
        };
        if sample.temperature().is_none() {
            tracing::debug!(?sample.dt, "skipping sample without temperature");
            continue;
        }
        grouped.entry(day).or_default().push(sample);
    }

    grouped
}

/// Most frequent `main` condition of a day, with the icon first seen for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConditionTally {
    pub condition: String,
    pub icon: String,
    pub count: usize,
}

/// Ties go to the condition seen first.
pub fn most_common_condition(bucket: &[&ForecastSample]) -> Option<ConditionTally> {
    let mut tallies: Vec<ConditionTally> = Vec::new();

    for sample in bucket {
        let Some(weather) = sample.primary_weather() else {
            continue;
        };
        let condition = weather.main.clone().unwrap_or_default();

        match tallies.iter_mut().find(|t| t.condition == condition) {
            Some(tally) => tally.count += 1,
            None => tallies.push(ConditionTally {
                condition,
                icon: weather.icon.clone().unwrap_or_default(),
                count: 1,
            }),
        }
    }

    // max_by_key keeps the last maximum, so walk in reverse to prefer the earliest.
    tallies.into_iter().rev().max_by_key(|t| t.count)
}

/// Aggregated view of one day of 3-hour samples.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DayOutlook {
    pub date: NaiveDate,
    pub temp_min: i32,
    pub temp_max: i32,
    pub condition: String,
    pub icon: String,
    pub pop: u8,
    pub samples: usize,
}

/// Per-day min/max, dominant condition and peak precipitation chance.
pub fn daily_outlook<Tz: TimeZone>(samples: &[ForecastSample], tz: &Tz) -> Vec<DayOutlook> {
    group_by_day(samples, tz)
        .into_iter()
        .filter_map(|(date, bucket)| {
            let (min, max) = temperature_bounds(&bucket)?;
            let tally = most_common_condition(&bucket);
            Some(DayOutlook {
                date,
                temp_min: round_temp(min),
                temp_max: round_temp(max),
                condition: tally.as_ref().map(|t| t.condition.clone()).unwrap_or_default(),
                icon: tally.map(|t| t.icon).unwrap_or_default(),
                pop: peak_pop(&bucket),
                samples: bucket.len(),
            })
        })
        .collect()
}

fn from_daily<Tz: TimeZone>(
    daily: &[DailyForecastEntry],
    target: NaiveDate,
    tz: &Tz,
) -> Option<ForecastSummary> {
    let (entry, (min, max)) = daily.iter().find_map(|entry| {
        let day = entry.timestamp().and_then(|ts| day_identity(ts, tz))?;
        if day != target {
            return None;
        }
        match entry.temperature_range() {
            Some(range) => Some((entry, range)),
            None => {
                tracing::debug!(?entry.dt, "skipping daily entry without temperature range");
                None
            }
        }
    })?;

    let weather = entry.primary_weather();
    Some(ForecastSummary {
        source: ForecastSource::Daily,
        date: target,
        temp_min: round_temp(min),
        temp_max: round_temp(max),
        condition: weather.and_then(|w| w.main.clone()).unwrap_or_default(),
        description: weather.and_then(|w| w.description.clone()).unwrap_or_default(),
        pop: to_percent(entry.precipitation_probability()),
        icon: weather.and_then(|w| w.icon.clone()).unwrap_or_default(),
    })
}

fn from_bucket(bucket: &[&ForecastSample], target: NaiveDate) -> Option<ForecastSummary> {
    let (min, max) = temperature_bounds(bucket)?;
    let headline = bucket.first().and_then(|s| s.primary_weather());

    Some(ForecastSummary {
        source: ForecastSource::ThreeHour,
        date: target,
        temp_min: round_temp(min),
        temp_max: round_temp(max),
        condition: headline.and_then(|w| w.main.clone()).unwrap_or_default(),
        description: headline.and_then(|w| w.description.clone()).unwrap_or_default(),
        pop: peak_pop(bucket),
        icon: headline.and_then(|w| w.icon.clone()).unwrap_or_default(),
    })
}

fn temperature_bounds(bucket: &[&ForecastSample]) -> Option<(f64, f64)> {
    bucket
        .iter()
        .filter_map(|s| s.temperature())
        .fold(None, |acc, t| match acc {
            None => Some((t, t)),
            Some((min, max)) => Some((f64::min(min, t), f64::max(max, t))),
        })
}

fn peak_pop(bucket: &[&ForecastSample]) -> u8 {
    let peak = bucket
        .iter()
        .map(|s| s.precipitation_probability())
        .fold(0.0, f64::max);
    to_percent(peak)
}

fn round_temp(value: f64) -> i32 {
    value.round() as i32
}

fn to_percent(probability: f64) -> u8 {
    (probability * 100.0).round().clamp(0.0, 100.0) as u8
}
