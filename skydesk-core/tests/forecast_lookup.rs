//! Forecast lookup against hand-built caches (no network).
//! - daily entries win over 3-hour samples
//! - 3-hour buckets aggregate min/max/peak precipitation
//! - uncovered dates resolve to nothing
//! - days are cut at local midnight, not UTC midnight

use chrono::{FixedOffset, NaiveDate, Utc};
use skydesk_core::forecast::{group_by_day, resolve_in};
use skydesk_core::model::{DailyForecastEntry, ForecastSample};
use skydesk_core::{ForecastCache, ForecastSource};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn ts(y: i32, m: u32, d: u32, h: u32) -> i64 {
    date(y, m, d).and_hms_opt(h, 0, 0).unwrap().and_utc().timestamp()
}

fn daily(value: serde_json::Value) -> Vec<DailyForecastEntry> {
    serde_json::from_value(value).unwrap()
}

fn samples(value: serde_json::Value) -> Vec<ForecastSample> {
    serde_json::from_value(value).unwrap()
}

fn june_10_daily() -> Vec<DailyForecastEntry> {
    daily(serde_json::json!([{
        "dt": ts(2024, 6, 10, 11),
        "temp": { "min": 10.0, "max": 22.0 },
        "weather": [{ "main": "Clouds", "description": "broken clouds", "icon": "04d" }],
        "pop": 0.2
    }]))
}

fn june_11_samples() -> Vec<ForecastSample> {
    samples(serde_json::json!([
        { "dt": ts(2024, 6, 11, 0), "main": { "temp": 14.0 }, "pop": 0.1,
          "weather": [{ "main": "Clear", "description": "clear sky", "icon": "01n" }] },
        { "dt": ts(2024, 6, 11, 3), "main": { "temp": 12.0 }, "pop": 0.05,
          "weather": [{ "main": "Clouds", "description": "few clouds", "icon": "02n" }] },
        { "dt": ts(2024, 6, 11, 6), "main": { "temp": 11.0 }, "pop": 0.3,
          "weather": [{ "main": "Clouds", "description": "few clouds", "icon": "02d" }] },
        { "dt": ts(2024, 6, 11, 9), "main": { "temp": 16.0 }, "pop": 0.0,
          "weather": [{ "main": "Clouds", "description": "scattered clouds", "icon": "03d" }] }
    ]))
}

#[test]
fn daily_entry_resolves_to_daily_summary() {
    let cache = ForecastCache::new(Some(june_10_daily()), None);

    let summary = resolve_in(&cache, date(2024, 6, 10), &Utc).unwrap();

    assert_eq!(summary.source, ForecastSource::Daily);
    assert_eq!(summary.date, date(2024, 6, 10));
    assert_eq!((summary.temp_min, summary.temp_max), (10, 22));
    assert_eq!(summary.condition, "Clouds");
    assert_eq!(summary.description, "broken clouds");
    assert_eq!(summary.pop, 20);
    assert_eq!(summary.icon, "04d");
}

#[test]
fn three_hour_bucket_uses_first_sample_headline() {
    let cache = ForecastCache::new(None, Some(june_11_samples()));

    let summary = resolve_in(&cache, date(2024, 6, 11), &Utc).unwrap();

    assert_eq!(summary.source, ForecastSource::ThreeHour);
    assert_eq!((summary.temp_min, summary.temp_max), (11, 16));
    assert_eq!(summary.pop, 30);
    // Clouds is the majority, but the headline comes from the 00:00 sample.
    assert_eq!(summary.condition, "Clear");
    assert_eq!(summary.description, "clear sky");
    assert_eq!(summary.icon, "01n");
}

#[test]
fn empty_cache_resolves_to_nothing() {
    assert!(resolve_in(&ForecastCache::default(), date(2024, 6, 10), &Utc).is_none());
    assert!(resolve_in(&ForecastCache::new(Some(vec![]), Some(vec![])), date(2024, 6, 10), &Utc)
        .is_none());
}

#[test]
fn date_outside_both_series_resolves_to_nothing() {
    let week: Vec<serde_json::Value> = (10..=16)
        .map(|d| {
            serde_json::json!({ "dt": ts(2024, 6, d, 11), "temp": { "min": 10.0, "max": 20.0 } })
        })
        .collect();
    let cache = ForecastCache::new(
        Some(daily(serde_json::Value::Array(week))),
        Some(june_11_samples()),
    );

    assert!(resolve_in(&cache, date(2024, 7, 1), &Utc).is_none());
    assert!(resolve_in(&cache, date(2024, 6, 9), &Utc).is_none());
}

#[test]
fn missing_precipitation_counts_as_zero() {
    let cache = ForecastCache::new(
        None,
        Some(samples(serde_json::json!([
            { "dt": ts(2024, 6, 12, 0), "main": { "temp": 9.0 } },
            { "dt": ts(2024, 6, 12, 3), "main": { "temp": 8.0 } }
        ]))),
    );

    let summary = resolve_in(&cache, date(2024, 6, 12), &Utc).unwrap();
    assert_eq!(summary.pop, 0);
    assert_eq!(summary.condition, "");
    assert_eq!(summary.icon, "");
}

#[test]
fn peak_ignores_missing_precipitation() {
    let cache = ForecastCache::new(
        None,
        Some(samples(serde_json::json!([
            { "dt": ts(2024, 6, 12, 0), "main": { "temp": 9.0 } },
            { "dt": ts(2024, 6, 12, 3), "main": { "temp": 8.0 }, "pop": 0.4 },
            { "dt": ts(2024, 6, 12, 6), "main": { "temp": 7.0 } }
        ]))),
    );

    assert_eq!(resolve_in(&cache, date(2024, 6, 12), &Utc).unwrap().pop, 40);
}

#[test]
fn daily_wins_when_both_cover_the_date() {
    let overlapping = samples(serde_json::json!([
        { "dt": ts(2024, 6, 10, 12), "main": { "temp": 30.0 }, "pop": 0.9 }
    ]));
    let cache = ForecastCache::new(Some(june_10_daily()), Some(overlapping));

    let summary = resolve_in(&cache, date(2024, 6, 10), &Utc).unwrap();
    assert_eq!(summary.source, ForecastSource::Daily);
    assert_eq!(summary.temp_max, 22);
    assert_eq!(summary.pop, 20);
}

#[test]
fn daily_miss_falls_back_to_samples() {
    let cache = ForecastCache::new(Some(june_10_daily()), Some(june_11_samples()));

    let summary = resolve_in(&cache, date(2024, 6, 11), &Utc).unwrap();
    assert_eq!(summary.source, ForecastSource::ThreeHour);
}

#[test]
fn lookup_is_repeatable() {
    let cache = ForecastCache::new(Some(june_10_daily()), Some(june_11_samples()));

    for day in [date(2024, 6, 10), date(2024, 6, 11), date(2024, 6, 12)] {
        assert_eq!(resolve_in(&cache, day, &Utc), resolve_in(&cache, day, &Utc));
    }
}

#[test]
fn every_sample_lands_in_its_own_day() {
    let mut all = june_11_samples();
    all.extend(samples(serde_json::json!([
        { "dt": ts(2024, 6, 12, 0), "main": { "temp": 9.0 } },
        { "dt": ts(2024, 6, 12, 21), "main": { "temp": 8.0 } }
    ])));

    let grouped = group_by_day(&all, &Utc);

    let total: usize = grouped.values().map(Vec::len).sum();
    assert_eq!(total, all.len());
    for (day, bucket) in &grouped {
        for sample in bucket {
            let sample_day = chrono::DateTime::from_timestamp(sample.dt.unwrap(), 0)
                .unwrap()
                .date_naive();
            assert_eq!(&sample_day, day);
        }
    }
    let june_11: Vec<i64> = grouped[&date(2024, 6, 11)].iter().filter_map(|s| s.dt).collect();
    assert_eq!(june_11, vec![ts(2024, 6, 11, 0), ts(2024, 6, 11, 3), ts(2024, 6, 11, 6), ts(2024, 6, 11, 9)]);
}

#[test]
fn samples_bucket_by_local_midnight() {
    let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
    // 20:00, 23:00 and 02:00 UTC are 23:00, 02:00 and 05:00 at UTC+3.
    let cache = ForecastCache::new(
        None,
        Some(samples(serde_json::json!([
            { "dt": ts(2024, 6, 10, 20), "main": { "temp": 18.0 }, "pop": 0.1 },
            { "dt": ts(2024, 6, 10, 23), "main": { "temp": 12.0 }, "pop": 0.6 },
            { "dt": ts(2024, 6, 11, 2), "main": { "temp": 10.0 }, "pop": 0.2 }
        ]))),
    );

    let evening = resolve_in(&cache, date(2024, 6, 10), &plus_three).unwrap();
    assert_eq!((evening.temp_min, evening.temp_max, evening.pop), (18, 18, 10));

    let night = resolve_in(&cache, date(2024, 6, 11), &plus_three).unwrap();
    assert_eq!((night.temp_min, night.temp_max, night.pop), (10, 12, 60));

    let utc_evening = resolve_in(&cache, date(2024, 6, 10), &Utc).unwrap();
    assert_eq!((utc_evening.temp_min, utc_evening.temp_max), (12, 18));
}

#[test]
fn daily_entry_matches_its_local_day() {
    let plus_three = FixedOffset::east_opt(3 * 3600).unwrap();
    let cache = ForecastCache::new(
        Some(daily(serde_json::json!([{
            "dt": ts(2024, 6, 10, 22),
            "temp": { "min": 9.4, "max": 19.5 }
        }]))),
        None,
    );

    let summary = resolve_in(&cache, date(2024, 6, 11), &plus_three).unwrap();
    assert_eq!(summary.source, ForecastSource::Daily);
    assert_eq!((summary.temp_min, summary.temp_max), (9, 20));
    assert!(resolve_in(&cache, date(2024, 6, 10), &plus_three).is_none());
    assert!(resolve_in(&cache, date(2024, 6, 10), &Utc).is_some());
}
