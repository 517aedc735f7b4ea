//! Builders for cleaned rows used across unit tests.

use chrono::{Datelike, NaiveDate};

use crate::normalizer::{CleanedMeasurement, classify_recency};
use crate::reference::PollutantCode;

pub const AS_OF_YEAR: i32 = 2025;

/// A cleaned row for `city` at a fixed station, dated at midnight UTC.
pub fn measurement(
    city: &str,
    pollutant: PollutantCode,
    value: f64,
    date: Option<(i32, u32, u32)>,
) -> CleanedMeasurement {
    let date = date.and_then(|(y, m, d)| NaiveDate::from_ymd_opt(y, m, d));
    let timestamp = date.and_then(|d| d.and_hms_opt(0, 0, 0)).map(|ts| ts.and_utc());
    let year = date.map(|d| d.year());

    CleanedMeasurement {
        country_code: Some("FR".to_string()),
        city: city.to_string(),
        location: Some(format!("{city} Centre")),
        coordinates: "46.0, 2.0".to_string(),
        pollutant,
        source_name: None,
        unit: Some("µg/m³".to_string()),
        value,
        last_updated: timestamp.map(|ts| ts.to_rfc3339()),
        country_label: Some("France".to_string()),
        latitude: 46.0,
        longitude: 2.0,
        timestamp,
        date,
        year,
        month: date.map(|d| d.month()),
        city_normalized: city.to_uppercase(),
        is_recent: classify_recency(year, AS_OF_YEAR, 1),
        data_age: year.map(|y| AS_OF_YEAR - y),
    }
}

/// A cleaned row at an explicit station and position, dated 2025-01-01.
pub fn measurement_at(
    city: &str,
    location: &str,
    (latitude, longitude): (f64, f64),
    pollutant: PollutantCode,
    value: f64,
) -> CleanedMeasurement {
    CleanedMeasurement {
        location: Some(location.to_string()),
        coordinates: format!("{latitude}, {longitude}"),
        latitude,
        longitude,
        ..measurement(city, pollutant, value, Some((2025, 1, 1)))
    }
}
