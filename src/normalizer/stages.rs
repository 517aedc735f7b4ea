//! Row-level filter and transform stages.
//!
//! Each stage takes ownership of the row batch and returns the rows that
//! survive. Stages never fail; a bad row is simply not returned.

use chrono::{DateTime, Utc};

use super::coords::parse_coordinates;
use super::time::parse_timestamp;
use crate::parser::RawMeasurement;
use crate::reference::{PollutantCode, VALUE_CEILING};

/// A raw row with its typed fields parsed but not yet validated.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRow {
    pub raw: RawMeasurement,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub pollutant: Option<PollutantCode>,
    pub value: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl ParsedRow {
    pub fn parse(raw: RawMeasurement) -> Self {
        let coords = raw.coordinates.as_deref().and_then(parse_coordinates);
        let pollutant = raw.pollutant.as_deref().and_then(|p| p.parse().ok());
        let value = raw.value.as_deref().and_then(|v| v.trim().parse().ok());
        let timestamp = raw.last_updated.as_deref().and_then(parse_timestamp);

        Self {
            latitude: coords.map(|(lat, _)| lat),
            longitude: coords.map(|(_, lon)| lon),
            pollutant,
            value,
            timestamp,
            raw,
        }
    }
}

/// Keeps rows whose pollutant code is one of the seven known codes.
pub fn filter_to_known_pollutants(mut rows: Vec<ParsedRow>) -> Vec<ParsedRow> {
    rows.retain(|row| row.pollutant.is_some());
    rows
}

/// Whether a concentration lies in the plausible range `[0, VALUE_CEILING)`.
pub fn is_valid_value(value: f64) -> bool {
    (0.0..VALUE_CEILING).contains(&value)
}

/// Keeps rows with a concentration in `[0, VALUE_CEILING)`.
pub fn filter_valid_values(mut rows: Vec<ParsedRow>) -> Vec<ParsedRow> {
    rows.retain(|row| row.value.is_some_and(is_valid_value));
    rows
}

/// Drops rows missing latitude, longitude or value.
pub fn require_fields(mut rows: Vec<ParsedRow>) -> Vec<ParsedRow> {
    rows.retain(|row| row.latitude.is_some() && row.longitude.is_some() && row.value.is_some());
    rows
}

/// Substitutes the location label when the city label is missing or blank.
pub fn backfill_city(mut row: ParsedRow) -> ParsedRow {
    let blank = row.raw.city.as_deref().is_none_or(|c| c.trim().is_empty());
    if blank {
        row.raw.city = row.raw.location.clone();
    }
    row
}

/// True when `year` falls within `years_back` years of `as_of_year`.
/// Rows without a parsed year are never recent.
pub fn classify_recency(year: Option<i32>, as_of_year: i32, years_back: i32) -> bool {
    year.is_some_and(|y| y >= as_of_year.saturating_sub(years_back))
}
