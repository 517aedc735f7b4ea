//! Cleaning pipeline turning raw CSV rows into [`CleanedMeasurement`]s.
//!
//! Stages run in a fixed order: typed parsing, pollutant filter, value
//! range filter, required-field check, city backfill, city-label validation,
//! canonicalization and recency tagging. City validation runs after backfill
//! because the label it checks may come from either the city or the
//! location column.

mod city;
mod coords;
mod stages;
mod time;

pub use city::{canonicalize_city, is_valid_city_label};
pub use coords::parse_coordinates;
pub use stages::{
    ParsedRow, backfill_city, classify_recency, filter_to_known_pollutants, filter_valid_values,
    is_valid_value, require_fields,
};
pub use time::parse_timestamp;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

use crate::parser::RawMeasurement;
use crate::reference::{PollutantCode, ReferenceData};

/// A measurement that passed every cleaning stage, plus derived fields.
///
/// Field order is the export column order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanedMeasurement {
    #[serde(rename = "Country Code")]
    pub country_code: Option<String>,
    /// City label after backfill from the location column.
    #[serde(rename = "City")]
    pub city: String,
    #[serde(rename = "Location")]
    pub location: Option<String>,
    #[serde(rename = "Coordinates")]
    pub coordinates: String,
    #[serde(rename = "Pollutant")]
    pub pollutant: PollutantCode,
    #[serde(rename = "Source Name")]
    pub source_name: Option<String>,
    #[serde(rename = "Unit")]
    pub unit: Option<String>,
    #[serde(rename = "Value")]
    pub value: f64,
    #[serde(rename = "Last Updated")]
    pub last_updated: Option<String>,
    #[serde(rename = "Country Label")]
    pub country_label: Option<String>,
    #[serde(rename = "Latitude")]
    pub latitude: f64,
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    #[serde(skip)]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(rename = "Date")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "Year")]
    pub year: Option<i32>,
    #[serde(rename = "Month")]
    pub month: Option<u32>,
    #[serde(rename = "City_Normalized")]
    pub city_normalized: String,
    #[serde(rename = "Is_Recent")]
    pub is_recent: bool,
    #[serde(rename = "Data_Age")]
    pub data_age: Option<i32>,
}

/// Header row written by the CSV export, matching the serialized field order.
pub const EXPORT_COLUMNS: [&str; 18] = [
    "Country Code",
    "City",
    "Location",
    "Coordinates",
    "Pollutant",
    "Source Name",
    "Unit",
    "Value",
    "Last Updated",
    "Country Label",
    "Latitude",
    "Longitude",
    "Date",
    "Year",
    "Month",
    "City_Normalized",
    "Is_Recent",
    "Data_Age",
];

impl CleanedMeasurement {
    /// Rebuilds the raw row this measurement was cleaned from, with the city
    /// already backfilled. Feeding it back through [`Normalizer::normalize`]
    /// reproduces `self`.
    pub fn to_raw(&self) -> RawMeasurement {
        RawMeasurement {
            country_code: self.country_code.clone(),
            city: Some(self.city.clone()),
            location: self.location.clone(),
            coordinates: Some(self.coordinates.clone()),
            pollutant: Some(self.pollutant.as_str().to_string()),
            source_name: self.source_name.clone(),
            unit: self.unit.clone(),
            value: Some(self.value.to_string()),
            last_updated: self.last_updated.clone(),
            country_label: self.country_label.clone(),
        }
    }
}

/// Rows removed by each stage during one normalization run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CleaningReport {
    pub input_rows: usize,
    pub malformed_records: usize,
    pub unknown_pollutant: usize,
    pub invalid_value: usize,
    pub missing_fields: usize,
    pub invalid_city: usize,
    pub unparsed_timestamp: usize,
    pub kept: usize,
}

impl CleaningReport {
    pub fn dropped(&self) -> usize {
        self.input_rows - self.kept
    }
}

/// Output of [`Normalizer::normalize`].
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub rows: Vec<CleanedMeasurement>,
    pub report: CleaningReport,
}

/// Runs the cleaning stages against a fixed reference table and reference year.
pub struct Normalizer<'a> {
    reference: &'a ReferenceData,
    as_of_year: i32,
}

impl<'a> Normalizer<'a> {
    pub fn new(reference: &'a ReferenceData, as_of_year: i32) -> Self {
        Self {
            reference,
            as_of_year,
        }
    }

    /// Cleans `rows`. Always returns a dataset, possibly empty.
    pub fn normalize(&self, rows: Vec<RawMeasurement>) -> Normalized {
        let mut report = CleaningReport {
            input_rows: rows.len(),
            ..Default::default()
        };

        let parsed: Vec<ParsedRow> = rows.into_iter().map(ParsedRow::parse).collect();

        let before = parsed.len();
        let known = filter_to_known_pollutants(parsed);
        report.unknown_pollutant = before - known.len();

        let before = known.len();
        let in_range = filter_valid_values(known);
        report.invalid_value = before - in_range.len();

        let before = in_range.len();
        let complete = require_fields(in_range);
        report.missing_fields = before - complete.len();

        let labels = &self.reference.station_labels;
        let before = complete.len();
        let with_city: Vec<ParsedRow> = complete
            .into_iter()
            .map(backfill_city)
            .filter(|row| {
                row.raw
                    .city
                    .as_deref()
                    .is_some_and(|c| is_valid_city_label(c, labels))
            })
            .collect();
        report.invalid_city = before - with_city.len();

        let cleaned: Vec<CleanedMeasurement> =
            with_city.into_iter().filter_map(|row| self.finish(row)).collect();
        report.unparsed_timestamp = cleaned.iter().filter(|m| m.timestamp.is_none()).count();
        report.kept = cleaned.len();

        Normalized {
            rows: cleaned,
            report,
        }
    }

    /// Re-runs the pipeline over rows that were already cleaned.
    pub fn renormalize(&self, rows: &[CleanedMeasurement]) -> Normalized {
        self.normalize(rows.iter().map(CleanedMeasurement::to_raw).collect())
    }

    fn finish(&self, row: ParsedRow) -> Option<CleanedMeasurement> {
        let ParsedRow {
            raw,
            latitude,
            longitude,
            pollutant,
            value,
            timestamp,
        } = row;

        let city = raw.city?;
        let city_normalized = canonicalize_city(&city, &self.reference.district_aliases);
        let year = timestamp.map(|ts| ts.year());

        Some(CleanedMeasurement {
            country_code: raw.country_code,
            city,
            location: raw.location,
            coordinates: raw.coordinates?,
            pollutant: pollutant?,
            source_name: raw.source_name,
            unit: raw.unit,
            value: value?,
            last_updated: raw.last_updated,
            country_label: raw.country_label,
            latitude: latitude?,
            longitude: longitude?,
            timestamp,
            date: timestamp.map(|ts| ts.date_naive()),
            year,
            month: timestamp.map(|ts| ts.month()),
            city_normalized,
            is_recent: classify_recency(year, self.as_of_year, self.reference.recent_years_back),
            data_age: year.map(|y| self.as_of_year.saturating_sub(y)),
        })
    }
}

/// Logs a one-line summary of a cleaning run.
pub fn log_report(report: &CleaningReport) {
    info!(
        input = report.input_rows,
        malformed = report.malformed_records,
        unknown_pollutant = report.unknown_pollutant,
        invalid_value = report.invalid_value,
        missing_fields = report.missing_fields,
        invalid_city = report.invalid_city,
        unparsed_timestamp = report.unparsed_timestamp,
        kept = report.kept,
        "Dataset cleaned"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(city: Option<&str>, location: &str, coords: &str, pollutant: &str, value: &str, ts: &str) -> RawMeasurement {
        RawMeasurement {
            country_code: Some("FR".to_string()),
            city: city.map(String::from),
            location: Some(location.to_string()),
            coordinates: Some(coords.to_string()),
            pollutant: Some(pollutant.to_string()),
            source_name: Some("EEA".to_string()),
            unit: Some("µg/m³".to_string()),
            value: Some(value.to_string()),
            last_updated: Some(ts.to_string()),
            country_label: Some("France".to_string()),
        }
    }

    fn sample_rows() -> Vec<RawMeasurement> {
        vec![
            raw(Some("Paris 5e Arrondissement"), "Paris Centre", "48.84, 2.35", "NO2", "41.2", "2025-02-01T10:00:00+00:00"),
            raw(Some("Lyon 3"), "Lyon Est", "45.76, 4.85", "PM10", "22", "2023-06-01T10:00:00+00:00"),
            raw(None, "Villeparisis", "48.94, 2.61", "O3", "80", "2024-08-15T12:00:00+00:00"),
            raw(Some("FR04001"), "FR04001", "48.0, 2.0", "NO2", "10", "2025-01-01T00:00:00+00:00"),
            raw(Some("ATMO-NORD"), "Lille", "50.6, 3.0", "NO2", "10", "2025-01-01T00:00:00+00:00"),
            raw(Some("Nice"), "Nice Port", "43.7 7.2", "NO2", "10", "2025-01-01T00:00:00+00:00"),
            raw(Some("Nice"), "Nice Port", "43.7, 7.2", "BENZENE", "10", "2025-01-01T00:00:00+00:00"),
            raw(Some("Nice"), "Nice Port", "43.7, 7.2", "SO2", "1500", "2025-01-01T00:00:00+00:00"),
            raw(Some("Nice"), "Nice Port", "43.7, 7.2", "CO", "not-a-date-value", "2025-01-01T00:00:00+00:00"),
            raw(Some("Toulouse"), "Toulouse Sud", "43.6, 1.44", "PM2.5", "9.5", "garbage"),
        ]
    }

    #[test]
    fn test_pipeline_keeps_only_valid_rows() {
        let reference = ReferenceData::default();
        let out = Normalizer::new(&reference, 2025).normalize(sample_rows());

        let cities: Vec<_> = out.rows.iter().map(|m| m.city_normalized.as_str()).collect();
        assert_eq!(cities, vec!["PARIS", "LYON", "VILLEPARISIS", "TOULOUSE"]);

        assert_eq!(out.report.input_rows, 10);
        assert_eq!(out.report.unknown_pollutant, 1);
        assert_eq!(out.report.invalid_value, 2);
        assert_eq!(out.report.missing_fields, 1);
        assert_eq!(out.report.invalid_city, 2);
        assert_eq!(out.report.unparsed_timestamp, 1);
        assert_eq!(out.report.kept, 4);
        assert_eq!(out.report.dropped(), 6);
    }

    #[test]
    fn test_derived_fields() {
        let reference = ReferenceData::default();
        let out = Normalizer::new(&reference, 2025).normalize(sample_rows());

        let paris = &out.rows[0];
        assert_eq!(paris.city, "Paris 5e Arrondissement");
        assert_eq!((paris.latitude, paris.longitude), (48.84, 2.35));
        assert_eq!(paris.date, NaiveDate::from_ymd_opt(2025, 2, 1));
        assert_eq!((paris.year, paris.month), (Some(2025), Some(2)));
        assert!(paris.is_recent);
        assert_eq!(paris.data_age, Some(0));

        let lyon = &out.rows[1];
        assert!(!lyon.is_recent);
        assert_eq!(lyon.data_age, Some(2));

        let villeparisis = &out.rows[2];
        assert_eq!(villeparisis.city, "Villeparisis");
        assert!(villeparisis.is_recent);

        let toulouse = &out.rows[3];
        assert_eq!(toulouse.date, None);
        assert!(!toulouse.is_recent);
        assert_eq!(toulouse.data_age, None);
    }

    #[test]
    fn test_extreme_as_of_year_does_not_overflow() {
        let reference = ReferenceData::default();
        let out = Normalizer::new(&reference, i32::MIN).normalize(sample_rows());

        let paris = &out.rows[0];
        assert_eq!(paris.data_age, Some(i32::MIN));
        assert!(paris.is_recent);

        let out = Normalizer::new(&reference, i32::MAX).normalize(sample_rows());
        assert!(!out.rows[0].is_recent);
    }

    #[test]
    fn test_values_within_bounds_after_cleaning() {
        let reference = ReferenceData::default();
        let out = Normalizer::new(&reference, 2025).normalize(sample_rows());
        assert!(out.rows.iter().all(|m| (0.0..1000.0).contains(&m.value)));
    }

    #[test]
    fn test_renormalize_is_idempotent() {
        let reference = ReferenceData::default();
        let normalizer = Normalizer::new(&reference, 2025);
        let once = normalizer.normalize(sample_rows());
        let twice = normalizer.renormalize(&once.rows);

        assert_eq!(twice.rows, once.rows);
        assert_eq!(twice.report.dropped(), 0);
    }

    #[test]
    fn test_empty_input_yields_empty_dataset() {
        let reference = ReferenceData::default();
        let out = Normalizer::new(&reference, 2025).normalize(Vec::new());
        assert!(out.rows.is_empty());
        assert_eq!(out.report, CleaningReport::default());
    }

    #[test]
    fn test_substituted_station_rules() {
        let mut reference = ReferenceData::default();
        reference.station_labels.operator_prefixes.push("AIRPARIF".to_string());

        let rows = vec![raw(Some("AIRPARIF-12"), "X", "48.0, 2.0", "NO2", "10", "2025-01-01")];
        let out = Normalizer::new(&reference, 2025).normalize(rows);
        assert!(out.rows.is_empty());
        assert_eq!(out.report.invalid_city, 1);
    }
}
