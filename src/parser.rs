//! CSV decoder for the semicolon-separated air-quality export.

use csv::ReaderBuilder;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One row as it appears in the source file, before any cleaning.
///
/// Every column is optional: a missing column or an empty cell both decode
/// to `None`, and the normalizer decides what to drop.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMeasurement {
    #[serde(rename = "Country Code", default)]
    pub country_code: Option<String>,
    #[serde(rename = "City", default)]
    pub city: Option<String>,
    #[serde(rename = "Location", default)]
    pub location: Option<String>,
    #[serde(rename = "Coordinates", default)]
    pub coordinates: Option<String>,
    #[serde(rename = "Pollutant", default)]
    pub pollutant: Option<String>,
    #[serde(rename = "Source Name", default)]
    pub source_name: Option<String>,
    #[serde(rename = "Unit", default)]
    pub unit: Option<String>,
    #[serde(rename = "Value", default)]
    pub value: Option<String>,
    #[serde(rename = "Last Updated", default)]
    pub last_updated: Option<String>,
    #[serde(rename = "Country Label", default)]
    pub country_label: Option<String>,
}

/// Decoded rows plus the number of records the CSV reader could not decode.
#[derive(Debug, Default)]
pub struct ParsedCsv {
    pub rows: Vec<RawMeasurement>,
    pub malformed: usize,
}

/// Decodes semicolon-delimited bytes into [`RawMeasurement`] rows.
///
/// Never fails: undecodable records (bad UTF-8, broken quoting) are counted
/// in [`ParsedCsv::malformed`] and skipped. Empty input yields no rows.
pub fn parse_measurements(bytes: &[u8]) -> ParsedCsv {
    let mut rdr = ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(bytes);

    let mut parsed = ParsedCsv::default();
    for result in rdr.deserialize::<RawMeasurement>() {
        match result {
            Ok(row) => parsed.rows.push(row),
            Err(e) => {
                parsed.malformed += 1;
                debug!(error = %e, "Skipping undecodable CSV record");
            }
        }
    }

    parsed
}
