//! Fixed reference data: pollutant thresholds and weights, city lists,
//! station-label patterns and index policy.
//!
//! [`ReferenceData`] is built once at startup (either from the built-in
//! defaults or from a JSON file, see [`ReferenceData::load`]) and passed by
//! reference to the normalizer and the index calculator.

mod config;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Score given to a pollutant whose mean sits exactly on its moderate threshold.
pub const MODERATE_ANCHOR_SCORE: f64 = 100.0;
/// Upper clamp for a single pollutant's normalized score.
pub const MAX_NORMALIZED_SCORE: f64 = 150.0;
/// Composite index at or above which a region is "Moderate".
pub const INDEX_MODERATE_THRESHOLD: f64 = 50.0;
/// Composite index at or above which a region is "High".
pub const INDEX_HIGH_THRESHOLD: f64 = 100.0;
/// Threshold multiplier applied for sensitive populations.
pub const SENSITIVE_POPULATION_FACTOR: f64 = 0.7;
/// Rows from this many years before the reference year still count as recent.
pub const RECENT_DATA_YEARS_BACK: i32 = 1;
/// Concentrations at or above this ceiling are treated as implausible.
pub const VALUE_CEILING: f64 = 1000.0;
/// Severity thresholds used for pollutants missing from the table.
pub const DEFAULT_GOOD_THRESHOLD: f64 = 25.0;
pub const DEFAULT_MODERATE_THRESHOLD: f64 = 50.0;
/// Display colour for pollutants missing from the table.
pub const DEFAULT_POLLUTANT_COLOR: &str = "#7F8C8D";

/// The seven pollutant codes the dataset is filtered to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PollutantCode {
    #[serde(rename = "NO2")]
    No2,
    #[serde(rename = "O3")]
    O3,
    #[serde(rename = "PM10")]
    Pm10,
    #[serde(rename = "PM2.5")]
    Pm25,
    #[serde(rename = "SO2")]
    So2,
    #[serde(rename = "NO")]
    No,
    #[serde(rename = "CO")]
    Co,
}

impl PollutantCode {
    pub const ALL: [PollutantCode; 7] = [
        PollutantCode::No2,
        PollutantCode::O3,
        PollutantCode::Pm10,
        PollutantCode::Pm25,
        PollutantCode::So2,
        PollutantCode::No,
        PollutantCode::Co,
    ];

    /// The code as it appears in the source feed.
    pub fn as_str(&self) -> &'static str {
        match self {
            PollutantCode::No2 => "NO2",
            PollutantCode::O3 => "O3",
            PollutantCode::Pm10 => "PM10",
            PollutantCode::Pm25 => "PM2.5",
            PollutantCode::So2 => "SO2",
            PollutantCode::No => "NO",
            PollutantCode::Co => "CO",
        }
    }
}

impl fmt::Display for PollutantCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string is not one of the known pollutant codes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPollutant(pub String);

impl fmt::Display for UnknownPollutant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown pollutant code '{}'", self.0)
    }
}

impl std::error::Error for UnknownPollutant {}

impl FromStr for PollutantCode {
    type Err = UnknownPollutant;

    /// Matches the feed's codes exactly; no trimming or case folding.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PollutantCode::ALL
            .into_iter()
            .find(|code| code.as_str() == s)
            .ok_or_else(|| UnknownPollutant(s.to_string()))
    }
}

/// Thresholds, weight and display metadata for one pollutant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PollutantReference {
    pub good: f64,
    pub moderate: f64,
    pub weight: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub group: String,
}

impl PollutantReference {
    fn new(good: f64, moderate: f64, weight: f64, name: &str, color: &str, group: &str) -> Self {
        Self {
            good,
            moderate,
            weight,
            name: name.to_string(),
            color: color.to_string(),
            group: group.to_string(),
        }
    }
}

/// Display-only metadata, with defaults for pollutants absent from the table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantInfo {
    pub name: String,
    pub color: String,
    pub group: String,
}

/// A city that reports per district, and the word marking a district label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistrictAlias {
    pub root: String,
    #[serde(default = "default_district_marker")]
    pub district_marker: String,
}

fn default_district_marker() -> String {
    "ARRONDISSEMENT".to_string()
}

impl DistrictAlias {
    pub fn new(root: &str) -> Self {
        Self {
            root: root.to_string(),
            district_marker: default_district_marker(),
        }
    }
}

/// Literal patterns identifying internal station or network codes that
/// show up in the city column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationLabelRules {
    /// Two-letter prefixes that mark a station code when followed by a digit.
    pub country_prefixes: Vec<String>,
    /// Network-operator prefixes.
    pub operator_prefixes: Vec<String>,
    /// Substrings that mark a network identifier anywhere in the label.
    pub network_markers: Vec<String>,
}

impl Default for StationLabelRules {
    fn default() -> Self {
        Self {
            country_prefixes: vec!["FR".to_string()],
            operator_prefixes: vec!["ATMO".to_string()],
            network_markers: vec!["NET-".to_string()],
        }
    }
}

/// Constants governing the composite index. These encode a policy choice and
/// can be overridden from the reference file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexPolicy {
    pub anchor_score: f64,
    pub max_normalized_score: f64,
    pub moderate_threshold: f64,
    pub high_threshold: f64,
}

impl Default for IndexPolicy {
    fn default() -> Self {
        Self {
            anchor_score: MODERATE_ANCHOR_SCORE,
            max_normalized_score: MAX_NORMALIZED_SCORE,
            moderate_threshold: INDEX_MODERATE_THRESHOLD,
            high_threshold: INDEX_HIGH_THRESHOLD,
        }
    }
}

/// Immutable configuration shared by every stage of the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReferenceData {
    pub pollutants: BTreeMap<PollutantCode, PollutantReference>,
    pub major_cities: Vec<String>,
    pub district_aliases: Vec<DistrictAlias>,
    pub station_labels: StationLabelRules,
    /// Pollutants shown in the health-risk table.
    pub high_impact: Vec<PollutantCode>,
    /// Pollutants checked for moderate-threshold exceedances.
    pub alert_pollutants: Vec<PollutantCode>,
    pub sensitive_population_factor: f64,
    pub recent_years_back: i32,
    pub policy: IndexPolicy,
}

impl Default for ReferenceData {
    fn default() -> Self {
        use PollutantCode::*;

        let pollutants = BTreeMap::from([
            (
                Pm25,
                PollutantReference::new(15.0, 25.0, 1.5, "Fine particles PM2.5", "#E67E22", "Particles"),
            ),
            (
                Pm10,
                PollutantReference::new(45.0, 75.0, 1.2, "Particles PM10", "#9B59B6", "Particles"),
            ),
            (
                No2,
                PollutantReference::new(25.0, 50.0, 1.3, "Nitrogen dioxide", "#E74C3C", "Nitrogen oxides"),
            ),
            (
                O3,
                PollutantReference::new(100.0, 180.0, 1.0, "Ozone", "#3498DB", "Oxidants"),
            ),
            (
                So2,
                PollutantReference::new(40.0, 100.0, 0.8, "Sulfur dioxide", "#1ABC9C", "Sulfur"),
            ),
            (
                Co,
                PollutantReference::new(4000.0, 10000.0, 0.5, "Carbon monoxide", "#34495E", "Carbon"),
            ),
            (
                No,
                PollutantReference::new(25.0, 50.0, 0.6, "Nitric oxide", "#F39C12", "Nitrogen oxides"),
            ),
        ]);

        let major_cities = [
            "PARIS",
            "LYON",
            "MARSEILLE",
            "TOULOUSE",
            "NICE",
            "NANTES",
            "STRASBOURG",
            "MONTPELLIER",
            "BORDEAUX",
            "LILLE",
        ]
        .into_iter()
        .map(String::from)
        .collect();

        Self {
            pollutants,
            major_cities,
            district_aliases: vec![
                DistrictAlias::new("PARIS"),
                DistrictAlias::new("MARSEILLE"),
                DistrictAlias::new("LYON"),
            ],
            station_labels: StationLabelRules::default(),
            high_impact: vec![Pm25, Pm10, No2],
            alert_pollutants: vec![Pm25, Pm10, No2, O3],
            sensitive_population_factor: SENSITIVE_POPULATION_FACTOR,
            recent_years_back: RECENT_DATA_YEARS_BACK,
            policy: IndexPolicy::default(),
        }
    }
}

impl ReferenceData {
    /// Threshold and weight entry for `code`, if the table has one.
    pub fn pollutant(&self, code: PollutantCode) -> Option<&PollutantReference> {
        self.pollutants.get(&code)
    }

    /// `(good, moderate)` thresholds, falling back to the generic defaults.
    pub fn thresholds(&self, code: PollutantCode) -> (f64, f64) {
        self.pollutant(code)
            .map(|p| (p.good, p.moderate))
            .unwrap_or((DEFAULT_GOOD_THRESHOLD, DEFAULT_MODERATE_THRESHOLD))
    }

    /// Display metadata for `code`. Missing entries and blank fields fall
    /// back to the code itself, a neutral grey and the "Other" group.
    pub fn info(&self, code: PollutantCode) -> PollutantInfo {
        let entry = self.pollutant(code);
        let pick = |field: Option<&String>, fallback: &str| match field {
            Some(s) if !s.is_empty() => s.clone(),
            _ => fallback.to_string(),
        };

        PollutantInfo {
            name: pick(entry.map(|p| &p.name), code.as_str()),
            color: pick(entry.map(|p| &p.color), DEFAULT_POLLUTANT_COLOR),
            group: pick(entry.map(|p| &p.group), "Other"),
        }
    }

    /// Whether `city` (already canonical) is in the major-city list.
    pub fn is_major_city(&self, city: &str) -> bool {
        self.major_cities.iter().any(|c| c == city)
    }

    /// Threshold multiplier for the requested audience.
    pub fn threshold_factor(&self, sensitive: bool) -> f64 {
        if sensitive {
            self.sensitive_population_factor
        } else {
            1.0
        }
    }
}
