//! Data types produced by the analysis pipeline.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::analyzers::grade::{IndexCategory, Severity};
use crate::reference::PollutantCode;

/// Composite index for one city under the current filters.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityPollutionIndex {
    pub city: String,
    /// Mean concentration per pollutant for the city.
    pub values: BTreeMap<PollutantCode, f64>,
    pub index: f64,
    pub category: IndexCategory,
    pub measurements: usize,
}

/// One row of the city ranking.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CityRanking {
    pub city: String,
    pub index: f64,
    pub category: IndexCategory,
    pub measurements: usize,
}

/// Headline figures for the current view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutiveSummary {
    pub most_polluted_city: String,
    pub most_polluted_value: f64,
    pub dominant_pollutant: PollutantCode,
    pub dominant_pollutant_value: f64,
    pub overall_mean: f64,
    /// `None` when the most polluted city has no pollutant in the reference table.
    pub city_index: Option<CityPollutionIndex>,
    pub measurements: usize,
}

/// Distribution of one pollutant's values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PollutantStatistics {
    pub pollutant: PollutantCode,
    pub name: String,
    pub color: String,
    pub count: usize,
    pub mean: f64,
    pub median: f64,
    /// Sample standard deviation; 0 with fewer than two values.
    pub stddev: f64,
    pub min: f64,
    pub max: f64,
    /// `None` when the pollutant has no reference entry.
    pub moderate_threshold: Option<f64>,
}

/// Mean for one pollutant over one period. `month` is `None` for yearly means.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodMean {
    pub year: i32,
    pub month: Option<u32>,
    pub pollutant: PollutantCode,
    pub mean: f64,
    pub count: usize,
}

/// One reading shown in a station's popup table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationReading {
    pub pollutant: PollutantCode,
    pub value: f64,
    pub severity: Severity,
}

/// Map marker for one station: every reading at a (lat, lon, city,
/// location) position, across pollutants.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationMarker {
    pub latitude: f64,
    pub longitude: f64,
    pub city: String,
    pub location: Option<String>,
    pub readings: Vec<StationReading>,
    /// Pollutant of the highest positive reading.
    pub dominant_pollutant: Option<PollutantCode>,
    pub max_value: f64,
    pub mean: f64,
    pub last_updated: Option<DateTime<Utc>>,
    pub severity: Severity,
}

/// City and pollutant pair in the health-risk table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthRisk {
    pub city: String,
    pub pollutant: PollutantCode,
    /// Mean concentration, rounded to one decimal.
    pub mean: f64,
    pub risk: Severity,
}

/// A pollutant whose mean over the view exceeds its (possibly scaled)
/// moderate threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Exceedance {
    pub pollutant: PollutantCode,
    pub mean: f64,
    pub threshold: f64,
    /// Selected cities, joined and truncated for display. `None` when no
    /// city filter is active.
    pub scope: Option<String>,
}

/// Pearson correlations between pollutants over (city, day) pairs where
/// every listed pollutant was measured.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    pub pollutants: Vec<PollutantCode>,
    /// Number of complete (city, day) rows.
    pub samples: usize,
    /// Row-major; `None` where a series is constant.
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: PollutantCode, b: PollutantCode) -> Option<f64> {
        let i = self.pollutants.iter().position(|&p| p == a)?;
        let j = self.pollutants.iter().position(|&p| p == b)?;
        self.values[i][j]
    }
}
