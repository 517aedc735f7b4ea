//! Aggregation and scoring over filtered measurement views.
//!
//! This module computes the composite pollution index per city, ranks
//! cities by it, and produces the per-pollutant, per-period and per-station
//! aggregates consumed by the presentation layer.

pub mod analyzer;
pub mod grade;
pub mod index;
pub mod types;
pub mod utility;

pub use analyzer::{
    alert_scope, executive_summary, health_risks, monthly_means, pollutant_correlations,
    pollutant_statistics, rank_cities, station_markers, threshold_exceedances, yearly_means,
};
pub use grade::{IndexCategory, Severity, categorize};
pub use index::{calculate_pollution_index, compute_city_index};
