use serde::Serialize;

use crate::reference::IndexPolicy;

/// Qualitative bucket for a composite pollution index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum IndexCategory {
    Good,
    Moderate,
    High,
}

impl IndexCategory {
    pub fn label(&self) -> &'static str {
        match self {
            IndexCategory::Good => "Good",
            IndexCategory::Moderate => "Moderate",
            IndexCategory::High => "High",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            IndexCategory::Good => "#28a745",
            IndexCategory::Moderate => "#ffc107",
            IndexCategory::High => "#dc3545",
        }
    }
}

/// Converts a composite index into a category.
///
/// | Range                         | Category |
/// |-------------------------------|----------|
/// | < moderate_threshold (50)     | Good     |
/// | < high_threshold (100)        | Moderate |
/// | >= high_threshold             | High     |
pub fn categorize(index: f64, policy: &IndexPolicy) -> IndexCategory {
    match index {
        i if i < policy.moderate_threshold => IndexCategory::Good,
        i if i < policy.high_threshold => IndexCategory::Moderate,
        _ => IndexCategory::High,
    }
}

/// Severity of a single concentration against a pollutant's thresholds.
/// Drives station marker colours and health-risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Severity {
    Low,
    Moderate,
    High,
}

impl Severity {
    /// Marker colour name.
    pub fn color(&self) -> &'static str {
        match self {
            Severity::Low => "green",
            Severity::Moderate => "orange",
            Severity::High => "red",
        }
    }
}

/// Buckets `value` against `good` and `moderate` thresholds.
pub fn severity(value: f64, good: f64, moderate: f64) -> Severity {
    match value {
        v if v < good => Severity::Low,
        v if v < moderate => Severity::Moderate,
        _ => Severity::High,
    }
}
