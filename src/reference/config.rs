use anyhow::{Context, Result, bail};
use std::path::Path;

use super::ReferenceData;

impl ReferenceData {
    /// Loads reference data from a JSON file at `path`.
    ///
    /// Top-level keys that are absent keep their built-in values, so a file
    /// can override just the pollutant table or just the city lists:
    /// ```json
    /// {
    ///   "pollutants": {
    ///     "PM2.5": { "good": 15, "moderate": 25, "weight": 1.5 },
    ///     "NO2":   { "good": 25, "moderate": 50, "weight": 1.3 }
    ///   },
    ///   "district_aliases": [{ "root": "PARIS" }, { "root": "TOULOUSE" }]
    /// }
    /// ```
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read reference data '{}'", path.display()))?;
        Self::from_json(&content)
            .with_context(|| format!("invalid reference data in '{}'", path.display()))
    }

    /// Parses and validates reference data from a JSON string.
    pub fn from_json(content: &str) -> Result<Self> {
        let reference: ReferenceData = serde_json::from_str(content)?;
        reference.validate()?;
        Ok(reference)
    }

    /// Rejects tables that would make normalization divide by zero or
    /// produce negative weights.
    pub fn validate(&self) -> Result<()> {
        for (code, entry) in &self.pollutants {
            if !(entry.moderate.is_finite() && entry.moderate > 0.0) {
                bail!("{code}: moderate threshold must be a positive number");
            }
            if !(entry.weight.is_finite() && entry.weight >= 0.0) {
                bail!("{code}: weight must be a non-negative number");
            }
            if entry.good > entry.moderate {
                bail!("{code}: good threshold exceeds moderate threshold");
            }
        }

        let policy = &self.policy;
        if policy.moderate_threshold > policy.high_threshold {
            bail!("index moderate threshold exceeds high threshold");
        }
        if policy.max_normalized_score <= 0.0 || policy.anchor_score <= 0.0 {
            bail!("index scores must be positive");
        }
        if !(self.sensitive_population_factor > 0.0) {
            bail!("sensitive population factor must be positive");
        }

        Ok(())
    }
}
