//! Dashboard filters and the borrowed views they produce.

use chrono::NaiveDate;
use std::collections::BTreeSet;

use crate::dataset::CleanedDataset;
use crate::normalizer::CleanedMeasurement;
use crate::reference::{PollutantCode, ReferenceData};

/// Which part of the dataset to keep by recency.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RecencyMode {
    #[default]
    All,
    Recent,
    Historical,
}

/// A set of filters. Empty lists mean "no restriction".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatasetFilter {
    pub recency: RecencyMode,
    pub major_cities_only: bool,
    pub pollutants: Vec<PollutantCode>,
    /// Canonical city names. Matched after uppercasing.
    pub cities: Vec<String>,
    /// Inclusive date range. Rows without a date never match.
    pub date_range: Option<(NaiveDate, NaiveDate)>,
}

impl DatasetFilter {
    /// Returns the rows of `dataset` that pass every filter, in dataset order.
    pub fn apply<'a>(&self, dataset: &'a CleanedDataset, reference: &ReferenceData) -> FilteredView<'a> {
        let cities: Vec<String> = self.cities.iter().map(|c| c.to_uppercase()).collect();

        let rows = dataset
            .rows()
            .iter()
            .filter(|row| self.matches(row, &cities, reference))
            .collect();

        FilteredView { rows }
    }

    fn matches(&self, row: &CleanedMeasurement, cities: &[String], reference: &ReferenceData) -> bool {
        let recency_ok = match self.recency {
            RecencyMode::All => true,
            RecencyMode::Recent => row.is_recent,
            RecencyMode::Historical => !row.is_recent,
        };
        if !recency_ok {
            return false;
        }

        if self.major_cities_only && !reference.is_major_city(&row.city_normalized) {
            return false;
        }

        if !self.pollutants.is_empty() && !self.pollutants.contains(&row.pollutant) {
            return false;
        }

        if !cities.is_empty() && !cities.iter().any(|c| *c == row.city_normalized) {
            return false;
        }

        match self.date_range {
            Some((from, to)) => row.date.is_some_and(|d| from <= d && d <= to),
            None => true,
        }
    }
}

/// Read-only selection of rows borrowed from a [`CleanedDataset`].
#[derive(Debug, Clone, Default)]
pub struct FilteredView<'a> {
    rows: Vec<&'a CleanedMeasurement>,
}

impl<'a> FilteredView<'a> {
    pub fn new(rows: Vec<&'a CleanedMeasurement>) -> Self {
        Self { rows }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a CleanedMeasurement> + '_ {
        self.rows.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows for one canonical city.
    pub fn for_city(&self, city: &str) -> impl Iterator<Item = &'a CleanedMeasurement> + '_ {
        let city = city.to_uppercase();
        self.iter().filter(move |row| row.city_normalized == city)
    }

    /// Distinct canonical cities, sorted.
    pub fn cities(&self) -> BTreeSet<&'a str> {
        self.iter().map(|row| row.city_normalized.as_str()).collect()
    }

    /// Distinct pollutants, in code order.
    pub fn pollutants(&self) -> BTreeSet<PollutantCode> {
        self.iter().map(|row| row.pollutant).collect()
    }
}

/// Cities offered by the city picker: every canonical city, or only the
/// major ones, optionally narrowed by a case-insensitive substring search.
pub fn available_cities(
    dataset: &CleanedDataset,
    reference: &ReferenceData,
    major_only: bool,
    search: Option<&str>,
) -> Vec<String> {
    let needle = search.map(str::to_uppercase).filter(|s| !s.is_empty());

    dataset
        .rows()
        .iter()
        .map(|row| row.city_normalized.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter(|city| !major_only || reference.is_major_city(city))
        .filter(|city| needle.as_deref().is_none_or(|n| city.contains(n)))
        .map(String::from)
        .collect()
}
