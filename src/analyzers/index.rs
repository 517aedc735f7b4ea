use std::collections::BTreeMap;

use crate::analyzers::grade::categorize;
use crate::analyzers::types::CityPollutionIndex;
use crate::analyzers::utility::{group_means, round1};
use crate::filter::FilteredView;
use crate::normalizer::CleanedMeasurement;
use crate::reference::{IndexPolicy, PollutantCode, PollutantReference, ReferenceData};

/// Scores one concentration against its pollutant's moderate threshold.
///
/// A value on the threshold scores `policy.anchor_score` (100). Higher values
/// score proportionally more, clamped at `policy.max_normalized_score` (150).
pub fn normalized_score(value: f64, entry: &PollutantReference, policy: &IndexPolicy) -> f64 {
    ((value / entry.moderate) * policy.anchor_score).min(policy.max_normalized_score)
}

/// Weighted average of normalized scores, or `None` when no pollutant in
/// `values` has a reference entry with positive total weight.
pub fn weighted_index(values: &BTreeMap<PollutantCode, f64>, reference: &ReferenceData) -> Option<f64> {
    let mut weighted_total = 0.0;
    let mut weight_sum = 0.0;

    for (code, value) in values {
        // Pollutants without a reference entry are skipped, not counted as zero.
        let Some(entry) = reference.pollutant(*code) else {
            continue;
        };

        weighted_total += normalized_score(*value, entry, &reference.policy) * entry.weight;
        weight_sum += entry.weight;
    }

    if weight_sum == 0.0 {
        None
    } else {
        Some(round1(weighted_total / weight_sum))
    }
}

/// Composite pollution index for a mapping of pollutant → representative
/// concentration, rounded to one decimal.
///
/// Returns 0 when no pollutant overlaps the reference table. Pure: the same
/// input and table always give the same score.
pub fn calculate_pollution_index(values: &BTreeMap<PollutantCode, f64>, reference: &ReferenceData) -> f64 {
    weighted_index(values, reference).unwrap_or(0.0)
}

/// Mean concentration per pollutant over `rows`.
pub fn pollutant_means<'a, I>(rows: I) -> BTreeMap<PollutantCode, f64>
where
    I: IntoIterator<Item = &'a CleanedMeasurement>,
{
    group_means(rows.into_iter().map(|row| (row.pollutant, row.value)))
        .into_iter()
        .map(|(code, acc)| (code, acc.mean()))
        .collect()
}

/// Composite index for `city` (canonical name) within `view`, optionally
/// restricted to `pollutant_filter`.
///
/// Returns `None` ("no data") when the city has no rows in scope or none of
/// its pollutants has a reference entry. Callers can then show an empty
/// state instead of a misleading zero.
pub fn compute_city_index(
    view: &FilteredView<'_>,
    city: &str,
    pollutant_filter: Option<&[PollutantCode]>,
    reference: &ReferenceData,
) -> Option<CityPollutionIndex> {
    let rows: Vec<&CleanedMeasurement> = view
        .for_city(city)
        .filter(|row| pollutant_filter.is_none_or(|codes| codes.contains(&row.pollutant)))
        .collect();
    if rows.is_empty() {
        return None;
    }

    let values = pollutant_means(rows.iter().copied());
    let index = weighted_index(&values, reference)?;

    Some(CityPollutionIndex {
        city: city.to_uppercase(),
        values,
        index,
        category: categorize(index, &reference.policy),
        measurements: rows.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzers::grade::IndexCategory;
    use crate::dataset::CleanedDataset;
    use crate::testing::measurement;

    fn values(pairs: &[(PollutantCode, f64)]) -> BTreeMap<PollutantCode, f64> {
        pairs.iter().copied().collect()
    }

    #[test]
    fn test_index_at_moderate_thresholds_is_100() {
        let reference = ReferenceData::default();
        let input = values(&[(PollutantCode::Pm25, 25.0), (PollutantCode::No2, 50.0)]);

        let index = calculate_pollution_index(&input, &reference);
        assert_eq!(index, 100.0);
        assert_eq!(categorize(index, &reference.policy), IndexCategory::High);
    }

    #[test]
    fn test_empty_input_is_zero_and_good() {
        let reference = ReferenceData::default();
        let index = calculate_pollution_index(&BTreeMap::new(), &reference);
        assert_eq!(index, 0.0);
        assert_eq!(categorize(index, &reference.policy), IndexCategory::Good);
        assert_eq!(weighted_index(&BTreeMap::new(), &reference), None);
    }

    #[test]
    fn test_weighted_average() {
        let reference = ReferenceData::default();
        // PM2.5 at 12.5 scores 50 (weight 1.5), NO2 at 50 scores 100 (weight 1.3).
        let input = values(&[(PollutantCode::Pm25, 12.5), (PollutantCode::No2, 50.0)]);
        let expected = round1((50.0 * 1.5 + 100.0 * 1.3) / 2.8);

        assert_eq!(calculate_pollution_index(&input, &reference), expected);
        assert_eq!(expected, 73.2);
    }

    #[test]
    fn test_single_outlier_is_clamped() {
        let reference = ReferenceData::default();
        let input = values(&[(PollutantCode::So2, 900.0)]);
        assert_eq!(calculate_pollution_index(&input, &reference), 150.0);

        let mixed = values(&[(PollutantCode::So2, 900.0), (PollutantCode::O3, 0.0)]);
        let expected = round1(150.0 * 0.8 / 1.8);
        assert_eq!(calculate_pollution_index(&mixed, &reference), expected);
    }

    #[test]
    fn test_good_threshold_scores_below_100() {
        let reference = ReferenceData::default();
        for code in PollutantCode::ALL {
            let entry = reference.pollutant(code).unwrap();
            let index = calculate_pollution_index(&values(&[(code, entry.good)]), &reference);

            assert_eq!(index, round1(100.0 * entry.good / entry.moderate), "{code}");
            assert!(index < 100.0, "{code}");
        }
    }

    #[test]
    fn test_missing_reference_entries_are_excluded() {
        let mut reference = ReferenceData::default();
        reference.pollutants.remove(&PollutantCode::Co);

        let input = values(&[(PollutantCode::Co, 50_000.0), (PollutantCode::No2, 25.0)]);
        assert_eq!(calculate_pollution_index(&input, &reference), 50.0);

        let only_co = values(&[(PollutantCode::Co, 50_000.0)]);
        assert_eq!(calculate_pollution_index(&only_co, &reference), 0.0);
        assert_eq!(weighted_index(&only_co, &reference), None);
    }

    #[test]
    fn test_custom_policy_cap() {
        let mut reference = ReferenceData::default();
        reference.policy.max_normalized_score = 120.0;
        let input = values(&[(PollutantCode::No2, 500.0)]);
        assert_eq!(calculate_pollution_index(&input, &reference), 120.0);
    }

    #[test]
    fn test_input_is_not_mutated() {
        let reference = ReferenceData::default();
        let input = values(&[(PollutantCode::Pm10, 80.0)]);
        let copy = input.clone();
        let first = calculate_pollution_index(&input, &reference);
        let second = calculate_pollution_index(&input, &reference);
        assert_eq!(input, copy);
        assert_eq!(first, second);
    }

    fn dataset() -> CleanedDataset {
        CleanedDataset::from_rows(vec![
            measurement("PARIS", PollutantCode::No2, 40.0, Some((2025, 1, 1))),
            measurement("PARIS", PollutantCode::No2, 60.0, Some((2025, 1, 2))),
            measurement("PARIS", PollutantCode::Pm25, 25.0, Some((2025, 1, 2))),
            measurement("LYON", PollutantCode::O3, 90.0, Some((2025, 1, 2))),
        ])
    }

    #[test]
    fn test_compute_city_index_uses_means() {
        let ds = dataset();
        let reference = ReferenceData::default();
        let idx = compute_city_index(&ds.view(), "Paris", None, &reference).unwrap();

        assert_eq!(idx.city, "PARIS");
        assert_eq!(idx.values[&PollutantCode::No2], 50.0);
        assert_eq!(idx.values[&PollutantCode::Pm25], 25.0);
        assert_eq!(idx.index, 100.0);
        assert_eq!(idx.category, IndexCategory::High);
        assert_eq!(idx.measurements, 3);
    }

    #[test]
    fn test_compute_city_index_with_pollutant_filter() {
        let ds = dataset();
        let reference = ReferenceData::default();
        let idx = compute_city_index(&ds.view(), "PARIS", Some(&[PollutantCode::Pm25]), &reference).unwrap();

        assert_eq!(idx.values.len(), 1);
        assert_eq!(idx.measurements, 1);
    }

    #[test]
    fn test_compute_city_index_no_data() {
        let ds = dataset();
        let reference = ReferenceData::default();

        assert_eq!(compute_city_index(&ds.view(), "NICE", None, &reference), None);
        assert_eq!(
            compute_city_index(&ds.view(), "LYON", Some(&[PollutantCode::No2]), &reference),
            None
        );

        let mut sparse = ReferenceData::default();
        sparse.pollutants.remove(&PollutantCode::O3);
        assert_eq!(compute_city_index(&ds.view(), "LYON", None, &sparse), None);
    }
}
