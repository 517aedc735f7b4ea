use chrono::NaiveDate;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

use crate::analyzers::grade::{Severity, severity};
use crate::analyzers::index::compute_city_index;
use crate::analyzers::types::{
    CityRanking, CorrelationMatrix, ExecutiveSummary, Exceedance, HealthRisk, PeriodMean,
    PollutantStatistics, StationMarker, StationReading,
};
use crate::analyzers::utility::{argmax, group_means, mean, median, pearson, round1, stddev};
use crate::filter::FilteredView;
use crate::reference::{PollutantCode, ReferenceData};

/// Maximum number of rows in the health-risk table.
pub const HEALTH_TABLE_LIMIT: usize = 15;

/// Cities named in an alert scope before it is cut short with "...".
pub const MAX_CITIES_IN_ALERT: usize = 3;

/// A correlation matrix needs strictly more complete rows than this.
pub const MIN_CORRELATION_SAMPLES: usize = 10;

/// Number of pollutants in play: the explicit selection, or every pollutant
/// in `view` when nothing is selected.
fn selected_count(view: &FilteredView<'_>, selected: &[PollutantCode]) -> usize {
    if selected.is_empty() {
        view.pollutants().len()
    } else {
        selected.len()
    }
}

/// Composite index for every city in `view`, highest first.
///
/// Cities whose pollutants are all missing from the reference table are
/// left out. Ties are ordered by city name.
pub fn rank_cities(view: &FilteredView<'_>, reference: &ReferenceData) -> Vec<CityRanking> {
    let mut ranking: Vec<CityRanking> = view
        .cities()
        .into_iter()
        .filter_map(|city| compute_city_index(view, city, None, reference))
        .map(|idx| CityRanking {
            city: idx.city,
            index: idx.index,
            category: idx.category,
            measurements: idx.measurements,
        })
        .collect();

    ranking.sort_by(|a, b| b.index.total_cmp(&a.index).then_with(|| a.city.cmp(&b.city)));
    debug!(cities = ranking.len(), "Ranked cities");
    ranking
}

/// Headline figures for `view`, or `None` when it is empty.
pub fn executive_summary(view: &FilteredView<'_>, reference: &ReferenceData) -> Option<ExecutiveSummary> {
    let by_city = group_means(view.iter().map(|row| (row.city_normalized.as_str(), row.value)));
    let by_pollutant = group_means(view.iter().map(|row| (row.pollutant, row.value)));

    let (city, city_value) = argmax(&by_city)?;
    let (pollutant, pollutant_value) = argmax(&by_pollutant)?;

    let values: Vec<f64> = view.iter().map(|row| row.value).collect();

    Some(ExecutiveSummary {
        most_polluted_city: city.to_string(),
        most_polluted_value: city_value,
        dominant_pollutant: pollutant,
        dominant_pollutant_value: pollutant_value,
        overall_mean: mean(&values),
        city_index: compute_city_index(view, city, None, reference),
        measurements: view.len(),
    })
}

/// Count, mean, median, sample standard deviation, min, max and moderate
/// threshold per pollutant.
pub fn pollutant_statistics(view: &FilteredView<'_>, reference: &ReferenceData) -> Vec<PollutantStatistics> {
    view.pollutants()
        .into_iter()
        .map(|code| {
            let series: Vec<f64> = view
                .iter()
                .filter(|row| row.pollutant == code)
                .map(|row| row.value)
                .collect();
            let avg = mean(&series);
            let info = reference.info(code);

            PollutantStatistics {
                pollutant: code,
                name: info.name,
                color: info.color,
                count: series.len(),
                mean: avg,
                median: median(&series),
                stddev: stddev(&series, avg),
                min: series.iter().copied().fold(f64::INFINITY, f64::min),
                max: series.iter().copied().fold(f64::NEG_INFINITY, f64::max),
                moderate_threshold: reference.pollutant(code).map(|entry| entry.moderate),
            }
        })
        .collect()
}

/// Mean per (year, month, pollutant), in chronological order. Undated rows
/// are skipped.
pub fn monthly_means(view: &FilteredView<'_>) -> Vec<PeriodMean> {
    let groups = group_means(view.iter().filter_map(|row| {
        let year = row.year?;
        let month = row.month?;
        Some(((year, month, row.pollutant), row.value))
    }));

    groups
        .into_iter()
        .map(|((year, month, pollutant), acc)| PeriodMean {
            year,
            month: Some(month),
            pollutant,
            mean: acc.mean(),
            count: acc.count,
        })
        .collect()
}

/// Mean per (year, pollutant), in chronological order. Undated rows are skipped.
pub fn yearly_means(view: &FilteredView<'_>) -> Vec<PeriodMean> {
    let groups = group_means(
        view.iter()
            .filter_map(|row| Some(((row.year?, row.pollutant), row.value))),
    );

    groups
        .into_iter()
        .map(|((year, pollutant), acc)| PeriodMean {
            year,
            month: None,
            pollutant,
            mean: acc.mean(),
            count: acc.count,
        })
        .collect()
}

/// One marker per (lat, lon, city, location) station, carrying every
/// reading taken there.
///
/// The marker colour uses the thresholds of the dominant (highest reading)
/// pollutant. With a single pollutant selected it grades the highest
/// reading, otherwise the station mean. A station with no positive reading
/// has no dominant pollutant and is graded moderate.
pub fn station_markers(
    view: &FilteredView<'_>,
    reference: &ReferenceData,
    selected: &[PollutantCode],
) -> Vec<StationMarker> {
    let single_pollutant = selected_count(view, selected) == 1;
    let mut markers: Vec<StationMarker> = Vec::new();
    let mut slots = BTreeMap::new();

    for row in view.iter() {
        let key = (
            row.latitude.to_bits(),
            row.longitude.to_bits(),
            row.city.as_str(),
            row.location.as_deref(),
        );
        let slot = *slots.entry(key).or_insert_with(|| {
            markers.push(StationMarker {
                latitude: row.latitude,
                longitude: row.longitude,
                city: row.city.clone(),
                location: row.location.clone(),
                readings: Vec::new(),
                dominant_pollutant: None,
                max_value: 0.0,
                mean: 0.0,
                last_updated: None,
                severity: Severity::Moderate,
            });
            markers.len() - 1
        });

        let marker = &mut markers[slot];
        let (good, moderate) = reference.thresholds(row.pollutant);
        marker.readings.push(StationReading {
            pollutant: row.pollutant,
            value: row.value,
            severity: severity(row.value, good, moderate),
        });
        if row.value > marker.max_value {
            marker.max_value = row.value;
            marker.dominant_pollutant = Some(row.pollutant);
        }
        if row.timestamp > marker.last_updated {
            marker.last_updated = row.timestamp;
        }
    }

    for marker in &mut markers {
        let values: Vec<f64> = marker.readings.iter().map(|r| r.value).collect();
        marker.mean = mean(&values);

        if let Some(code) = marker.dominant_pollutant {
            let (good, moderate) = reference.thresholds(code);
            let graded = if single_pollutant { marker.max_value } else { marker.mean };
            marker.severity = severity(graded, good, moderate);
        }
    }

    markers
}

/// Display label for the cities an alert applies to: the first
/// [`MAX_CITIES_IN_ALERT`] names joined by commas, with "..." when more were
/// selected. `None` for an empty selection.
pub fn alert_scope(cities: &[String]) -> Option<String> {
    if cities.is_empty() {
        return None;
    }

    let mut scope = cities
        .iter()
        .take(MAX_CITIES_IN_ALERT)
        .map(String::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    if cities.len() > MAX_CITIES_IN_ALERT {
        scope.push_str("...");
    }
    Some(scope)
}

/// Mean concentration of the high-impact pollutants per city, highest
/// first, capped at [`HEALTH_TABLE_LIMIT`] rows.
///
/// Risk levels use the pollutant thresholds scaled down by the
/// sensitive-population factor when `sensitive` is set.
pub fn health_risks(view: &FilteredView<'_>, reference: &ReferenceData, sensitive: bool) -> Vec<HealthRisk> {
    let factor = reference.threshold_factor(sensitive);
    let groups = group_means(
        view.iter()
            .filter(|row| reference.high_impact.contains(&row.pollutant))
            .map(|row| ((row.city_normalized.as_str(), row.pollutant), row.value)),
    );

    let mut rows: Vec<(f64, HealthRisk)> = groups
        .into_iter()
        .map(|((city, pollutant), acc)| {
            let avg = acc.mean();
            let (good, moderate) = reference.thresholds(pollutant);
            let risk = HealthRisk {
                city: city.to_string(),
                pollutant,
                mean: round1(avg),
                risk: severity(avg, good * factor, moderate * factor),
            };
            (avg, risk)
        })
        .collect();

    rows.sort_by(|a, b| b.0.total_cmp(&a.0));
    rows.into_iter()
        .take(HEALTH_TABLE_LIMIT)
        .map(|(_, risk)| risk)
        .collect()
}

/// Alert pollutants whose mean over `view` exceeds their moderate threshold
/// (scaled for sensitive populations when requested). Each exceedance is
/// labelled with the selected `cities`.
pub fn threshold_exceedances(
    view: &FilteredView<'_>,
    reference: &ReferenceData,
    sensitive: bool,
    cities: &[String],
) -> Vec<Exceedance> {
    let factor = reference.threshold_factor(sensitive);
    let scope = alert_scope(cities);

    reference
        .alert_pollutants
        .iter()
        .filter_map(|&code| {
            let series: Vec<f64> = view
                .iter()
                .filter(|row| row.pollutant == code)
                .map(|row| row.value)
                .collect();
            if series.is_empty() {
                return None;
            }

            let avg = mean(&series);
            let (_, moderate) = reference.thresholds(code);
            let threshold = moderate * factor;
            (avg > threshold).then(|| Exceedance {
                pollutant: code,
                mean: avg,
                threshold,
                scope: scope.clone(),
            })
        })
        .collect()
}

/// Correlation between pollutants across (city, day) pairs.
///
/// Values are first averaged per canonical city, day and pollutant. Only
/// pairs with a value for every pollutant are kept. Returns `None` when
/// fewer than two pollutants are in play or at most
/// [`MIN_CORRELATION_SAMPLES`] complete pairs remain. Undated rows are
/// ignored.
pub fn pollutant_correlations(view: &FilteredView<'_>, selected: &[PollutantCode]) -> Option<CorrelationMatrix> {
    if view.is_empty() || selected_count(view, selected) < 2 {
        return None;
    }

    let cells = group_means(
        view.iter()
            .filter_map(|row| Some(((row.city_normalized.as_str(), row.date?, row.pollutant), row.value))),
    );

    let pollutants: Vec<PollutantCode> = cells
        .keys()
        .map(|&(_, _, code)| code)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect();

    let mut pivot: BTreeMap<(&str, NaiveDate), BTreeMap<PollutantCode, f64>> = BTreeMap::new();
    for (&(city, date, code), acc) in &cells {
        pivot.entry((city, date)).or_default().insert(code, acc.mean());
    }

    // Each complete row lists its values in `pollutants` order.
    let complete: Vec<Vec<f64>> = pivot
        .into_values()
        .filter(|row| row.len() == pollutants.len())
        .map(|row| row.into_values().collect())
        .collect();
    if complete.len() <= MIN_CORRELATION_SAMPLES {
        debug!(samples = complete.len(), "Not enough complete rows for correlations");
        return None;
    }

    let columns: Vec<Vec<f64>> = (0..pollutants.len())
        .map(|j| complete.iter().map(|row| row[j]).collect())
        .collect();

    let values = (0..columns.len())
        .map(|i| {
            (0..columns.len())
                .map(|j| {
                    let r = pearson(&columns[i], &columns[j]);
                    if i == j { r.map(|_| 1.0) } else { r }
                })
                .collect()
        })
        .collect();

    Some(CorrelationMatrix {
        pollutants,
        samples: complete.len(),
        values,
    })
}
