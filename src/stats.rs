use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use std::collections::BTreeSet;

use crate::filter::FilteredView;

/// Below this many rows a view is flagged as having limited data.
pub const MIN_DATA_WARNING_THRESHOLD: usize = 100;

/// How much data a view holds, for empty-state and warning banners.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DataVolume {
    Empty,
    Limited(usize),
    Sufficient(usize),
}

impl DataVolume {
    pub fn classify(rows: usize) -> Self {
        match rows {
            0 => DataVolume::Empty,
            n if n < MIN_DATA_WARNING_THRESHOLD => DataVolume::Limited(n),
            n => DataVolume::Sufficient(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateSpan {
    pub first: NaiveDate,
    pub last: NaiveDate,
}

/// Coverage figures for a view: row, station and city counts, the date
/// span and the most recent update.
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct DatasetSummary {
    pub measurements: usize,
    pub stations: usize,
    pub cities: usize,
    pub pollutants: usize,
    pub recent: usize,
    pub dated: usize,
    pub span: Option<DateSpan>,
    pub last_updated: Option<DateTime<Utc>>,
}

impl DatasetSummary {
    pub fn from_view(view: &FilteredView<'_>) -> Self {
        let mut s = DatasetSummary {
            measurements: view.len(),
            ..Default::default()
        };

        let mut stations = BTreeSet::new();
        let mut first: Option<NaiveDate> = None;
        let mut last: Option<NaiveDate> = None;

        for row in view.iter() {
            if let Some(location) = row.location.as_deref() {
                stations.insert(location);
            }

            if row.is_recent {
                s.recent += 1;
            }

            if let Some(date) = row.date {
                s.dated += 1;
                first = Some(first.map_or(date, |f| f.min(date)));
                last = Some(last.map_or(date, |l| l.max(date)));
            }

            if row.timestamp > s.last_updated {
                s.last_updated = row.timestamp;
            }
        }

        s.stations = stations.len();
        s.cities = view.cities().len();
        s.pollutants = view.pollutants().len();
        s.span = first.zip(last).map(|(first, last)| DateSpan { first, last });
        s
    }

    pub fn pct(part: usize, total: usize) -> f64 {
        if total == 0 {
            0.0
        } else {
            (part as f64 / total as f64) * 100.0
        }
    }

    pub fn recent_pct(&self) -> f64 {
        Self::pct(self.recent, self.measurements)
    }

    pub fn volume(&self) -> DataVolume {
        DataVolume::classify(self.measurements)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::CleanedDataset;
    use crate::reference::PollutantCode;
    use crate::testing::measurement;

    #[test]
    fn test_pct_with_zero_total() {
        assert_eq!(DatasetSummary::pct(10, 0), 0.0);
    }

    #[test]
    fn test_pct_normal_values() {
        assert_eq!(DatasetSummary::pct(50, 100), 50.0);
        assert_eq!(DatasetSummary::pct(1, 4), 25.0);
    }

    #[test]
    fn test_data_volume_boundaries() {
        assert_eq!(DataVolume::classify(0), DataVolume::Empty);
        assert_eq!(DataVolume::classify(1), DataVolume::Limited(1));
        assert_eq!(DataVolume::classify(99), DataVolume::Limited(99));
        assert_eq!(DataVolume::classify(100), DataVolume::Sufficient(100));
    }

    #[test]
    fn test_summary_of_empty_view() {
        let summary = DatasetSummary::from_view(&FilteredView::default());
        assert_eq!(summary, DatasetSummary::default());
        assert_eq!(summary.volume(), DataVolume::Empty);
        assert_eq!(summary.recent_pct(), 0.0);
    }

    #[test]
    fn test_summary_counts() {
        let ds = CleanedDataset::from_rows(vec![
            measurement("PARIS", PollutantCode::No2, 40.0, Some((2025, 3, 10))),
            measurement("PARIS", PollutantCode::Pm10, 20.0, Some((2023, 1, 5))),
            measurement("LYON", PollutantCode::No2, 30.0, Some((2024, 11, 2))),
            measurement("NICE", PollutantCode::O3, 70.0, None),
        ]);
        let summary = DatasetSummary::from_view(&ds.view());

        assert_eq!(summary.measurements, 4);
        assert_eq!(summary.stations, 3);
        assert_eq!(summary.cities, 3);
        assert_eq!(summary.pollutants, 3);
        assert_eq!(summary.recent, 2);
        assert_eq!(summary.dated, 3);
        assert_eq!(summary.recent_pct(), 50.0);
        assert_eq!(
            summary.span,
            Some(DateSpan {
                first: NaiveDate::from_ymd_opt(2023, 1, 5).unwrap(),
                last: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            })
        );
        assert_eq!(summary.last_updated.unwrap().date_naive(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert_eq!(summary.volume(), DataVolume::Limited(4));
    }
}
