//! Loading, cleaning and caching of the measurement dataset.

use anyhow::Result;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

use crate::fetch::read_source;
use crate::filter::FilteredView;
use crate::normalizer::{CleanedMeasurement, CleaningReport, Normalizer, log_report};
use crate::parser::parse_measurements;
use crate::reference::ReferenceData;

/// The cleaned measurement set. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct CleanedDataset {
    rows: Vec<CleanedMeasurement>,
    report: CleaningReport,
}

impl CleanedDataset {
    /// Wraps rows that are already clean.
    pub fn from_rows(rows: Vec<CleanedMeasurement>) -> Self {
        let report = CleaningReport {
            input_rows: rows.len(),
            kept: rows.len(),
            ..Default::default()
        };
        Self { rows, report }
    }

    pub fn rows(&self) -> &[CleanedMeasurement] {
        &self.rows
    }

    pub fn report(&self) -> &CleaningReport {
        &self.report
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Unfiltered view over every row.
    pub fn view(&self) -> FilteredView<'_> {
        FilteredView::new(self.rows.iter().collect())
    }
}

/// Decodes and cleans raw file content. Never fails; unusable content
/// produces an empty dataset.
pub fn clean_bytes(bytes: &[u8], reference: &ReferenceData, as_of_year: i32) -> CleanedDataset {
    let parsed = parse_measurements(bytes);
    let normalized = Normalizer::new(reference, as_of_year).normalize(parsed.rows);

    let mut report = normalized.report;
    report.malformed_records = parsed.malformed;
    report.input_rows += parsed.malformed;
    log_report(&report);

    CleanedDataset {
        rows: normalized.rows,
        report,
    }
}

/// Reads `source` (a local path or an `http(s)` URL) and cleans it.
///
/// # Errors
///
/// Only when the source cannot be read. Malformed content is filtered, not
/// rejected.
#[tracing::instrument(skip(source, reference), fields(source = %source))]
pub fn load_and_clean(source: &str, reference: &ReferenceData, as_of_year: i32) -> Result<CleanedDataset> {
    let bytes = read_source(source)?;
    debug!(bytes = bytes.len(), "Source read");
    Ok(clean_bytes(&bytes, reference, as_of_year))
}

/// Shares one cleaned dataset per distinct source content.
///
/// Entries are keyed by the raw bytes themselves, so reloading an unchanged
/// file returns the existing `Arc` and any change, however small, is
/// cleaned afresh.
pub struct DatasetCache {
    reference: Arc<ReferenceData>,
    as_of_year: i32,
    entries: Mutex<HashMap<Box<[u8]>, Arc<CleanedDataset>>>,
}

impl DatasetCache {
    pub fn new(reference: Arc<ReferenceData>, as_of_year: i32) -> Self {
        Self {
            reference,
            as_of_year,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    /// Returns the cached dataset for `bytes`, cleaning it on first sight.
    pub fn get_or_load(&self, bytes: &[u8]) -> Arc<CleanedDataset> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(dataset) = entries.get(bytes) {
            debug!(bytes = bytes.len(), "Dataset cache hit");
            return Arc::clone(dataset);
        }

        info!(bytes = bytes.len(), "Dataset cache miss, cleaning source");
        let dataset = Arc::new(clean_bytes(bytes, &self.reference, self.as_of_year));
        entries.insert(Box::from(bytes), Arc::clone(&dataset));
        dataset
    }

    /// Reads `source` and returns its cached dataset.
    pub fn load(&self, source: &str) -> Result<Arc<CleanedDataset>> {
        let bytes = read_source(source)?;
        Ok(self.get_or_load(&bytes))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every cached dataset. Views already handed out stay valid.
    pub fn clear(&self) {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
Country Code;City;Location;Coordinates;Pollutant;Source Name;Unit;Value;Last Updated;Country Label
FR;Paris;Paris 13e;48.83, 2.36;NO2;EEA;µg/m³;32.5;2025-05-01T10:00:00+00:00;France
FR;FR04001;FR04001;48.0, 2.0;NO2;EEA;µg/m³;10;2025-05-01T10:00:00+00:00;France
FR;Lyon;Lyon Est;45.76, 4.85;BENZENE;EEA;µg/m³;3;2025-05-01T10:00:00+00:00;France
";

    #[test]
    fn test_clean_bytes() {
        let ds = clean_bytes(CSV.as_bytes(), &ReferenceData::default(), 2025);
        assert_eq!(ds.len(), 1);
        assert_eq!(ds.rows()[0].city_normalized, "PARIS");
        assert_eq!(ds.report().input_rows, 3);
        assert_eq!(ds.report().invalid_city, 1);
        assert_eq!(ds.report().unknown_pollutant, 1);
    }

    #[test]
    fn test_unparseable_content_is_empty_dataset() {
        let reference = ReferenceData::default();
        assert!(clean_bytes(b"", &reference, 2025).is_empty());
        assert!(clean_bytes(b"not;a;dataset\n1;2;3\n", &reference, 2025).is_empty());
    }

    #[test]
    fn test_cache_shares_dataset_for_same_content() {
        let cache = DatasetCache::new(Arc::new(ReferenceData::default()), 2025);
        let first = cache.get_or_load(CSV.as_bytes());
        let second = cache.get_or_load(CSV.as_bytes());

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_reloads_changed_content() {
        let cache = DatasetCache::new(Arc::new(ReferenceData::default()), 2025);
        let first = cache.get_or_load(CSV.as_bytes());
        let changed = format!("{CSV}FR;Nice;Nice Port;43.7, 7.2;O3;EEA;µg/m³;80;2025-05-01;France\n");
        let second = cache.get_or_load(changed.as_bytes());

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(second.len(), 2);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
        assert_eq!(first.len(), 1);
    }

    #[test]
    fn test_cache_distinguishes_same_length_content() {
        let cache = DatasetCache::new(Arc::new(ReferenceData::default()), 2025);
        let edited = CSV.replace("32.5", "42.5");
        assert_eq!(edited.len(), CSV.len());

        let first = cache.get_or_load(CSV.as_bytes());
        let second = cache.get_or_load(edited.as_bytes());

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(first.rows()[0].value, 32.5);
        assert_eq!(second.rows()[0].value, 42.5);
        assert_eq!(cache.len(), 2);
    }

    #[derive(Clone, Default)]
    struct CapturedLog(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLog {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_load_span_records_as_of_year() {
        let path = std::env::temp_dir().join("airq_explorer_span_source.csv");
        std::fs::write(&path, CSV).unwrap();

        let log = CapturedLog::default();
        let writer = log.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            load_and_clean(path.to_str().unwrap(), &ReferenceData::default(), 2025).unwrap();
        });
        std::fs::remove_file(&path).unwrap();

        let text = String::from_utf8(log.0.lock().unwrap().clone()).unwrap();
        assert!(text.contains("as_of_year=2025"), "{text}");
    }

    #[test]
    fn test_load_and_clean_missing_file_errors() {
        let path = std::env::temp_dir().join("airq_explorer_missing_source.csv");
        let _ = std::fs::remove_file(&path);
        let result = load_and_clean(path.to_str().unwrap(), &ReferenceData::default(), 2025);
        assert!(result.is_err());
    }
}
