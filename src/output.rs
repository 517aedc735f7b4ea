//! Output formatting and persistence.
//!
//! Supports pretty-printing, JSON logging, and comma-separated export of a
//! filtered view.

use anyhow::{Context, Result, anyhow};
use csv::WriterBuilder;
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use crate::filter::FilteredView;
use crate::normalizer::EXPORT_COLUMNS;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty(value: &impl Debug) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json(value: &impl Serialize) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Serializes `view` as comma-separated text with a header row.
///
/// The header is always written, even for an empty view. Identical views
/// produce identical bytes.
pub fn to_csv_bytes(view: &FilteredView<'_>) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new().has_headers(false).from_writer(Vec::new());

    writer.write_record(EXPORT_COLUMNS)?;
    for row in view.iter() {
        writer.serialize(row)?;
    }
    writer.flush()?;

    writer.into_inner().map_err(|e| anyhow!("failed to finish CSV export: {e}"))
}

/// Writes `view` to `path` as CSV, gzip-compressed when `gzip` is set.
#[tracing::instrument(skip(view, path), fields(path = %path.as_ref().display(), rows = view.len()))]
pub fn export_csv(view: &FilteredView<'_>, path: impl AsRef<Path>, gzip: bool) -> Result<()> {
    let path = path.as_ref();
    let body = to_csv_bytes(view)?;

    let mut file = File::create(path).with_context(|| format!("failed to create '{}'", path.display()))?;
    if gzip {
        let mut encoder = GzEncoder::new(file, Compression::default());
        encoder.write_all(&body)?;
        encoder.finish()?.flush()?;
    } else {
        file.write_all(&body)?;
        file.flush()?;
    }

    info!(bytes = body.len(), gzip, "Export written");
    Ok(())
}
