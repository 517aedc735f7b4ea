//! CLI entry point for the air-quality explorer.
//!
//! Loads and cleans the measurement export once, applies the requested
//! filters and prints the selected aggregate as JSON.

use airq_explorer::analyzers::{
    compute_city_index, executive_summary, health_risks, monthly_means, pollutant_correlations,
    pollutant_statistics, rank_cities, station_markers, threshold_exceedances, yearly_means,
};
use airq_explorer::dataset::load_and_clean;
use airq_explorer::filter::{DatasetFilter, RecencyMode, available_cities};
use airq_explorer::output::{export_csv, print_json, print_pretty};
use airq_explorer::reference::{PollutantCode, ReferenceData};
use airq_explorer::stats::{DataVolume, DatasetSummary};
use anyhow::Result;
use chrono::{Datelike, NaiveDate, Utc};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::json;
use std::ffi::OsStr;
use std::path::Path;
use tracing::{info, warn};
use tracing_subscriber::{
    EnvFilter, Layer,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
};

const DEFAULT_SOURCE: &str = "qualite-de-lair-france.csv";

#[derive(Parser)]
#[command(name = "airq_explorer")]
#[command(about = "Explore French air-quality measurements", long_about = None)]
struct Cli {
    /// Path or URL of the semicolon-separated measurement file
    /// [default: $AIRQ_SOURCE or qualite-de-lair-france.csv]
    #[arg(short, long, global = true, value_name = "FILE_OR_URL")]
    source: Option<String>,

    /// JSON file overriding the built-in reference data [default: $AIRQ_REFERENCE_PATH]
    #[arg(long, global = true)]
    reference: Option<String>,

    /// Year used to decide which measurements are recent (default: current year)
    #[arg(long, global = true, value_parser = clap::value_parser!(i32).range(1900..=9999))]
    as_of_year: Option<i32>,

    #[command(flatten)]
    filters: FilterArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct FilterArgs {
    /// Keep all, only recent or only historical measurements
    #[arg(long, global = true, value_enum, default_value_t = RecencyArg::All)]
    recency: RecencyArg,

    /// Only keep the major metropolitan areas
    #[arg(long, global = true, default_value_t = false)]
    major_only: bool,

    /// Pollutant code to keep (repeatable), e.g. NO2, PM2.5
    #[arg(long = "pollutant", global = true)]
    pollutants: Vec<PollutantCode>,

    /// Canonical city name to keep (repeatable)
    #[arg(long = "city", global = true)]
    cities: Vec<String>,

    /// First day to include (YYYY-MM-DD)
    #[arg(long, global = true)]
    from: Option<NaiveDate>,

    /// Last day to include (YYYY-MM-DD)
    #[arg(long, global = true)]
    to: Option<NaiveDate>,
}

#[derive(Clone, Copy, ValueEnum)]
enum RecencyArg {
    All,
    Recent,
    Historical,
}

impl FilterArgs {
    fn to_filter(&self) -> DatasetFilter {
        let date_range = match (self.from, self.to) {
            (None, None) => None,
            (from, to) => Some((from.unwrap_or(NaiveDate::MIN), to.unwrap_or(NaiveDate::MAX))),
        };

        DatasetFilter {
            recency: match self.recency {
                RecencyArg::All => RecencyMode::All,
                RecencyArg::Recent => RecencyMode::Recent,
                RecencyArg::Historical => RecencyMode::Historical,
            },
            major_cities_only: self.major_only,
            pollutants: self.pollutants.clone(),
            cities: self.cities.clone(),
            date_range,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Dataset coverage, cleaning report and headline figures
    Summary,
    /// Rank cities by composite pollution index
    Rank {
        /// Number of cities to show
        #[arg(short = 'n', long, default_value_t = 10)]
        top: usize,
    },
    /// Composite pollution index for one city
    Index {
        /// Canonical city name, e.g. PARIS
        city: String,
    },
    /// Per-pollutant distribution statistics
    Pollutants,
    /// Health-risk table and threshold exceedances for high-impact pollutants
    Health {
        /// Use stricter thresholds for sensitive populations
        #[arg(long, default_value_t = false)]
        sensitive: bool,
    },
    /// One marker per station with its readings and severity colour
    Stations,
    /// Correlation matrix between pollutants over (city, day) pairs
    Correlations,
    /// Monthly (or yearly) mean concentration per pollutant
    Trend {
        #[arg(long, default_value_t = false)]
        yearly: bool,
    },
    /// List available cities
    Cities {
        /// Case-insensitive substring to search for
        #[arg(long)]
        search: Option<String>,
    },
    /// Write the filtered measurements to a CSV file
    Export {
        #[arg(short, long, default_value = "qualite_air_export.csv")]
        output: String,

        /// Gzip compress the export
        #[arg(long, default_value_t = false)]
        gzip: bool,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok(); // Load .env file

    // Logging setup: colored stderr + JSON rolling log file
    let log_file_path =
        std::env::var("LOG_FILE_PATH").unwrap_or_else(|_| "logs/airq_explorer.log".to_string());
    let log_dir = Path::new(&log_file_path)
        .parent()
        .unwrap_or(Path::new("logs"));
    let log_file_name = Path::new(&log_file_path)
        .file_name()
        .unwrap_or(OsStr::new("airq_explorer.log"));

    let file_appender = tracing_appender::rolling::daily(log_dir, log_file_name);
    let (non_blocking_file, _file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_ansi(true)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::from_env("RUST_LOG").add_directive("info".parse()?));

    let json_layer = fmt::layer()
        .json()
        .with_current_span(true)
        .with_span_list(true)
        .with_writer(non_blocking_file)
        .with_filter(EnvFilter::from_env("RUST_LOG_JSON").add_directive("debug".parse()?));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let cli = Cli::parse();

    let reference_path = cli
        .reference
        .clone()
        .or_else(|| std::env::var("AIRQ_REFERENCE_PATH").ok());
    let reference = match reference_path {
        Some(path) => {
            info!(path = %path, "Loading reference data");
            ReferenceData::load(&path)?
        }
        None => ReferenceData::default(),
    };

    let source = cli
        .source
        .clone()
        .or_else(|| std::env::var("AIRQ_SOURCE").ok())
        .unwrap_or_else(|| DEFAULT_SOURCE.to_string());
    let as_of_year = cli.as_of_year.unwrap_or_else(|| Utc::now().year());

    let dataset = load_and_clean(&source, &reference, as_of_year)?;
    let filter = cli.filters.to_filter();
    let view = filter.apply(&dataset, &reference);

    match DataVolume::classify(view.len()) {
        DataVolume::Empty => warn!("No measurements match the current filters"),
        DataVolume::Limited(n) => warn!(measurements = n, "Limited data for the current filters"),
        DataVolume::Sufficient(n) => info!(measurements = n, "Filters applied"),
    }

    match cli.command {
        Commands::Summary => {
            let full = DatasetSummary::from_view(&dataset.view());
            let filtered = DatasetSummary::from_view(&view);
            print_pretty(&filtered);
            print_json(&json!({
                "cleaning": dataset.report(),
                "dataset": full,
                "filtered": filtered,
                "headline": executive_summary(&view, &reference),
            }))?;
        }
        Commands::Rank { top } => {
            let ranking = rank_cities(&view, &reference);
            info!(cities = ranking.len(), "City ranking computed");
            let shown: Vec<_> = ranking.into_iter().take(top).collect();
            print_json(&shown)?;
        }
        Commands::Index { city } => {
            let pollutants = (!filter.pollutants.is_empty()).then_some(filter.pollutants.as_slice());
            match compute_city_index(&view, &city, pollutants, &reference) {
                Some(index) => print_json(&index)?,
                None => warn!(city = %city, "No data to compute an index for this city"),
            }
        }
        Commands::Pollutants => {
            print_json(&pollutant_statistics(&view, &reference))?;
        }
        Commands::Health { sensitive } => {
            print_json(&json!({
                "sensitive": sensitive,
                "risks": health_risks(&view, &reference, sensitive),
                "exceedances": threshold_exceedances(&view, &reference, sensitive, &filter.cities),
            }))?;
        }
        Commands::Stations => {
            print_json(&station_markers(&view, &reference, &filter.pollutants))?;
        }
        Commands::Correlations => match pollutant_correlations(&view, &filter.pollutants) {
            Some(matrix) => print_json(&matrix)?,
            None => warn!("Not enough common data to compute correlations; widen the filters"),
        },
        Commands::Trend { yearly } => {
            let series = if yearly {
                yearly_means(&view)
            } else {
                monthly_means(&view)
            };
            print_json(&series)?;
        }
        Commands::Cities { search } => {
            let cities =
                available_cities(&dataset, &reference, filter.major_cities_only, search.as_deref());
            print_json(&cities)?;
        }
        Commands::Export { output, gzip } => {
            export_csv(&view, &output, gzip)?;
        }
    }

    Ok(())
}
