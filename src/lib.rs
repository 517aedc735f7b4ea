pub mod analyzers;
pub mod dataset;
pub mod fetch;
pub mod filter;
pub mod normalizer;
pub mod output;
pub mod parser;
pub mod reference;
pub mod stats;

#[cfg(test)]
mod testing;

pub use analyzers::{calculate_pollution_index, compute_city_index};
pub use dataset::{CleanedDataset, DatasetCache, load_and_clean};
pub use filter::{DatasetFilter, FilteredView, RecencyMode};
pub use reference::{PollutantCode, ReferenceData};
