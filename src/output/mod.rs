//! Output module for persisting harvested records
//!
//! This module handles:
//! - The `BatchSink` interface the crawl hands its records to
//! - JSON file and SQLite sinks
//! - Fanning one batch out to several sinks
//! - Crawl statistics

mod json;
mod schema;
mod sqlite_output;
pub mod stats;
mod traits;

pub use json::JsonFileSink;
pub use sqlite_output::SqliteSink;
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{BatchSink, OutputError, OutputResult};

use crate::config::OutputConfig;
use crate::extract::Record;
use std::path::Path;

/// Hands one batch to several sinks in order
///
/// Stops at the first sink that fails.
pub struct SinkChain {
    sinks: Vec<Box<dyn BatchSink>>,
}

impl SinkChain {
    pub fn new(sinks: Vec<Box<dyn BatchSink>>) -> Self {
        Self { sinks }
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl BatchSink for SinkChain {
    fn write_batch(&mut self, records: &[Record]) -> OutputResult<()> {
        for sink in &mut self.sinks {
            tracing::debug!(sink = sink.name(), records = records.len(), "Writing batch");
            sink.write_batch(records)?;
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "chain"
    }
}

/// Builds the configured sinks: always JSON, plus SQLite when a database path is set
///
/// # Arguments
///
/// * `config` - The output configuration
///
/// # Returns
///
/// * `Ok(SinkChain)` - Sinks ready to receive a batch
/// * `Err(OutputError)` - The database could not be opened
pub fn build_sinks(config: &OutputConfig) -> OutputResult<SinkChain> {
    let mut sinks: Vec<Box<dyn BatchSink>> = vec![Box::new(JsonFileSink::new(&config.json_path))];

    if let Some(database_path) = &config.database_path {
        sinks.push(Box::new(SqliteSink::new(Path::new(database_path))?));
    }

    Ok(SinkChain::new(sinks))
}
