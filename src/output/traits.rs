//! Batch sink trait and output errors

use crate::extract::Record;
use thiserror::Error;

/// Errors that can occur while persisting a batch
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// Accepts the finished record list of a crawl
///
/// A crawl hands its records over exactly once, as a single batch; there is
/// no incremental persistence.
pub trait BatchSink: Send {
    /// Persists a finished batch
    ///
    /// # Arguments
    ///
    /// * `records` - Every record gathered by the crawl, in crawl order
    fn write_batch(&mut self, records: &[Record]) -> OutputResult<()>;

    /// Short name used in log events
    fn name(&self) -> &str;
}
