//! JSON file sink
//!
//! Writes the batch as a single JSON array with non-ASCII text kept as-is.

use crate::extract::Record;
use crate::output::traits::{BatchSink, OutputResult};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Sink that serializes the batch to a JSON file
pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }
}

impl BatchSink for JsonFileSink {
    fn write_batch(&mut self, records: &[Record]) -> OutputResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let mut writer = BufWriter::new(File::create(&self.path)?);
        serde_json::to_writer(&mut writer, records)?;
        writer.flush()?;

        tracing::info!(path = %self.path.display(), records = records.len(), "Wrote JSON batch");
        Ok(())
    }

    fn name(&self) -> &str {
        "json"
    }
}
