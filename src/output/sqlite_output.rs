//! SQLite sink
//!
//! Each batch replaces the table contents inside one transaction, so a reader
//! sees either the previous batch or the new one.

use crate::extract::Record;
use crate::output::schema::initialize_schema;
use crate::output::traits::{BatchSink, OutputResult};
use rusqlite::{params, Connection};
use std::path::Path;

/// Sink that stores the batch in a `resorts` table
pub struct SqliteSink {
    conn: Connection,
}

impl SqliteSink {
    /// Opens (or creates) the database and its schema
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    pub fn new(path: &Path) -> OutputResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> OutputResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Number of rows currently stored
    pub fn count(&self) -> OutputResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM resorts", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl BatchSink for SqliteSink {
    fn write_batch(&mut self, records: &[Record]) -> OutputResult<()> {
        let tx = self.conn.transaction()?;
        let replaced = tx.execute("DELETE FROM resorts", [])?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO resorts (
                    poi_id, resortName, areaName, areaId, address, lat, lng,
                    introduction, openInfo, ticketsInfo, transInfo, tel,
                    item_site, item_time, payAbstracts, source, timeStamp
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            )?;

            for record in records {
                stmt.execute(params![
                    record.poi_id,
                    record.resort_name,
                    record.area_name,
                    record.area_id,
                    record.address,
                    record.lat,
                    record.lng,
                    record.introduction,
                    record.open_info,
                    record.tickets_info,
                    record.trans_info,
                    record.tel,
                    record.item_site,
                    record.item_time,
                    record.pay_abstracts,
                    record.source,
                    record.time_stamp,
                ])?;
            }
        }

        tx.commit()?;
        tracing::info!(replaced, inserted = records.len(), "Wrote SQLite batch");
        Ok(())
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use tempfile::TempDir;

    fn record(name: &str, poi_id: i64) -> Record {
        let mut record = Record::new("mafengwo", Local::now());
        record.resort_name = Some(name.to_string());
        record.poi_id = Some(poi_id);
        record.lat = Some(18.25);
        record
    }

    #[test]
    fn test_batch_replaces_previous_contents() {
        let mut sink = SqliteSink::new_in_memory().unwrap();

        sink.write_batch(&[record("A", 1), record("B", 2), record("C", 3)])
            .unwrap();
        assert_eq!(sink.count().unwrap(), 3);

        sink.write_batch(&[record("D", 4)]).unwrap();
        assert_eq!(sink.count().unwrap(), 1);

        let name: String = sink
            .conn
            .query_row("SELECT resortName FROM resorts", [], |row| row.get(0))
            .unwrap();
        assert_eq!(name, "D");
    }

    #[test]
    fn test_null_fields_are_stored_as_null() {
        let mut sink = SqliteSink::new_in_memory().unwrap();
        sink.write_batch(&[Record::new("mafengwo", Local::now())])
            .unwrap();

        let (poi_id, lat, source): (Option<i64>, Option<f64>, String) = sink
            .conn
            .query_row("SELECT poi_id, lat, source FROM resorts", [], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .unwrap();
        assert_eq!(poi_id, None);
        assert_eq!(lat, None);
        assert_eq!(source, "mafengwo");
    }

    #[test]
    fn test_file_database_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db").join("resorts.db");

        {
            let mut sink = SqliteSink::new(&path).unwrap();
            sink.write_batch(&[record("A", 1), record("B", 2)]).unwrap();
        }

        let reopened = SqliteSink::new(&path).unwrap();
        assert_eq!(reopened.count().unwrap(), 2);
    }
}
