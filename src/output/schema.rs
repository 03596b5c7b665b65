//! Database schema for the SQLite sink

use rusqlite::Connection;

/// SQL schema for the record table
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS resorts (
    poi_id INTEGER,
    resortName TEXT,
    areaName TEXT,
    areaId INTEGER,
    address TEXT,
    lat REAL,
    lng REAL,
    introduction TEXT,
    openInfo TEXT,
    ticketsInfo TEXT,
    transInfo TEXT,
    tel TEXT,
    item_site TEXT,
    item_time TEXT,
    payAbstracts TEXT,
    source TEXT NOT NULL,
    timeStamp TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_resorts_poi ON resorts(poi_id);
CREATE INDEX IF NOT EXISTS idx_resorts_area ON resorts(areaId);
"#;

/// Creates the record table if it does not exist
pub fn initialize_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)
}
