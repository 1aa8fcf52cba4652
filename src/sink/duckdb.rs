use super::traits::{Sink, SinkError};
use crate::config::types::SinkConfig;
use crate::source::record::LogRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use duckdb::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

/// A row as persisted in the logs table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredRecord {
    pub file_name: String,
    pub log_time: Option<DateTime<Utc>>,
    pub log_msg: String,
    pub log_format: String,
}

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// DuckDB implementation of the Sink trait.
///
/// The logical database maps to a DuckDB schema and the collection to a table
/// inside it. The connection lives behind a mutex and is replaced wholesale
/// on reconnect; an in-memory sink starts empty again after a reconnect.
pub struct DuckDbSink {
    location: Location,
    schema: String,
    table: String,
    conn: Arc<Mutex<Option<Connection>>>,
}

impl DuckDbSink {
    /// Open (or create) the database file named in `config`
    pub fn open(config: &SinkConfig) -> Result<Self, SinkError> {
        Self::with_location(
            Location::File(config.path.clone()),
            &config.database,
            &config.collection,
        )
    }

    /// Create an in-memory DuckDB sink (for testing)
    pub fn in_memory(database: &str, collection: &str) -> Result<Self, SinkError> {
        Self::with_location(Location::Memory, database, collection)
    }

    fn with_location(location: Location, database: &str, collection: &str) -> Result<Self, SinkError> {
        let schema = quote_ident(database);
        let table = format!("{}.{}", schema, quote_ident(collection));

        let conn = connect(&location)?;
        init_schema(&conn, &schema, &table)?;

        tracing::info!(location = ?location, table = %table, "Sink connected");

        Ok(Self {
            location,
            schema,
            table,
            conn: Arc::new(Mutex::new(Some(conn))),
        })
    }

    /// Release the connection. Later calls fail until `reconnect`.
    pub async fn close(&self) -> Result<(), SinkError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            lock(&conn)?.take();
            Ok(())
        })
        .await?
    }

    /// Every persisted row, in insertion order
    pub async fn records(&self) -> Result<Vec<StoredRecord>, SinkError> {
        let conn = self.conn.clone();
        let sql = format!(
            "SELECT file_name, epoch_us(log_time), log_msg, log_format FROM {} ORDER BY rowid",
            self.table
        );

        tokio::task::spawn_blocking(move || -> Result<Vec<StoredRecord>, SinkError> {
            let guard = lock(&conn)?;
            let conn = guard.as_ref().ok_or(SinkError::Disconnected)?;

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map([], |row| {
                let micros: Option<i64> = row.get(1)?;
                Ok(StoredRecord {
                    file_name: row.get(0)?,
                    log_time: micros.and_then(DateTime::from_timestamp_micros),
                    log_msg: row.get(2)?,
                    log_format: row.get(3)?,
                })
            })?;

            let records = rows.collect::<Result<Vec<_>, _>>()?;
            Ok(records)
        })
        .await?
    }
}

#[async_trait]
impl Sink for DuckDbSink {
    async fn insert(&self, record: &LogRecord) -> Result<(), SinkError> {
        let conn = self.conn.clone();
        let sql = format!(
            "INSERT INTO {} (file_name, log_time, log_msg, log_format)
             VALUES (?, to_timestamp(? / 1000000.0), ?, ?)",
            self.table
        );
        let file_name = record.source_file().to_string();
        let log_time = record.timestamp().map(|ts| ts.timestamp_micros());
        let log_msg = record.message().to_string();
        let log_format = record.format().as_str();

        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let guard = lock(&conn)?;
            let conn = guard.as_ref().ok_or(SinkError::Disconnected)?;
            conn.execute(
                &sql,
                duckdb::params![file_name, log_time, log_msg, log_format],
            )?;
            Ok(())
        })
        .await?
    }

    async fn ping(&self) -> Result<(), SinkError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let guard = lock(&conn)?;
            let conn = guard.as_ref().ok_or(SinkError::Disconnected)?;
            conn.query_row("SELECT 1", [], |row| row.get::<_, i32>(0))?;
            Ok(())
        })
        .await?
    }

    async fn reconnect(&self) -> Result<(), SinkError> {
        let conn = self.conn.clone();
        let location = self.location.clone();
        let schema = self.schema.clone();
        let table = self.table.clone();

        tokio::task::spawn_blocking(move || -> Result<(), SinkError> {
            let mut guard = lock(&conn)?;
            // Close the old handle before reopening so file locks are released
            guard.take();

            let fresh = connect(&location)?;
            init_schema(&fresh, &schema, &table)?;
            *guard = Some(fresh);
            Ok(())
        })
        .await?
    }
}

fn connect(location: &Location) -> Result<Connection, SinkError> {
    let conn = match location {
        Location::File(path) => Connection::open(path)?,
        Location::Memory => Connection::open_in_memory()?,
    };
    Ok(conn)
}

fn init_schema(conn: &Connection, schema: &str, table: &str) -> Result<(), SinkError> {
    conn.execute_batch(&format!(
        "CREATE SCHEMA IF NOT EXISTS {schema};
         CREATE TABLE IF NOT EXISTS {table} (
             file_name VARCHAR NOT NULL,
             log_time TIMESTAMPTZ,
             log_msg VARCHAR NOT NULL,
             log_format VARCHAR NOT NULL
         );"
    ))?;
    Ok(())
}

fn lock(conn: &Mutex<Option<Connection>>) -> Result<MutexGuard<'_, Option<Connection>>, SinkError> {
    conn.lock()
        .map_err(|e| SinkError::Generic(format!("connection mutex poisoned: {}", e)))
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
