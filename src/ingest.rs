//! File ingestion: uploaded CSV/JSON buffers become database tables.
//!
//! The engine's readers want a file path, not an in-memory buffer, so each
//! upload is materialized to a named temporary file for the duration of the
//! `CREATE TABLE` statement. The [`NamedTempFile`](tempfile::NamedTempFile)
//! guard removes it when the registration scope ends, whether or not the
//! statement succeeded.

use std::io::Write;

use duckdb::Connection;
use tempfile::NamedTempFile;

use crate::error::IngestError;

/// Table name for the bundled sample dataset.
pub const SAMPLE_TABLE: &str = "posts";

const SAMPLE_JSON: &str = include_str!("../sample_data/posts.json");

/// A transient (filename, bytes) pair consumed during ingestion.
pub struct UploadedFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

/// Per-file result of an ingestion batch.
#[derive(Debug)]
pub enum IngestOutcome {
    /// The file was parsed and registered as a table.
    Registered {
        file: String,
        table: String,
        rows: usize,
    },
    /// Unrecognized extension; the file was not loaded.
    Skipped { file: String },
    /// Decoding, temp-file, or registration failure for this file.
    Failed { file: String, error: IngestError },
}

/// Recognized source formats, dispatched on filename suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SourceFormat {
    Csv,
    Json,
}

impl SourceFormat {
    /// Match a recognized suffix (case-sensitive, exact) and return the
    /// format together with the table name (filename minus suffix).
    fn from_name(name: &str) -> Option<(Self, &str)> {
        if let Some(stem) = name.strip_suffix(".csv") {
            Some((SourceFormat::Csv, stem))
        } else if let Some(stem) = name.strip_suffix(".json") {
            Some((SourceFormat::Json, stem))
        } else {
            None
        }
    }

    /// The engine's reader function for this format.
    fn reader_function(self) -> &'static str {
        match self {
            SourceFormat::Csv => "read_csv_auto",
            SourceFormat::Json => "read_json_auto",
        }
    }

    /// Temp-file suffix, so the engine's own sniffing agrees with ours.
    fn temp_suffix(self) -> &'static str {
        match self {
            SourceFormat::Csv => ".csv",
            SourceFormat::Json => ".json",
        }
    }
}

/// Load a batch of uploaded files into the connection's table catalog.
///
/// Each file gets its own outcome; a failure never aborts the remaining
/// files. Outcomes are returned in input order.
pub fn ingest(conn: &Connection, files: &[UploadedFile]) -> Vec<IngestOutcome> {
    files
        .iter()
        .map(|file| match ingest_one(conn, file) {
            Ok(outcome) => outcome,
            Err(error) => {
                tracing::warn!(file = %file.name, %error, "ingestion failed");
                IngestOutcome::Failed {
                    file: file.name.clone(),
                    error,
                }
            }
        })
        .collect()
}

fn ingest_one(conn: &Connection, file: &UploadedFile) -> Result<IngestOutcome, IngestError> {
    let Some((format, table)) = SourceFormat::from_name(&file.name) else {
        tracing::warn!(file = %file.name, "unrecognized extension, skipping");
        return Ok(IngestOutcome::Skipped {
            file: file.name.clone(),
        });
    };

    let text = std::str::from_utf8(&file.bytes).map_err(|_| IngestError::Utf8 {
        file: file.name.clone(),
    })?;

    let rows = register_table(conn, &file.name, table, format, text)?;
    tracing::info!(file = %file.name, table, rows, "registered table");

    Ok(IngestOutcome::Registered {
        file: file.name.clone(),
        table: table.to_string(),
        rows,
    })
}

/// Load the bundled sample dataset, registering (or replacing) the
/// fixed-name `posts` table.
pub fn load_sample(conn: &Connection) -> Result<IngestOutcome, IngestError> {
    let file = format!("{SAMPLE_TABLE}.json");
    let rows = register_table(conn, &file, SAMPLE_TABLE, SourceFormat::Json, SAMPLE_JSON)?;
    tracing::info!(table = SAMPLE_TABLE, rows, "loaded sample dataset");

    Ok(IngestOutcome::Registered {
        file,
        table: SAMPLE_TABLE.to_string(),
        rows,
    })
}

/// Materialize `text` to a temp file and register it as `table`.
///
/// `CREATE OR REPLACE` gives overwrite semantics for duplicate names. The
/// temp file is deleted when the guard drops, including when registration
/// fails.
fn register_table(
    conn: &Connection,
    file: &str,
    table: &str,
    format: SourceFormat,
    text: &str,
) -> Result<usize, IngestError> {
    let temp_file_error = |reason: String| IngestError::TempFile {
        file: file.to_string(),
        reason,
    };

    let tmp: NamedTempFile = tempfile::Builder::new()
        .prefix("quackpad-")
        .suffix(format.temp_suffix())
        .tempfile()
        .map_err(|e| temp_file_error(e.to_string()))?;
    tmp.as_file()
        .write_all(text.as_bytes())
        .map_err(|e| temp_file_error(e.to_string()))?;

    let path = tmp.path().to_string_lossy();
    let sql = format!(
        "CREATE OR REPLACE TABLE {} AS SELECT * FROM {}('{}')",
        quote_ident(table),
        format.reader_function(),
        escape_literal(&path),
    );
    conn.execute(&sql, [])
        .map_err(|e| IngestError::Registration {
            file: file.to_string(),
            reason: e.to_string(),
        })?;

    let count_sql = format!("SELECT count(*) FROM {}", quote_ident(table));
    let rows: i64 = conn
        .query_row(&count_sql, [], |row| row.get(0))
        .map_err(|e| IngestError::Registration {
            file: file.to_string(),
            reason: e.to_string(),
        })?;

    Ok(rows as usize)
}

/// Quote an identifier for use in SQL text.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a string literal for use in SQL text.
fn escape_literal(value: &str) -> String {
    value.replace('\'', "''")
}
