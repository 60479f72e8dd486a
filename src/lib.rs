//! quackpad - Query uploaded CSV and JSON files with SQL.
//!
//! This library wires a browser-facing HTTP surface to an embedded DuckDB
//! instance: uploaded files become tables, free-text SQL runs against them,
//! and results come back as Arrow record batches ready for rendering.
//!
//! # Example
//!
//! ```no_run
//! use quackpad::ingest::{self, UploadedFile};
//! use quackpad::runner;
//! use quackpad::session::Session;
//!
//! fn main() -> anyhow::Result<()> {
//!     let mut session = Session::new();
//!     let file = UploadedFile::new("trips.csv", b"city,n\nOslo,3\n".to_vec());
//!     ingest::ingest(session.connection()?, &[file]);
//!     let results = runner::run(session.connection()?, "SELECT * FROM trips;");
//!     // Render results...
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod ingest;
pub mod render;
pub mod runner;
pub mod schema;
pub mod session;
pub mod web;

pub use error::{Error, IngestError, QueryError, Result};
