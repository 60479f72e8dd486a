//! Query runner: multi-statement SQL execution with per-statement outcomes.
//!
//! Input text is split on `;`, and each non-empty segment runs sequentially
//! against the shared connection. Success and failure are independent per
//! statement: a failure in statement N never prevents statement N+1 from
//! running. Splitting does not parse the SQL, so a literal semicolon inside
//! a string literal or comment splits incorrectly.

use duckdb::arrow::record_batch::RecordBatch;
use duckdb::Connection;

use crate::error::QueryError;

/// Outcome of one executed statement: the statement text plus either the
/// fetched result batches or the execution error.
pub struct StatementResult {
    pub sql: String,
    pub outcome: Result<Vec<RecordBatch>, QueryError>,
}

impl StatementResult {
    /// Total number of result rows, zero for errors and row-less statements.
    pub fn row_count(&self) -> usize {
        match &self.outcome {
            Ok(batches) => batches.iter().map(RecordBatch::num_rows).sum(),
            Err(_) => 0,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Split SQL text into trimmed, non-empty statements.
pub fn split_statements(text: &str) -> Vec<&str> {
    text.split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .collect()
}

/// Execute each statement in `sql_text` in textual order.
///
/// Returns one [`StatementResult`] per executed statement; empty or
/// whitespace-only input yields an empty vector.
pub fn run(conn: &Connection, sql_text: &str) -> Vec<StatementResult> {
    split_statements(sql_text)
        .into_iter()
        .map(|sql| {
            let outcome = execute(conn, sql);
            if let Err(ref error) = outcome {
                tracing::debug!(sql, %error, "statement failed");
            }
            StatementResult {
                sql: sql.to_string(),
                outcome,
            }
        })
        .collect()
}

fn execute(conn: &Connection, sql: &str) -> Result<Vec<RecordBatch>, QueryError> {
    let mut stmt = conn.prepare(sql)?;
    let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
    Ok(batches)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connect() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn test_split_trims_and_drops_empty_segments() {
        assert_eq!(split_statements("SELECT 1; SELECT 2;"), vec!["SELECT 1", "SELECT 2"]);
        assert_eq!(split_statements("  SELECT 1  "), vec!["SELECT 1"]);
        assert_eq!(split_statements(""), Vec::<&str>::new());
        assert_eq!(split_statements("  \n\t "), Vec::<&str>::new());
        assert_eq!(split_statements(";;; ; ;"), Vec::<&str>::new());
    }

    #[test]
    fn test_failure_does_not_stop_subsequent_statements() {
        let conn = connect();
        let results = run(&conn, "SELECT 1; SELECT bad_column_that_does_not_exist;");

        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert_eq!(results[0].row_count(), 1);
        assert!(!results[1].is_ok());
    }

    #[test]
    fn test_statements_run_in_order_and_share_state() {
        let conn = connect();
        let results = run(
            &conn,
            "CREATE TABLE t (x INTEGER); INSERT INTO t VALUES (1), (2); SELECT * FROM t;",
        );

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(StatementResult::is_ok));
        assert_eq!(results[2].row_count(), 2);
    }

    #[test]
    fn test_empty_input_yields_no_outcomes() {
        let conn = connect();
        assert!(run(&conn, "").is_empty());
        assert!(run(&conn, "   ;  ;;  ").is_empty());
    }

    #[test]
    fn test_error_message_is_captured() {
        let conn = connect();
        let results = run(&conn, "SELECT * FROM missing_table;");

        let err = results[0].outcome.as_ref().unwrap_err();
        assert!(err.to_string().to_lowercase().contains("missing_table"));
    }
}
