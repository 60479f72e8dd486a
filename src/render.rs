//! JSON rendering for query results.
//!
//! Query results come back from the engine as Arrow record batches; this
//! module converts them into JSON row objects for the HTTP API. The browser
//! draws the result grid from those rows.

use std::sync::Arc;

use duckdb::arrow::array::Array;
use duckdb::arrow::record_batch::RecordBatch;
use duckdb::arrow::util::display::array_value_to_string;

/// Convert one cell to a JSON value, preserving numbers and booleans.
///
/// Arrow's display layer gives us strings; the round-trip through `parse` is
/// lossy for string columns that happen to hold numeric text, which is
/// acceptable for display purposes.
pub fn cell_to_json(col: &Arc<dyn Array>, row_idx: usize) -> serde_json::Value {
    if col.is_null(row_idx) {
        return serde_json::Value::Null;
    }

    let value = array_value_to_string(col, row_idx).unwrap_or_else(|_| "null".to_string());

    if value == "null" {
        serde_json::Value::Null
    } else if let Ok(n) = value.parse::<i64>() {
        serde_json::Value::Number(n.into())
    } else if let Ok(n) = value.parse::<f64>() {
        serde_json::json!(n)
    } else if value == "true" {
        serde_json::Value::Bool(true)
    } else if value == "false" {
        serde_json::Value::Bool(false)
    } else {
        serde_json::Value::String(value)
    }
}

/// Convert a batch into one JSON object per row, keyed by column name.
pub fn batch_to_json_rows(batch: &RecordBatch) -> Vec<serde_json::Value> {
    let schema = batch.schema();
    let mut rows = Vec::with_capacity(batch.num_rows());

    for row_idx in 0..batch.num_rows() {
        let mut obj = serde_json::Map::new();
        for (col_idx, field) in schema.fields().iter().enumerate() {
            obj.insert(
                field.name().clone(),
                cell_to_json(batch.column(col_idx), row_idx),
            );
        }
        rows.push(serde_json::Value::Object(obj));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use duckdb::arrow::array::{BooleanArray, Int64Array, StringArray};
    use duckdb::arrow::datatypes::{DataType, Field, Schema};

    fn create_test_batch() -> RecordBatch {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Int64, true),
            Field::new("name", DataType::Utf8, true),
        ]);

        let ids = Int64Array::from(vec![Some(1), Some(2), None]);
        let names = StringArray::from(vec![Some("Alice"), Some("Bob, Jr."), Some("Eve")]);

        RecordBatch::try_new(Arc::new(schema), vec![Arc::new(ids), Arc::new(names)]).unwrap()
    }

    #[test]
    fn test_json_rows_preserve_types_and_nulls() {
        let batch = create_test_batch();
        let rows = batch_to_json_rows(&batch);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0]["id"], serde_json::json!(1));
        assert_eq!(rows[0]["name"], serde_json::json!("Alice"));
        assert_eq!(rows[2]["id"], serde_json::Value::Null);
    }

    #[test]
    fn test_cell_to_json_maps_booleans() {
        let schema = Schema::new(vec![Field::new("flag", DataType::Boolean, true)]);
        let flags = BooleanArray::from(vec![Some(true), Some(false), None]);
        let batch =
            RecordBatch::try_new(Arc::new(schema), vec![Arc::new(flags)]).unwrap();

        assert_eq!(cell_to_json(batch.column(0), 0), serde_json::json!(true));
        assert_eq!(cell_to_json(batch.column(0), 1), serde_json::json!(false));
        assert_eq!(cell_to_json(batch.column(0), 2), serde_json::Value::Null);
    }
}
