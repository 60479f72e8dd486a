//! Schema browser: textual outline of the connection's table catalog.

use duckdb::Connection;

use crate::error::Result;
use crate::ingest::quote_ident;

/// Describe every registered table as a nested bulleted outline.
///
/// One entry per table, one indented entry per column (`name type`), in
/// catalog-reported order. An empty catalog yields an empty string.
pub fn describe_all(conn: &Connection) -> Result<String> {
    let mut stmt = conn.prepare("SHOW ALL TABLES")?;
    // Catalog layout is (database, schema, name, ...); name is column 2.
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(2))?
        .collect::<std::result::Result<_, _>>()?;

    let mut outline = String::new();
    for table in tables {
        outline.push_str(&format!("- {table}\n"));

        let mut describe = conn.prepare(&format!("DESCRIBE {}", quote_ident(&table)))?;
        let columns = describe.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;
        for column in columns {
            let (name, data_type) = column?;
            outline.push_str(&format!("    - {name} {data_type}\n"));
        }
    }

    Ok(outline)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_catalog_yields_empty_outline() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(describe_all(&conn).unwrap(), "");
    }

    #[test]
    fn test_single_table_outline() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE users (id INTEGER, name VARCHAR)", [])
            .unwrap();

        let outline = describe_all(&conn).unwrap();
        assert_eq!(outline, "- users\n    - id INTEGER\n    - name VARCHAR\n");
    }

    #[test]
    fn test_multiple_tables_each_get_an_entry() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute("CREATE TABLE a (x INTEGER)", []).unwrap();
        conn.execute("CREATE TABLE b (y VARCHAR)", []).unwrap();

        let outline = describe_all(&conn).unwrap();
        assert!(outline.contains("- a\n"));
        assert!(outline.contains("    - x INTEGER\n"));
        assert!(outline.contains("- b\n"));
        assert!(outline.contains("    - y VARCHAR\n"));
    }
}
