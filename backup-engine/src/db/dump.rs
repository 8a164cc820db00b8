//! Schema-discovered database serialization.
//!
//! The table set is discovered from the live schema at call time rather
//! than from a fixed list, so newly added domain tables are picked up
//! without touching this module. The whole dump is materialized in memory
//! before it is written; this is a known bound, acceptable for the
//! database sizes this platform manages.

use crate::models::dump::{ColumnValue, DatabaseDump, DumpRow, TableDump};
use chrono::Utc;
use rusqlite::Connection;

/// All base tables in the schema, ordered by name so dumps are
/// deterministic. The engine's own `sqlite_*` bookkeeping tables are
/// excluded.
pub fn discover_tables(conn: &Connection) -> anyhow::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
         ORDER BY name",
    )?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(names)
}

/// Dump every discovered table. Read-only; any query error aborts the
/// whole dump so no partial dump ever reaches the archive writer.
pub fn dump_database(conn: &Connection) -> anyhow::Result<DatabaseDump> {
    let tables = discover_tables(conn)?;
    dump_tables(conn, &tables)
}

/// Dump a fixed table set. Split out from [`dump_database`] so callers and
/// tests can pin the table list.
pub fn dump_tables(conn: &Connection, tables: &[String]) -> anyhow::Result<DatabaseDump> {
    let mut dumped = Vec::with_capacity(tables.len());
    for name in tables {
        let rows = dump_rows(conn, name)?;
        tracing::debug!(table = %name, rows = rows.len(), "Dumped table");
        dumped.push(TableDump {
            name: name.clone(),
            row_count: rows.len(),
            rows,
        });
    }
    Ok(DatabaseDump {
        exported_at: Utc::now(),
        tables: dumped,
    })
}

fn dump_rows(conn: &Connection, table: &str) -> anyhow::Result<Vec<DumpRow>> {
    let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(table)))?;
    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let mut rows = stmt.query([])?;
    let mut out = Vec::new();
    while let Some(row) = rows.next()? {
        let mut record = DumpRow::new();
        for (idx, column) in columns.iter().enumerate() {
            record.insert(column.clone(), ColumnValue::from_sql_ref(row.get_ref(idx)?)?);
        }
        out.push(record);
    }
    Ok(out)
}

/// Double-quote an identifier, escaping embedded quotes. Table names come
/// from the schema catalog, but they still must not be spliced raw.
pub(crate) fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seeded_conn() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE users (
                 id INTEGER PRIMARY KEY AUTOINCREMENT,
                 name TEXT NOT NULL,
                 avatar BLOB
             );
             CREATE TABLE events (
                 id INTEGER PRIMARY KEY,
                 title TEXT NOT NULL,
                 starts_at TEXT,
                 notes TEXT
             );
             INSERT INTO users (name, avatar) VALUES ('Ada', x'00ff10');
             INSERT INTO users (name, avatar) VALUES ('Grace', NULL);
             INSERT INTO events (id, title, starts_at, notes)
                 VALUES (1, 'Orientation', '2025-06-01T10:30:00+00:00', NULL);",
        )
        .unwrap();
        conn
    }

    #[test]
    fn discovery_is_sorted_and_skips_internal_tables() {
        let conn = seeded_conn();
        // AUTOINCREMENT creates sqlite_sequence; it must not be listed.
        let tables = discover_tables(&conn).unwrap();
        assert_eq!(tables, vec!["events".to_string(), "users".to_string()]);
    }

    #[test]
    fn dump_preserves_counts_and_values() {
        let conn = seeded_conn();
        let dump = dump_database(&conn).unwrap();
        assert_eq!(dump.table_counts()["users"], 2);
        assert_eq!(dump.table_counts()["events"], 1);

        let users = &dump.tables.iter().find(|t| t.name == "users").unwrap().rows;
        assert_eq!(users[0]["avatar"], ColumnValue::Binary(vec![0x00, 0xff, 0x10]));
        assert_eq!(users[1]["avatar"], ColumnValue::Null);

        let events = &dump.tables.iter().find(|t| t.name == "events").unwrap().rows;
        assert_eq!(
            events[0]["starts_at"],
            ColumnValue::Text("2025-06-01T10:30:00+00:00".into())
        );
        assert_eq!(events[0]["notes"], ColumnValue::Null);
    }

    #[test]
    fn dump_tables_honors_a_fixed_set() {
        let conn = seeded_conn();
        let dump = dump_tables(&conn, &["users".to_string()]).unwrap();
        assert_eq!(dump.tables.len(), 1);
        assert_eq!(dump.tables[0].name, "users");
    }

    #[test]
    fn dump_fails_on_missing_table() {
        let conn = seeded_conn();
        assert!(dump_tables(&conn, &["missing".to_string()]).is_err());
    }

    #[test]
    fn dump_fails_on_invalid_utf8_text() {
        let conn = seeded_conn();
        // A TEXT value carrying bytes that are not UTF-8 must abort the
        // dump rather than be silently rewritten.
        conn.execute(
            "INSERT INTO events (id, title) VALUES (2, CAST(x'ff80' AS TEXT))",
            [],
        )
        .unwrap();
        let err = dump_tables(&conn, &["events".to_string()]).unwrap_err();
        assert!(err.to_string().contains("UTF-8"), "{err}");
    }
}
