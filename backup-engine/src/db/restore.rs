//! Transactional reload of a dumped database.

use crate::db::dump::quote_ident;
use crate::models::dump::DatabaseDump;
use rusqlite::{params, Connection, ToSql};

/// Replace the contents of every table present in `dump` inside a single
/// transaction: clear each table (resetting its AUTOINCREMENT sequence),
/// then insert all dumped rows table-by-table in dump order. Foreign-key
/// enforcement is deferred to commit, so inter-table ordering inside the
/// dump does not matter. Any error rolls the whole transaction back and
/// the database is left exactly as it was.
pub fn restore_dump(conn: &mut Connection, dump: &DatabaseDump) -> anyhow::Result<()> {
    let tx = conn.transaction()?;
    tx.execute_batch("PRAGMA defer_foreign_keys = ON")?;

    // sqlite_sequence only exists once some table uses AUTOINCREMENT.
    let has_sequences: bool = tx.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'sqlite_sequence'",
        [],
        |row| row.get::<_, i64>(0),
    )? > 0;

    for table in &dump.tables {
        tx.execute(&format!("DELETE FROM {}", quote_ident(&table.name)), [])?;
        if has_sequences {
            tx.execute(
                "DELETE FROM sqlite_sequence WHERE name = ?1",
                params![table.name],
            )?;
        }
    }

    for table in &dump.tables {
        for row in &table.rows {
            if row.is_empty() {
                tx.execute(
                    &format!("INSERT INTO {} DEFAULT VALUES", quote_ident(&table.name)),
                    [],
                )?;
                continue;
            }
            let columns: Vec<String> = row.keys().map(|c| quote_ident(c)).collect();
            let placeholders: Vec<String> = (1..=row.len()).map(|i| format!("?{i}")).collect();
            let sql = format!(
                "INSERT INTO {} ({}) VALUES ({})",
                quote_ident(&table.name),
                columns.join(", "),
                placeholders.join(", "),
            );
            let mut stmt = tx.prepare_cached(&sql)?;
            let values: Vec<&dyn ToSql> = row.values().map(|v| v as &dyn ToSql).collect();
            stmt.execute(values.as_slice())?;
        }
        tracing::debug!(table = %table.name, rows = table.rows.len(), "Reloaded table");
    }

    tx.commit()?;
    Ok(())
}
