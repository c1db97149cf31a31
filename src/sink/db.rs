use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use rusqlite::Connection;

use crate::record::{FieldValue, RecordSet};

pub const LOADED_AT_COLUMN: &str = "loaded_at";

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let conn = Connection::open(path)
        .with_context(|| format!("Failed to open database {}", path.display()))?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;
    Ok(conn)
}

/// Replace `table` wholesale with the record set: one TEXT column per key,
/// list values stored as JSON arrays, absent fields as NULL.
pub fn replace_table(conn: &Connection, table: &str, records: &RecordSet) -> Result<usize> {
    let keys = records.columns();
    let columns = column_names(&keys);
    let loaded_at = chrono::Utc::now().to_rfc3339();

    let tx = conn.unchecked_transaction()?;
    tx.execute_batch(&format!("DROP TABLE IF EXISTS {};", quote_ident(table)))?;

    let defs: Vec<String> = std::iter::once(format!("{} TEXT NOT NULL", quote_ident(LOADED_AT_COLUMN)))
        .chain(columns.iter().map(|c| format!("{} TEXT", quote_ident(c))))
        .collect();
    tx.execute_batch(&format!(
        "CREATE TABLE {} ({});",
        quote_ident(table),
        defs.join(", ")
    ))?;

    let mut count = 0;
    {
        let names: Vec<String> = std::iter::once(LOADED_AT_COLUMN)
            .chain(columns.iter().map(String::as_str))
            .map(quote_ident)
            .collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{}", i)).collect();
        let mut stmt = tx.prepare(&format!(
            "INSERT INTO {} ({}) VALUES ({})",
            quote_ident(table),
            names.join(", "),
            placeholders.join(", ")
        ))?;

        for record in records {
            let mut values: Vec<Option<String>> = Vec::with_capacity(names.len());
            values.push(Some(loaded_at.clone()));
            for key in &keys {
                values.push(match record.get(key) {
                    Some(FieldValue::Text(s)) => Some(s.clone()),
                    Some(list @ FieldValue::List(_)) => Some(serde_json::to_string(list)?),
                    None => None,
                });
            }
            count += stmt.execute(rusqlite::params_from_iter(values))?;
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct TableStats {
    pub rows: usize,
    pub columns: Vec<String>,
    pub loaded_at: Option<String>,
}

pub fn table_stats(conn: &Connection, table: &str) -> Result<TableStats> {
    let rows: usize = conn
        .query_row(&format!("SELECT COUNT(*) FROM {}", quote_ident(table)), [], |r| r.get(0))
        .with_context(|| format!("Table {} not found", table))?;

    let mut stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(table)))?;
    let columns = stmt
        .column_names()
        .into_iter()
        .filter(|c| *c != LOADED_AT_COLUMN)
        .map(str::to_string)
        .collect();

    let loaded_at = conn
        .query_row(
            &format!("SELECT MAX({}) FROM {}", quote_ident(LOADED_AT_COLUMN), quote_ident(table)),
            [],
            |r| r.get(0),
        )
        .unwrap_or(None);

    Ok(TableStats {
        rows,
        columns,
        loaded_at,
    })
}

/// SQLite column names are case-insensitive; labels that differ only in case
/// (or collide with `loaded_at`) get a numeric suffix.
fn column_names(keys: &[&str]) -> Vec<String> {
    let mut taken: HashSet<String> = HashSet::from([LOADED_AT_COLUMN.to_string()]);
    keys.iter()
        .map(|key| {
            let mut name = key.to_string();
            let mut n = 2;
            while !taken.insert(name.to_lowercase()) {
                name = format!("{}_{}", key, n);
                n += 1;
            }
            name
        })
        .collect()
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::CharacterRecord;

    fn set(records: Vec<CharacterRecord>) -> RecordSet {
        RecordSet::finalize(records, "Joanne Rowling")
    }

    #[test]
    fn table_is_replaced_on_each_load() {
        let conn = Connection::open_in_memory().unwrap();

        let first = set(vec![
            CharacterRecord::new("Harry Potter", "h").with_field("Casa", FieldValue::text("Grifinória")),
            CharacterRecord::new("Draco Malfoy", "d").with_field("Casa", FieldValue::text("Sonserina")),
        ]);
        assert_eq!(replace_table(&conn, "personagens", &first).unwrap(), 2);

        let second = set(vec![CharacterRecord::new("Dobby", "x")
            .with_field("Lealdade", FieldValue::list(["Harry Potter", "Hogwarts"]))]);
        assert_eq!(replace_table(&conn, "personagens", &second).unwrap(), 1);

        let stats = table_stats(&conn, "personagens").unwrap();
        assert_eq!(stats.rows, 1);
        assert_eq!(stats.columns, vec!["name", "source URL", "Lealdade"]);
        assert!(stats.loaded_at.is_some());

        let lealdade: String = conn
            .query_row("SELECT \"Lealdade\" FROM personagens", [], |r| r.get(0))
            .unwrap();
        assert_eq!(lealdade, r#"["Harry Potter","Hogwarts"]"#);
    }

    #[test]
    fn absent_fields_are_null() {
        let conn = Connection::open_in_memory().unwrap();
        let records = set(vec![
            CharacterRecord::new("A", "a").with_field("Olhos", FieldValue::text("Verdes")),
            CharacterRecord::new("B", "b"),
        ]);
        replace_table(&conn, "t", &records).unwrap();

        let olhos: Option<String> = conn
            .query_row("SELECT \"Olhos\" FROM t WHERE name = 'B'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(olhos, None);
    }

    #[test]
    fn case_colliding_labels_get_suffixes() {
        assert_eq!(
            column_names(&["name", "Casa", "casa", "Loaded_At"]),
            vec!["name", "Casa", "casa_2", "Loaded_At_2"]
        );
    }

    #[test]
    fn connect_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data/personagens.sqlite");
        let conn = connect(&path).unwrap();
        replace_table(&conn, "personagens", &set(vec![CharacterRecord::new("A", "a")])).unwrap();
        assert!(path.exists());
    }
}
