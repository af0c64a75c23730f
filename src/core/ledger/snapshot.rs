//! SQLite snapshot of the ledger workbook
//!
//! One TEXT-only table per sheet plus a `_meta` key/value table. The snapshot
//! travels through the blob store as raw database-file bytes, so both building
//! and reading go through a scratch file.

use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, OpenFlags};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use tempfile::NamedTempFile;
use tracing::debug;

use super::sheet::Sheet;
use super::LedgerError;

const META_TABLE: &str = "_meta";

/// Key/value metadata stored alongside the sheets
pub type SnapshotMeta = BTreeMap<String, String>;

pub const META_SHA256: &str = "workbook_sha256";
pub const META_CONVERTED_AT: &str = "converted_at";

/// Hex SHA-256 of the workbook bytes
pub fn fingerprint(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Write the sheets into a fresh database file and return its bytes
pub fn write_snapshot(sheets: &[Sheet], workbook_sha256: &str) -> Result<Vec<u8>, LedgerError> {
    let scratch = NamedTempFile::new()?;
    {
        let mut conn = Connection::open(scratch.path())?;
        let tx = conn.transaction()?;

        tx.execute(
            &format!(
                "CREATE TABLE {} (key TEXT PRIMARY KEY, value TEXT NOT NULL)",
                META_TABLE
            ),
            [],
        )?;
        let insert_meta = format!("INSERT INTO {} (key, value) VALUES (?1, ?2)", META_TABLE);
        tx.execute(&insert_meta, params![META_SHA256, workbook_sha256])?;
        tx.execute(
            &insert_meta,
            params![META_CONVERTED_AT, Utc::now().to_rfc3339()],
        )?;

        for sheet in sheets {
            if sheet.headers.is_empty() {
                tx.execute(
                    &format!("CREATE TABLE {} (\"_empty\" TEXT)", quote_ident(&sheet.name)),
                    [],
                )?;
                continue;
            }
            let columns: Vec<String> = sheet
                .headers
                .iter()
                .map(|h| format!("{} TEXT", quote_ident(h)))
                .collect();
            tx.execute(
                &format!(
                    "CREATE TABLE {} ({})",
                    quote_ident(&sheet.name),
                    columns.join(", ")
                ),
                [],
            )?;

            let placeholders: Vec<String> =
                (1..=sheet.headers.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "INSERT INTO {} VALUES ({})",
                quote_ident(&sheet.name),
                placeholders.join(", ")
            );
            let mut stmt = tx.prepare(&sql)?;
            for row in &sheet.rows {
                let values = (0..sheet.headers.len())
                    .map(|i| row.get(i).map(String::as_str).unwrap_or(""));
                stmt.execute(params_from_iter(values))?;
            }
            debug!(sheet = %sheet.name, rows = sheet.rows.len(), "sheet written to snapshot");
        }

        tx.commit()?;
    }
    Ok(fs::read(scratch.path())?)
}

/// Everything read back from a snapshot
#[derive(Debug, Default)]
pub struct Snapshot {
    pub sheets: Vec<Sheet>,
    pub meta: SnapshotMeta,
}

impl Snapshot {
    pub fn sheet(&self, name: &str) -> Option<&Sheet> {
        self.sheets.iter().find(|s| s.name == name)
    }

    pub fn take(&mut self, name: &str) -> Option<Sheet> {
        let idx = self.sheets.iter().position(|s| s.name == name)?;
        Some(self.sheets.remove(idx))
    }
}

/// Read every table of a snapshot back into sheets
pub fn read_snapshot(bytes: &[u8]) -> Result<Snapshot, LedgerError> {
    let scratch = NamedTempFile::new()?;
    fs::write(scratch.path(), bytes)?;
    let conn = Connection::open_with_flags(scratch.path(), OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let table_names: Vec<String> = {
        let mut stmt = conn.prepare(
            "SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY rowid",
        )?;
        let names = stmt
            .query_map([], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        names
    };

    let mut snapshot = Snapshot::default();
    for table in table_names {
        if table == META_TABLE {
            let mut stmt = conn.prepare(&format!("SELECT key, value FROM {}", META_TABLE))?;
            let pairs = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
                .collect::<Result<Vec<_>, _>>()?;
            snapshot.meta.extend(pairs);
            continue;
        }

        let mut stmt = conn.prepare(&format!("SELECT * FROM {}", quote_ident(&table)))?;
        let headers: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
        let width = headers.len();
        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Option<String>>(i).map(Option::unwrap_or_default))
                    .collect::<Result<Vec<_>, _>>()
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let headers = if headers == ["_empty"] { Vec::new() } else { headers };
        debug!(table = %table, rows = rows.len(), "table read from snapshot");
        snapshot.sheets.push(Sheet::new(table, headers, rows));
    }
    Ok(snapshot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_preserves_columns_and_rows() {
        let sheets = vec![
            Sheet::from_strs(
                "재고",
                &["작업장", "품번", "실재고수량"],
                &[&["WC501", "P-1", "10"], &["WC999", "P-2", ""]],
            ),
            Sheet::from_strs("불량", &["작지번호"], &[]),
        ];
        let bytes = write_snapshot(&sheets, "abc123").unwrap();
        let snap = read_snapshot(&bytes).unwrap();

        assert_eq!(snap.meta.get(META_SHA256).map(String::as_str), Some("abc123"));
        assert!(snap.meta.contains_key(META_CONVERTED_AT));
        assert_eq!(snap.sheet("재고"), Some(&sheets[0]));
        assert_eq!(snap.sheet("불량").map(|s| s.headers.len()), Some(1));
    }

    #[test]
    fn test_fingerprint_is_stable_hex() {
        let a = fingerprint(b"ledger");
        assert_eq!(a.len(), 64);
        assert_eq!(a, fingerprint(b"ledger"));
        assert_ne!(a, fingerprint(b"ledger2"));
    }

    #[test]
    fn test_read_rejects_non_database() {
        assert!(read_snapshot(b"not sqlite at all").is_err());
    }
}
