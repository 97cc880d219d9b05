//! SQLite-backed key-value store.

use super::{is_namespaced, KvError, KvResult, KvStore, NAMESPACE_PREFIX};
use log::warn;
use rusqlite::{params, Connection};
use serde_json::Value;

/// Key-value store over the migrated `kv_entries` table.
///
/// Values are persisted as JSON text.
pub struct SqliteKvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KvStore for SqliteKvStore<'_> {
    fn set(&self, key: &str, value: &Value) -> KvResult<()> {
        let encoded = serde_json::to_string(value).map_err(KvError::Encode)?;
        self.conn.execute(
            "INSERT INTO kv_entries (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, encoded],
        )?;
        Ok(())
    }

    fn get(&self, key: &str) -> KvResult<Option<Value>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM kv_entries WHERE key = ?1;")?;
        let mut rows = stmt.query([key])?;
        match rows.next()? {
            Some(row) => {
                let text: String = row.get(0)?;
                decode_value(key, &text).map(Some)
            }
            None => Ok(None),
        }
    }

    fn list_all(&self) -> KvResult<Vec<(String, Value)>> {
        let mut stmt = self.conn.prepare(
            "SELECT key, value
             FROM kv_entries
             WHERE substr(key, 1, length(?1)) = ?1
             ORDER BY key ASC;",
        )?;
        let mut rows = stmt.query([NAMESPACE_PREFIX])?;
        let mut entries = Vec::new();
        while let Some(row) = rows.next()? {
            let key: String = row.get("key")?;
            let text: String = row.get("value")?;
            if !is_namespaced(&key) {
                continue;
            }
            match decode_value(&key, &text) {
                Ok(value) => entries.push((key, value)),
                Err(err) => {
                    warn!("event=kv_list module=store status=skipped key={key} error={err}");
                }
            }
        }
        Ok(entries)
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }
}

fn decode_value(key: &str, text: &str) -> KvResult<Value> {
    serde_json::from_str(text).map_err(|err| KvError::Decode {
        key: key.to_string(),
        message: err.to_string(),
    })
}
