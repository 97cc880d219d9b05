//! Key-value store adapter.
//!
//! # Responsibility
//! - Define the minimal persistence contract the collection layers rely on:
//!   get/set/list-by-namespace/delete over JSON values.
//! - Own the persisted key layout shared by every higher layer.
//!
//! # Invariants
//! - Each call is atomic on its own; there is no cross-call transaction.
//! - `delete` of an absent key succeeds.
//! - `list_all` only yields keys under [`NAMESPACE_PREFIX`], ordered by key.

use crate::db::DbError;
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod sqlite;

pub use memory::MemoryKvStore;
pub use sqlite::SqliteKvStore;

/// Prefix carried by every key this system owns.
pub const NAMESPACE_PREFIX: &str = "cm_";
/// Prefix for one-key-per-conversation record storage.
pub const RECORD_KEY_PREFIX: &str = "cm_conv_";
/// Well-known key holding the category-name sequence.
pub const CATEGORIES_KEY: &str = "cm_meta_categories";
/// Well-known key holding the last backup timestamp (epoch ms).
pub const LAST_BACKUP_KEY: &str = "cm_meta_last_backup_at";
/// Well-known key holding the backup-reminder-disabled flag.
pub const REMINDER_DISABLED_KEY: &str = "cm_meta_backup_reminder_disabled";

pub type KvResult<T> = Result<T, KvError>;

/// Store-level failure. Callers above the repository layer convert these
/// into logged fallbacks instead of propagating them to users.
#[derive(Debug)]
pub enum KvError {
    Db(DbError),
    /// A persisted value is not valid JSON.
    Decode { key: String, message: String },
    /// A value could not be encoded for persistence.
    Encode(serde_json::Error),
    /// The backing store is not reachable at all.
    Unavailable(String),
}

impl Display for KvError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Decode { key, message } => {
                write!(f, "stored value under `{key}` is not valid JSON: {message}")
            }
            Self::Encode(err) => write!(f, "failed to encode value: {err}"),
            Self::Unavailable(message) => write!(f, "key-value store unavailable: {message}"),
        }
    }
}

impl Error for KvError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::Decode { .. } | Self::Unavailable(_) => None,
        }
    }
}

impl From<DbError> for KvError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for KvError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistent string-keyed store of structured values.
pub trait KvStore {
    /// Persists `value` under `key`, overwriting any previous value.
    fn set(&self, key: &str, value: &Value) -> KvResult<()>;
    /// Returns the stored value, or `None` when the key is absent.
    fn get(&self, key: &str) -> KvResult<Option<Value>>;
    /// Returns every namespaced `(key, value)` pair ordered by key.
    fn list_all(&self) -> KvResult<Vec<(String, Value)>>;
    /// Removes `key`. Absent keys are not an error.
    fn delete(&self, key: &str) -> KvResult<()>;

    /// Returns the stored value or `default` when the key is absent.
    fn get_or(&self, key: &str, default: Value) -> KvResult<Value> {
        Ok(self.get(key)?.unwrap_or(default))
    }
}

impl<S: KvStore + ?Sized> KvStore for &S {
    fn set(&self, key: &str, value: &Value) -> KvResult<()> {
        (**self).set(key, value)
    }

    fn get(&self, key: &str) -> KvResult<Option<Value>> {
        (**self).get(key)
    }

    fn list_all(&self) -> KvResult<Vec<(String, Value)>> {
        (**self).list_all()
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        (**self).delete(key)
    }
}

/// Returns whether `key` belongs to this system's namespace.
pub fn is_namespaced(key: &str) -> bool {
    key.starts_with(NAMESPACE_PREFIX)
}
