//! Backup export/import and backup reminder bookkeeping.
//!
//! # Responsibility
//! - Snapshot the category registry and all visible records.
//! - Restore a snapshot with merge-by-id semantics.
//! - Track the last backup time and the reminder opt-out flag.
//!
//! # Invariants
//! - Import validates the whole document before the first write.
//! - Records carrying an id overwrite that id; records without one are
//!   added under a fresh id.
//! - `category_names` replaces the registry only when it has exactly one
//!   name per slot.

use crate::model::backup::{BackupDocument, BackupRecord, BACKUP_FORMAT_VERSION};
use crate::repo::category_repo::{CategoryRegistry, CATEGORY_SLOT_COUNT};
use crate::repo::conversation_repo::ConversationRepository;
use crate::repo::RepoError;
use crate::store::{KvStore, LAST_BACKUP_KEY, REMINDER_DISABLED_KEY};
use log::{info, warn};
use serde_json::Value;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type BackupResult<T> = Result<T, BackupError>;

/// Backup codec error.
#[derive(Debug)]
pub enum BackupError {
    /// Document is not a usable backup (missing/invalid `records`, bad JSON).
    Format(String),
    UnsupportedVersion { found: u32, supported: u32 },
    Repo(RepoError),
}

impl Display for BackupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Format(message) => write!(f, "invalid backup document: {message}"),
            Self::UnsupportedVersion { found, supported } => write!(
                f,
                "backup format version {found} is newer than supported {supported}"
            ),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BackupError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for BackupError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Outcome of a successful import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImportSummary {
    pub imported_count: usize,
    pub categories_replaced: bool,
}

/// Backup codec over the collection store.
pub struct BackupService<'s, S: KvStore + ?Sized> {
    store: &'s S,
    records: ConversationRepository<'s, S>,
    categories: CategoryRegistry<'s, S>,
}

impl<'s, S: KvStore + ?Sized> BackupService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            records: ConversationRepository::new(store),
            categories: CategoryRegistry::new(store),
        }
    }

    /// Creates a service whose registry initializes with `default_names`.
    pub fn with_category_defaults(store: &'s S, default_names: &[String]) -> Self {
        Self {
            store,
            records: ConversationRepository::new(store),
            categories: CategoryRegistry::with_defaults(store, default_names),
        }
    }

    /// Snapshots registry and visible records, then records `now_ms` as the
    /// last backup time.
    pub fn export(&self, now_ms: i64) -> BackupResult<BackupDocument> {
        let records = self.records.load_visible()?;
        let document = BackupDocument {
            format_version: BACKUP_FORMAT_VERSION,
            exported_at: now_ms,
            category_names: self.categories.get_all(),
            records: records.iter().map(BackupRecord::from).collect(),
        };
        self.mark_backed_up(now_ms);
        info!(
            "event=backup_export module=service status=ok records={}",
            document.records.len()
        );
        Ok(document)
    }

    /// Exports as pretty-printed JSON.
    pub fn export_json(&self, now_ms: i64) -> BackupResult<String> {
        let document = self.export(now_ms)?;
        serde_json::to_string_pretty(&document)
            .map_err(|err| BackupError::Format(format!("failed to encode backup: {err}")))
    }

    /// Imports a JSON backup document.
    pub fn import_json(&self, text: &str, now_ms: i64) -> BackupResult<ImportSummary> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| BackupError::Format(format!("not valid JSON: {err}")))?;
        self.import_value(value, now_ms)
    }

    /// Imports an already-parsed JSON document.
    ///
    /// Fields with unexpected types decode to their defaults; every record
    /// is decoded before the first write.
    ///
    /// # Errors
    /// - `Format` when `records` is missing or not an array. Nothing is
    ///   written in that case.
    pub fn import_value(&self, value: Value, now_ms: i64) -> BackupResult<ImportSummary> {
        match value.get("records") {
            Some(Value::Array(_)) => {}
            Some(_) => return Err(BackupError::Format("`records` is not a list".to_string())),
            None => return Err(BackupError::Format("`records` is missing".to_string())),
        }
        let document: BackupDocument = serde_json::from_value(value)
            .map_err(|err| BackupError::Format(err.to_string()))?;
        self.import(document, now_ms)
    }

    /// Merges `document` into the store by record id.
    pub fn import(&self, document: BackupDocument, now_ms: i64) -> BackupResult<ImportSummary> {
        if document.format_version > BACKUP_FORMAT_VERSION {
            return Err(BackupError::UnsupportedVersion {
                found: document.format_version,
                supported: BACKUP_FORMAT_VERSION,
            });
        }

        let mut imported_count = 0;
        for incoming in document.records {
            if incoming.is_ghost() {
                warn!("event=backup_import module=service status=skipped reason=ghost");
                continue;
            }
            let record = incoming.into_record(now_ms);
            self.records.put(&record)?;
            imported_count += 1;
        }

        let categories_replaced = document.category_names.len() == CATEGORY_SLOT_COUNT
            && self.categories.replace_all(&document.category_names);

        self.mark_backed_up(now_ms);
        info!(
            "event=backup_import module=service status=ok records={imported_count} categories_replaced={categories_replaced}"
        );
        Ok(ImportSummary {
            imported_count,
            categories_replaced,
        })
    }

    /// Last successful export/import time (epoch ms).
    pub fn last_backup_at(&self) -> Option<i64> {
        match self.store.get(LAST_BACKUP_KEY) {
            Ok(value) => value.and_then(|value| value.as_i64()),
            Err(err) => {
                warn!("event=backup_meta module=service status=fallback error={err}");
                None
            }
        }
    }

    pub fn reminder_disabled(&self) -> bool {
        match self.store.get(REMINDER_DISABLED_KEY) {
            Ok(value) => value.and_then(|value| value.as_bool()).unwrap_or(false),
            Err(err) => {
                warn!("event=backup_meta module=service status=fallback error={err}");
                false
            }
        }
    }

    pub fn set_reminder_disabled(&self, disabled: bool) -> BackupResult<()> {
        self.store
            .set(REMINDER_DISABLED_KEY, &Value::Bool(disabled))
            .map_err(RepoError::from)?;
        Ok(())
    }

    /// Whether the user should be nudged to export a backup.
    ///
    /// True when reminders are enabled, at least one record exists, and no
    /// backup was ever made or the last one is at least `interval_ms` old.
    pub fn reminder_due(&self, now_ms: i64, interval_ms: i64) -> bool {
        if self.reminder_disabled() {
            return false;
        }
        let has_records = match self.records.load_visible() {
            Ok(records) => !records.is_empty(),
            Err(err) => {
                warn!("event=backup_reminder module=service status=fallback error={err}");
                false
            }
        };
        if !has_records {
            return false;
        }
        match self.last_backup_at() {
            Some(last) => now_ms.saturating_sub(last) >= interval_ms,
            None => true,
        }
    }

    fn mark_backed_up(&self, now_ms: i64) {
        if let Err(err) = self.store.set(LAST_BACKUP_KEY, &Value::from(now_ms)) {
            warn!("event=backup_meta module=service status=error error={err}");
        }
    }
}
