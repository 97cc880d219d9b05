//! Conversation record persistence.
//!
//! # Responsibility
//! - Store one record per key under `RECORD_KEY_PREFIX`.
//! - Decode persisted values leniently: missing fields default, values that
//!   are not records at all are skipped.
//!
//! # Invariants
//! - The id lives in the key only; the stored value never duplicates it.
//! - Load order is key order.

use crate::model::conversation::{category_field, ConversationId, ConversationRecord};
use crate::repo::RepoResult;
use crate::store::{KvError, KvStore, RECORD_KEY_PREFIX};
use log::warn;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persisted shape of one record (id excluded).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredConversation {
    #[serde(default)]
    title: String,
    #[serde(default)]
    body: String,
    #[serde(default)]
    url: String,
    #[serde(default, with = "category_field")]
    category: Option<String>,
    #[serde(default)]
    saved_at: i64,
}

impl StoredConversation {
    fn from_record(record: &ConversationRecord) -> Self {
        Self {
            title: record.title.clone(),
            body: record.body.clone(),
            url: record.source_url.clone(),
            category: record.category.clone(),
            saved_at: record.saved_at,
        }
    }

    fn into_record(self, id: ConversationId) -> ConversationRecord {
        ConversationRecord {
            id,
            title: self.title,
            body: self.body,
            source_url: self.url,
            category: self.category,
            saved_at: self.saved_at,
        }
    }
}

/// Key-value backed record repository.
pub struct ConversationRepository<'s, S: KvStore + ?Sized> {
    store: &'s S,
}

impl<'s, S: KvStore + ?Sized> ConversationRepository<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self { store }
    }

    /// Loads every decodable record, ghosts included.
    pub fn load_all(&self) -> RepoResult<Vec<ConversationRecord>> {
        let mut records = Vec::new();
        for (key, value) in self.store.list_all()? {
            let Some(id) = key
                .strip_prefix(RECORD_KEY_PREFIX)
                .and_then(ConversationId::parse)
            else {
                continue;
            };
            match decode_record(id, value) {
                Some(record) => records.push(record),
                None => {
                    warn!("event=record_decode module=repo status=skipped key={key}");
                }
            }
        }
        Ok(records)
    }

    /// Loads every record that is not a ghost.
    pub fn load_visible(&self) -> RepoResult<Vec<ConversationRecord>> {
        let mut records = self.load_all()?;
        records.retain(|record| !record.is_ghost());
        Ok(records)
    }

    /// Gets one record by id, ghosts included.
    pub fn get(&self, id: &ConversationId) -> RepoResult<Option<ConversationRecord>> {
        let value = self.store.get(&record_key(id))?;
        Ok(value.and_then(|value| decode_record(id.clone(), value)))
    }

    /// Inserts or overwrites the record at its id.
    pub fn put(&self, record: &ConversationRecord) -> RepoResult<()> {
        let value = serde_json::to_value(StoredConversation::from_record(record))
            .map_err(KvError::Encode)?;
        self.store.set(&record_key(&record.id), &value)?;
        Ok(())
    }

    /// Deletes the record at `id`. Absent ids are not an error.
    pub fn delete(&self, id: &ConversationId) -> RepoResult<()> {
        self.store.delete(&record_key(id))?;
        Ok(())
    }
}

/// Returns the storage key for `id`.
pub fn record_key(id: &ConversationId) -> String {
    format!("{RECORD_KEY_PREFIX}{id}")
}

fn decode_record(id: ConversationId, value: Value) -> Option<ConversationRecord> {
    if !value.is_object() {
        return None;
    }
    serde_json::from_value::<StoredConversation>(value)
        .ok()
        .map(|stored| stored.into_record(id))
}
