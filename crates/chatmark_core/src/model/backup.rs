//! Portable backup document.
//!
//! # Invariants
//! - `category_names` has exactly one entry per category slot when produced
//!   by export; import only trusts it when the length matches.
//! - Every exported record carries its id, so re-importing is idempotent.
//! - Decoding only fails when `records` is not a list. Odd field types fall
//!   back to defaults, numeric ids are stringified, and entries that are not
//!   objects are dropped.

use crate::model::conversation::{category_field, ConversationId, ConversationRecord};
use serde::{Deserialize, Serialize};

/// Wire format version written by this build.
pub const BACKUP_FORMAT_VERSION: u32 = 1;

/// Snapshot of the registry and the record collection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupDocument {
    #[serde(
        default = "default_format_version",
        deserialize_with = "lenient::format_version"
    )]
    pub format_version: u32,
    /// Unix epoch milliseconds.
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub exported_at: i64,
    /// Empty unless every entry is a string.
    #[serde(default, deserialize_with = "lenient::names")]
    pub category_names: Vec<String>,
    #[serde(deserialize_with = "lenient::records")]
    pub records: Vec<BackupRecord>,
}

/// Record snapshot inside a backup. `id` is optional on import.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient::id"
    )]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "lenient::text")]
    pub title: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub body: String,
    #[serde(default, deserialize_with = "lenient::text")]
    pub url: String,
    #[serde(
        default,
        serialize_with = "category_field::serialize",
        deserialize_with = "lenient::category"
    )]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "lenient::timestamp")]
    pub saved_at: i64,
}

impl BackupRecord {
    /// Converts into a stored record, generating an id when none is usable.
    pub fn into_record(self, now_ms: i64) -> ConversationRecord {
        let id = self
            .id
            .as_deref()
            .and_then(ConversationId::parse)
            .unwrap_or_else(|| ConversationId::generate(now_ms));
        ConversationRecord {
            id,
            title: self.title,
            body: self.body,
            source_url: self.url,
            category: self.category,
            saved_at: self.saved_at,
        }
    }

    pub fn is_ghost(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }
}

impl From<&ConversationRecord> for BackupRecord {
    fn from(record: &ConversationRecord) -> Self {
        Self {
            id: Some(record.id.as_str().to_string()),
            title: record.title.clone(),
            body: record.body.clone(),
            url: record.source_url.clone(),
            category: record.category.clone(),
            saved_at: record.saved_at,
        }
    }
}

fn default_format_version() -> u32 {
    BACKUP_FORMAT_VERSION
}

mod lenient {
    use super::{BackupRecord, BACKUP_FORMAT_VERSION};
    use crate::model::conversation::normalize_category;
    use log::warn;
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    pub fn text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
        Ok(scalar_text(Value::deserialize(deserializer)?).unwrap_or_default())
    }

    pub fn id<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(scalar_text(Value::deserialize(deserializer)?))
    }

    pub fn category<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        match Value::deserialize(deserializer)? {
            Value::String(name) => Ok(normalize_category(Some(&name))),
            _ => Ok(None),
        }
    }

    pub fn timestamp<'de, D: Deserializer<'de>>(deserializer: D) -> Result<i64, D::Error> {
        let millis = match Value::deserialize(deserializer)? {
            Value::Number(number) => number
                .as_i64()
                .or_else(|| number.as_f64().map(|value| value as i64)),
            Value::String(text) => text.trim().parse().ok(),
            _ => None,
        };
        Ok(millis.unwrap_or(0))
    }

    pub fn format_version<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u32, D::Error> {
        Ok(match Value::deserialize(deserializer)?.as_u64() {
            Some(version) => u32::try_from(version).unwrap_or(u32::MAX),
            None => BACKUP_FORMAT_VERSION,
        })
    }

    pub fn names<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<String>, D::Error> {
        let Value::Array(items) = Value::deserialize(deserializer)? else {
            return Ok(Vec::new());
        };
        let names: Option<Vec<String>> = items
            .into_iter()
            .map(|item| match item {
                Value::String(name) => Some(name),
                _ => None,
            })
            .collect();
        Ok(names.unwrap_or_default())
    }

    pub fn records<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<BackupRecord>, D::Error> {
        let Value::Array(items) = Value::deserialize(deserializer)? else {
            return Err(D::Error::custom("`records` is not a list"));
        };
        let mut records = Vec::with_capacity(items.len());
        for (position, item) in items.into_iter().enumerate() {
            if !item.is_object() {
                warn!(
                    "event=backup_decode module=model status=skipped position={position} reason=not_object"
                );
                continue;
            }
            records.push(BackupRecord::deserialize(item).map_err(D::Error::custom)?);
        }
        Ok(records)
    }

    fn scalar_text(value: Value) -> Option<String> {
        match value {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{BackupDocument, BackupRecord};
    use serde_json::json;

    #[test]
    fn record_without_id_gets_generated_id() {
        let record: BackupRecord = serde_json::from_value(json!({
            "title": "t",
            "body": "b",
        }))
        .unwrap();
        let converted = record.into_record(42);
        assert!(converted.id.as_str().starts_with("42_"));
    }

    #[test]
    fn record_fields_with_odd_types_fall_back_instead_of_failing() {
        let record: BackupRecord = serde_json::from_value(json!({
            "id": 7,
            "title": null,
            "body": "b",
            "url": false,
            "category": 3,
            "savedAt": "1700",
        }))
        .unwrap();
        assert_eq!(record.id.as_deref(), Some("7"));
        assert_eq!(record.title, "");
        assert_eq!(record.url, "false");
        assert_eq!(record.category, None);
        assert_eq!(record.saved_at, 1700);
    }

    #[test]
    fn document_drops_non_object_entries_and_mixed_category_names() {
        let doc: BackupDocument = serde_json::from_value(json!({
            "formatVersion": "one",
            "categoryNames": ["a", 2, "c", "d", "e", "f"],
            "records": [ "stray", { "title": "kept" }, null ],
        }))
        .unwrap();
        assert_eq!(doc.format_version, super::BACKUP_FORMAT_VERSION);
        assert!(doc.category_names.is_empty());
        assert_eq!(doc.records.len(), 1);
        assert_eq!(doc.records[0].title, "kept");
    }

    #[test]
    fn document_rejects_records_that_are_not_a_list() {
        let err = serde_json::from_value::<BackupDocument>(json!({ "records": { "id": "x" } }))
            .unwrap_err();
        assert!(err.to_string().contains("`records` is not a list"));
    }

    #[test]
    fn document_defaults_optional_header_fields() {
        let doc: BackupDocument = serde_json::from_value(json!({ "records": [] })).unwrap();
        assert_eq!(doc.format_version, super::BACKUP_FORMAT_VERSION);
        assert!(doc.category_names.is_empty());
    }
}
