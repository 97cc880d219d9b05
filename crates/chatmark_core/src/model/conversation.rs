//! Conversation record model.
//!
//! # Invariants
//! - `id` is opaque and never reused for another record.
//! - `category == None` means uncategorized; an empty name is never stored.
//! - `saved_at` is Unix epoch milliseconds.

use crate::hash::fingerprint;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const RANDOM_SUFFIX_LEN: usize = 9;
const DEFAULT_PREVIEW_CHARS: usize = 100;

/// Opaque record identifier, `<epoch-ms>_<random>` when generated here.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConversationId(String);

impl ConversationId {
    /// Generates a fresh id from the save time plus random characters.
    pub fn generate(now_ms: i64) -> Self {
        let random = Uuid::new_v4().simple().to_string();
        Self(format!("{now_ms}_{}", &random[..RANDOM_SUFFIX_LEN]))
    }

    /// Wraps an externally supplied id (import paths).
    ///
    /// Returns `None` for blank input.
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ConversationId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// One bookmarked conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationRecord {
    pub id: ConversationId,
    #[serde(default)]
    pub title: String,
    /// Newline-joined conversation text with code/math placeholders.
    #[serde(default)]
    pub body: String,
    /// Page the conversation was captured from.
    #[serde(default, rename = "url")]
    pub source_url: String,
    /// Category slot name; serialized as `""` when uncategorized.
    #[serde(default, with = "category_field")]
    pub category: Option<String>,
    #[serde(default)]
    pub saved_at: i64,
}

impl ConversationRecord {
    /// Creates an uncategorized record with a freshly generated id.
    pub fn new(
        title: impl Into<String>,
        body: impl Into<String>,
        source_url: impl Into<String>,
        saved_at: i64,
    ) -> Self {
        Self {
            id: ConversationId::generate(saved_at),
            title: title.into(),
            body: body.into(),
            source_url: source_url.into(),
            category: None,
            saved_at,
        }
    }

    /// Ghost records carry neither title nor body and are never surfaced.
    pub fn is_ghost(&self) -> bool {
        self.title.is_empty() && self.body.is_empty()
    }

    pub fn fingerprint(&self) -> i32 {
        fingerprint(&self.title, &self.body)
    }

    /// Body length in characters.
    pub fn body_len(&self) -> usize {
        self.body.chars().count()
    }

    pub fn is_uncategorized(&self) -> bool {
        self.category.is_none()
    }

    /// Short body excerpt for list rows.
    pub fn preview(&self) -> String {
        preview_text(&self.body, DEFAULT_PREVIEW_CHARS)
    }

    /// Index letter for the title: uppercase ASCII letter, otherwise `#`.
    pub fn title_initial(&self) -> char {
        match self.title.chars().next() {
            Some(first) if first.is_ascii_alphabetic() => first.to_ascii_uppercase(),
            _ => '#',
        }
    }
}

/// Returns the first `max_chars` characters of `text`, with `...` appended
/// when truncated.
pub fn preview_text(text: &str, max_chars: usize) -> String {
    let mut preview: String = text.chars().take(max_chars).collect();
    if text.chars().nth(max_chars).is_some() {
        preview.push_str("...");
    }
    preview
}

/// Normalizes an optional category name: blank means uncategorized.
pub fn normalize_category(name: Option<&str>) -> Option<String> {
    name.map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub(crate) mod category_field {
    use super::normalize_category;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<String>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(value.as_deref().unwrap_or(""))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<String>, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(normalize_category(raw.as_deref()))
    }
}
