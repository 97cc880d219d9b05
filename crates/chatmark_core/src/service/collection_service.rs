//! Collection store use-cases.
//!
//! # Responsibility
//! - Deduplicating save (upsert by content fingerprint).
//! - Filtered, stably sorted listing and derived per-category counts.
//! - Category assignment and slot renames that keep records attached.
//!
//! # Invariants
//! - No two records written by `save` share a fingerprint.
//! - `save` never writes a ghost record.
//! - Ghost records never appear in `list` results or counts.
//! - Sorting is stable: ties keep store order.

use crate::model::conversation::{normalize_category, ConversationId, ConversationRecord};
use crate::repo::category_repo::CategoryRegistry;
use crate::repo::conversation_repo::ConversationRepository;
use crate::repo::RepoError;
use crate::store::KvStore;
use log::{error, info, warn};
use std::cmp::Ordering;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CollectionResult<T> = Result<T, CollectionError>;

/// Service error for collection use-cases.
#[derive(Debug)]
pub enum CollectionError {
    /// Title and body are both empty; such a record would be a ghost.
    EmptyContent,
    /// The name is not one of the registry's slots.
    UnknownCategory(String),
    /// Persistence-layer failure.
    Repo(RepoError),
}

impl Display for CollectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyContent => write!(f, "conversation has neither title nor body"),
            Self::UnknownCategory(name) => write!(f, "no category slot named `{name}`"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for CollectionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            Self::EmptyContent | Self::UnknownCategory(_) => None,
        }
    }
}

impl From<RepoError> for CollectionError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

/// Result of a deduplicating save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    /// A new record was written.
    Created(ConversationId),
    /// An existing record with identical content was refreshed.
    Updated(ConversationId),
}

impl SaveOutcome {
    pub fn id(&self) -> &ConversationId {
        match self {
            Self::Created(id) | Self::Updated(id) => id,
        }
    }
}

/// Category half of a list filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Uncategorized,
    Named(String),
}

impl CategoryFilter {
    /// Parses the stable filter ids `all`, `uncategorized`, or a slot name.
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "all" => Self::All,
            "uncategorized" => Self::Uncategorized,
            name => Self::Named(name.to_string()),
        }
    }

    pub fn matches(&self, record: &ConversationRecord) -> bool {
        match self {
            Self::All => true,
            Self::Uncategorized => record.category.is_none(),
            Self::Named(name) => record.category.as_deref() == Some(name.as_str()),
        }
    }
}

/// Category filter AND optional case-insensitive search term.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListFilter {
    pub category: CategoryFilter,
    pub search: Option<String>,
}

impl ListFilter {
    pub fn category(category: CategoryFilter) -> Self {
        Self {
            category,
            search: None,
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    fn matches(&self, record: &ConversationRecord, needle: Option<&str>) -> bool {
        if !self.category.matches(record) {
            return false;
        }
        match needle {
            Some(needle) => {
                record.title.to_lowercase().contains(needle)
                    || record.body.to_lowercase().contains(needle)
            }
            None => true,
        }
    }

    /// Lowercased term, matched verbatim; only an empty term disables search.
    fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

/// List ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortKey {
    #[default]
    TimeDesc,
    TimeAsc,
    LengthDesc,
    LengthAsc,
    TitleAsc,
    TitleDesc,
}

impl SortKey {
    pub const ALL: [SortKey; 6] = [
        Self::TimeDesc,
        Self::TimeAsc,
        Self::LengthDesc,
        Self::LengthAsc,
        Self::TitleAsc,
        Self::TitleDesc,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::TimeDesc => "time-desc",
            Self::TimeAsc => "time-asc",
            Self::LengthDesc => "length-desc",
            Self::LengthAsc => "length-asc",
            Self::TitleAsc => "title-asc",
            Self::TitleDesc => "title-desc",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.as_str() == value.trim())
    }

    fn compare(self, a: &ConversationRecord, b: &ConversationRecord) -> Ordering {
        match self {
            Self::TimeDesc => b.saved_at.cmp(&a.saved_at),
            Self::TimeAsc => a.saved_at.cmp(&b.saved_at),
            Self::LengthDesc => b.body_len().cmp(&a.body_len()),
            Self::LengthAsc => a.body_len().cmp(&b.body_len()),
            Self::TitleAsc => compare_titles(&a.title, &b.title),
            Self::TitleDesc => compare_titles(&b.title, &a.title),
        }
    }
}

/// Record counts per category bucket, ghosts excluded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryCounts {
    pub all: usize,
    pub uncategorized: usize,
    /// `(slot name, count)` in slot order.
    pub slots: Vec<(String, usize)>,
}

/// Collection store facade.
pub struct CollectionService<'s, S: KvStore + ?Sized> {
    records: ConversationRepository<'s, S>,
    categories: CategoryRegistry<'s, S>,
}

impl<'s, S: KvStore + ?Sized> CollectionService<'s, S> {
    pub fn new(store: &'s S) -> Self {
        Self {
            records: ConversationRepository::new(store),
            categories: CategoryRegistry::new(store),
        }
    }

    /// Creates a service whose registry initializes with `default_names`.
    pub fn with_category_defaults(store: &'s S, default_names: &[String]) -> Self {
        Self {
            records: ConversationRepository::new(store),
            categories: CategoryRegistry::with_defaults(store, default_names),
        }
    }

    pub fn categories(&self) -> &CategoryRegistry<'s, S> {
        &self.categories
    }

    /// Saves a conversation, refreshing an existing record with the same
    /// content fingerprint instead of creating a duplicate.
    pub fn save(
        &self,
        title: &str,
        body: &str,
        source_url: &str,
        now_ms: i64,
    ) -> CollectionResult<SaveOutcome> {
        if title.is_empty() && body.is_empty() {
            return Err(CollectionError::EmptyContent);
        }
        let target = crate::hash::fingerprint(title, body);
        let existing = self
            .records
            .load_visible()?
            .into_iter()
            .find(|record| record.fingerprint() == target);

        if let Some(mut record) = existing {
            record.source_url = source_url.to_string();
            record.saved_at = now_ms;
            self.records.put(&record)?;
            info!("event=conversation_save module=service status=updated id={}", record.id);
            return Ok(SaveOutcome::Updated(record.id));
        }

        let record = ConversationRecord::new(title, body, source_url, now_ms);
        self.records.put(&record)?;
        info!("event=conversation_save module=service status=created id={}", record.id);
        Ok(SaveOutcome::Created(record.id))
    }

    /// Returns one visible record.
    pub fn get(&self, id: &ConversationId) -> CollectionResult<Option<ConversationRecord>> {
        Ok(self.records.get(id)?.filter(|record| !record.is_ghost()))
    }

    /// Deletes one record. Missing ids succeed.
    pub fn remove(&self, id: &ConversationId) -> CollectionResult<()> {
        self.records.delete(id)?;
        info!("event=conversation_remove module=service status=ok id={id}");
        Ok(())
    }

    /// Deletes every id, best-effort. Returns how many deletes succeeded.
    pub fn remove_many<'a>(&self, ids: impl IntoIterator<Item = &'a ConversationId>) -> usize {
        let mut removed = 0;
        for id in ids {
            match self.remove(id) {
                Ok(()) => removed += 1,
                Err(err) => {
                    error!(
                        "event=conversation_remove module=service status=error id={id} error={err}"
                    );
                }
            }
        }
        removed
    }

    /// Sets or clears (`""`) the category of one record.
    ///
    /// Returns `Ok(false)` when the record does not exist.
    ///
    /// # Errors
    /// - `UnknownCategory` when a non-blank name is not a registry slot.
    pub fn set_category(&self, id: &ConversationId, category: &str) -> CollectionResult<bool> {
        let category = normalize_category(Some(category));
        if let Some(name) = category.as_deref() {
            if self.categories.index_of(name).is_none() {
                return Err(CollectionError::UnknownCategory(name.to_string()));
            }
        }
        let Some(mut record) = self.records.get(id)? else {
            return Ok(false);
        };
        record.category = category;
        self.records.put(&record)?;
        info!(
            "event=conversation_categorize module=service status=ok id={id} uncategorized={}",
            record.is_uncategorized()
        );
        Ok(true)
    }

    /// Lists visible records matching `filter`, ordered by `sort`.
    ///
    /// Store read failures yield an empty list.
    pub fn list(&self, filter: &ListFilter, sort: SortKey) -> Vec<ConversationRecord> {
        let records = match self.records.load_visible() {
            Ok(records) => records,
            Err(err) => {
                warn!("event=conversation_list module=service status=fallback error={err}");
                return Vec::new();
            }
        };

        let needle = filter.normalized_search();
        let mut matched: Vec<ConversationRecord> = records
            .into_iter()
            .filter(|record| filter.matches(record, needle.as_deref()))
            .collect();
        matched.sort_by(|a, b| sort.compare(a, b));
        matched
    }

    /// Number of visible records in `category`, ignoring any search term.
    pub fn count(&self, category: &CategoryFilter) -> usize {
        match self.records.load_visible() {
            Ok(records) => records
                .iter()
                .filter(|record| category.matches(record))
                .count(),
            Err(err) => {
                warn!("event=conversation_count module=service status=fallback error={err}");
                0
            }
        }
    }

    /// Counts for the `all`, `uncategorized` and every slot bucket.
    pub fn category_counts(&self) -> CategoryCounts {
        let records = self.list(&ListFilter::default(), SortKey::default());
        let slots = self
            .categories
            .get_all()
            .into_iter()
            .map(|name| {
                let count = records
                    .iter()
                    .filter(|record| record.category.as_deref() == Some(name.as_str()))
                    .count();
                (name, count)
            })
            .collect();
        CategoryCounts {
            all: records.len(),
            uncategorized: records
                .iter()
                .filter(|record| record.is_uncategorized())
                .count(),
            slots,
        }
    }

    /// Renames slot `index` and moves records filed under the old name.
    ///
    /// Returns `false` when the registry rejects the rename.
    pub fn rename_category(&self, index: usize, new_name: &str) -> bool {
        let Some(old_name) = self.categories.get_all().get(index).cloned() else {
            return false;
        };
        if !self.categories.rename(index, new_name) {
            return false;
        }

        let new_name = new_name.trim();
        if new_name == old_name {
            return true;
        }
        match self.records.load_all() {
            Ok(records) => {
                for mut record in records {
                    if record.category.as_deref() != Some(old_name.as_str()) {
                        continue;
                    }
                    record.category = Some(new_name.to_string());
                    if let Err(err) = self.records.put(&record) {
                        error!(
                            "event=category_refile module=service status=error id={} error={err}",
                            record.id
                        );
                    }
                }
            }
            Err(err) => {
                warn!("event=category_refile module=service status=skipped error={err}");
            }
        }
        true
    }
}

/// Locale-style title comparison in three levels: base letters (case and
/// Latin accents ignored), then accents, then case with lowercase first.
///
/// Accent folding covers Latin-1 and Latin Extended-A; other scripts
/// compare by code point.
pub fn compare_titles(a: &str, b: &str) -> Ordering {
    base_letters(a)
        .cmp(base_letters(b))
        .then_with(|| lowercased(a).cmp(lowercased(b)))
        .then_with(|| b.cmp(a))
}

fn lowercased(title: &str) -> impl Iterator<Item = char> + '_ {
    title.chars().flat_map(char::to_lowercase)
}

fn base_letters(title: &str) -> impl Iterator<Item = char> + '_ {
    lowercased(title).map(strip_accent)
}

fn strip_accent(letter: char) -> char {
    match letter {
        'à'..='å' | 'ā' | 'ă' | 'ą' => 'a',
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => 'c',
        'ď' | 'đ' => 'd',
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => 'e',
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => 'g',
        'ĥ' | 'ħ' => 'h',
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => 'i',
        'ĵ' => 'j',
        'ķ' => 'k',
        'ĺ' | 'ļ' | 'ľ' | 'ŀ' | 'ł' => 'l',
        'ñ' | 'ń' | 'ņ' | 'ň' => 'n',
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => 'o',
        'ŕ' | 'ŗ' | 'ř' => 'r',
        'ś' | 'ŝ' | 'ş' | 'š' => 's',
        'ţ' | 'ť' | 'ŧ' => 't',
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => 'u',
        'ŵ' => 'w',
        'ý' | 'ÿ' | 'ŷ' => 'y',
        'ź' | 'ż' | 'ž' => 'z',
        other => other,
    }
}
