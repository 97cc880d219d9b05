//! Session controller for one open collection panel.
//!
//! # Responsibility
//! - Hold view state (search term, active category, sort, selection) as
//!   explicit fields instead of ambient globals.
//! - Guard the "save current conversation" action against rapid repeats.
//! - Act as the user-facing error boundary: every failure is logged and
//!   reported through `Notifier`, never returned as an error.
//!
//! # Invariants
//! - At most one save runs at a time; saves within the cooldown after a
//!   finished save are throttled without touching the store.
//! - The selection only ever holds ids the user picked; deleting clears it.

use crate::capture::{
    normalize_captured_body, normalize_page_title, Confirmer, ConversationSource, NoticeLevel,
    Notifier,
};
use crate::clock::Clock;
use crate::config::CoreConfig;
use crate::model::conversation::{ConversationId, ConversationRecord};
use crate::service::backup_service::{BackupService, ImportSummary};
use crate::service::collection_service::{
    CategoryCounts, CategoryFilter, CollectionError, CollectionService, ListFilter, SaveOutcome,
    SortKey,
};
use crate::store::KvStore;
use log::{error, info};
use std::collections::BTreeSet;

/// Result of a user-triggered save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveAttempt {
    Saved(SaveOutcome),
    /// Dropped by the in-progress flag or the cooldown window.
    Throttled,
    /// The host page offered nothing to save.
    NothingCaptured,
    Failed,
}

/// Reentrancy flag plus cooldown for the save action.
///
/// The in-progress half only matters to hosts that split a save across
/// `try_begin`/`finish` calls (for example around an async capture).
/// [`Session::save_current`] holds `&mut self` for the whole save, so through
/// it only the cooldown is ever observable.
#[derive(Debug, Clone, Default)]
pub struct SaveGuard {
    in_progress: bool,
    cooldown_until: Option<i64>,
}

impl SaveGuard {
    /// Claims the guard. Returns `false` when a save is running or the
    /// cooldown has not elapsed.
    pub fn try_begin(&mut self, now_ms: i64) -> bool {
        if self.in_progress {
            return false;
        }
        if self.cooldown_until.is_some_and(|until| now_ms < until) {
            return false;
        }
        self.in_progress = true;
        true
    }

    /// Releases the guard and starts the cooldown window.
    pub fn finish(&mut self, now_ms: i64, cooldown_ms: i64) {
        self.in_progress = false;
        self.cooldown_until = Some(now_ms.saturating_add(cooldown_ms));
    }

    pub fn is_busy(&self) -> bool {
        self.in_progress
    }
}

/// Everything a renderer needs to draw the panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewSnapshot {
    pub records: Vec<ConversationRecord>,
    pub counts: CategoryCounts,
    pub category_names: Vec<String>,
    pub active_category: CategoryFilter,
    pub sort: SortKey,
    pub search_term: String,
    pub selected: usize,
}

/// Host capabilities consumed by the session.
pub struct Host<'a> {
    pub source: &'a dyn ConversationSource,
    pub notifier: &'a dyn Notifier,
    pub confirmer: &'a dyn Confirmer,
    pub clock: &'a dyn Clock,
}

/// Headless controller over one store.
pub struct Session<'a, S: KvStore + ?Sized> {
    collection: CollectionService<'a, S>,
    backup: BackupService<'a, S>,
    host: Host<'a>,
    config: CoreConfig,
    search_term: String,
    active_category: CategoryFilter,
    sort: SortKey,
    selection: BTreeSet<ConversationId>,
    save_guard: SaveGuard,
}

impl<'a, S: KvStore + ?Sized> Session<'a, S> {
    pub fn new(store: &'a S, host: Host<'a>, config: CoreConfig) -> Self {
        Self {
            collection: CollectionService::with_category_defaults(
                store,
                &config.default_category_names,
            ),
            backup: BackupService::with_category_defaults(store, &config.default_category_names),
            host,
            config,
            search_term: String::new(),
            active_category: CategoryFilter::All,
            sort: SortKey::default(),
            selection: BTreeSet::new(),
            save_guard: SaveGuard::default(),
        }
    }

    pub fn collection(&self) -> &CollectionService<'a, S> {
        &self.collection
    }

    /// Captures the current conversation and saves it.
    ///
    /// Runs synchronously under `&mut self`; repeated calls are throttled by
    /// the cooldown window, never by the in-progress flag.
    pub fn save_current(&mut self) -> SaveAttempt {
        let started_at = self.host.clock.now_ms();
        if !self.save_guard.try_begin(started_at) {
            info!("event=session_save module=session status=throttled");
            return SaveAttempt::Throttled;
        }

        let attempt = self.capture_and_save(started_at);
        let cooldown_ms = i64::try_from(self.config.save_cooldown_ms).unwrap_or(i64::MAX);
        self.save_guard
            .finish(self.host.clock.now_ms(), cooldown_ms);
        attempt
    }

    fn capture_and_save(&self, now_ms: i64) -> SaveAttempt {
        let Some(captured) = self.host.source.current_conversation() else {
            self.host
                .notifier
                .notify(NoticeLevel::Error, "No conversation content found");
            return SaveAttempt::NothingCaptured;
        };

        let title = normalize_page_title(
            &captured.page_title,
            &self.config.page_title_suffix,
            &self.config.untitled_label,
        );
        let body = normalize_captured_body(&captured.body);
        match self.collection.save(&title, &body, &captured.url, now_ms) {
            Ok(outcome) => {
                let message = match outcome {
                    SaveOutcome::Created(_) => "Conversation bookmarked",
                    SaveOutcome::Updated(_) => "Existing bookmark refreshed",
                };
                self.host.notifier.notify(NoticeLevel::Success, message);
                SaveAttempt::Saved(outcome)
            }
            Err(err) => {
                error!("event=session_save module=session status=error error={err}");
                self.host
                    .notifier
                    .notify(NoticeLevel::Error, "Failed to save conversation");
                SaveAttempt::Failed
            }
        }
    }

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn set_active_category(&mut self, category: CategoryFilter) {
        self.active_category = category;
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        self.sort = sort;
    }

    pub fn active_category(&self) -> &CategoryFilter {
        &self.active_category
    }

    /// Records matching the current view state.
    pub fn visible_records(&self) -> Vec<ConversationRecord> {
        let filter = ListFilter {
            category: self.active_category.clone(),
            search: Some(self.search_term.clone()),
        };
        self.collection.list(&filter, self.sort)
    }

    /// Toggles one id in the selection; returns whether it is now selected.
    pub fn toggle_selection(&mut self, id: &ConversationId) -> bool {
        if self.selection.remove(id) {
            false
        } else {
            self.selection.insert(id.clone());
            true
        }
    }

    /// Selects every currently visible record.
    pub fn select_all_visible(&mut self) {
        let visible: Vec<ConversationId> = self
            .visible_records()
            .into_iter()
            .map(|record| record.id)
            .collect();
        self.selection.extend(visible);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    pub fn is_selected(&self, id: &ConversationId) -> bool {
        self.selection.contains(id)
    }

    /// Removes every selected record after confirmation.
    ///
    /// Returns the number of records removed (0 when declined).
    pub fn delete_selected(&mut self) -> usize {
        if self.selection.is_empty() {
            return 0;
        }
        let message = if self.selection.len() == 1 {
            "Remove this bookmark? The original conversation is not deleted.".to_string()
        } else {
            format!(
                "Remove the {} selected bookmarks? The original conversations are not deleted.",
                self.selection.len()
            )
        };
        if !self.host.confirmer.confirm(&message) {
            return 0;
        }

        let removed = self.collection.remove_many(self.selection.iter());
        self.selection.clear();
        self.host
            .notifier
            .notify(NoticeLevel::Success, &format!("Removed {removed} bookmark(s)"));
        removed
    }

    /// Removes one record after confirmation.
    pub fn delete_one(&mut self, id: &ConversationId) -> bool {
        if !self
            .host
            .confirmer
            .confirm("Remove this bookmark? The original conversation is not deleted.")
        {
            return false;
        }
        match self.collection.remove(id) {
            Ok(()) => {
                self.selection.remove(id);
                self.host
                    .notifier
                    .notify(NoticeLevel::Success, "Bookmark removed");
                true
            }
            Err(err) => {
                error!("event=session_delete module=session status=error id={id} error={err}");
                self.host
                    .notifier
                    .notify(NoticeLevel::Error, "Failed to remove bookmark");
                false
            }
        }
    }

    /// Files one record under `category` (`""` clears it).
    pub fn assign_category(&self, id: &ConversationId, category: &str) -> bool {
        match self.collection.set_category(id, category) {
            Ok(true) => {
                self.host
                    .notifier
                    .notify(NoticeLevel::Success, "Category updated");
                true
            }
            Ok(false) => false,
            Err(CollectionError::UnknownCategory(name)) => {
                self.host
                    .notifier
                    .notify(NoticeLevel::Error, &format!("Unknown category: {name}"));
                false
            }
            Err(err) => {
                error!("event=session_categorize module=session status=error id={id} error={err}");
                self.host
                    .notifier
                    .notify(NoticeLevel::Error, "Failed to update category");
                false
            }
        }
    }

    /// Renames a slot and keeps the active filter pointed at it.
    pub fn rename_category(&mut self, index: usize, new_name: &str) -> bool {
        let old_name = self.collection.categories().get_all().get(index).cloned();
        if !self.collection.rename_category(index, new_name) {
            self.host.notifier.notify(
                NoticeLevel::Error,
                "Rename failed (the name may duplicate another category)",
            );
            return false;
        }
        if let Some(old_name) = old_name {
            if self.active_category == CategoryFilter::Named(old_name) {
                self.active_category = CategoryFilter::Named(new_name.trim().to_string());
            }
        }
        self.host
            .notifier
            .notify(NoticeLevel::Success, "Category renamed");
        true
    }

    pub fn category_counts(&self) -> CategoryCounts {
        self.collection.category_counts()
    }

    /// Exports a JSON backup; `None` on failure.
    pub fn export_backup(&self) -> Option<String> {
        match self.backup.export_json(self.host.clock.now_ms()) {
            Ok(json) => {
                self.host
                    .notifier
                    .notify(NoticeLevel::Success, "Backup exported");
                Some(json)
            }
            Err(err) => {
                error!("event=session_export module=session status=error error={err}");
                self.host
                    .notifier
                    .notify(NoticeLevel::Error, "Backup export failed");
                None
            }
        }
    }

    /// Imports a JSON backup; `None` on failure.
    pub fn import_backup(&mut self, text: &str) -> Option<ImportSummary> {
        match self.backup.import_json(text, self.host.clock.now_ms()) {
            Ok(summary) => {
                self.selection.clear();
                self.host.notifier.notify(
                    NoticeLevel::Success,
                    &format!("Imported {} bookmark(s)", summary.imported_count),
                );
                Some(summary)
            }
            Err(err) => {
                error!("event=session_import module=session status=error error={err}");
                self.host
                    .notifier
                    .notify(NoticeLevel::Error, &format!("Import failed: {err}"));
                None
            }
        }
    }

    pub fn backup_reminder_due(&self) -> bool {
        self.backup.reminder_due(
            self.host.clock.now_ms(),
            self.config.backup_reminder_interval_ms(),
        )
    }

    pub fn disable_backup_reminder(&self) {
        if let Err(err) = self.backup.set_reminder_disabled(true) {
            error!("event=session_reminder module=session status=error error={err}");
            self.host
                .notifier
                .notify(NoticeLevel::Error, "Failed to update reminder setting");
        }
    }

    /// Builds the full panel state for a renderer.
    pub fn snapshot(&self) -> ViewSnapshot {
        ViewSnapshot {
            records: self.visible_records(),
            counts: self.category_counts(),
            category_names: self.collection.categories().get_all(),
            active_category: self.active_category.clone(),
            sort: self.sort,
            search_term: self.search_term.clone(),
            selected: self.selection.len(),
        }
    }
}
