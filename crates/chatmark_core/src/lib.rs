//! Core collection logic for chatmark.
//! This crate is the single source of truth for bookmark invariants.

pub mod capture;
pub mod clock;
pub mod config;
pub mod db;
pub mod hash;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod session;
pub mod store;

pub use capture::{
    CapturedConversation, Confirmer, ConversationSource, NoticeLevel, Notifier,
    CODE_BLOCK_PLACEHOLDER, MATH_PLACEHOLDER,
};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, CoreConfig};
pub use hash::fingerprint;
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::backup::{BackupDocument, BackupRecord, BACKUP_FORMAT_VERSION};
pub use model::conversation::{ConversationId, ConversationRecord};
pub use repo::category_repo::{CategoryRegistry, CATEGORY_SLOT_COUNT, DEFAULT_CATEGORY_NAMES};
pub use repo::conversation_repo::ConversationRepository;
pub use repo::{RepoError, RepoResult};
pub use service::backup_service::{BackupError, BackupResult, BackupService, ImportSummary};
pub use service::collection_service::{
    CategoryCounts, CategoryFilter, CollectionError, CollectionResult, CollectionService,
    ListFilter, SaveOutcome, SortKey,
};
pub use session::{Host, SaveAttempt, SaveGuard, Session, ViewSnapshot};
pub use store::{KvError, KvResult, KvStore, MemoryKvStore, SqliteKvStore};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
