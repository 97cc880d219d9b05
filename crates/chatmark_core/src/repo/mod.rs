//! Repository layer over the key-value store.
//!
//! # Responsibility
//! - Map domain types to the persisted key layout.
//! - Repair or skip malformed persisted state instead of failing reads.
//!
//! # Invariants
//! - Record keys are `RECORD_KEY_PREFIX + id`.
//! - The category sequence always reads back with exactly
//!   `CATEGORY_SLOT_COUNT` entries.

use crate::store::KvError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod category_repo;
pub mod conversation_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for record persistence.
#[derive(Debug)]
pub enum RepoError {
    Store(KvError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
        }
    }
}

impl From<KvError> for RepoError {
    fn from(value: KvError) -> Self {
        Self::Store(value)
    }
}
