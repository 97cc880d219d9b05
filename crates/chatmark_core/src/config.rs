//! Runtime configuration for the collection core.
//!
//! # Invariants
//! - `CoreConfig::default()` always passes `validate()`.
//! - `default_category_names` has exactly [`CATEGORY_SLOT_COUNT`] entries.

use crate::repo::category_repo::{CATEGORY_SLOT_COUNT, DEFAULT_CATEGORY_NAMES};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

const DEFAULT_SAVE_COOLDOWN_MS: u64 = 1_000;
const DEFAULT_BACKUP_REMINDER_DAYS: u64 = 7;
const DEFAULT_TITLE_SUFFIX: &str = " - DeepSeek";
const DEFAULT_UNTITLED: &str = "DeepSeek Conversation";
const MS_PER_DAY: u64 = 24 * 60 * 60 * 1000;

/// Configuration error raised by [`CoreConfig::validate`] or JSON loading.
#[derive(Debug)]
pub enum ConfigError {
    Parse(serde_json::Error),
    ZeroCooldown,
    ZeroReminderInterval,
    CategoryCount { expected: usize, actual: usize },
    BlankCategoryName(usize),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "invalid config document: {err}"),
            Self::ZeroCooldown => write!(f, "save_cooldown_ms must be greater than zero"),
            Self::ZeroReminderInterval => {
                write!(f, "backup_reminder_days must be greater than zero")
            }
            Self::CategoryCount { expected, actual } => write!(
                f,
                "default_category_names must have {expected} entries, got {actual}"
            ),
            Self::BlankCategoryName(index) => {
                write!(f, "default_category_names[{index}] is blank")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Tunables shared by the session controller and the services.
///
/// Every field is optional in the JSON form and falls back to its default.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Quiet period after a save during which further saves are throttled.
    pub save_cooldown_ms: u64,
    /// Age after which an existing backup counts as stale.
    pub backup_reminder_days: u64,
    /// Suffix the host site appends to page titles.
    pub page_title_suffix: String,
    /// Title used when the page title is empty after suffix removal.
    pub untitled_label: String,
    /// Names written on first registry access.
    pub default_category_names: Vec<String>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            save_cooldown_ms: DEFAULT_SAVE_COOLDOWN_MS,
            backup_reminder_days: DEFAULT_BACKUP_REMINDER_DAYS,
            page_title_suffix: DEFAULT_TITLE_SUFFIX.to_string(),
            untitled_label: DEFAULT_UNTITLED.to_string(),
            default_category_names: DEFAULT_CATEGORY_NAMES
                .iter()
                .map(|name| (*name).to_string())
                .collect(),
        }
    }
}

impl CoreConfig {
    /// Parses a JSON config document and validates it.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.save_cooldown_ms == 0 {
            return Err(ConfigError::ZeroCooldown);
        }
        if self.backup_reminder_days == 0 {
            return Err(ConfigError::ZeroReminderInterval);
        }
        if self.default_category_names.len() != CATEGORY_SLOT_COUNT {
            return Err(ConfigError::CategoryCount {
                expected: CATEGORY_SLOT_COUNT,
                actual: self.default_category_names.len(),
            });
        }
        if let Some(index) = self
            .default_category_names
            .iter()
            .position(|name| name.trim().is_empty())
        {
            return Err(ConfigError::BlankCategoryName(index));
        }
        Ok(())
    }

    pub fn save_cooldown(&self) -> Duration {
        Duration::from_millis(self.save_cooldown_ms)
    }

    /// Reminder interval in milliseconds.
    pub fn backup_reminder_interval_ms(&self) -> i64 {
        i64::try_from(self.backup_reminder_days.saturating_mul(MS_PER_DAY)).unwrap_or(i64::MAX)
    }
}
