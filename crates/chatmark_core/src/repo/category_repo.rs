//! Fixed-cardinality category registry.
//!
//! # Responsibility
//! - Persist the ordered category-name sequence under one well-known key.
//! - Auto-repair missing or malformed state by reinitializing to defaults.
//!
//! # Invariants
//! - `get_all()` always returns exactly `CATEGORY_SLOT_COUNT` names.
//! - Slots are renamed, never added or removed.
//! - No two slots share a name after a successful `rename`.

use crate::store::{KvStore, CATEGORIES_KEY};
use log::{error, info, warn};
use serde_json::Value;

/// Number of category slots.
pub const CATEGORY_SLOT_COUNT: usize = 6;

/// Names written on first access.
pub const DEFAULT_CATEGORY_NAMES: [&str; CATEGORY_SLOT_COUNT] = [
    "Chemistry",
    "English",
    "Math",
    "Physics",
    "Computer Science",
    "School Life",
];

/// Registry of the fixed category slots.
pub struct CategoryRegistry<'s, S: KvStore + ?Sized> {
    store: &'s S,
    defaults: Vec<String>,
}

impl<'s, S: KvStore + ?Sized> CategoryRegistry<'s, S> {
    /// Creates a registry seeded with [`DEFAULT_CATEGORY_NAMES`].
    pub fn new(store: &'s S) -> Self {
        Self {
            store,
            defaults: builtin_defaults(),
        }
    }

    /// Creates a registry with caller-provided defaults.
    ///
    /// Defaults with the wrong length are ignored in favour of the built-in
    /// set.
    pub fn with_defaults(store: &'s S, defaults: &[String]) -> Self {
        let defaults = if defaults.len() == CATEGORY_SLOT_COUNT {
            defaults.to_vec()
        } else {
            warn!(
                "event=category_defaults module=repo status=ignored count={}",
                defaults.len()
            );
            builtin_defaults()
        };
        Self { store, defaults }
    }

    pub fn slot_count(&self) -> usize {
        CATEGORY_SLOT_COUNT
    }

    /// Returns all slot names, initializing storage when needed.
    pub fn get_all(&self) -> Vec<String> {
        match self.store.get(CATEGORIES_KEY) {
            Ok(Some(value)) => match parse_names(&value) {
                Some(names) => names,
                None => {
                    warn!("event=category_load module=repo status=repaired reason=malformed");
                    self.persist(&self.defaults);
                    self.defaults.clone()
                }
            },
            Ok(None) => {
                info!("event=category_load module=repo status=initialized");
                self.persist(&self.defaults);
                self.defaults.clone()
            }
            Err(err) => {
                warn!("event=category_load module=repo status=fallback error={err}");
                self.defaults.clone()
            }
        }
    }

    /// Renames slot `index`.
    ///
    /// Returns `false` without mutation when the index is out of range, the
    /// trimmed name is empty, or another slot already has that name.
    pub fn rename(&self, index: usize, new_name: &str) -> bool {
        let trimmed = new_name.trim();
        if index >= CATEGORY_SLOT_COUNT || trimmed.is_empty() {
            return false;
        }

        let mut names = self.get_all();
        let conflict = names
            .iter()
            .enumerate()
            .any(|(slot, name)| slot != index && name == trimmed);
        if conflict {
            info!(
                "event=category_rename module=repo status=rejected index={index} reason=duplicate"
            );
            return false;
        }

        names[index] = trimmed.to_string();
        if !self.persist(&names) {
            return false;
        }
        info!("event=category_rename module=repo status=ok index={index}");
        true
    }

    /// Returns the slot holding `name`, if any.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.get_all().iter().position(|current| current == name)
    }

    /// Replaces every slot name at once.
    ///
    /// Only accepts exactly `CATEGORY_SLOT_COUNT` names; blank entries fall
    /// back to the default name of that slot.
    pub fn replace_all(&self, names: &[String]) -> bool {
        if names.len() != CATEGORY_SLOT_COUNT {
            return false;
        }
        let normalized: Vec<String> = names
            .iter()
            .zip(&self.defaults)
            .map(|(name, fallback)| {
                let trimmed = name.trim();
                if trimmed.is_empty() {
                    fallback.clone()
                } else {
                    trimmed.to_string()
                }
            })
            .collect();
        self.persist(&normalized)
    }

    fn persist(&self, names: &[String]) -> bool {
        let value = Value::Array(names.iter().cloned().map(Value::String).collect());
        match self.store.set(CATEGORIES_KEY, &value) {
            Ok(()) => true,
            Err(err) => {
                error!("event=category_save module=repo status=error error={err}");
                false
            }
        }
    }
}

fn builtin_defaults() -> Vec<String> {
    DEFAULT_CATEGORY_NAMES
        .iter()
        .map(|name| (*name).to_string())
        .collect()
}

fn parse_names(value: &Value) -> Option<Vec<String>> {
    let items = value.as_array()?;
    if items.len() != CATEGORY_SLOT_COUNT {
        return None;
    }
    items
        .iter()
        .map(|item| item.as_str().map(str::to_string))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{CategoryRegistry, CATEGORY_SLOT_COUNT, DEFAULT_CATEGORY_NAMES};
    use crate::store::{KvStore, MemoryKvStore, CATEGORIES_KEY};
    use serde_json::json;

    #[test]
    fn first_access_persists_defaults() {
        let store = MemoryKvStore::new();
        let registry = CategoryRegistry::new(&store);

        let names = registry.get_all();
        assert_eq!(names, DEFAULT_CATEGORY_NAMES.to_vec());
        assert_eq!(
            store.get(CATEGORIES_KEY).unwrap(),
            Some(json!(DEFAULT_CATEGORY_NAMES))
        );
    }

    #[test]
    fn corrupted_state_is_repaired() {
        let store = MemoryKvStore::new();
        let registry = CategoryRegistry::new(&store);
        for corrupted in [
            json!(["only", "three", "names"]),
            json!("not a list"),
            json!([1, 2, 3, 4, 5, 6]),
            json!({"a": 1}),
        ] {
            store.set(CATEGORIES_KEY, &corrupted).unwrap();
            assert_eq!(registry.get_all().len(), CATEGORY_SLOT_COUNT);
            assert_eq!(
                store.get(CATEGORIES_KEY).unwrap(),
                Some(json!(DEFAULT_CATEGORY_NAMES))
            );
        }
    }

    #[test]
    fn rename_rejects_out_of_range_and_blank() {
        let store = MemoryKvStore::new();
        let registry = CategoryRegistry::new(&store);
        assert!(!registry.rename(CATEGORY_SLOT_COUNT, "Z"));
        assert!(!registry.rename(0, "   "));
        assert_eq!(registry.get_all(), DEFAULT_CATEGORY_NAMES.to_vec());
    }

    #[test]
    fn rename_to_own_name_is_allowed() {
        let store = MemoryKvStore::new();
        let registry = CategoryRegistry::new(&store);
        assert!(registry.rename(2, " Math "));
        assert_eq!(registry.get_all()[2], "Math");
    }

    #[test]
    fn replace_all_requires_exact_count_and_fills_blanks() {
        let store = MemoryKvStore::new();
        let registry = CategoryRegistry::new(&store);
        assert!(!registry.replace_all(&["a".to_string()]));

        let names: Vec<String> = ["a", "", "c", "d", "e", "f"]
            .iter()
            .map(|name| name.to_string())
            .collect();
        assert!(registry.replace_all(&names));
        assert_eq!(registry.get_all(), vec!["a", "English", "c", "d", "e", "f"]);
    }

    #[test]
    fn with_defaults_ignores_wrong_length() {
        let store = MemoryKvStore::new();
        let registry = CategoryRegistry::with_defaults(&store, &["x".to_string()]);
        assert_eq!(registry.get_all(), DEFAULT_CATEGORY_NAMES.to_vec());
    }
}
