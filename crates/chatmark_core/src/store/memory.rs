//! In-memory key-value store for headless use.

use super::{is_namespaced, KvResult, KvStore};
use serde_json::Value;
use std::cell::RefCell;
use std::collections::BTreeMap;

/// Ordered in-memory store.
///
/// Not thread-safe; the collection core is single-threaded.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RefCell<BTreeMap<String, Value>>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys held, namespaced or not.
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }
}

impl KvStore for MemoryKvStore {
    fn set(&self, key: &str, value: &Value) -> KvResult<()> {
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.clone());
        Ok(())
    }

    fn get(&self, key: &str) -> KvResult<Option<Value>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn list_all(&self) -> KvResult<Vec<(String, Value)>> {
        Ok(self
            .entries
            .borrow()
            .iter()
            .filter(|(key, _)| is_namespaced(key))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn delete(&self, key: &str) -> KvResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::MemoryKvStore;
    use crate::store::KvStore;
    use serde_json::json;

    #[test]
    fn get_or_falls_back_to_default() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get_or("cm_x", json!([])).unwrap(), json!([]));
        store.set("cm_x", &json!(["a"])).unwrap();
        assert_eq!(store.get_or("cm_x", json!([])).unwrap(), json!(["a"]));
    }

    #[test]
    fn list_all_is_namespace_scoped() {
        let store = MemoryKvStore::new();
        store.set("cm_one", &json!(1)).unwrap();
        store.set("foreign", &json!(2)).unwrap();
        assert_eq!(store.list_all().unwrap().len(), 1);
        assert_eq!(store.len(), 2);
    }
}
