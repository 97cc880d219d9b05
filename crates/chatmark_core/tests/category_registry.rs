use chatmark_core::store::CATEGORIES_KEY;
use chatmark_core::{
    CategoryRegistry, KvError, KvResult, KvStore, MemoryKvStore, CATEGORY_SLOT_COUNT,
    DEFAULT_CATEGORY_NAMES,
};
use serde_json::{json, Value};

struct UnreadableStore;

impl KvStore for UnreadableStore {
    fn set(&self, _key: &str, _value: &Value) -> KvResult<()> {
        Err(KvError::Unavailable("read-only".to_string()))
    }

    fn get(&self, _key: &str) -> KvResult<Option<Value>> {
        Err(KvError::Unavailable("offline".to_string()))
    }

    fn list_all(&self) -> KvResult<Vec<(String, Value)>> {
        Err(KvError::Unavailable("offline".to_string()))
    }

    fn delete(&self, _key: &str) -> KvResult<()> {
        Err(KvError::Unavailable("offline".to_string()))
    }
}

#[test]
fn get_all_always_returns_fixed_slot_count() {
    let store = MemoryKvStore::new();
    let registry = CategoryRegistry::new(&store);

    assert_eq!(registry.get_all().len(), CATEGORY_SLOT_COUNT);

    store.set(CATEGORIES_KEY, &json!(["a", "b"])).unwrap();
    assert_eq!(registry.get_all().len(), CATEGORY_SLOT_COUNT);

    store.set(CATEGORIES_KEY, &json!(42)).unwrap();
    assert_eq!(registry.get_all().len(), CATEGORY_SLOT_COUNT);

    store.delete(CATEGORIES_KEY).unwrap();
    assert_eq!(registry.get_all().len(), CATEGORY_SLOT_COUNT);

    store
        .set(CATEGORIES_KEY, &json!(["1", "2", "3", "4", "5", "6", "7"]))
        .unwrap();
    assert_eq!(registry.get_all(), DEFAULT_CATEGORY_NAMES.to_vec());
}

#[test]
fn unreadable_store_falls_back_to_defaults() {
    let store = UnreadableStore;
    let registry = CategoryRegistry::new(&store);

    assert_eq!(registry.get_all(), DEFAULT_CATEGORY_NAMES.to_vec());
    assert!(!registry.rename(0, "Biology"));
}

#[test]
fn rename_rejects_duplicate_and_accepts_unique_name() {
    let store = MemoryKvStore::new();
    let registry = CategoryRegistry::new(&store);
    let names = registry.get_all();

    assert!(!registry.rename(1, &names[0]));
    assert_eq!(registry.get_all()[1], names[1]);

    assert!(registry.rename(1, "Z"));
    assert_eq!(registry.get_all()[1], "Z");
    assert_eq!(registry.get_all().len(), CATEGORY_SLOT_COUNT);
}

#[test]
fn rename_trims_before_checking_conflicts() {
    let store = MemoryKvStore::new();
    let registry = CategoryRegistry::new(&store);

    assert!(!registry.rename(3, "  Chemistry  "));
    assert!(registry.rename(3, "  Biology  "));
    assert_eq!(registry.index_of("Biology"), Some(3));
    assert_eq!(registry.index_of("Physics"), None);
}

#[test]
fn custom_stored_names_are_returned_unchanged() {
    let store = MemoryKvStore::new();
    let custom = json!(["W", "X", "Y", "Z", "Q", "R"]);
    store.set(CATEGORIES_KEY, &custom).unwrap();

    let registry = CategoryRegistry::new(&store);
    assert_eq!(registry.get_all(), vec!["W", "X", "Y", "Z", "Q", "R"]);
    assert_eq!(store.get(CATEGORIES_KEY).unwrap(), Some(custom));
}
