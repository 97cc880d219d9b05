use chatmark_core::db::open_db_in_memory;
use chatmark_core::store::{LAST_BACKUP_KEY, RECORD_KEY_PREFIX};
use chatmark_core::{
    BackupDocument, BackupError, BackupRecord, BackupService, CategoryFilter, CategoryRegistry,
    CollectionService, ConversationId, KvStore, ListFilter, MemoryKvStore, SortKey,
    SqliteKvStore, BACKUP_FORMAT_VERSION, CATEGORY_SLOT_COUNT,
};
use serde_json::json;

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

fn seed(service: &CollectionService<'_, MemoryKvStore>) -> Vec<ConversationId> {
    let a = service.save("Alpha", "first body", "https://c/1", 10).unwrap();
    let b = service
        .save("Beta", "second, longer body", "https://c/2", 20)
        .unwrap();
    let c = service.save("Gamma", "third", "https://c/3", 30).unwrap();
    service.set_category(a.id(), "Math").unwrap();
    service.set_category(c.id(), "English").unwrap();
    vec![a.id().clone(), b.id().clone(), c.id().clone()]
}

fn all_records(
    service: &CollectionService<'_, MemoryKvStore>,
) -> Vec<chatmark_core::ConversationRecord> {
    service.list(&ListFilter::category(CategoryFilter::All), SortKey::TimeDesc)
}

#[test]
fn export_then_import_leaves_store_unchanged() {
    let store = MemoryKvStore::new();
    let collection = CollectionService::new(&store);
    let backup = BackupService::new(&store);
    seed(&collection);
    assert!(collection.categories().rename(5, "Hobbies"));

    let before = all_records(&collection);
    let names_before = collection.categories().get_all();

    let json = backup.export_json(1_000).unwrap();
    let summary = backup.import_json(&json, 2_000).unwrap();

    assert_eq!(summary.imported_count, 3);
    assert!(summary.categories_replaced);
    assert_eq!(all_records(&collection), before);
    assert_eq!(collection.categories().get_all(), names_before);
}

#[test]
fn export_snapshot_excludes_ghosts_and_carries_ids() {
    let store = MemoryKvStore::new();
    store
        .set(&format!("{RECORD_KEY_PREFIX}ghost"), &json!({ "title": "", "body": "" }))
        .unwrap();
    let collection = CollectionService::new(&store);
    let ids = seed(&collection);
    let backup = BackupService::new(&store);

    let document = backup.export(5_000).unwrap();
    assert_eq!(document.format_version, BACKUP_FORMAT_VERSION);
    assert_eq!(document.exported_at, 5_000);
    assert_eq!(document.category_names.len(), CATEGORY_SLOT_COUNT);
    assert_eq!(document.records.len(), 3);
    for id in &ids {
        assert!(document
            .records
            .iter()
            .any(|record| record.id.as_deref() == Some(id.as_str())));
    }
    assert_eq!(backup.last_backup_at(), Some(5_000));
}

#[test]
fn import_overwrites_existing_id_in_place() {
    let store = MemoryKvStore::new();
    let collection = CollectionService::new(&store);
    let ids = seed(&collection);
    let backup = BackupService::new(&store);

    let document = BackupDocument {
        format_version: BACKUP_FORMAT_VERSION,
        exported_at: 0,
        category_names: Vec::new(),
        records: vec![BackupRecord {
            id: Some(ids[0].as_str().to_string()),
            title: "Alpha (edited)".to_string(),
            body: "replaced".to_string(),
            url: "https://c/new".to_string(),
            category: None,
            saved_at: 99,
        }],
    };
    let summary = backup.import(document, 100).unwrap();

    assert_eq!(summary.imported_count, 1);
    assert!(!summary.categories_replaced);
    let records = all_records(&collection);
    assert_eq!(records.len(), 3);
    let edited = collection.get(&ids[0]).unwrap().unwrap();
    assert_eq!(edited.title, "Alpha (edited)");
    assert_eq!(edited.category, None);
    assert_eq!(edited.saved_at, 99);
}

#[test]
fn importing_twice_is_idempotent_with_ids_and_duplicates_without() {
    let store = MemoryKvStore::new();
    let backup = BackupService::new(&store);
    let collection = CollectionService::new(&store);
    let with_ids = json!({
        "records": [
            { "id": "fixed_1", "title": "One", "body": "1", "savedAt": 1 },
            { "id": "fixed_2", "title": "Two", "body": "2", "savedAt": 2 }
        ]
    })
    .to_string();
    backup.import_json(&with_ids, 10).unwrap();
    backup.import_json(&with_ids, 20).unwrap();
    assert_eq!(all_records(&collection).len(), 2);

    let without_ids = json!({ "records": [ { "title": "Loose", "body": "x" } ] }).to_string();
    backup.import_json(&without_ids, 30).unwrap();
    backup.import_json(&without_ids, 31).unwrap();
    assert_eq!(all_records(&collection).len(), 4);
}

#[test]
fn import_rejects_missing_or_non_list_records_without_mutation() {
    let store = MemoryKvStore::new();
    let collection = CollectionService::new(&store);
    seed(&collection);
    let backup = BackupService::new(&store);
    let names_before = collection.categories().get_all();
    let before = all_records(&collection);

    for bad in [
        json!({ "categoryNames": ["a", "b", "c", "d", "e", "f"] }),
        json!({ "records": "nope", "categoryNames": ["a", "b", "c", "d", "e", "f"] }),
        json!({ "records": { "id": "x" } }),
        json!({ "records": null }),
    ] {
        let err = backup.import_json(&bad.to_string(), 10).unwrap_err();
        assert!(matches!(err, BackupError::Format(_)), "{bad}");
    }
    assert!(matches!(
        backup.import_json("not json at all", 10).unwrap_err(),
        BackupError::Format(_)
    ));

    assert_eq!(all_records(&collection), before);
    assert_eq!(collection.categories().get_all(), names_before);
    assert_eq!(store.get(LAST_BACKUP_KEY).unwrap(), None);
}

#[test]
fn import_rejects_newer_format_versions() {
    let store = MemoryKvStore::new();
    let backup = BackupService::new(&store);
    let doc = json!({ "formatVersion": BACKUP_FORMAT_VERSION + 1, "records": [] });

    let err = backup.import_json(&doc.to_string(), 1).unwrap_err();
    assert!(matches!(err, BackupError::UnsupportedVersion { .. }));
}

#[test]
fn category_names_replace_registry_only_with_exact_count() {
    let store = MemoryKvStore::new();
    let backup = BackupService::new(&store);
    let registry = CategoryRegistry::new(&store);
    let defaults = registry.get_all();

    let short = json!({ "records": [], "categoryNames": ["x", "y"] });
    let summary = backup.import_json(&short.to_string(), 1).unwrap();
    assert!(!summary.categories_replaced);
    assert_eq!(registry.get_all(), defaults);

    let full = json!({ "records": [], "categoryNames": ["u", "v", "w", "x", "y", "z"] });
    let summary = backup.import_json(&full.to_string(), 2).unwrap();
    assert!(summary.categories_replaced);
    assert_eq!(registry.get_all(), vec!["u", "v", "w", "x", "y", "z"]);
}

#[test]
fn import_tolerates_odd_field_types_inside_a_valid_record_list() {
    let store = MemoryKvStore::new();
    let backup = BackupService::new(&store);
    let registry = CategoryRegistry::new(&store);
    let defaults = registry.get_all();
    let doc = json!({
        "categoryNames": [1, 2, 3, 4, 5, 6],
        "records": [
            { "id": 7, "title": "Numeric id", "body": "b", "savedAt": 5 },
            { "id": "named", "title": null, "body": "body only", "category": 9 },
            "not a record",
        ],
    });

    let summary = backup.import_json(&doc.to_string(), 1).unwrap();
    assert_eq!(summary.imported_count, 2);
    assert!(!summary.categories_replaced);
    assert_eq!(registry.get_all(), defaults);

    let collection = CollectionService::new(&store);
    let numeric = ConversationId::parse("7").unwrap();
    let stored = collection.get(&numeric).unwrap().unwrap();
    assert_eq!(stored.title, "Numeric id");
    assert_eq!(stored.saved_at, 5);
    assert!(store.get(&format!("{RECORD_KEY_PREFIX}7")).unwrap().is_some());

    let named = ConversationId::parse("named").unwrap();
    let stored = collection.get(&named).unwrap().unwrap();
    assert_eq!(stored.title, "");
    assert_eq!(stored.category, None);

    backup.import_json(&doc.to_string(), 2).unwrap();
    assert_eq!(all_records(&collection).len(), 2);
}

#[test]
fn ghost_records_in_backup_are_skipped() {
    let store = MemoryKvStore::new();
    let backup = BackupService::new(&store);
    let doc = json!({ "records": [ { "id": "g", "title": "", "body": "" }, { "title": "t" } ] });

    let summary = backup.import_json(&doc.to_string(), 1).unwrap();
    assert_eq!(summary.imported_count, 1);
}

#[test]
fn round_trip_works_over_sqlite_store() {
    let conn = open_db_in_memory().unwrap();
    let store = SqliteKvStore::new(&conn);
    let collection = CollectionService::new(&store);
    collection.save("Persisted", "body", "u", 7).unwrap();
    let backup = BackupService::new(&store);
    let json = backup.export_json(8).unwrap();

    let restored_conn = open_db_in_memory().unwrap();
    let restored_store = SqliteKvStore::new(&restored_conn);
    let restored = BackupService::new(&restored_store);
    restored.import_json(&json, 9).unwrap();

    let original = collection.list(&ListFilter::default(), SortKey::TimeDesc);
    let copied =
        CollectionService::new(&restored_store).list(&ListFilter::default(), SortKey::TimeDesc);
    assert_eq!(original, copied);
}

#[test]
fn reminder_is_due_only_with_records_and_stale_backup() {
    let store = MemoryKvStore::new();
    let backup = BackupService::new(&store);
    let collection = CollectionService::new(&store);

    assert!(!backup.reminder_due(0, 7 * DAY_MS));

    collection.save("T", "B", "u", 0).unwrap();
    assert!(backup.reminder_due(0, 7 * DAY_MS));

    backup.export(DAY_MS).unwrap();
    assert!(!backup.reminder_due(2 * DAY_MS, 7 * DAY_MS));
    assert!(backup.reminder_due(8 * DAY_MS, 7 * DAY_MS));

    backup.set_reminder_disabled(true).unwrap();
    assert!(backup.reminder_disabled());
    assert!(!backup.reminder_due(30 * DAY_MS, 7 * DAY_MS));
}
