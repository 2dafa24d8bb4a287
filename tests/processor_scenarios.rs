use serde_json::{Value, json};

use tablesync::{
    backup::BackupRecord,
    op::TableOperation,
    processor::{Applied, OperationProcessor, ProcessError, ProcessorConfig, TombstonePolicy},
    store::{LocalStore, memory::MemoryStore},
    types::Document,
};

fn doc(v: Value) -> Document {
    match v {
        Value::Object(map) => map,
        other => panic!("not an object: {other}"),
    }
}

#[test]
fn widgets_insert_update_delete_lifecycle() {
    let mut store = MemoryStore::new();

    let mut processor = OperationProcessor::new(
        &mut store,
        Some(doc(json!({"id": "1", "name": "A"}))),
        "widgets_backup",
    );
    processor
        .visit(&TableOperation::insert("widgets", "1").unwrap())
        .unwrap();
    assert_eq!(
        store.lookup("widgets", "1").unwrap(),
        Some(doc(json!({"id": "1", "name": "A"})))
    );

    let mut processor = OperationProcessor::new(
        &mut store,
        Some(doc(json!({"id": "1", "name": "B"}))),
        "widgets_backup",
    );
    processor
        .visit(&TableOperation::update("widgets", "1").unwrap())
        .unwrap();
    assert_eq!(
        store.lookup("widgets", "1").unwrap(),
        Some(doc(json!({"id": "1", "name": "B"})))
    );

    let mut processor = OperationProcessor::new(&mut store, None, "widgets_backup");
    let applied = processor
        .visit(&TableOperation::delete("widgets", "1").unwrap())
        .unwrap();
    assert_eq!(
        applied,
        Applied::Deleted {
            backup_key: "widgets/1".to_string(),
            had_item: true,
        }
    );

    assert_eq!(store.lookup("widgets", "1").unwrap(), None);
    assert_eq!(
        store.lookup("widgets_backup", "widgets/1").unwrap(),
        Some(doc(json!({
            "id": "widgets/1",
            "tablename": "widgets",
            "itemid": "1",
            "clientitem": {"id": "1", "name": "B"},
        })))
    );
}

#[test]
fn update_replaces_instead_of_merging() {
    let mut store = MemoryStore::new();
    store
        .upsert("widgets", &doc(json!({"id": "1", "name": "A", "color": "red"})))
        .unwrap();

    let mut processor = OperationProcessor::new(
        &mut store,
        Some(doc(json!({"id": "1", "name": "B"}))),
        "widgets_backup",
    );
    processor
        .visit(&TableOperation::update("widgets", "1").unwrap())
        .unwrap();

    let stored = store.lookup("widgets", "1").unwrap().unwrap();
    assert!(!stored.contains_key("color"));
}

#[test]
fn deleting_missing_item_writes_empty_tombstone() {
    let mut store = MemoryStore::new();
    let mut processor = OperationProcessor::new(&mut store, None, "widgets_backup");

    let applied = processor
        .visit(&TableOperation::delete("widgets", "99").unwrap())
        .unwrap();
    assert_eq!(
        applied,
        Applied::Deleted {
            backup_key: "widgets/99".to_string(),
            had_item: false,
        }
    );

    let backup = store.lookup("widgets_backup", "widgets/99").unwrap().unwrap();
    assert_eq!(backup.get("clientitem"), Some(&Value::Null));
    assert_eq!(store.lookup("widgets", "99").unwrap(), None);
}

#[test]
fn delete_ignores_held_payload() {
    let mut store = MemoryStore::new();
    store
        .upsert("widgets", &doc(json!({"id": "1", "name": "stored"})))
        .unwrap();

    let mut processor = OperationProcessor::new(
        &mut store,
        Some(doc(json!({"id": "1", "name": "held"}))),
        "widgets_backup",
    );
    processor
        .visit(&TableOperation::delete("widgets", "1").unwrap())
        .unwrap();

    let record = BackupRecord::from_document(
        store.lookup("widgets_backup", "widgets/1").unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(record.clientitem, Some(doc(json!({"id": "1", "name": "stored"}))));
}

#[test]
fn retried_delete_keeps_first_pre_image_by_default() {
    let mut store = MemoryStore::new();
    store
        .upsert("widgets", &doc(json!({"id": "1", "name": "B"})))
        .unwrap();
    let op = TableOperation::delete("widgets", "1").unwrap();

    let mut processor = OperationProcessor::new(&mut store, None, "widgets_backup");
    processor.visit(&op).unwrap();
    let retried = processor.visit(&op).unwrap();
    assert_eq!(
        retried,
        Applied::DeletedPreservingBackup {
            backup_key: "widgets/1".to_string(),
        }
    );

    let record = BackupRecord::from_document(
        store.lookup("widgets_backup", "widgets/1").unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(record.clientitem, Some(doc(json!({"id": "1", "name": "B"}))));
}

#[test]
fn overwrite_policy_replaces_pre_image_on_retry() {
    let mut store = MemoryStore::new();
    store
        .upsert("widgets", &doc(json!({"id": "1", "name": "B"})))
        .unwrap();
    let op = TableOperation::delete("widgets", "1").unwrap();
    let config = ProcessorConfig {
        backup_table: "widgets_backup".to_string(),
        tombstone_policy: TombstonePolicy::Overwrite,
    };

    let mut processor = OperationProcessor::with_config(&mut store, None, config);
    processor.visit(&op).unwrap();
    processor.visit(&op).unwrap();

    let record = BackupRecord::from_document(
        store.lookup("widgets_backup", "widgets/1").unwrap().unwrap(),
    )
    .unwrap();
    assert_eq!(record.clientitem, None);
}

#[test]
fn insert_without_payload_is_rejected_before_touching_store() {
    let mut store = MemoryStore::new();
    let mut processor = OperationProcessor::new(&mut store, None, "widgets_backup");

    let err = processor
        .visit(&TableOperation::insert("widgets", "1").unwrap())
        .unwrap_err();
    assert!(matches!(err, ProcessError::MissingItem { .. }));
    assert!(store.table_names().is_empty());
}

#[test]
fn payload_id_must_match_operation() {
    let mut store = MemoryStore::new();
    let mut processor = OperationProcessor::new(
        &mut store,
        Some(doc(json!({"id": "2", "name": "A"}))),
        "widgets_backup",
    );

    let err = processor
        .visit(&TableOperation::insert("widgets", "1").unwrap())
        .unwrap_err();
    match err {
        ProcessError::ItemIdMismatch { expected, found } => {
            assert_eq!(expected, "1");
            assert_eq!(found.as_deref(), Some("2"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert_eq!(store.lookup("widgets", "2").unwrap(), None);
}

#[test]
fn set_item_swaps_payload_for_retry() {
    let mut store = MemoryStore::new();
    let op = TableOperation::update("widgets", "1").unwrap();

    let mut processor = OperationProcessor::new(
        &mut store,
        Some(doc(json!({"id": "1", "name": "stale"}))),
        "widgets_backup",
    );
    processor.visit(&op).unwrap();
    processor.set_item(Some(doc(json!({"id": "1", "name": "fresh"}))));
    assert_eq!(processor.item().and_then(|d| d.get("name")), Some(&json!("fresh")));
    assert_eq!(processor.backup_table(), "widgets_backup");
    processor.visit(&op).unwrap();

    assert_eq!(
        store.lookup("widgets", "1").unwrap(),
        Some(doc(json!({"id": "1", "name": "fresh"})))
    );
}
