use chrono::{Duration, TimeZone, Utc};
use pneuqueue::{Error, HistoryFilter, NewServiceRecord, QueueStore};
use tempfile::TempDir;

/// Crée une base temporaire pour les tests
fn create_test_store() -> (TempDir, QueueStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("queue").join("queue.db");
    let store = QueueStore::open(&db_path).unwrap();
    (temp_dir, store)
}

fn new_record(plate: &str) -> NewServiceRecord {
    NewServiceRecord::new(plate, "Onix", "Preto", ["Alinhamento", "Balanceamento"])
}

#[test]
fn test_store_open_creates_database() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("nested").join("queue.db");
    assert!(QueueStore::open(&db_path).is_ok());
    assert!(db_path.exists());
}

#[test]
fn test_insert_assigns_unique_ids() {
    let (_temp_dir, store) = create_test_store();
    let now = Utc::now();

    let a = store.insert(&new_record("AAA1111"), now).unwrap();
    let b = store.insert(&new_record("BBB2222"), now).unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(a.services, vec!["Alinhamento", "Balanceamento"]);
    assert!(a.is_open());
    assert_eq!(store.get(b.id).unwrap(), b);
}

#[test]
fn test_list_open_is_entry_descending() {
    let (_temp_dir, store) = create_test_store();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    let first = store.insert(&new_record("AAA1111"), t0).unwrap();
    let second = store
        .insert(&new_record("BBB2222"), t0 + Duration::minutes(5))
        .unwrap();
    let third = store
        .insert(&new_record("CCC3333"), t0 + Duration::minutes(10))
        .unwrap();
    store.finalize(second.id, t0 + Duration::minutes(20)).unwrap();

    let ids: Vec<i64> = store.list_open().unwrap().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![third.id, first.id]);
}

#[test]
fn test_finalize_sets_exit_once() {
    let (_temp_dir, store) = create_test_store();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let record = store.insert(&new_record("AAA1111"), t0).unwrap();

    let done = store.finalize(record.id, t0 + Duration::hours(1)).unwrap();
    assert_eq!(done.exited_at, Some(t0 + Duration::hours(1)));

    assert!(matches!(
        store.finalize(record.id, t0 + Duration::hours(2)),
        Err(Error::AlreadyFinalized(id)) if id == record.id
    ));
    assert_eq!(
        store.get(record.id).unwrap().exited_at,
        Some(t0 + Duration::hours(1))
    );
}

#[test]
fn test_finalize_never_exits_before_entry() {
    let (_temp_dir, store) = create_test_store();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let record = store.insert(&new_record("AAA1111"), t0).unwrap();

    let done = store.finalize(record.id, t0 - Duration::minutes(3)).unwrap();
    assert_eq!(done.exited_at, Some(t0));
}

#[test]
fn test_unknown_id_is_not_found() {
    let (_temp_dir, store) = create_test_store();
    assert!(matches!(store.get(42), Err(Error::NotFound(42))));
    assert!(matches!(
        store.finalize(42, Utc::now()),
        Err(Error::NotFound(42))
    ));
}

#[test]
fn test_history_filters_range_and_plate() {
    let (_temp_dir, store) = create_test_store();
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

    let old = store
        .insert(&new_record("OLD1234"), t0 - Duration::days(2))
        .unwrap();
    let a = store.insert(&new_record("ABC1D23"), t0).unwrap();
    let b = store
        .insert(&new_record("XYZ9K88"), t0 + Duration::hours(1))
        .unwrap();
    store.finalize(a.id, t0 + Duration::hours(2)).unwrap();

    let all = store.history(&HistoryFilter::default()).unwrap();
    assert_eq!(
        all.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![b.id, a.id, old.id]
    );

    let in_range = store
        .history(&HistoryFilter {
            from: Some(t0),
            to: Some(t0 + Duration::hours(1)),
            plate: None,
        })
        .unwrap();
    assert_eq!(
        in_range.iter().map(|r| r.id).collect::<Vec<_>>(),
        vec![b.id, a.id]
    );
    assert!(in_range.iter().any(|r| r.exited_at.is_some()));

    let by_plate = store
        .history(&HistoryFilter {
            plate: Some("abc-1".into()),
            ..Default::default()
        })
        .unwrap();
    assert_eq!(by_plate.len(), 1);
    assert_eq!(by_plate[0].id, a.id);
}

#[test]
fn test_records_survive_reopen() {
    let temp_dir = tempfile::tempdir().unwrap();
    let db_path = temp_dir.path().join("queue.db");

    let id = {
        let store = QueueStore::open(&db_path).unwrap();
        store.insert(&new_record("AAA1111"), Utc::now()).unwrap().id
    };

    let store = QueueStore::open(&db_path).unwrap();
    assert_eq!(store.get(id).unwrap().plate, "AAA1111");
}
