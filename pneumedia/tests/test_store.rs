use pneumedia::{Error, MediaKind, NewPlaylistItem, PlaylistStore};
use tempfile::TempDir;

/// Crée une base temporaire pour les tests
fn create_test_store() -> (TempDir, PlaylistStore) {
    let temp_dir = tempfile::tempdir().unwrap();
    let store = PlaylistStore::open(&temp_dir.path().join("media.db")).unwrap();
    (temp_dir, store)
}

#[test]
fn test_add_appends_at_end() {
    let (_temp_dir, store) = create_test_store();

    let a = store.add(&NewPlaylistItem::image("/media/a.jpg")).unwrap();
    let b = store
        .add(&NewPlaylistItem::video("/media/b.mp4").with_interval(5))
        .unwrap();

    assert_eq!(a.position, 0);
    assert_eq!(b.position, 1);
    assert_eq!(b.kind, MediaKind::Video);
    assert_eq!(b.min_interval_minutes, 5);
}

#[test]
fn test_list_follows_position() {
    let (_temp_dir, store) = create_test_store();

    let late = store.add(&NewPlaylistItem::image("late.jpg").at(10)).unwrap();
    let early = store.add(&NewPlaylistItem::image("early.jpg").at(1)).unwrap();

    let ids: Vec<i64> = store.list().unwrap().iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![early.id, late.id]);
}

#[test]
fn test_update_keeps_position_when_absent() {
    let (_temp_dir, store) = create_test_store();
    let item = store.add(&NewPlaylistItem::image("a.jpg").at(4)).unwrap();

    let updated = store
        .update(item.id, &NewPlaylistItem::image("b.jpg").with_duration(20))
        .unwrap();
    assert_eq!(updated.position, 4);
    assert_eq!(updated.source, "b.jpg");
    assert_eq!(updated.duration_secs, Some(20));

    assert!(matches!(
        store.update(99, &NewPlaylistItem::image("c.jpg")),
        Err(Error::NotFound(99))
    ));
}

#[test]
fn test_remove() {
    let (_temp_dir, store) = create_test_store();
    let item = store.add(&NewPlaylistItem::image("a.jpg")).unwrap();

    store.remove(item.id).unwrap();
    assert!(store.list().unwrap().is_empty());
    assert!(matches!(store.remove(item.id), Err(Error::NotFound(_))));
}

#[test]
fn test_add_rejects_blank_source() {
    let (_temp_dir, store) = create_test_store();
    assert!(matches!(
        store.add(&NewPlaylistItem::image(" ")),
        Err(Error::InvalidInput { .. })
    ));
}
