use async_trait::async_trait;
use pneudisplay::{
    Announcer, DisplaySnapshot, QueueSynchronizer, Screen, SyncHandle, SyncSettings,
    follow_queue_events,
};
use pneuqueue::api::queue_api_router;
use pneuqueue::{
    NewServiceRecord, NotificationBus, QueueClient, QueueService, QueueStore, ServiceRecord,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;

async fn spawn_server() -> (QueueService, String) {
    let service = QueueService::new(QueueStore::in_memory().unwrap(), NotificationBus::new(16));
    let app = axum::Router::new().nest("/api/queue", queue_api_router(service.clone()));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (service, format!("http://{}", addr))
}

#[derive(Default)]
struct RecordingAnnouncer {
    announced: Mutex<Vec<String>>,
}

#[async_trait]
impl Announcer for RecordingAnnouncer {
    async fn announce(&self, record: &ServiceRecord) {
        self.announced.lock().unwrap().push(record.plate.clone());
    }
}

async fn wait_for(
    handle: &SyncHandle,
    f: impl FnMut(&DisplaySnapshot) -> bool,
) -> DisplaySnapshot {
    let mut rx = handle.snapshot();
    let snapshot = tokio::time::timeout(Duration::from_secs(5), rx.wait_for(f))
        .await
        .expect("condition not reached")
        .expect("synchronizer stopped")
        .clone();
    snapshot
}

#[tokio::test]
async fn test_display_follows_server_queue() {
    let (service, base_url) = spawn_server().await;
    let client = QueueClient::new(&base_url);
    let announcer = Arc::new(RecordingAnnouncer::default());

    let settings = SyncSettings {
        announcement_cap: Duration::from_millis(300),
        ..SyncSettings::default()
    };
    let (sync, _task) =
        QueueSynchronizer::spawn(settings, Arc::new(client.clone()), announcer.clone());
    tokio::spawn(follow_queue_events(
        client,
        sync.clone(),
        Duration::from_millis(100),
    ));

    // L'abonnement SSE doit être actif avant les enregistrements
    while service.bus().subscriber_count() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let onix = service
        .register(&NewServiceRecord::new("ONX-2024", "Onix", "Branco", ["Troca de pneus"]))
        .unwrap();
    let hb20 = service
        .register(&NewServiceRecord::new("abc1q23", "HB20", "Prata", ["Alinhamento"]))
        .unwrap();

    let snapshot = wait_for(&sync, |s| s.records.len() == 2).await;
    assert_eq!(snapshot.ids(), vec![hb20.id, onix.id]);
    assert!(snapshot.rotation_armed);

    service.finalize(hb20.id).unwrap();
    let snapshot = wait_for(&sync, |s| s.records.len() == 1).await;
    assert_eq!(snapshot.ids(), vec![onix.id]);
    assert_eq!(snapshot.announcing.map(|r| r.id), Some(hb20.id));
    assert!(!snapshot.rotation_armed);

    let snapshot = wait_for(&sync, |s| s.announcing.is_none()).await;
    assert_eq!(snapshot.displayed, Some(0));
    assert!(matches!(
        sync.screen().borrow().clone(),
        Screen::Queue { ref record, position: 1, total: 1 } if record.id == onix.id
    ));
    assert_eq!(*announcer.announced.lock().unwrap(), vec!["ABC1Q23".to_string()]);

    sync.shutdown().await;
}
