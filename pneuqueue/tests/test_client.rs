use futures::StreamExt;
use pneuqueue::api::queue_api_router;
use pneuqueue::{
    Error, NewServiceRecord, NotificationBus, QueueClient, QueueEvent, QueueService, QueueStore,
    RegistrationForm, SubmitError,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Lance l'API queue sur un port éphémère et retourne l'URL de base
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

fn hb20() -> NewServiceRecord {
    NewServiceRecord::new("abc-1d23", "HB20", "Prata", ["Alinhamento"])
}

#[tokio::test]
async fn test_client_round_trip() {
    let (_service, base_url) = spawn_server().await;
    let client = QueueClient::new(&base_url);

    let record = client.register(&hb20()).await.unwrap();
    assert_eq!(record.plate, "ABC1D23");

    let queue = client.fetch_queue().await.unwrap();
    assert_eq!(queue.len(), 1);
    assert_eq!(client.get(record.id).await.unwrap(), record);

    let done = client.finalize(record.id).await.unwrap();
    assert!(done.exited_at.is_some());
    assert!(client.fetch_queue().await.unwrap().is_empty());

    assert!(matches!(
        client.finalize(record.id).await,
        Err(Error::AlreadyFinalized(id)) if id == record.id
    ));
    assert!(matches!(client.get(999).await, Err(Error::NotFound(999))));
}

#[tokio::test]
async fn test_client_receives_sse_events() {
    let (service, base_url) = spawn_server().await;
    let client = QueueClient::new(&base_url);

    let events = client.subscribe().await.unwrap();
    tokio::pin!(events);

    // L'abonnement SSE est enregistré quand le handler a démarré
    while service.bus().subscriber_count() == 0 {
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let record = service.register(&hb20()).unwrap();
    service.finalize(record.id).unwrap();

    let first = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(matches!(first.event, QueueEvent::VehicleAdded(ref r) if r.id == record.id));

    let second = tokio::time::timeout(Duration::from_secs(5), events.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    match second.event {
        QueueEvent::VehicleFinalized(r) => {
            assert_eq!(r.id, record.id);
            assert!(r.exited_at.is_some());
        }
        other => panic!("unexpected event: {:?}", other),
    }
}

#[tokio::test]
async fn test_registration_form_rejects_invalid_input_locally() {
    let form = RegistrationForm::new(QueueClient::new("http://127.0.0.1:9"));
    let result = form
        .submit(&NewServiceRecord::new("A1", "HB20", "Prata", ["Alinhamento"]))
        .await;
    assert!(matches!(result, Err(SubmitError::Invalid(_))));
    assert!(!form.is_submitting());
}

#[tokio::test]
async fn test_registration_form_reports_unavailable_server() {
    // Port libéré juste après l'attribution : connexion refusée
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let form = RegistrationForm::new(QueueClient::new(format!("http://{}", addr)));
    let result = form.submit(&hb20()).await;
    assert!(matches!(result, Err(SubmitError::Unavailable(_))));
    assert!(!form.is_submitting());
}

#[tokio::test]
async fn test_registration_form_blocks_only_while_in_flight() {
    // Serveur qui accepte les connexions sans jamais répondre
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let mut sockets = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            sockets.push(socket);
        }
    });

    let client = QueueClient::with_timeout(format!("http://{}", addr), Duration::from_millis(500));
    let form = Arc::new(RegistrationForm::new(client));

    let pending = {
        let form = form.clone();
        tokio::spawn(async move { form.submit(&hb20()).await })
    };
    while !form.is_submitting() {
        tokio::task::yield_now().await;
    }

    assert!(matches!(
        form.submit(&hb20()).await,
        Err(SubmitError::InFlight)
    ));

    let first = pending.await.unwrap();
    assert!(matches!(first, Err(SubmitError::Unavailable(_))));
    assert!(!form.is_submitting());
}
