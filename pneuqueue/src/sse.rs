//! SSE pour suivre les évènements de la file d'attente.
//!
//! Route : `GET /api/queue/events`. Chaque message porte le nom de
//! l'évènement (`vehicle_added`, `vehicle_finalized`) et la fiche en JSON.

use crate::bus::EventPayload;
use crate::service::QueueService;
use async_stream::stream;
use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
};
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

/// Handler SSE : diffuse les évènements de la file à un panneau.
#[utoipa::path(
    get,
    path = "/api/queue/events",
    tag = "queue",
    responses(
        (status = 200, description = "Flux SSE des évènements de la file (vehicle_added, vehicle_finalized)", content_type = "text/event-stream", body = EventPayload)
    )
)]
pub async fn queue_events_sse(State(service): State<QueueService>) -> impl IntoResponse {
    let mut rx = service.subscribe();
    debug!(
        subscribers = service.bus().subscriber_count(),
        "Queue SSE subscriber connected"
    );

    let stream = stream! {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    match serde_json::to_string(&envelope.payload()) {
                        Ok(json) => {
                            yield Ok::<_, axum::Error>(
                                Event::default().event(envelope.event.name()).data(json),
                            );
                        }
                        Err(e) => warn!("Failed to encode queue event: {}", e),
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Queue SSE subscriber lagging, events skipped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            }
        }
    };

    Sse::new(stream).keep_alive(KeepAlive::default())
}
