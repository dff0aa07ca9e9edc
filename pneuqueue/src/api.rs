//! API REST de la file d'attente.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use crate::model::{HistoryFilter, NewServiceRecord, ServiceRecord};
use crate::service::QueueService;
use crate::sse::queue_events_sse;
use crate::ErrorResponse;

/// Router `/api/queue` combinant les endpoints REST et le flux SSE.
pub fn queue_api_router(service: QueueService) -> Router {
    Router::new()
        .route("/", get(list_queue).post(register_vehicle))
        .route("/history", get(queue_history))
        .route("/events", get(queue_events_sse))
        .route("/{id}", get(get_record))
        .route("/{id}/finalize", post(finalize_vehicle))
        .with_state(service)
}

#[utoipa::path(
    get,
    path = "/api/queue",
    tag = "queue",
    responses(
        (status = 200, description = "Véhicules en attente, du plus récent au plus ancien", body = [ServiceRecord])
    )
)]
pub async fn list_queue(State(service): State<QueueService>) -> Response {
    match service.list_open() {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/queue",
    tag = "queue",
    request_body = NewServiceRecord,
    responses(
        (status = 201, description = "Véhicule enregistré", body = ServiceRecord),
        (status = 400, description = "Fiche invalide", body = ErrorResponse)
    )
)]
pub async fn register_vehicle(
    State(service): State<QueueService>,
    Json(req): Json<NewServiceRecord>,
) -> Response {
    match service.register(&req) {
        Ok(record) => (StatusCode::CREATED, Json(record)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/queue/{id}",
    tag = "queue",
    params(
        ("id" = i64, Path, description = "Identifiant de la fiche")
    ),
    responses(
        (status = 200, description = "Fiche de service", body = ServiceRecord),
        (status = 404, description = "Fiche introuvable", body = ErrorResponse)
    )
)]
pub async fn get_record(State(service): State<QueueService>, Path(id): Path<i64>) -> Response {
    match service.get(id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/queue/{id}/finalize",
    tag = "queue",
    params(
        ("id" = i64, Path, description = "Identifiant de la fiche")
    ),
    responses(
        (status = 200, description = "Fiche clôturée", body = ServiceRecord),
        (status = 404, description = "Fiche introuvable", body = ErrorResponse),
        (status = 409, description = "Fiche déjà clôturée", body = ErrorResponse)
    )
)]
pub async fn finalize_vehicle(
    State(service): State<QueueService>,
    Path(id): Path<i64>,
) -> Response {
    match service.finalize(id) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/queue/history",
    tag = "queue",
    params(HistoryFilter),
    responses(
        (status = 200, description = "Fiches entrées dans l'intervalle, ouvertes ou clôturées", body = [ServiceRecord])
    )
)]
pub async fn queue_history(
    State(service): State<QueueService>,
    Query(filter): Query<HistoryFilter>,
) -> Response {
    match service.history(&filter) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => map_error(err),
    }
}

fn map_error(error: crate::Error) -> Response {
    let (status, code) = match &error {
        crate::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        crate::Error::AlreadyFinalized(_) => (StatusCode::CONFLICT, "ALREADY_FINALIZED"),
        crate::Error::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        crate::Error::PersistenceError(_)
        | crate::Error::Transport(_)
        | crate::Error::Server { .. }
        | crate::Error::Payload(_)
        | crate::Error::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!("Queue API error: {}", error);
    }

    (
        status,
        Json(ErrorResponse {
            error: code.to_string(),
            message: error.to_string(),
        }),
    )
        .into_response()
}
