//! API REST de la playlist média.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tracing::info;

use crate::model::{NewPlaylistItem, PlaylistItem};
use crate::persistence::PlaylistStore;
use crate::ErrorResponse;

/// Router `/api/media`
pub fn media_api_router(store: PlaylistStore) -> Router {
    Router::new()
        .route("/playlist", get(list_items).post(add_item))
        .route(
            "/playlist/{id}",
            get(get_item).put(update_item).delete(remove_item),
        )
        .with_state(store)
}

#[utoipa::path(
    get,
    path = "/api/media/playlist",
    tag = "media",
    responses(
        (status = 200, description = "Playlist dans l'ordre de diffusion", body = [PlaylistItem])
    )
)]
pub async fn list_items(State(store): State<PlaylistStore>) -> Response {
    match store.list() {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    post,
    path = "/api/media/playlist",
    tag = "media",
    request_body = NewPlaylistItem,
    responses(
        (status = 201, description = "Élément ajouté", body = PlaylistItem),
        (status = 400, description = "Élément invalide", body = ErrorResponse)
    )
)]
pub async fn add_item(
    State(store): State<PlaylistStore>,
    Json(req): Json<NewPlaylistItem>,
) -> Response {
    match store.add(&req) {
        Ok(item) => {
            info!(id = item.id, kind = %item.kind, source = %item.source, "Playlist item added");
            (StatusCode::CREATED, Json(item)).into_response()
        }
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    get,
    path = "/api/media/playlist/{id}",
    tag = "media",
    params(
        ("id" = i64, Path, description = "Identifiant de l'élément")
    ),
    responses(
        (status = 200, description = "Élément de playlist", body = PlaylistItem),
        (status = 404, description = "Élément introuvable", body = ErrorResponse)
    )
)]
pub async fn get_item(State(store): State<PlaylistStore>, Path(id): Path<i64>) -> Response {
    match store.get(id) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    put,
    path = "/api/media/playlist/{id}",
    tag = "media",
    params(
        ("id" = i64, Path, description = "Identifiant de l'élément")
    ),
    request_body = NewPlaylistItem,
    responses(
        (status = 200, description = "Élément mis à jour", body = PlaylistItem),
        (status = 400, description = "Élément invalide", body = ErrorResponse),
        (status = 404, description = "Élément introuvable", body = ErrorResponse)
    )
)]
pub async fn update_item(
    State(store): State<PlaylistStore>,
    Path(id): Path<i64>,
    Json(req): Json<NewPlaylistItem>,
) -> Response {
    match store.update(id, &req) {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(err) => map_error(err),
    }
}

#[utoipa::path(
    delete,
    path = "/api/media/playlist/{id}",
    tag = "media",
    params(
        ("id" = i64, Path, description = "Identifiant de l'élément")
    ),
    responses(
        (status = 204, description = "Élément supprimé"),
        (status = 404, description = "Élément introuvable", body = ErrorResponse)
    )
)]
pub async fn remove_item(State(store): State<PlaylistStore>, Path(id): Path<i64>) -> Response {
    match store.remove(id) {
        Ok(()) => {
            info!(id, "Playlist item removed");
            StatusCode::NO_CONTENT.into_response()
        }
        Err(err) => map_error(err),
    }
}

fn map_error(error: crate::Error) -> Response {
    let (status, code) = match &error {
        crate::Error::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
        crate::Error::InvalidInput { .. } => (StatusCode::BAD_REQUEST, "INVALID_INPUT"),
        crate::Error::PersistenceError(_)
        | crate::Error::Transport(_)
        | crate::Error::Server { .. }
        | crate::Error::Other(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
    };

    if status.is_server_error() {
        tracing::error!("Media API error: {}", error);
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
