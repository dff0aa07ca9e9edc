use crate::Config;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use serde_yaml::Value;
use std::sync::Arc;

/// Valeur de configuration à un chemin donné
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigValue {
    /// Chemin de la clé (ex: "display.rotation_period_secs")
    pub path: String,
    /// Valeur au format JSON
    pub value: JsonValue,
}

/// Requête de mise à jour d'une valeur de configuration
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct UpdateConfigRequest {
    /// Chemin de la clé (ex: "display.announcement.cap_secs")
    pub path: String,
    /// Nouvelle valeur au format JSON
    pub value: JsonValue,
}

/// Corps d'erreur, même forme que les autres APIs PneuShop
#[derive(Debug, Serialize, Deserialize, utoipa::ToSchema)]
pub struct ConfigError {
    pub error: String,
    pub message: String,
}

/// Erreur d'un handler de configuration
#[derive(Debug)]
pub enum ApiError {
    UnknownPath(anyhow::Error),
    Invalid(anyhow::Error),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, err) = match self {
            ApiError::UnknownPath(e) => (StatusCode::NOT_FOUND, "NOT_FOUND", e),
            ApiError::Invalid(e) => (StatusCode::BAD_REQUEST, "INVALID_INPUT", e),
        };
        let body = ConfigError {
            error: code.to_string(),
            message: err.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

fn split_path(path: &str) -> Vec<&str> {
    path.split('.').filter(|part| !part.is_empty()).collect()
}

/// GET /api/config - Récupérer toute la configuration
#[utoipa::path(
    get,
    path = "/api/config",
    tag = "config",
    responses(
        (status = 200, description = "Configuration complète", body = serde_json::Value)
    )
)]
pub(crate) async fn get_full_config(
    State(config): State<Arc<Config>>,
) -> Result<Json<JsonValue>, ApiError> {
    let value = config.get_value(&[]).map_err(ApiError::UnknownPath)?;
    Ok(Json(yaml_to_json(&value)?))
}

/// GET /api/config/{path} - Récupérer une valeur à un chemin spécifique
#[utoipa::path(
    get,
    path = "/api/config/{path}",
    tag = "config",
    params(
        ("path" = String, Path, description = "Chemin de la configuration (séparé par des points, ex: host.http_port)")
    ),
    responses(
        (status = 200, description = "Valeur de configuration", body = ConfigValue),
        (status = 404, description = "Chemin non trouvé", body = ConfigError)
    )
)]
pub(crate) async fn get_config_value(
    State(config): State<Arc<Config>>,
    Path(path): Path<String>,
) -> Result<Json<ConfigValue>, ApiError> {
    let value = config
        .get_value(&split_path(&path))
        .map_err(ApiError::UnknownPath)?;

    Ok(Json(ConfigValue {
        value: yaml_to_json(&value)?,
        path,
    }))
}

/// POST /api/config - Modifier une valeur (sauvegardée dans config.yaml)
///
/// Les réglages du panneau sont relus à son prochain démarrage.
#[utoipa::path(
    post,
    path = "/api/config",
    tag = "config",
    request_body = UpdateConfigRequest,
    responses(
        (status = 200, description = "Valeur enregistrée", body = ConfigValue),
        (status = 400, description = "Chemin ou valeur invalide", body = ConfigError)
    )
)]
pub(crate) async fn update_config_value(
    State(config): State<Arc<Config>>,
    Json(request): Json<UpdateConfigRequest>,
) -> Result<Json<ConfigValue>, ApiError> {
    let path = split_path(&request.path);
    if path.is_empty() {
        return Err(ApiError::Invalid(anyhow::anyhow!("empty configuration path")));
    }

    let value = serde_yaml::to_value(&request.value).map_err(|e| ApiError::Invalid(e.into()))?;
    config.set_value(&path, value).map_err(ApiError::Invalid)?;
    tracing::info!(path = %request.path, "Configuration updated");

    Ok(Json(ConfigValue {
        path: request.path,
        value: request.value,
    }))
}

fn yaml_to_json(yaml: &Value) -> Result<JsonValue, ApiError> {
    serde_json::to_value(yaml).map_err(|e| ApiError::Invalid(e.into()))
}

/// Routes relatives, montées sous `/api/config` par le serveur
pub fn create_router(config: Arc<Config>) -> Router {
    Router::new()
        .route("/", get(get_full_config).post(update_config_value))
        .route("/{path}", get(get_config_value))
        .with_state(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    fn router() -> (tempfile::TempDir, Router) {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_config(dir.path().to_str().unwrap()).unwrap();
        (dir, create_router(Arc::new(config)))
    }

    #[tokio::test]
    async fn test_get_value_by_dotted_path() {
        let (_dir, app) = router();

        let response = app
            .oneshot(
                Request::get("/display.rotation_period_secs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: ConfigValue = serde_json::from_slice(&body).unwrap();
        assert_eq!(value.value, serde_json::json!(6));
    }

    #[tokio::test]
    async fn test_update_then_read_back() {
        let (_dir, app) = router();

        let response = app
            .clone()
            .oneshot(
                Request::post("/")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"path": "display.announcement.cap_secs", "value": 20}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(
                Request::get("/display.announcement.cap_secs")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value: ConfigValue = serde_json::from_slice(&body).unwrap();
        assert_eq!(value.value, serde_json::json!(20));
    }

    #[tokio::test]
    async fn test_unknown_path_is_not_found() {
        let (_dir, app) = router();

        let response = app
            .oneshot(Request::get("/nope.nothing").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: ConfigError = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "NOT_FOUND");
    }
}
