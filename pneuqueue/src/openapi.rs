//! Documentation OpenAPI pour l'API de la file d'attente.

use utoipa::OpenApi;

/// Documentation OpenAPI pour l'API queue (REST + flux SSE).
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::list_queue,
        crate::api::register_vehicle,
        crate::api::get_record,
        crate::api::finalize_vehicle,
        crate::api::queue_history,
        crate::sse::queue_events_sse,
    ),
    components(
        schemas(
            crate::model::ServiceRecord,
            crate::model::NewServiceRecord,
            crate::bus::EventPayload,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "queue", description = "File d'attente des véhicules")
    ),
    info(
        title = "PneuShop Queue API",
        version = "0.1.0",
        description = r#"
# File d'attente de l'atelier

- enregistrement des véhicules à l'accueil
- clôture d'une fiche quand le véhicule est prêt
- rapport d'historique par période et par plaque

Flux SSE `/api/queue/events` :
- `vehicle_added` : un véhicule vient d'être enregistré
- `vehicle_finalized` : un véhicule est prêt à être retiré

Payload JSON par évènement : `{ "record": ServiceRecord, "timestamp": "…" }`
        "#,
    )
)]
pub struct ApiDoc;
