//! Documentation OpenAPI pour l'API de la playlist média.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::api::list_items,
        crate::api::add_item,
        crate::api::get_item,
        crate::api::update_item,
        crate::api::remove_item,
    ),
    components(
        schemas(
            crate::model::MediaKind,
            crate::model::PlaylistItem,
            crate::model::NewPlaylistItem,
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "media", description = "Playlist d'images et de vidéos du panneau TV")
    ),
    info(
        title = "PneuShop Media API",
        version = "0.1.0",
        description = r#"
# Playlist du panneau TV

Les éléments sont diffusés dans l'ordre de `position`. Un élément avec
`min_interval_minutes > 0` n'est pas rediffusé avant ce délai.

Les fichiers déposés dans le répertoire média sont servis sous `/media/`.
        "#,
    )
)]
pub struct ApiDoc;
