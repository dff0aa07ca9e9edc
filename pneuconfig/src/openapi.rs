use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "PneuShop Configuration API",
        version = "0.1.0",
        description = "Lecture et modification de la configuration YAML (serveur et panneau TV)",
    ),
    paths(
        crate::api::get_full_config,
        crate::api::get_config_value,
        crate::api::update_config_value,
    ),
    components(
        schemas(
            crate::api::ConfigValue,
            crate::api::UpdateConfigRequest,
            crate::api::ConfigError,
        )
    ),
    tags(
        (name = "config", description = "Configuration PneuShop")
    )
)]
pub struct ApiDoc;
