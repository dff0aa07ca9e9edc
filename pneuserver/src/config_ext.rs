//! Extension pour intégrer l'API de configuration de pneuconfig dans pneuserver

use crate::Server;
use anyhow::Result;
use pneuconfig::{ApiDoc, api, get_config};
use utoipa::OpenApi;

/// Trait d'extension pour ajouter l'API de configuration au serveur
pub trait ConfigExt {
    /// Initialise l'API de configuration et enregistre les routes HTTP
    ///
    /// # Routes enregistrées
    ///
    /// - `GET /api/config` - Récupérer toute la configuration
    /// - `GET /api/config/{path}` - Récupérer une valeur (ex: display.rotation_period_secs)
    /// - `POST /api/config` - Mettre à jour une valeur
    /// - `GET /swagger-ui/config` - Documentation interactive Swagger
    async fn init_config_api(&mut self) -> Result<()>;
}

impl ConfigExt for Server {
    async fn init_config_api(&mut self) -> Result<()> {
        let api_router = api::create_router(get_config());
        self.add_openapi(api_router, ApiDoc::openapi(), "config").await;
        Ok(())
    }
}
