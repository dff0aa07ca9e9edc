//! Extension pneuserver : montage de l'API de la file d'attente
//!
//! `pneuqueue` étend `pneuserver::Server` sans que `pneuserver` connaisse
//! `pneuqueue`.
//!
//! ```rust,no_run
//! use pneuqueue::QueueServerExt;
//! use pneuserver::ServerBuilder;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let mut server = ServerBuilder::new_configured().build();
//! let queue = server.init_queue_api().await?;
//! server.start().await?;
//! # Ok(())
//! # }
//! ```

use crate::api::queue_api_router;
use crate::openapi::ApiDoc;
use crate::service::QueueService;
use anyhow::Result;
use pneuserver::Server;
use tracing::info;
use utoipa::OpenApi;

/// Trait d'extension pour ajouter l'API queue au serveur
pub trait QueueServerExt {
    /// Ouvre la base configurée et monte `/api/queue`
    async fn init_queue_api(&mut self) -> Result<QueueService>;

    /// Monte `/api/queue` sur un service existant
    async fn init_queue_api_with(&mut self, service: QueueService);
}

impl QueueServerExt for Server {
    async fn init_queue_api(&mut self) -> Result<QueueService> {
        let service = QueueService::from_config()?;
        self.init_queue_api_with(service.clone()).await;
        Ok(service)
    }

    async fn init_queue_api_with(&mut self, service: QueueService) {
        self.add_openapi(queue_api_router(service), ApiDoc::openapi(), "queue")
            .await;
        info!("Queue API available at /api/queue (SSE: /api/queue/events)");
    }
}
