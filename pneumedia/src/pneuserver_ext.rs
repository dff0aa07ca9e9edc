//! Extension pneuserver : API playlist et fichiers média

use crate::api::media_api_router;
use crate::config_ext::MediaConfigExt;
use crate::openapi::ApiDoc;
use crate::persistence::PlaylistStore;
use anyhow::Result;
use pneuserver::Server;
use std::path::Path;
use tracing::info;
use utoipa::OpenApi;

/// Trait d'extension pour ajouter la playlist média au serveur
pub trait MediaServerExt {
    /// Ouvre la base configurée, monte `/api/media` et sert `/media`
    async fn init_media_api(&mut self) -> Result<PlaylistStore>;

    /// Monte l'API sur un magasin existant et sert `files_dir` sous `/media`
    async fn init_media_api_with(&mut self, store: PlaylistStore, files_dir: &Path);
}

impl MediaServerExt for Server {
    async fn init_media_api(&mut self) -> Result<PlaylistStore> {
        let config = pneuconfig::get_config();
        let db_path = config.media_db_path()?;
        let files_dir = config.media_files_dir()?;

        let store = PlaylistStore::open(&db_path)?;
        info!("Media playlist opened at {}", db_path.display());

        self.init_media_api_with(store.clone(), &files_dir).await;
        Ok(store)
    }

    async fn init_media_api_with(&mut self, store: PlaylistStore, files_dir: &Path) {
        self.add_openapi(media_api_router(store), ApiDoc::openapi(), "media")
            .await;
        self.add_dir("/media", files_dir).await;
        info!(
            "Media API available at /api/media/playlist, files served from {}",
            files_dir.display()
        );
    }
}
