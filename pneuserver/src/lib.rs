//! # pneuserver - Serveur web PneuShop basé sur Axum
//!
//! Cette crate fournit le serveur HTTP commun de PneuShop : l'accueil y
//! enregistre les véhicules, les panneaux TV s'y abonnent aux évènements de
//! la file et y récupèrent la playlist média.
//!
//! ## Fonctionnalités
//!
//! - 🚀 **API de haut niveau** : création de routes sans manipuler Axum directement
//! - 📡 **Server-Sent Events (SSE)** : logs en temps réel via `/log-sse`
//! - 📁 **Fichiers statiques** : médias servis depuis le disque
//! - 📚 **Documentation OpenAPI** : Swagger UI par API
//! - ⚡ **Arrêt gracieux** : Ctrl+C / SIGTERM
//!
//! ## Architecture
//!
//! - [`server`] : serveur principal et builder
//! - [`logs`] : logs SSE, buffer circulaire et niveau de log dynamique
//! - [`config_ext`] : montage de l'API de configuration
//!
//! ## Exemple d'utilisation
//!
//! ```rust,no_run
//! use pneuserver::{ConfigExt, ServerBuilder};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let mut server = ServerBuilder::new_configured().build();
//!     server.init_logging().await;
//!     server.init_config_api().await?;
//!
//!     server.add_route("/api/status", || async {
//!         serde_json::json!({"status": "ok"})
//!     }).await;
//!
//!     server.start().await?;
//!     server.wait().await;
//!     Ok(())
//! }
//! ```

pub mod config_ext;
pub mod logs;
pub mod server;

pub use config_ext::ConfigExt;
pub use logs::{LogState, SseLayer, log_dump, log_sse};
pub use server::{Server, ServerBuilder, ServerInfo};
