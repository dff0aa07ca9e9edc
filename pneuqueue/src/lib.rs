//! # pneuqueue - File d'attente des véhicules de l'atelier
//!
//! Cette crate fournit :
//! - le magasin des fiches de service (SQLite)
//! - le bus de notification (évènements `vehicle_added` / `vehicle_finalized`)
//! - l'API REST + SSE montée sur pneuserver (feature `api`)
//! - le client HTTP, le décodeur SSE et le formulaire d'accueil (feature `client`)
//!
//! # Architecture
//!
//! - **QueueStore** : persistance des fiches, jamais supprimées
//! - **NotificationBus** : diffusion `broadcast` vers les abonnés SSE
//! - **QueueService** : enregistre / clôture puis publie sur le bus
//!
//! # Exemple d'utilisation
//!
//! ```no_run
//! use pneuqueue::{NewServiceRecord, NotificationBus, QueueService, QueueStore};
//!
//! # fn main() -> pneuqueue::Result<()> {
//! let service = QueueService::new(QueueStore::in_memory()?, NotificationBus::new(16));
//! let mut events = service.subscribe();
//!
//! let record = service.register(&NewServiceRecord::new(
//!     "abc-1d23",
//!     "HB20",
//!     "Prata",
//!     ["Alinhamento"],
//! ))?;
//! service.finalize(record.id)?;
//! # Ok(())
//! # }
//! ```

mod bus;
mod config_ext;
mod error;
mod model;
mod persistence;
mod service;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "api")]
pub mod openapi;
#[cfg(feature = "api")]
mod pneuserver_ext;
#[cfg(feature = "api")]
pub mod sse;

#[cfg(feature = "client")]
pub mod client;

// Réexports publics
pub use bus::{
    EventPayload, NotificationBus, QueueEvent, QueueEventEnvelope, VEHICLE_ADDED,
    VEHICLE_FINALIZED,
};
pub use config_ext::QueueConfigExt;
pub use error::{Error, ErrorResponse, Result};
pub use model::{normalize_plate, HistoryFilter, NewServiceRecord, ServiceRecord};
pub use persistence::QueueStore;
pub use service::QueueService;

#[cfg(feature = "api")]
pub use pneuserver_ext::QueueServerExt;

#[cfg(feature = "client")]
pub use client::{QueueClient, RegistrationForm, SubmitError};
