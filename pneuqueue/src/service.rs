//! Service de file d'attente : magasin + bus de notification.
//!
//! Toute mutation réussie est publiée sur le bus après écriture en base.

use crate::bus::{NotificationBus, QueueEvent, QueueEventEnvelope};
use crate::model::{HistoryFilter, NewServiceRecord, ServiceRecord};
use crate::persistence::QueueStore;
use crate::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::info;

/// Point d'entrée des opérations sur la file
#[derive(Clone)]
pub struct QueueService {
    store: Arc<QueueStore>,
    bus: NotificationBus,
}

impl QueueService {
    pub fn new(store: QueueStore, bus: NotificationBus) -> Self {
        Self {
            store: Arc::new(store),
            bus,
        }
    }

    /// Construit le service depuis la configuration (base + capacité du bus)
    pub fn from_config() -> anyhow::Result<Self> {
        use crate::config_ext::QueueConfigExt;

        let config = pneuconfig::get_config();
        let db_path = config.queue_db_path()?;
        let store = QueueStore::open(&db_path)?;
        info!("Queue store opened at {}", db_path.display());

        Ok(Self::new(
            store,
            NotificationBus::new(config.queue_bus_capacity()),
        ))
    }

    /// Enregistre un véhicule et publie `vehicle_added`
    pub fn register(&self, new: &NewServiceRecord) -> Result<ServiceRecord> {
        let normalized = new.normalized()?;
        let record = self.store.insert(&normalized, Utc::now())?;

        info!(id = record.id, plate = %record.plate, "Vehicle registered");
        self.bus.publish(QueueEvent::VehicleAdded(record.clone()));
        Ok(record)
    }

    /// Clôture une fiche et publie `vehicle_finalized`
    pub fn finalize(&self, id: i64) -> Result<ServiceRecord> {
        let record = self.store.finalize(id, Utc::now())?;

        info!(id = record.id, plate = %record.plate, "Vehicle finalized");
        self.bus.publish(QueueEvent::VehicleFinalized(record.clone()));
        Ok(record)
    }

    pub fn get(&self, id: i64) -> Result<ServiceRecord> {
        self.store.get(id)
    }

    pub fn list_open(&self) -> Result<Vec<ServiceRecord>> {
        self.store.list_open()
    }

    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<ServiceRecord>> {
        self.store.history(filter)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEventEnvelope> {
        self.bus.subscribe()
    }

    pub fn bus(&self) -> &NotificationBus {
        &self.bus
    }
}
