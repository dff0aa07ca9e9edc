//! Bus de notification : diffusion des évènements de la file aux abonnés.
//!
//! Les évènements sont transitoires. Un abonné trop lent perd les messages
//! en retard et continue avec les suivants.

use crate::model::ServiceRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::trace;

/// Nom SSE de l'évènement d'ajout
pub const VEHICLE_ADDED: &str = "vehicle_added";
/// Nom SSE de l'évènement de finalisation
pub const VEHICLE_FINALIZED: &str = "vehicle_finalized";

/// Évènement de la file d'attente
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueEvent {
    /// Un véhicule vient d'être enregistré
    VehicleAdded(ServiceRecord),
    /// Un véhicule vient d'être clôturé (instantané au moment de la clôture)
    VehicleFinalized(ServiceRecord),
}

impl QueueEvent {
    /// Nom de l'évènement sur le flux SSE
    pub fn name(&self) -> &'static str {
        match self {
            QueueEvent::VehicleAdded(_) => VEHICLE_ADDED,
            QueueEvent::VehicleFinalized(_) => VEHICLE_FINALIZED,
        }
    }

    pub fn record(&self) -> &ServiceRecord {
        match self {
            QueueEvent::VehicleAdded(record) | QueueEvent::VehicleFinalized(record) => record,
        }
    }

    /// Reconstruit un évènement depuis son nom SSE
    pub fn from_parts(name: &str, record: ServiceRecord) -> Option<Self> {
        match name {
            VEHICLE_ADDED => Some(QueueEvent::VehicleAdded(record)),
            VEHICLE_FINALIZED => Some(QueueEvent::VehicleFinalized(record)),
            _ => None,
        }
    }
}

/// Évènement horodaté pour diffusion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueEventEnvelope {
    pub event: QueueEvent,
    pub timestamp: DateTime<Utc>,
}

impl QueueEventEnvelope {
    pub fn new(event: QueueEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now(),
        }
    }

    pub fn payload(&self) -> EventPayload {
        EventPayload {
            record: self.event.record().clone(),
            timestamp: self.timestamp,
        }
    }

    pub fn from_payload(name: &str, payload: EventPayload) -> Option<Self> {
        QueueEvent::from_parts(name, payload.record).map(|event| Self {
            event,
            timestamp: payload.timestamp,
        })
    }
}

/// Données JSON d'un évènement SSE
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct EventPayload {
    pub record: ServiceRecord,
    pub timestamp: DateTime<Utc>,
}

/// Canal de diffusion des évènements de la file
#[derive(Clone)]
pub struct NotificationBus {
    tx: broadcast::Sender<QueueEventEnvelope>,
}

impl NotificationBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            tx: broadcast::channel(capacity.max(1)).0,
        }
    }

    /// Publie un évènement, retourne le nombre d'abonnés atteints
    pub fn publish(&self, event: QueueEvent) -> usize {
        let name = event.name();
        let delivered = self.tx.send(QueueEventEnvelope::new(event)).unwrap_or(0);
        trace!(event = name, subscribers = delivered, "Queue event published");
        delivered
    }

    pub fn subscribe(&self) -> broadcast::Receiver<QueueEventEnvelope> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: i64) -> ServiceRecord {
        ServiceRecord {
            id,
            plate: "ABC1D23".into(),
            model: "Onix".into(),
            color: "Preto".into(),
            services: vec!["Alinhamento".into()],
            entered_at: Utc::now(),
            exited_at: None,
        }
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_dropped() {
        let bus = NotificationBus::new(4);
        assert_eq!(bus.publish(QueueEvent::VehicleAdded(record(1))), 0);
    }

    #[tokio::test]
    async fn test_every_subscriber_receives_events() {
        let bus = NotificationBus::new(4);
        let mut a = bus.subscribe();
        let mut b = bus.subscribe();

        assert_eq!(bus.publish(QueueEvent::VehicleFinalized(record(7))), 2);

        for rx in [&mut a, &mut b] {
            let envelope = rx.recv().await.unwrap();
            assert_eq!(envelope.event.name(), VEHICLE_FINALIZED);
            assert_eq!(envelope.event.record().id, 7);
        }
    }

    #[tokio::test]
    async fn test_lagging_subscriber_skips_missed_events() {
        let bus = NotificationBus::new(2);
        let mut rx = bus.subscribe();
        for id in 1..=4 {
            bus.publish(QueueEvent::VehicleAdded(record(id)));
        }

        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(2))
        ));
        assert_eq!(rx.recv().await.unwrap().event.record().id, 3);
        assert_eq!(rx.recv().await.unwrap().event.record().id, 4);
    }

    #[test]
    fn test_payload_round_trip_keeps_event_kind() {
        let envelope = QueueEventEnvelope::new(QueueEvent::VehicleAdded(record(3)));
        let rebuilt = QueueEventEnvelope::from_payload(VEHICLE_ADDED, envelope.payload()).unwrap();
        assert_eq!(rebuilt, envelope);
        assert!(QueueEventEnvelope::from_payload("other", envelope.payload()).is_none());
    }
}
