//! Sources de données du panneau : file, playlist et flux d'évènements.

use crate::error::Result;
use crate::sync::{SyncHandle, SyncInput};
use async_trait::async_trait;
use futures::StreamExt;
use pneumedia::{MediaClient, PlaylistItem};
use pneuqueue::{QueueClient, ServiceRecord};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Fournit la file des fiches ouvertes
#[async_trait]
pub trait QueueSource: Send + Sync {
    async fn fetch_queue(&self) -> Result<Vec<ServiceRecord>>;
}

/// Fournit la playlist dans l'ordre de diffusion
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn fetch_playlist(&self) -> Result<Vec<PlaylistItem>>;
}

#[async_trait]
impl QueueSource for QueueClient {
    async fn fetch_queue(&self) -> Result<Vec<ServiceRecord>> {
        Ok(QueueClient::fetch_queue(self).await?)
    }
}

#[async_trait]
impl PlaylistSource for MediaClient {
    async fn fetch_playlist(&self) -> Result<Vec<PlaylistItem>> {
        Ok(MediaClient::fetch_playlist(self).await?)
    }
}

/// Relaie le flux SSE de la file vers le synchroniseur
///
/// À chaque coupure (erreur ou fin du flux), attend `reconnect_delay`, se
/// réabonne puis demande un rechargement complet pour rattraper les
/// évènements manqués. S'arrête quand le synchroniseur est arrêté.
pub async fn follow_queue_events(
    client: QueueClient,
    sync: SyncHandle,
    reconnect_delay: Duration,
) {
    loop {
        match client.subscribe().await {
            Ok(events) => {
                info!("Subscribed to queue events at {}", client.base_url());
                let mut events = std::pin::pin!(events);
                while let Some(event) = events.next().await {
                    match event {
                        Ok(envelope) => {
                            debug!(
                                event = envelope.event.name(),
                                id = envelope.event.record().id,
                                "Queue event"
                            );
                            if !sync.send(SyncInput::Event(envelope.event)).await {
                                return;
                            }
                        }
                        Err(pneuqueue::Error::Payload(e)) => {
                            warn!("Ignoring malformed queue event: {}", e);
                        }
                        Err(e) => {
                            warn!("Queue event stream failed: {}", e);
                            break;
                        }
                    }
                }
                warn!("Queue event stream closed");
            }
            Err(e) => warn!("Queue event subscription failed: {}", e),
        }

        tokio::time::sleep(reconnect_delay).await;
        if !sync.refetch().await {
            return;
        }
    }
}
