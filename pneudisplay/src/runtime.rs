//! Assemblage du panneau TV : clients HTTP, synchroniseur, flux SSE,
//! rotation des médias et rendu.

use crate::announce::AnnouncementSequencer;
use crate::backend::backends_from_settings;
use crate::clock::Clock;
use crate::media::{LogSurface, MediaRotationRunner};
use crate::settings::DisplaySettings;
use crate::source::follow_queue_events;
use crate::sync::{QueueSynchronizer, Screen, SyncSettings};
use pneumedia::{LastPlayedLedger, MediaClient, PlaylistItem};
use pneuqueue::QueueClient;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::info;

/// Lance le panneau et attend Ctrl+C
pub async fn run_display(settings: DisplaySettings) -> anyhow::Result<()> {
    info!("📺 Starting display for {}", settings.server_url);

    let queue_client = QueueClient::new(&settings.server_url);
    let media_client = MediaClient::new(&settings.server_url);

    let (audio, speech) = backends_from_settings(&settings.announcement);
    let announcer = Arc::new(AnnouncementSequencer::new(
        &settings.announcement,
        audio,
        speech,
    ));

    let (sync, sync_task) = QueueSynchronizer::spawn(
        SyncSettings::from(&settings),
        Arc::new(queue_client.clone()),
        announcer,
    );
    let events = tokio::spawn(follow_queue_events(
        queue_client,
        sync.clone(),
        settings.reconnect_delay,
    ));

    let (stop_tx, stop_rx) = watch::channel(false);
    let (media, current_media) = MediaRotationRunner::new(
        &settings.media,
        settings.server_url.clone(),
        Arc::new(media_client),
        Arc::new(LogSurface),
        LastPlayedLedger::with_session_file(&settings.session_file),
        Clock::new(),
    );
    let media_task = tokio::spawn(media.run(stop_rx));
    let renderer = tokio::spawn(render(sync.screen(), current_media));

    info!("✅ Display is ready, press Ctrl+C to stop...");
    tokio::signal::ctrl_c().await?;

    info!("Stopping display");
    events.abort();
    sync.shutdown().await;
    stop_tx.send_replace(true);
    let _ = sync_task.await;
    let _ = media_task.await;
    renderer.abort();

    Ok(())
}

/// Rendu texte : journalise chaque changement d'écran ou de média
async fn render(
    mut screen: watch::Receiver<Screen>,
    mut media: watch::Receiver<Option<PlaylistItem>>,
) {
    loop {
        tokio::select! {
            changed = screen.changed() => {
                if changed.is_err() {
                    break;
                }
                let current = screen.borrow_and_update().clone();
                log_screen(&current);
            }
            changed = media.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(item) = media.borrow_and_update().clone() {
                    info!(id = item.id, kind = %item.kind, source = %item.source, "Media");
                }
            }
        }
    }
}

fn log_screen(screen: &Screen) {
    match screen {
        Screen::Empty => info!("Queue is empty"),
        Screen::Queue {
            record,
            position,
            total,
        } => info!(
            "[{}/{}] {} {} {} ({})",
            position,
            total,
            record.plate,
            record.model,
            record.color,
            record.services.join(", ")
        ),
        Screen::Announcement(record) => {
            info!("📢 {} {} {} ready for pickup", record.plate, record.model, record.color)
        }
    }
}
