//! Diffusion des médias entre deux annonces.
//!
//! Le [`MediaRotationRunner`] recharge la playlist sur sa propre minuterie,
//! choisit l'élément suivant avec [`MediaRotation`] et le confie à une
//! [`MediaSurface`].

use crate::clock::Clock;
use crate::error::Result;
use crate::settings::MediaSettings;
use crate::source::PlaylistSource;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use pneumedia::{
    LastPlayedLedger, MIN_WAIT, MediaKind, MediaRotation, PlaylistItem, RotationTiming, Selection,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::{Instant, interval_at};
use tracing::{debug, info, warn};

/// Durée simulée d'une vidéo sans durée connue
const LOG_VIDEO_LENGTH: Duration = Duration::from_secs(30);

/// Sortie des médias
#[async_trait]
pub trait MediaSurface: Send + Sync {
    /// Affiche une image ; la durée d'affichage est gérée par l'appelant
    async fn show_image(&self, url: &str, item: &PlaylistItem) -> Result<()>;

    /// Lit une vidéo jusqu'à sa fin
    async fn play_video(&self, url: &str, item: &PlaylistItem) -> Result<()>;
}

/// Surface qui journalise ce qui serait affiché
#[derive(Debug, Default, Clone)]
pub struct LogSurface;

#[async_trait]
impl MediaSurface for LogSurface {
    async fn show_image(&self, url: &str, item: &PlaylistItem) -> Result<()> {
        info!(id = item.id, url, "Showing image");
        Ok(())
    }

    async fn play_video(&self, url: &str, item: &PlaylistItem) -> Result<()> {
        let length = item
            .duration_secs
            .map(|s| Duration::from_secs(u64::from(s)))
            .unwrap_or(LOG_VIDEO_LENGTH);
        info!(id = item.id, url, ?length, "Playing video");
        tokio::time::sleep(length).await;
        Ok(())
    }
}

pub struct MediaRotationRunner {
    source: Arc<dyn PlaylistSource>,
    surface: Arc<dyn MediaSurface>,
    rotation: MediaRotation,
    clock: Clock,
    server_url: String,
    refresh: Duration,
    items: Vec<PlaylistItem>,
    /// Dernier élément dont la diffusion a échoué
    failed: Option<i64>,
    current_tx: watch::Sender<Option<PlaylistItem>>,
}

impl MediaRotationRunner {
    /// Retourne aussi un récepteur de l'élément en cours (`None` pendant une attente)
    pub fn new(
        settings: &MediaSettings,
        server_url: impl Into<String>,
        source: Arc<dyn PlaylistSource>,
        surface: Arc<dyn MediaSurface>,
        ledger: LastPlayedLedger,
        clock: Clock,
    ) -> (Self, watch::Receiver<Option<PlaylistItem>>) {
        let (current_tx, current) = watch::channel(None);
        (
            Self {
                source,
                surface,
                rotation: MediaRotation::new(settings.timing, ledger),
                clock,
                server_url: server_url.into(),
                refresh: settings.refresh,
                items: Vec::new(),
                failed: None,
                current_tx,
            },
            current,
        )
    }

    pub fn items(&self) -> &[PlaylistItem] {
        &self.items
    }

    /// Boucle de diffusion, jusqu'à ce que `shutdown` passe à `true`
    ///
    /// À l'arrêt, le fichier de session du registre est supprimé.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        self.refresh_playlist().await;
        let mut refresh = interval_at(Instant::now() + self.refresh, self.refresh);

        'rotation: while !*shutdown.borrow() {
            let step = self.next_step();
            tokio::pin!(step);

            loop {
                tokio::select! {
                    failed = &mut step => {
                        self.failed = failed;
                        break;
                    }
                    _ = refresh.tick() => self.refresh_playlist().await,
                    changed = shutdown.changed() => {
                        if changed.is_err() || *shutdown.borrow() {
                            break 'rotation;
                        }
                    }
                }
            }
        }

        self.current_tx.send_replace(None);
        self.rotation.ledger_mut().end_session();
        info!("Media rotation stopped");
    }

    /// Un rechargement raté garde l'ancienne playlist
    async fn refresh_playlist(&mut self) {
        match self.source.fetch_playlist().await {
            Ok(items) => {
                if items != self.items {
                    debug!("Playlist refreshed: {} items", items.len());
                }
                self.rotation.ledger_mut().retain_items(&items);
                self.items = items;
            }
            Err(e) => warn!(
                "Playlist refresh failed, keeping {} items: {}",
                self.items.len(),
                e
            ),
        }
    }

    /// Sélectionne l'élément suivant et renvoie la tâche qui le diffuse
    ///
    /// La tâche rend l'identifiant de l'élément si sa diffusion a échoué.
    /// Un élément qui vient d'échouer et qui est choisi à nouveau attend
    /// [`MIN_WAIT`] avant d'être retenté.
    fn next_step(&mut self) -> BoxFuture<'static, Option<i64>> {
        match self.rotation.select_next(&self.items, self.clock.now()) {
            Selection::Show(item) => {
                self.current_tx.send_replace(Some(item.clone()));
                let url = item.source_url(&self.server_url);
                let surface = self.surface.clone();
                let timing = *self.rotation.timing();
                let retry = self.failed == Some(item.id);
                async move {
                    if retry {
                        debug!(id = item.id, "Retrying failed media after {:?}", MIN_WAIT);
                        tokio::time::sleep(MIN_WAIT).await;
                    }
                    present(surface, item, url, timing).await
                }
                .boxed()
            }
            Selection::Wait(wait) => {
                debug!(?wait, "No eligible media");
                self.current_tx.send_replace(None);
                tokio::time::sleep(wait).map(|_| None).boxed()
            }
        }
    }
}

/// Diffuse un élément ; une erreur de lecture passe tout de suite à la suite
async fn present(
    surface: Arc<dyn MediaSurface>,
    item: PlaylistItem,
    url: String,
    timing: RotationTiming,
) -> Option<i64> {
    let duration = timing.display_duration(&item);
    match item.kind {
        MediaKind::Image => match surface.show_image(&url, &item).await {
            Ok(()) => tokio::time::sleep(duration).await,
            Err(e) => {
                warn!(id = item.id, "Image failed: {}", e);
                return Some(item.id);
            }
        },
        MediaKind::Video => match tokio::time::timeout(duration, surface.play_video(&url, &item))
            .await
        {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                warn!(id = item.id, "Video failed: {}", e);
                return Some(item.id);
            }
            Err(_) => info!(id = item.id, "Video stopped at {:?} ceiling", duration),
        },
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DisplayError;
    use chrono::{TimeZone, Utc};
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use tokio::sync::mpsc;

    fn image(id: i64, interval: u32, secs: u32) -> PlaylistItem {
        PlaylistItem {
            id,
            kind: MediaKind::Image,
            source: format!("/media/{}.jpg", id),
            min_interval_minutes: interval,
            duration_secs: Some(secs),
            position: id,
        }
    }

    fn video(id: i64, interval: u32) -> PlaylistItem {
        PlaylistItem {
            id,
            kind: MediaKind::Video,
            source: format!("https://cdn.example.com/{}.mp4", id),
            min_interval_minutes: interval,
            duration_secs: None,
            position: id,
        }
    }

    #[derive(Default)]
    struct FakePlaylist {
        items: Mutex<Vec<PlaylistItem>>,
        failing: AtomicBool,
    }

    impl FakePlaylist {
        fn with(items: Vec<PlaylistItem>) -> Arc<Self> {
            Arc::new(Self {
                items: Mutex::new(items),
                ..Default::default()
            })
        }
    }

    #[async_trait]
    impl PlaylistSource for FakePlaylist {
        async fn fetch_playlist(&self) -> Result<Vec<PlaylistItem>> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(DisplayError::Transport("server down".into()));
            }
            Ok(self.items.lock().unwrap().clone())
        }
    }

    /// Journalise (seconde, id) de chaque diffusion
    struct RecordingSurface {
        origin: Instant,
        shown: mpsc::UnboundedSender<(u64, i64)>,
        broken_videos: bool,
        endless_videos: bool,
    }

    impl RecordingSurface {
        fn new() -> (Self, mpsc::UnboundedReceiver<(u64, i64)>) {
            let (shown, rx) = mpsc::unbounded_channel();
            (
                Self {
                    origin: Instant::now(),
                    shown,
                    broken_videos: false,
                    endless_videos: false,
                },
                rx,
            )
        }

        fn log(&self, item: &PlaylistItem) {
            let _ = self.shown.send((self.origin.elapsed().as_secs(), item.id));
        }
    }

    #[async_trait]
    impl MediaSurface for RecordingSurface {
        async fn show_image(&self, _url: &str, item: &PlaylistItem) -> Result<()> {
            self.log(item);
            Ok(())
        }

        async fn play_video(&self, url: &str, item: &PlaylistItem) -> Result<()> {
            self.log(item);
            assert!(url.starts_with("https://cdn.example.com/"));
            if self.broken_videos {
                return Err(DisplayError::Playback("codec".into()));
            }
            if self.endless_videos {
                std::future::pending::<()>().await;
            }
            Ok(())
        }
    }

    fn runner(
        settings: MediaSettings,
        source: Arc<FakePlaylist>,
        surface: RecordingSurface,
        ledger: LastPlayedLedger,
    ) -> (watch::Sender<bool>, tokio::task::JoinHandle<()>) {
        let clock = Clock::starting_at(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap());
        let (runner, _current) = MediaRotationRunner::new(
            &settings,
            "http://shop.local:8080",
            source,
            Arc::new(surface),
            ledger,
            clock,
        );
        let (stop_tx, stop_rx) = watch::channel(false);
        (stop_tx, tokio::spawn(runner.run(stop_rx)))
    }

    async fn collect(rx: &mut mpsc::UnboundedReceiver<(u64, i64)>, n: usize) -> Vec<(u64, i64)> {
        let mut shown = Vec::new();
        while shown.len() < n {
            shown.push(rx.recv().await.unwrap());
        }
        shown
    }

    #[tokio::test(start_paused = true)]
    async fn test_images_rotate_and_wait_for_interval() {
        let source = FakePlaylist::with(vec![image(1, 1, 10), image(2, 1, 10)]);
        let (surface, mut rx) = RecordingSurface::new();
        let (_stop, _task) = runner(MediaSettings::default(), source, surface, LastPlayedLedger::new());

        // 1 et 2 diffusés, puis rien d'éligible avant 60 s
        assert_eq!(
            collect(&mut rx, 4).await,
            vec![(0, 1), (10, 2), (60, 1), (70, 2)]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_fit_prefers_zero_interval_head() {
        let source = FakePlaylist::with(vec![image(1, 0, 5), image(2, 5, 5)]);
        let (surface, mut rx) = RecordingSurface::new();
        let (_stop, _task) = runner(MediaSettings::default(), source, surface, LastPlayedLedger::new());

        assert_eq!(collect(&mut rx, 3).await, vec![(0, 1), (5, 1), (10, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_video_ceiling() {
        let settings = MediaSettings {
            refresh: Duration::from_secs(300),
            timing: RotationTiming {
                video_ceiling: Duration::from_secs(20),
                ..RotationTiming::default()
            },
        };
        let source = FakePlaylist::with(vec![video(1, 0)]);
        let (mut surface, mut rx) = RecordingSurface::new();
        surface.endless_videos = true;
        let (_stop, _task) = runner(settings, source, surface, LastPlayedLedger::new());

        assert_eq!(collect(&mut rx, 3).await, vec![(0, 1), (20, 1), (40, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_playback_error_advances() {
        let source = FakePlaylist::with(vec![video(1, 1), image(2, 0, 5)]);
        let (mut surface, mut rx) = RecordingSurface::new();
        surface.broken_videos = true;
        let (_stop, _task) = runner(MediaSettings::default(), source, surface, LastPlayedLedger::new());

        assert_eq!(collect(&mut rx, 3).await, vec![(0, 1), (0, 2), (5, 2)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failing_item_picked_again_is_retried_after_floor() {
        let source = FakePlaylist::with(vec![video(1, 0)]);
        let (mut surface, mut rx) = RecordingSurface::new();
        surface.broken_videos = true;
        let (_stop, _task) = runner(MediaSettings::default(), source, surface, LastPlayedLedger::new());

        assert_eq!(collect(&mut rx, 3).await, vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_playlist_waits_then_picks_up_refresh() {
        let settings = MediaSettings {
            refresh: Duration::from_secs(20),
            ..MediaSettings::default()
        };
        let source = FakePlaylist::with(Vec::new());
        let (surface, mut rx) = RecordingSurface::new();
        let (_stop, _task) = runner(settings, source.clone(), surface, LastPlayedLedger::new());

        tokio::time::sleep(Duration::from_secs(1)).await;
        source.items.lock().unwrap().push(image(7, 0, 10));
        // rechargé à 20 s, sélectionné à la fin de l'attente de 15 s suivante
        assert_eq!(collect(&mut rx, 1).await, vec![(30, 7)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_refresh_keeps_playlist() {
        let settings = MediaSettings {
            refresh: Duration::from_secs(5),
            ..MediaSettings::default()
        };
        let source = FakePlaylist::with(vec![image(1, 0, 10)]);
        let (surface, mut rx) = RecordingSurface::new();
        let (_stop, _task) = runner(settings, source.clone(), surface, LastPlayedLedger::new());

        assert_eq!(collect(&mut rx, 1).await, vec![(0, 1)]);
        source.failing.store(true, Ordering::SeqCst);
        assert_eq!(collect(&mut rx, 2).await, vec![(10, 1), (20, 1)]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_ends_session() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session.json");
        let ledger = LastPlayedLedger::with_session_file(&session);

        let source = FakePlaylist::with(vec![image(1, 5, 10)]);
        let (surface, mut rx) = RecordingSurface::new();
        let (stop, task) = runner(MediaSettings::default(), source, surface, ledger);

        collect(&mut rx, 1).await;
        assert!(session.exists());

        stop.send(true).unwrap();
        task.await.unwrap();
        assert!(!session.exists());
    }
}
