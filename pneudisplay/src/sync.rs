//! Synchroniseur de la file affichée.
//!
//! Acteur propriétaire de la [`QueueView`] : chaque entrée est traitée en
//! entier avant la suivante. Les minuteries (rotation, plafond d'annonce,
//! rechargement périodique) sont des tâches tokio dont les `JoinHandle`
//! appartiennent à l'acteur ; un tic dont la génération ne correspond plus
//! est ignoré.

use crate::announce::Announcer;
use crate::error::Result;
use crate::settings::DisplaySettings;
use crate::source::QueueSource;
use crate::view::QueueView;
use pneuqueue::{QueueEvent, ServiceRecord};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const INPUT_CAPACITY: usize = 64;

/// Entrées de l'acteur
#[derive(Debug)]
pub enum SyncInput {
    Refetch,
    Fetched(Result<Vec<ServiceRecord>>),
    Event(QueueEvent),
    RotationTick(u64),
    AnnouncementElapsed(u64),
    Shutdown,
}

/// Ce que le panneau doit montrer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    Empty,
    Queue {
        record: ServiceRecord,
        /// Position affichée, à partir de 1
        position: usize,
        total: usize,
    },
    Announcement(ServiceRecord),
}

/// État observable du synchroniseur
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySnapshot {
    pub records: Vec<ServiceRecord>,
    pub displayed: Option<usize>,
    pub announcing: Option<ServiceRecord>,
    pub rotation_armed: bool,
}

impl DisplaySnapshot {
    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncSettings {
    pub rotation_period: Duration,
    pub queue_poll: Duration,
    pub announcement_cap: Duration,
}

impl From<&DisplaySettings> for SyncSettings {
    fn from(settings: &DisplaySettings) -> Self {
        Self {
            rotation_period: settings.rotation_period,
            queue_poll: settings.queue_poll,
            announcement_cap: settings.announcement.cap,
        }
    }
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self::from(&DisplaySettings::default())
    }
}

/// Poignée vers un synchroniseur lancé
#[derive(Clone)]
pub struct SyncHandle {
    tx: mpsc::Sender<SyncInput>,
    screen: watch::Receiver<Screen>,
    snapshot: watch::Receiver<DisplaySnapshot>,
}

impl SyncHandle {
    /// Envoie une entrée ; `false` si l'acteur est arrêté
    pub async fn send(&self, input: SyncInput) -> bool {
        self.tx.send(input).await.is_ok()
    }

    pub async fn refetch(&self) -> bool {
        self.send(SyncInput::Refetch).await
    }

    pub async fn shutdown(&self) {
        let _ = self.tx.send(SyncInput::Shutdown).await;
    }

    pub fn screen(&self) -> watch::Receiver<Screen> {
        self.screen.clone()
    }

    pub fn snapshot(&self) -> watch::Receiver<DisplaySnapshot> {
        self.snapshot.clone()
    }

    pub fn current_snapshot(&self) -> DisplaySnapshot {
        self.snapshot.borrow().clone()
    }
}

pub struct QueueSynchronizer {
    settings: SyncSettings,
    source: Arc<dyn QueueSource>,
    announcer: Arc<dyn Announcer>,

    view: QueueView,
    announcing: Option<ServiceRecord>,

    rx: mpsc::Receiver<SyncInput>,
    // Les minuteries ne gardent pas le canal ouvert
    weak_tx: mpsc::WeakSender<SyncInput>,
    screen_tx: watch::Sender<Screen>,
    snapshot_tx: watch::Sender<DisplaySnapshot>,

    rotation: Option<JoinHandle<()>>,
    rotation_generation: u64,
    announcement: Option<JoinHandle<()>>,
    cap_timer: Option<JoinHandle<()>>,
    announcement_generation: u64,
    fetch: Option<JoinHandle<()>>,
    poll: Option<JoinHandle<()>>,
}

impl QueueSynchronizer {
    pub fn new(
        settings: SyncSettings,
        source: Arc<dyn QueueSource>,
        announcer: Arc<dyn Announcer>,
    ) -> (Self, SyncHandle) {
        let (tx, rx) = mpsc::channel(INPUT_CAPACITY);
        let (screen_tx, screen) = watch::channel(Screen::Empty);
        let (snapshot_tx, snapshot) = watch::channel(DisplaySnapshot::default());

        let synchronizer = Self {
            settings,
            source,
            announcer,
            view: QueueView::new(),
            announcing: None,
            rx,
            weak_tx: tx.downgrade(),
            screen_tx,
            snapshot_tx,
            rotation: None,
            rotation_generation: 0,
            announcement: None,
            cap_timer: None,
            announcement_generation: 0,
            fetch: None,
            poll: None,
        };

        (
            synchronizer,
            SyncHandle {
                tx,
                screen,
                snapshot,
            },
        )
    }

    /// Lance l'acteur dans sa propre tâche
    pub fn spawn(
        settings: SyncSettings,
        source: Arc<dyn QueueSource>,
        announcer: Arc<dyn Announcer>,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (synchronizer, handle) = Self::new(settings, source, announcer);
        (handle, tokio::spawn(synchronizer.run()))
    }

    /// Boucle principale, jusqu'à `Shutdown` ou la fermeture de toutes les poignées
    pub async fn run(mut self) {
        info!(
            rotation = ?self.settings.rotation_period,
            poll = ?self.settings.queue_poll,
            "Queue synchronizer started"
        );
        self.start_polling();
        self.publish();

        while let Some(input) = self.rx.recv().await {
            if !self.handle(input) {
                break;
            }
        }

        self.stop_tasks();
        info!("Queue synchronizer stopped");
    }

    fn handle(&mut self, input: SyncInput) -> bool {
        match input {
            SyncInput::Refetch => self.start_fetch(),
            SyncInput::Fetched(Ok(records)) => {
                if self.view.replace(records) {
                    debug!(ids = ?self.view.ids(), "Queue contents changed");
                    self.rearm_rotation();
                }
                self.publish();
            }
            SyncInput::Fetched(Err(e)) => {
                warn!("Queue fetch failed, keeping {} records: {}", self.view.len(), e);
            }
            SyncInput::Event(QueueEvent::VehicleAdded(record)) => {
                debug!(id = record.id, "Vehicle added, refetching queue");
                self.start_fetch();
            }
            SyncInput::Event(QueueEvent::VehicleFinalized(record)) => {
                if self.view.remove(record.id).is_none() {
                    debug!(id = record.id, "Finalized vehicle was not in the local view");
                }
                self.start_announcement(record);
                self.rearm_rotation();
                self.publish();
            }
            SyncInput::RotationTick(generation) => {
                if generation == self.rotation_generation && self.rotation.is_some() {
                    self.view.advance();
                    self.publish();
                } else {
                    debug!(generation, "Stale rotation tick ignored");
                }
            }
            SyncInput::AnnouncementElapsed(generation) => {
                if generation == self.announcement_generation && self.announcing.is_some() {
                    self.finish_announcement();
                    self.rearm_rotation();
                    self.publish();
                } else {
                    debug!(generation, "Stale announcement timer ignored");
                }
            }
            SyncInput::Shutdown => return false,
        }
        true
    }

    /// Rechargement complet ; un rechargement en cours est abandonné
    fn start_fetch(&mut self) {
        abort(&mut self.fetch);

        let Some(tx) = self.weak_tx.upgrade() else {
            return;
        };
        let source = self.source.clone();
        self.fetch = Some(tokio::spawn(async move {
            let result = source.fetch_queue().await;
            let _ = tx.send(SyncInput::Fetched(result)).await;
        }));
    }

    fn start_polling(&mut self) {
        abort(&mut self.poll);

        let weak = self.weak_tx.clone();
        let period = self.settings.queue_poll;
        self.poll = Some(tokio::spawn(async move {
            // premier tic immédiat : chargement initial
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                if tx.send(SyncInput::Refetch).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Annule la rotation et la relance si plus d'une fiche est en file et
    /// qu'aucune annonce n'est en cours
    fn rearm_rotation(&mut self) {
        abort(&mut self.rotation);
        self.rotation_generation += 1;

        if self.view.len() <= 1 || self.announcing.is_some() {
            return;
        }

        let weak = self.weak_tx.clone();
        let period = self.settings.rotation_period;
        let generation = self.rotation_generation;
        self.rotation = Some(tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut ticker = tokio::time::interval_at(start, period);
            loop {
                ticker.tick().await;
                let Some(tx) = weak.upgrade() else {
                    break;
                };
                if tx.send(SyncInput::RotationTick(generation)).await.is_err() {
                    break;
                }
            }
        }));
    }

    /// Démarre la séquence d'annonce et le plafond qui la borne
    ///
    /// Une annonce en cours est interrompue.
    fn start_announcement(&mut self, record: ServiceRecord) {
        abort(&mut self.announcement);
        abort(&mut self.cap_timer);
        self.announcement_generation += 1;
        self.announcing = Some(record.clone());

        let announcer = self.announcer.clone();
        self.announcement = Some(tokio::spawn(async move {
            announcer.announce(&record).await;
        }));

        let weak = self.weak_tx.clone();
        let cap = self.settings.announcement_cap;
        let generation = self.announcement_generation;
        self.cap_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(cap).await;
            if let Some(tx) = weak.upgrade() {
                let _ = tx.send(SyncInput::AnnouncementElapsed(generation)).await;
            }
        }));
    }

    fn finish_announcement(&mut self) {
        if let Some(record) = self.announcing.take() {
            debug!(id = record.id, "Announcement window elapsed");
        }
        abort(&mut self.announcement);
        self.cap_timer = None;
    }

    fn screen(&self) -> Screen {
        if let Some(record) = &self.announcing {
            return Screen::Announcement(record.clone());
        }
        match (self.view.displayed_index(), self.view.displayed()) {
            (Some(index), Some(record)) => Screen::Queue {
                record: record.clone(),
                position: index + 1,
                total: self.view.len(),
            },
            _ => Screen::Empty,
        }
    }

    fn publish(&self) {
        self.screen_tx.send_replace(self.screen());
        self.snapshot_tx.send_replace(DisplaySnapshot {
            records: self.view.records().to_vec(),
            displayed: self.view.displayed_index(),
            announcing: self.announcing.clone(),
            rotation_armed: self.rotation.is_some(),
        });
    }

    fn stop_tasks(&mut self) {
        abort(&mut self.rotation);
        abort(&mut self.announcement);
        abort(&mut self.cap_timer);
        abort(&mut self.fetch);
        abort(&mut self.poll);
    }
}

fn abort(task: &mut Option<JoinHandle<()>>) {
    if let Some(task) = task.take() {
        task.abort();
    }
}
