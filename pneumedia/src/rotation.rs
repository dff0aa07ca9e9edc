//! Moteur de rotation des médias du panneau TV.
//!
//! Un élément est éligible si son intervalle minimal est nul, s'il n'a jamais
//! été diffusé, ou si au moins `min_interval_minutes` se sont écoulées depuis
//! sa dernière sélection (borne incluse). La sélection prend le premier
//! élément éligible dans l'ordre du serveur et l'inscrit aussitôt au registre.

use crate::model::{MediaKind, PlaylistItem};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, warn};

/// Attente minimale entre deux tentatives de sélection
pub const MIN_WAIT: Duration = Duration::from_secs(1);

/// Durées de diffusion
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotationTiming {
    /// Attente quand aucun intervalle ne contraint la playlist (ex: playlist vide)
    pub idle_floor: Duration,
    /// Durée d'une image sans `duration_secs`
    pub image_default: Duration,
    /// Durée minimale d'une image
    pub image_min: Duration,
    /// Durée maximale d'une vidéo
    pub video_ceiling: Duration,
}

impl Default for RotationTiming {
    fn default() -> Self {
        Self {
            idle_floor: Duration::from_secs(15),
            image_default: Duration::from_secs(10),
            image_min: Duration::from_secs(3),
            video_ceiling: Duration::from_secs(600),
        }
    }
}

impl RotationTiming {
    /// Durée d'affichage d'un élément (plafond pour une vidéo)
    pub fn display_duration(&self, item: &PlaylistItem) -> Duration {
        match item.kind {
            MediaKind::Image => item
                .duration_secs
                .map(|s| Duration::from_secs(u64::from(s)))
                .unwrap_or(self.image_default)
                .max(self.image_min),
            MediaKind::Video => self.video_ceiling,
        }
    }
}

fn interval(item: &PlaylistItem) -> chrono::Duration {
    chrono::Duration::minutes(i64::from(item.min_interval_minutes))
}

/// Éligibilité d'un élément à l'instant `now`
pub fn is_eligible(item: &PlaylistItem, last: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    if item.min_interval_minutes == 0 {
        return true;
    }
    match last {
        None => true,
        Some(last) => now - last >= interval(item),
    }
}

/// Temps restant avant éligibilité (`None` si l'élément est déjà éligible)
pub fn remaining_wait(
    item: &PlaylistItem,
    last: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Option<chrono::Duration> {
    if is_eligible(item, last, now) {
        return None;
    }
    last.map(|last| last + interval(item) - now)
}

/// Résultat d'une sélection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Diffuser cet élément
    Show(PlaylistItem),
    /// Rien d'éligible : réessayer après ce délai
    Wait(Duration),
}

/// Registre des dernières diffusions (id → instant de sélection)
///
/// Avec un fichier de session, le registre survit à un redémarrage du
/// panneau ; le fichier est supprimé à l'arrêt normal.
#[derive(Debug, Default)]
pub struct LastPlayedLedger {
    entries: HashMap<i64, DateTime<Utc>>,
    session_file: Option<PathBuf>,
}

#[derive(Serialize, Deserialize, Default)]
struct SessionFile {
    #[serde(default)]
    last_played: HashMap<i64, DateTime<Utc>>,
}

impl LastPlayedLedger {
    /// Registre en mémoire seulement
    pub fn new() -> Self {
        Self::default()
    }

    /// Registre adossé à un fichier de session JSON
    ///
    /// Un fichier absent ou illisible donne un registre vide.
    pub fn with_session_file(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => match serde_json::from_str::<SessionFile>(&content) {
                Ok(session) => {
                    debug!(
                        entries = session.last_played.len(),
                        "Media ledger restored from {}",
                        path.display()
                    );
                    session.last_played
                }
                Err(e) => {
                    warn!("Ignoring corrupted session file {}: {}", path.display(), e);
                    HashMap::new()
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => {
                warn!("Failed to read session file {}: {}", path.display(), e);
                HashMap::new()
            }
        };

        Self {
            entries,
            session_file: Some(path),
        }
    }

    pub fn last_played(&self, id: i64) -> Option<DateTime<Utc>> {
        self.entries.get(&id).copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn session_file(&self) -> Option<&Path> {
        self.session_file.as_deref()
    }

    /// Inscrit une sélection et sauvegarde la session
    pub fn record(&mut self, id: i64, at: DateTime<Utc>) {
        self.entries.insert(id, at);
        self.persist();
    }

    /// Oublie les éléments qui ne sont plus dans la playlist
    pub fn retain_items(&mut self, items: &[PlaylistItem]) {
        let before = self.entries.len();
        self.entries
            .retain(|id, _| items.iter().any(|item| item.id == *id));
        if self.entries.len() != before {
            self.persist();
        }
    }

    fn persist(&self) {
        let Some(path) = &self.session_file else {
            return;
        };

        let session = SessionFile {
            last_played: self.entries.clone(),
        };
        let result = serde_json::to_string_pretty(&session)
            .map_err(std::io::Error::other)
            .and_then(|json| {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, json)
            });

        if let Err(e) = result {
            warn!("Failed to save session file {}: {}", path.display(), e);
        }
    }

    /// Supprime le fichier de session (arrêt normal du panneau)
    pub fn end_session(&mut self) {
        if let Some(path) = self.session_file.take() {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!("Session file {} removed", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!("Failed to remove session file {}: {}", path.display(), e),
            }
        }
    }
}

/// Moteur de rotation : registre + durées
#[derive(Debug)]
pub struct MediaRotation {
    timing: RotationTiming,
    ledger: LastPlayedLedger,
}

impl MediaRotation {
    pub fn new(timing: RotationTiming, ledger: LastPlayedLedger) -> Self {
        Self { timing, ledger }
    }

    pub fn timing(&self) -> &RotationTiming {
        &self.timing
    }

    pub fn ledger(&self) -> &LastPlayedLedger {
        &self.ledger
    }

    pub fn ledger_mut(&mut self) -> &mut LastPlayedLedger {
        &mut self.ledger
    }

    /// Choisit le prochain élément à diffuser
    ///
    /// Premier élément éligible dans l'ordre donné ; sinon, attente égale au
    /// plus petit temps restant parmi les éléments à intervalle non nul, ou
    /// au plancher d'inactivité si aucun ne contraint la playlist.
    pub fn select_next(&mut self, items: &[PlaylistItem], now: DateTime<Utc>) -> Selection {
        if let Some(item) = items
            .iter()
            .find(|item| is_eligible(item, self.ledger.last_played(item.id), now))
        {
            self.ledger.record(item.id, now);
            return Selection::Show(item.clone());
        }

        let wait = items
            .iter()
            .filter(|item| item.min_interval_minutes > 0)
            .filter_map(|item| remaining_wait(item, self.ledger.last_played(item.id), now))
            .min()
            .and_then(|d| d.to_std().ok())
            .unwrap_or(self.timing.idle_floor);

        Selection::Wait(wait.max(MIN_WAIT))
    }
}
