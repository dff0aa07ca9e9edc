//! Réglages du panneau TV, lus depuis la section `display` de la configuration.

use pneumedia::RotationTiming;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// Un signal sonore de l'annonce (fichier + durée connue)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueSettings {
    pub file: PathBuf,
    /// Durée connue à l'avance, `None` si inconnue
    pub duration: Option<Duration>,
}

impl CueSettings {
    pub fn new(file: impl Into<PathBuf>, duration_ms: u64) -> Self {
        Self {
            file: file.into(),
            duration: (duration_ms > 0).then(|| Duration::from_millis(duration_ms)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementSettings {
    /// Durée maximale pendant laquelle l'annonce bloque la rotation
    pub cap: Duration,
    /// Délai entre les deux lectures du message
    pub repeat_delay: Duration,
    pub language: String,
    /// Lecteur audio externe (le fichier est ajouté en dernier argument)
    pub audio_command: Vec<String>,
    /// Synthèse vocale externe (le texte est ajouté en dernier argument)
    pub speech_command: Vec<String>,
    /// Prononciations supplémentaires des modèles (modèle → texte parlé)
    pub pronunciations: BTreeMap<String, String>,
    pub horn: CueSettings,
    pub start: CueSettings,
    pub brake: CueSettings,
}

impl Default for AnnouncementSettings {
    fn default() -> Self {
        Self {
            cap: Duration::from_secs(30),
            repeat_delay: Duration::from_secs(2),
            language: "pt-br".to_string(),
            audio_command: Vec::new(),
            speech_command: vec!["espeak-ng".into(), "-v".into(), "pt-br".into()],
            pronunciations: BTreeMap::new(),
            horn: CueSettings::new("sounds/buzina.mp3", 1500),
            start: CueSettings::new("sounds/partida.mp3", 4000),
            brake: CueSettings::new("sounds/freio.mp3", 2000),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    /// Période de rechargement de la playlist
    pub refresh: Duration,
    pub timing: RotationTiming,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            refresh: Duration::from_secs(30),
            timing: RotationTiming::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplaySettings {
    /// URL du serveur PneuShop
    pub server_url: String,
    pub rotation_period: Duration,
    pub queue_poll: Duration,
    /// Délai avant reconnexion au flux SSE
    pub reconnect_delay: Duration,
    /// Fichier de session du registre des médias
    pub session_file: PathBuf,
    pub announcement: AnnouncementSettings,
    pub media: MediaSettings,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            server_url: "http://127.0.0.1:8080".to_string(),
            rotation_period: Duration::from_secs(6),
            queue_poll: Duration::from_secs(30),
            reconnect_delay: Duration::from_secs(5),
            session_file: PathBuf::from("display/session.json"),
            announcement: AnnouncementSettings::default(),
            media: MediaSettings::default(),
        }
    }
}

/// Trait d'extension pour pneuconfig::Config
pub trait DisplayConfigExt {
    fn display_settings(&self) -> DisplaySettings;
}

fn secs(config: &pneuconfig::Config, path: &[&str], default: Duration) -> Duration {
    Duration::from_secs(config.get_u64_or(path, default.as_secs()))
}

fn cue(config: &pneuconfig::Config, name: &str, default: &CueSettings) -> CueSettings {
    let default_file = default.file.to_string_lossy();
    let default_ms = default.duration.map(|d| d.as_millis() as u64).unwrap_or(0);

    let file = config.get_string_or(
        &["display", "announcement", "cues", name, "file"],
        &default_file,
    );
    CueSettings::new(
        config.resolve_path(&file),
        config.get_u64_or(
            &["display", "announcement", "cues", name, "duration_ms"],
            default_ms,
        ),
    )
}

impl DisplayConfigExt for pneuconfig::Config {
    fn display_settings(&self) -> DisplaySettings {
        let defaults = DisplaySettings::default();
        let announcement = &defaults.announcement;
        let media = &defaults.media;

        let speech_command = match self.get_value(&["display", "announcement", "speech_command"]) {
            Ok(_) => self.get_string_list(&["display", "announcement", "speech_command"]),
            Err(_) => announcement.speech_command.clone(),
        };

        DisplaySettings {
            server_url: self.get_string_or(&["display", "server_url"], &defaults.server_url),
            rotation_period: secs(
                self,
                &["display", "rotation_period_secs"],
                defaults.rotation_period,
            ),
            queue_poll: secs(self, &["display", "queue_poll_secs"], defaults.queue_poll),
            reconnect_delay: secs(
                self,
                &["display", "reconnect_delay_secs"],
                defaults.reconnect_delay,
            ),
            session_file: self.resolve_path(&self.get_string_or(
                &["display", "session_file"],
                &defaults.session_file.to_string_lossy(),
            )),
            announcement: AnnouncementSettings {
                cap: secs(self, &["display", "announcement", "cap_secs"], announcement.cap),
                repeat_delay: secs(
                    self,
                    &["display", "announcement", "repeat_delay_secs"],
                    announcement.repeat_delay,
                ),
                language: self.get_string_or(
                    &["display", "announcement", "language"],
                    &announcement.language,
                ),
                audio_command: self.get_string_list(&["display", "announcement", "audio_command"]),
                speech_command,
                pronunciations: self.get_string_map(&["display", "announcement", "pronunciations"]),
                horn: cue(self, "horn", &announcement.horn),
                start: cue(self, "start", &announcement.start),
                brake: cue(self, "brake", &announcement.brake),
            },
            media: MediaSettings {
                refresh: secs(self, &["display", "media", "refresh_secs"], media.refresh),
                timing: RotationTiming {
                    idle_floor: secs(
                        self,
                        &["display", "media", "idle_floor_secs"],
                        media.timing.idle_floor,
                    ),
                    image_default: secs(
                        self,
                        &["display", "media", "image_default_secs"],
                        media.timing.image_default,
                    ),
                    image_min: secs(
                        self,
                        &["display", "media", "image_min_secs"],
                        media.timing.image_min,
                    ),
                    video_ceiling: secs(
                        self,
                        &["display", "media", "video_ceiling_secs"],
                        media.timing.video_ceiling,
                    ),
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cue_without_duration() {
        assert_eq!(CueSettings::new("a.mp3", 0).duration, None);
        assert_eq!(
            CueSettings::new("a.mp3", 1500).duration,
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn test_settings_from_embedded_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = pneuconfig::Config::load_config(dir.path().to_str().unwrap()).unwrap();
        let settings = config.display_settings();

        assert_eq!(settings.rotation_period, Duration::from_secs(6));
        assert_eq!(settings.queue_poll, Duration::from_secs(30));
        assert_eq!(settings.announcement.cap, Duration::from_secs(30));
        assert_eq!(settings.announcement.repeat_delay, Duration::from_secs(2));
        assert_eq!(settings.announcement.speech_command[0], "espeak-ng");
        assert!(settings.announcement.audio_command.is_empty());
        assert_eq!(
            settings.announcement.start.duration,
            Some(Duration::from_millis(4000))
        );
        assert!(settings.announcement.horn.file.starts_with(dir.path()));
        assert_eq!(settings.media.timing, RotationTiming::default());
        assert!(settings.session_file.ends_with("display/session.json"));
    }
}
