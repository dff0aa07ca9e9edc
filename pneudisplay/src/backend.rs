//! Sorties audio et synthèse vocale du panneau.
//!
//! - [`CommandAudio`] / [`CommandSpeech`] : lecteurs externes (`mpv`, `espeak-ng`…)
//! - [`SimulatedAudio`] : attend la durée configurée de chaque signal
//! - [`SilentSpeech`] : journalise le texte sans le lire

use crate::error::{DisplayError, Result};
use crate::settings::{AnnouncementSettings, CueSettings};
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

/// Durée supposée d'un signal simulé sans durée configurée
const SIMULATED_FALLBACK: Duration = Duration::from_secs(1);

/// Signaux sonores de l'annonce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CueKind {
    Horn,
    Start,
    Brake,
}

impl CueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CueKind::Horn => "horn",
            CueKind::Start => "start",
            CueKind::Brake => "brake",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub kind: CueKind,
    pub file: PathBuf,
    pub duration: Option<Duration>,
}

impl Cue {
    pub fn new(kind: CueKind, settings: &CueSettings) -> Self {
        Self {
            kind,
            file: settings.file.clone(),
            duration: settings.duration,
        }
    }
}

/// Lecture en cours : la durée (dès qu'elle est connue) et la fin de
/// lecture sont exposées séparément.
pub struct Playback {
    duration: Option<oneshot::Receiver<Duration>>,
    ended: oneshot::Receiver<Result<()>>,
}

/// Côté émetteur d'une [`Playback`], tenu par le backend
pub struct PlaybackReporter {
    duration: Option<oneshot::Sender<Duration>>,
    ended: oneshot::Sender<Result<()>>,
}

impl Playback {
    pub fn channel() -> (PlaybackReporter, Playback) {
        let (duration_tx, duration_rx) = oneshot::channel();
        let (ended_tx, ended_rx) = oneshot::channel();
        (
            PlaybackReporter {
                duration: Some(duration_tx),
                ended: ended_tx,
            },
            Playback {
                duration: Some(duration_rx),
                ended: ended_rx,
            },
        )
    }

    /// Lecture qui a échoué avant de commencer
    pub fn failed(error: DisplayError) -> Playback {
        let (reporter, playback) = Self::channel();
        reporter.finish(Err(error));
        playback
    }

    /// Durée de la lecture, `None` si elle ne sera jamais connue
    pub async fn duration(&mut self) -> Option<Duration> {
        match self.duration.take() {
            Some(rx) => rx.await.ok(),
            None => None,
        }
    }

    /// Attend la fin de la lecture
    pub async fn ended(self) -> Result<()> {
        self.ended
            .await
            .unwrap_or_else(|_| Err(DisplayError::Playback("playback interrupted".into())))
    }
}

impl PlaybackReporter {
    pub fn report_duration(&mut self, duration: Duration) {
        if let Some(tx) = self.duration.take() {
            let _ = tx.send(duration);
        }
    }

    pub fn finish(self, result: Result<()>) {
        let _ = self.ended.send(result);
    }
}

/// Sortie audio des signaux d'annonce
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, cue: &Cue) -> Playback;
}

/// Synthèse vocale
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Lit le texte et se termine à la fin de la lecture
    async fn speak(&self, text: &str) -> Result<()>;
}

/// Signaux simulés : chaque lecture dure la durée configurée
#[derive(Debug, Default, Clone)]
pub struct SimulatedAudio;

#[async_trait]
impl AudioOutput for SimulatedAudio {
    async fn play(&self, cue: &Cue) -> Playback {
        let (mut reporter, playback) = Playback::channel();
        let duration = cue.duration.unwrap_or(SIMULATED_FALLBACK);
        let kind = cue.kind;

        tokio::spawn(async move {
            debug!(cue = kind.as_str(), ?duration, "Simulated cue");
            reporter.report_duration(duration);
            tokio::time::sleep(duration).await;
            reporter.finish(Ok(()));
        });

        playback
    }
}

/// Lecteur audio externe, le fichier du signal en dernier argument
#[derive(Debug, Clone)]
pub struct CommandAudio {
    program: String,
    args: Vec<String>,
}

impl CommandAudio {
    /// `None` si la commande est vide
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl AudioOutput for CommandAudio {
    async fn play(&self, cue: &Cue) -> Playback {
        let child = Command::new(&self.program)
            .args(&self.args)
            .arg(&cue.file)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn();

        let mut child = match child {
            Ok(child) => child,
            Err(e) => {
                return Playback::failed(DisplayError::Playback(format!(
                    "{}: {}",
                    self.program, e
                )));
            }
        };

        let (mut reporter, playback) = Playback::channel();
        if let Some(duration) = cue.duration {
            reporter.report_duration(duration);
        }

        let kind = cue.kind;
        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(DisplayError::Playback(format!(
                    "{} cue exited with {}",
                    kind.as_str(),
                    status
                ))),
                Err(e) => Err(DisplayError::Playback(e.to_string())),
            };
            reporter.finish(result);
        });

        playback
    }
}

/// Synthèse vocale externe, le texte en dernier argument
#[derive(Debug, Clone)]
pub struct CommandSpeech {
    program: String,
    args: Vec<String>,
}

impl CommandSpeech {
    pub fn new(command: &[String]) -> Option<Self> {
        let (program, args) = command.split_first()?;
        Some(Self {
            program: program.clone(),
            args: args.to_vec(),
        })
    }
}

#[async_trait]
impl SpeechSynthesizer for CommandSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        let status = Command::new(&self.program)
            .args(&self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|e| DisplayError::Speech(format!("{}: {}", self.program, e)))?;

        if status.success() {
            Ok(())
        } else {
            Err(DisplayError::Speech(format!(
                "{} exited with {}",
                self.program, status
            )))
        }
    }
}

/// Synthèse muette : le texte est seulement journalisé
#[derive(Debug, Default, Clone)]
pub struct SilentSpeech;

#[async_trait]
impl SpeechSynthesizer for SilentSpeech {
    async fn speak(&self, text: &str) -> Result<()> {
        info!(text, "Announcement");
        Ok(())
    }
}

/// Choisit les backends selon la configuration
///
/// Sans commande audio, les signaux sont simulés ; sans commande vocale, le
/// texte est seulement journalisé.
pub fn backends_from_settings(
    settings: &AnnouncementSettings,
) -> (Arc<dyn AudioOutput>, Arc<dyn SpeechSynthesizer>) {
    let audio: Arc<dyn AudioOutput> = match CommandAudio::new(&settings.audio_command) {
        Some(audio) => {
            info!(program = %audio.program, "Announcement cues played by external command");
            Arc::new(audio)
        }
        None => {
            warn!("No audio command configured, announcement cues are simulated");
            Arc::new(SimulatedAudio)
        }
    };

    let speech: Arc<dyn SpeechSynthesizer> = match CommandSpeech::new(&settings.speech_command) {
        Some(speech) => Arc::new(speech),
        None => {
            warn!("No speech command configured, announcements are only logged");
            Arc::new(SilentSpeech)
        }
    };

    (audio, speech)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cue(duration: Option<Duration>) -> Cue {
        Cue {
            kind: CueKind::Start,
            file: PathBuf::from("start.mp3"),
            duration,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_simulated_playback_reports_duration_then_ends() {
        let start = tokio::time::Instant::now();
        let mut playback = SimulatedAudio.play(&cue(Some(Duration::from_secs(4)))).await;

        assert_eq!(playback.duration().await, Some(Duration::from_secs(4)));
        playback.ended().await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_secs(4));
    }

    #[tokio::test]
    async fn test_failed_playback() {
        let mut playback = Playback::failed(DisplayError::Playback("boom".into()));
        assert_eq!(playback.duration().await, None);
        assert!(matches!(
            playback.ended().await,
            Err(DisplayError::Playback(_))
        ));
    }

    #[tokio::test]
    async fn test_missing_program_fails_playback() {
        let audio = CommandAudio::new(&["pneushop-no-such-player".to_string()]).unwrap();
        let playback = audio.play(&cue(None)).await;
        assert!(playback.ended().await.is_err());

        let speech = CommandSpeech::new(&["pneushop-no-such-voice".to_string()]).unwrap();
        assert!(matches!(
            speech.speak("Atenção").await,
            Err(DisplayError::Speech(_))
        ));
    }

    #[test]
    fn test_empty_command_is_none() {
        assert!(CommandAudio::new(&[]).is_none());
        assert!(CommandSpeech::new(&[]).is_none());
    }
}
