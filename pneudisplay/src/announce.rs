//! Séquence d'annonce au retrait d'un véhicule.
//!
//! 1. buzina + partida en même temps ;
//! 2. freio au milieu de la partida, dès que sa durée est connue ;
//! 3. seconde buzina à la fin de la partida ;
//! 4. message vocal, pause, message répété.
//!
//! Chaque échec audio ou vocal est journalisé et l'étape suivante s'exécute
//! quand même. Seule la fin de la seconde buzina déclenche le message : la
//! première buzina et le freio ne retiennent jamais la suite.

use crate::backend::{AudioOutput, Cue, CueKind, SpeechSynthesizer};
use crate::settings::AnnouncementSettings;
use crate::speech::{Pronunciations, UtteranceBuilder};
use async_trait::async_trait;
use pneuqueue::ServiceRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Ce que le synchroniseur déclenche à chaque clôture
#[async_trait]
pub trait Announcer: Send + Sync {
    async fn announce(&self, record: &ServiceRecord);
}

pub struct AnnouncementSequencer {
    audio: Arc<dyn AudioOutput>,
    speech: Arc<dyn SpeechSynthesizer>,
    utterance: UtteranceBuilder,
    horn: Cue,
    start: Cue,
    brake: Cue,
    repeat_delay: Duration,
}

impl AnnouncementSequencer {
    pub fn new(
        settings: &AnnouncementSettings,
        audio: Arc<dyn AudioOutput>,
        speech: Arc<dyn SpeechSynthesizer>,
    ) -> Self {
        Self {
            audio,
            speech,
            utterance: UtteranceBuilder::new(Pronunciations::with_overrides(
                &settings.pronunciations,
            )),
            horn: Cue::new(CueKind::Horn, &settings.horn),
            start: Cue::new(CueKind::Start, &settings.start),
            brake: Cue::new(CueKind::Brake, &settings.brake),
            repeat_delay: settings.repeat_delay,
        }
    }

    pub fn utterance(&self, record: &ServiceRecord) -> String {
        self.utterance.build(record)
    }

    async fn play_to_end(&self, cue: &Cue) {
        let playback = self.audio.play(cue).await;
        if let Err(e) = playback.ended().await {
            warn!(cue = cue.kind.as_str(), "Announcement cue failed: {}", e);
        }
    }

    async fn speak(&self, text: &str) {
        if let Err(e) = self.speech.speak(text).await {
            warn!("Announcement speech failed: {}", e);
        }
    }

    /// Joue la séquence complète pour une fiche clôturée
    pub async fn run(&self, record: &ServiceRecord) {
        let text = self.utterance(record);
        info!(id = record.id, plate = %record.plate, "Announcing vehicle");

        let first_horn = self.play_to_end(&self.horn);
        let start_chain = async {
            let mut start = self.audio.play(&self.start).await;
            let duration = start.duration().await;

            let brake = async {
                match duration {
                    Some(duration) => {
                        tokio::time::sleep(duration / 2).await;
                        debug!("Brake cue at start midpoint ({:?})", duration / 2);
                        self.play_to_end(&self.brake).await;
                    }
                    None => debug!("Start cue duration unknown, brake cue skipped"),
                }
            };
            let horn_then_speech = async {
                if let Err(e) = start.ended().await {
                    warn!(cue = "start", "Announcement cue failed: {}", e);
                }
                self.play_to_end(&self.horn).await;

                self.speak(&text).await;
                tokio::time::sleep(self.repeat_delay).await;
                self.speak(&text).await;
                debug!(id = record.id, "Announcement speech finished");
            };

            tokio::join!(brake, horn_then_speech);
        };

        tokio::join!(first_horn, start_chain);
        debug!(id = record.id, "Announcement sequence finished");
    }
}

#[async_trait]
impl Announcer for AnnouncementSequencer {
    async fn announce(&self, record: &ServiceRecord) {
        self.run(record).await;
    }
}
