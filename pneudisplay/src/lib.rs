//! # pneudisplay - Panneau TV de l'atelier
//!
//! Client du serveur PneuShop qui affiche la file d'attente en direct,
//! annonce les véhicules prêts et diffuse la playlist média entre deux
//! annonces.
//!
//! # Architecture
//!
//! - **QueueSynchronizer** : acteur qui fusionne les évènements SSE et les
//!   rechargements périodiques dans une [`QueueView`], et publie l'écran
//!   courant via `tokio::sync::watch`
//! - **AnnouncementSequencer** : buzina, partida, freio puis message vocal,
//!   au mieux
//! - **MediaRotationRunner** : diffusion de la playlist selon les intervalles
//!   minimaux de chaque élément
//!
//! Les sorties (audio, voix, médias) sont des traits : les implémentations par
//! commande externe sont choisies par la configuration, les autres ne font que
//! journaliser.
//!
//! # Exemple
//!
//! ```no_run
//! use pneudisplay::{DisplayConfigExt, run_display};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = pneuconfig::get_config().display_settings();
//! run_display(settings).await
//! # }
//! ```

pub mod announce;
pub mod backend;
mod clock;
mod error;
pub mod media;
mod runtime;
pub mod settings;
pub mod source;
pub mod speech;
pub mod sync;
mod view;

pub use announce::{AnnouncementSequencer, Announcer};
pub use backend::{
    AudioOutput, CommandAudio, CommandSpeech, Cue, CueKind, Playback, PlaybackReporter,
    SilentSpeech, SimulatedAudio, SpeechSynthesizer, backends_from_settings,
};
pub use clock::Clock;
pub use error::{DisplayError, Result};
pub use media::{LogSurface, MediaRotationRunner, MediaSurface};
pub use runtime::run_display;
pub use settings::{
    AnnouncementSettings, CueSettings, DisplayConfigExt, DisplaySettings, MediaSettings,
};
pub use source::{PlaylistSource, QueueSource, follow_queue_events};
pub use speech::{Pronunciations, UtteranceBuilder, spell_plate};
pub use sync::{
    DisplaySnapshot, QueueSynchronizer, Screen, SyncHandle, SyncInput, SyncSettings,
};
pub use view::QueueView;
