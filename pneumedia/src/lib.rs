//! # pneumedia - Playlist d'images et de vidéos du panneau TV
//!
//! - magasin SQLite des éléments de playlist et API REST (feature `api`)
//! - moteur de rotation : éligibilité, sélection au premier éligible,
//!   registre des dernières diffusions avec fichier de session
//! - client HTTP (feature `client`)
//!
//! ```
//! use chrono::Utc;
//! use pneumedia::{LastPlayedLedger, MediaRotation, RotationTiming, Selection};
//!
//! let mut rotation = MediaRotation::new(RotationTiming::default(), LastPlayedLedger::new());
//! assert!(matches!(rotation.select_next(&[], Utc::now()), Selection::Wait(_)));
//! ```

mod config_ext;
mod error;
mod model;
mod persistence;
pub mod rotation;

#[cfg(feature = "api")]
pub mod api;
#[cfg(feature = "api")]
pub mod openapi;
#[cfg(feature = "api")]
mod pneuserver_ext;

#[cfg(feature = "client")]
pub mod client;

pub use config_ext::MediaConfigExt;
pub use error::{Error, ErrorResponse, Result};
pub use model::{MediaKind, NewPlaylistItem, PlaylistItem};
pub use persistence::PlaylistStore;
pub use rotation::{
    is_eligible, LastPlayedLedger, MediaRotation, RotationTiming, Selection, MIN_WAIT,
};

#[cfg(feature = "api")]
pub use pneuserver_ext::MediaServerExt;

#[cfg(feature = "client")]
pub use client::MediaClient;
