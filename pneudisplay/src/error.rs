//! Types d'erreurs du panneau TV
//!
//! Aucune de ces erreurs n'arrête le panneau : elles sont journalisées par le
//! composant qui a émis l'appel, et l'affichage garde ses données périmées.

/// Erreurs du panneau d'affichage
#[derive(Debug, thiserror::Error)]
pub enum DisplayError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Speech error: {0}")]
    Speech(String),

    #[error("Unexpected payload: {0}")]
    Payload(String),
}

impl From<pneuqueue::Error> for DisplayError {
    fn from(error: pneuqueue::Error) -> Self {
        match error {
            pneuqueue::Error::Payload(message) => DisplayError::Payload(message),
            other => DisplayError::Transport(other.to_string()),
        }
    }
}

impl From<pneumedia::Error> for DisplayError {
    fn from(error: pneumedia::Error) -> Self {
        DisplayError::Transport(error.to_string())
    }
}

/// Type Result spécialisé pour pneudisplay
pub type Result<T> = std::result::Result<T, DisplayError>;
