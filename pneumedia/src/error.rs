//! Types d'erreurs pour pneumedia

/// Erreurs de gestion de la playlist média
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Playlist item not found: {0}")]
    NotFound(i64),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Réponse d'erreur REST générique (`{error, message}`)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Type Result spécialisé pour pneumedia
pub type Result<T> = std::result::Result<T, Error>;
