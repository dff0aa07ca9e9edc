//! Types d'erreurs pour pneuqueue

/// Erreurs de gestion de la file d'attente
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Service record not found: {0}")]
    NotFound(i64),

    #[error("Service record already finalized: {0}")]
    AlreadyFinalized(i64),

    #[error("Invalid {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Persistence error: {0}")]
    PersistenceError(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("Unexpected payload: {0}")]
    Payload(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn invalid(field: &str, reason: impl Into<String>) -> Self {
        Error::InvalidInput {
            field: field.to_string(),
            reason: reason.into(),
        }
    }
}

/// Réponse d'erreur REST générique (`{error, message}`)
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

/// Type Result spécialisé pour pneuqueue
pub type Result<T> = std::result::Result<T, Error>;
