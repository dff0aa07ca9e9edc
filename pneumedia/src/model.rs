//! Éléments de la playlist diffusée sur le panneau TV.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};

/// Nature d'un élément de playlist
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "image" => Some(MediaKind::Image),
            "video" => Some(MediaKind::Video),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Élément de playlist, dans l'ordre défini par le serveur (`position`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct PlaylistItem {
    pub id: i64,
    pub kind: MediaKind,
    /// URL absolue ou chemin relatif au serveur (ex: `/media/promo.jpg`)
    pub source: String,
    /// Délai minimal entre deux diffusions, 0 = sans restriction
    #[serde(default)]
    pub min_interval_minutes: u32,
    /// Durée d'affichage d'une image
    #[serde(default)]
    pub duration_secs: Option<u32>,
    pub position: i64,
}

impl PlaylistItem {
    /// URL complète de la source pour un serveur donné
    pub fn source_url(&self, server_url: &str) -> String {
        if self.source.starts_with("http://") || self.source.starts_with("https://") {
            self.source.clone()
        } else {
            format!(
                "{}/{}",
                server_url.trim_end_matches('/'),
                self.source.trim_start_matches('/')
            )
        }
    }
}

/// Élément soumis par l'administration (création ou remplacement)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct NewPlaylistItem {
    pub kind: MediaKind,
    #[cfg_attr(feature = "api", schema(example = "/media/promo-pneus.jpg"))]
    pub source: String,
    #[serde(default)]
    pub min_interval_minutes: u32,
    #[serde(default)]
    pub duration_secs: Option<u32>,
    /// Position dans la playlist, en fin de liste si absente
    #[serde(default)]
    pub position: Option<i64>,
}

impl NewPlaylistItem {
    pub fn image(source: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Image,
            source: source.into(),
            min_interval_minutes: 0,
            duration_secs: None,
            position: None,
        }
    }

    pub fn video(source: impl Into<String>) -> Self {
        Self {
            kind: MediaKind::Video,
            ..Self::image(source)
        }
    }

    pub fn with_interval(mut self, minutes: u32) -> Self {
        self.min_interval_minutes = minutes;
        self
    }

    pub fn with_duration(mut self, secs: u32) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    pub fn at(mut self, position: i64) -> Self {
        self.position = Some(position);
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.source.trim().is_empty() {
            return Err(Error::InvalidInput {
                field: "source".into(),
                reason: "must not be blank".into(),
            });
        }
        if self.duration_secs == Some(0) {
            return Err(Error::InvalidInput {
                field: "duration_secs".into(),
                reason: "must be positive".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_url() {
        let item = PlaylistItem {
            id: 1,
            kind: MediaKind::Image,
            source: "/media/promo.jpg".into(),
            min_interval_minutes: 0,
            duration_secs: None,
            position: 0,
        };
        assert_eq!(
            item.source_url("http://10.0.0.2:8080/"),
            "http://10.0.0.2:8080/media/promo.jpg"
        );

        let remote = PlaylistItem {
            source: "https://cdn.example.com/a.mp4".into(),
            ..item
        };
        assert_eq!(
            remote.source_url("http://10.0.0.2:8080"),
            "https://cdn.example.com/a.mp4"
        );
    }

    #[test]
    fn test_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&MediaKind::Video).unwrap(),
            "\"video\""
        );
        assert_eq!(MediaKind::parse(" Image "), Some(MediaKind::Image));
        assert_eq!(MediaKind::parse("audio"), None);
    }

    #[test]
    fn test_validate_rejects_blank_source() {
        assert!(NewPlaylistItem::image("  ").validate().is_err());
        assert!(NewPlaylistItem::image("a.jpg")
            .with_duration(0)
            .validate()
            .is_err());
        assert!(NewPlaylistItem::video("a.mp4").validate().is_ok());
    }
}
