//! Fiches de service : un véhicule, ses services demandés et ses horodatages.

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Longueurs admises pour une plaque normalisée
const PLATE_MIN_LEN: usize = 5;
const PLATE_MAX_LEN: usize = 8;

/// Fiche de service telle que stockée par le serveur.
///
/// `exited_at` n'est renseigné qu'une seule fois, par la finalisation, et
/// n'est jamais antérieur à `entered_at`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct ServiceRecord {
    pub id: i64,
    #[cfg_attr(feature = "api", schema(example = "ABC1D23"))]
    pub plate: String,
    #[cfg_attr(feature = "api", schema(example = "HB20"))]
    pub model: String,
    #[cfg_attr(feature = "api", schema(example = "Prata"))]
    pub color: String,
    pub services: Vec<String>,
    pub entered_at: DateTime<Utc>,
    #[serde(default)]
    pub exited_at: Option<DateTime<Utc>>,
}

impl ServiceRecord {
    /// Le véhicule attend encore (pas de sortie enregistrée)
    pub fn is_open(&self) -> bool {
        self.exited_at.is_none()
    }
}

/// Fiche soumise par l'accueil, avant attribution d'un identifiant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::ToSchema))]
pub struct NewServiceRecord {
    #[cfg_attr(feature = "api", schema(example = "abc-1d23"))]
    pub plate: String,
    pub model: String,
    pub color: String,
    #[cfg_attr(feature = "api", schema(example = json!(["Alinhamento", "Balanceamento"])))]
    pub services: Vec<String>,
}

impl NewServiceRecord {
    pub fn new(
        plate: impl Into<String>,
        model: impl Into<String>,
        color: impl Into<String>,
        services: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            plate: plate.into(),
            model: model.into(),
            color: color.into(),
            services: services.into_iter().map(Into::into).collect(),
        }
    }

    /// Valide la fiche et retourne sa forme normalisée
    ///
    /// - plaque en majuscules, sans tirets ni espaces, 5 à 8 caractères alphanumériques ;
    /// - modèle et couleur non vides (espaces de bord retirés) ;
    /// - au moins un service non vide.
    pub fn normalized(&self) -> Result<NewServiceRecord> {
        let plate = normalize_plate(&self.plate)?;

        let model = self.model.trim();
        if model.is_empty() {
            return Err(Error::invalid("model", "must not be blank"));
        }

        let color = self.color.trim();
        if color.is_empty() {
            return Err(Error::invalid("color", "must not be blank"));
        }

        let services: Vec<String> = self
            .services
            .iter()
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        if services.is_empty() {
            return Err(Error::invalid("services", "at least one service is required"));
        }

        Ok(NewServiceRecord {
            plate,
            model: model.to_string(),
            color: color.to_string(),
            services,
        })
    }
}

/// Normalise une plaque saisie (`"abc-1d23"` → `"ABC1D23"`)
pub fn normalize_plate(raw: &str) -> Result<String> {
    let plate: String = raw
        .chars()
        .filter(|c| *c != '-' && !c.is_whitespace())
        .map(|c| c.to_ascii_uppercase())
        .collect();

    if plate.is_empty() {
        return Err(Error::invalid("plate", "must not be blank"));
    }
    if !plate.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::invalid("plate", "only letters and digits are allowed"));
    }
    if !(PLATE_MIN_LEN..=PLATE_MAX_LEN).contains(&plate.len()) {
        return Err(Error::invalid(
            "plate",
            format!(
                "expected {} to {} characters, got {}",
                PLATE_MIN_LEN,
                PLATE_MAX_LEN,
                plate.len()
            ),
        ));
    }

    Ok(plate)
}

/// Filtre du rapport d'historique (`GET /api/queue/history`)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[cfg_attr(feature = "api", derive(utoipa::IntoParams, utoipa::ToSchema))]
#[cfg_attr(feature = "api", into_params(parameter_in = Query))]
pub struct HistoryFilter {
    /// Entrées à partir de cet instant (inclus)
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    /// Entrées jusqu'à cet instant (inclus)
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
    /// Fragment de plaque recherché
    #[serde(default)]
    pub plate: Option<String>,
}

impl HistoryFilter {
    /// Fragment de plaque normalisé comme les plaques stockées
    pub(crate) fn plate_fragment(&self) -> Option<String> {
        self.plate
            .as_deref()
            .map(|p| {
                p.chars()
                    .filter(|c| *c != '-' && !c.is_whitespace())
                    .map(|c| c.to_ascii_uppercase())
                    .collect::<String>()
            })
            .filter(|p| !p.is_empty())
    }
}
