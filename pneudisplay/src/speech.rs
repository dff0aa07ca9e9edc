//! Texte de l'annonce vocale (pt-BR).
//!
//! Exemple pour un HB20 prata, placa ABC1Q23 :
//!
//! ```text
//! Atenção, agá bê vinte, placa á, bê, cê, 1, quê, 2, 3, cor prata. Por favor, dirija-se ao balcão para retirar o seu veículo.
//! ```

use pneuqueue::ServiceRecord;
use std::collections::BTreeMap;

/// Modèles dont la lecture par défaut est ambiguë
const BUILTIN_PRONUNCIATIONS: &[(&str, &str)] = &[
    ("HB20", "agá bê vinte"),
    ("HB20S", "agá bê vinte ésse"),
    ("ONIX", "ônix"),
    ("KWID", "cuídi"),
    ("T-CROSS", "tê cross"),
    ("HR-V", "agá érre vê"),
    ("CR-V", "cê érre vê"),
    ("UP", "âpi"),
    ("KA", "cá"),
    ("C3", "cê três"),
];

/// Nom parlé d'une lettre
///
/// Q, W et Y ont une prononciation explicite.
pub fn letter_name(c: char) -> Option<&'static str> {
    let name = match c.to_ascii_uppercase() {
        'A' => "á",
        'B' => "bê",
        'C' => "cê",
        'D' => "dê",
        'E' => "é",
        'F' => "éfe",
        'G' => "gê",
        'H' => "agá",
        'I' => "i",
        'J' => "jota",
        'K' => "cá",
        'L' => "éle",
        'M' => "ême",
        'N' => "ene",
        'O' => "ó",
        'P' => "pê",
        'Q' => "quê",
        'R' => "érre",
        'S' => "ésse",
        'T' => "tê",
        'U' => "u",
        'V' => "vê",
        'W' => "dáblio",
        'X' => "xis",
        'Y' => "ípsilon",
        'Z' => "zê",
        _ => return None,
    };
    Some(name)
}

/// Épelle une plaque : lettres nommées, chiffres conservés, séparateurs ignorés
pub fn spell_plate(plate: &str) -> String {
    plate
        .chars()
        .filter_map(|c| {
            if c.is_ascii_digit() {
                Some(c.to_string())
            } else {
                letter_name(c).map(str::to_string)
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Table de prononciation des modèles (clé en majuscules)
#[derive(Debug, Clone)]
pub struct Pronunciations {
    table: BTreeMap<String, String>,
}

impl Default for Pronunciations {
    fn default() -> Self {
        Self {
            table: BUILTIN_PRONUNCIATIONS
                .iter()
                .map(|(model, spoken)| (model.to_string(), spoken.to_string()))
                .collect(),
        }
    }
}

impl Pronunciations {
    /// Table intégrée complétée (ou surchargée) par `extra`
    pub fn with_overrides(extra: &BTreeMap<String, String>) -> Self {
        let mut pronunciations = Self::default();
        for (model, spoken) in extra {
            pronunciations
                .table
                .insert(model.trim().to_uppercase(), spoken.clone());
        }
        pronunciations
    }

    /// Forme parlée d'un modèle, le modèle tel quel s'il est inconnu
    pub fn pronounce(&self, model: &str) -> String {
        let model = model.trim();
        self.table
            .get(&model.to_uppercase())
            .cloned()
            .unwrap_or_else(|| model.to_string())
    }
}

/// Construit le message lu au retrait d'un véhicule
#[derive(Debug, Clone, Default)]
pub struct UtteranceBuilder {
    pronunciations: Pronunciations,
}

impl UtteranceBuilder {
    pub fn new(pronunciations: Pronunciations) -> Self {
        Self { pronunciations }
    }

    pub fn build(&self, record: &ServiceRecord) -> String {
        format!(
            "Atenção, {}, placa {}, cor {}. Por favor, dirija-se ao balcão para retirar o seu veículo.",
            self.pronunciations.pronounce(&record.model),
            spell_plate(&record.plate),
            record.color.trim().to_lowercase()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(plate: &str, model: &str, color: &str) -> ServiceRecord {
        ServiceRecord {
            id: 1,
            plate: plate.into(),
            model: model.into(),
            color: color.into(),
            services: vec!["Alinhamento".into()],
            entered_at: Utc::now(),
            exited_at: None,
        }
    }

    #[test]
    fn test_plate_with_q_uses_explicit_name() {
        assert_eq!(spell_plate("ABC1Q23"), "á, bê, cê, 1, quê, 2, 3");
    }

    #[test]
    fn test_w_and_y_and_separators() {
        assert_eq!(spell_plate("wy-9 k"), "dáblio, ípsilon, 9, cá");
    }

    #[test]
    fn test_pronunciation_lookup_is_case_insensitive() {
        let p = Pronunciations::default();
        assert_eq!(p.pronounce(" hb20 "), "agá bê vinte");
        assert_eq!(p.pronounce("Onix"), "ônix");
        assert_eq!(p.pronounce("Corolla"), "Corolla");
    }

    #[test]
    fn test_overrides_extend_builtin_table() {
        let mut extra = BTreeMap::new();
        extra.insert("yaris".to_string(), "iáris".to_string());
        extra.insert("ka".to_string(), "cá sedan".to_string());

        let p = Pronunciations::with_overrides(&extra);
        assert_eq!(p.pronounce("Yaris"), "iáris");
        assert_eq!(p.pronounce("KA"), "cá sedan");
        assert_eq!(p.pronounce("KWID"), "cuídi");
    }

    #[test]
    fn test_utterance() {
        let text = UtteranceBuilder::default().build(&record("ABC1Q23", "HB20", "Prata"));
        assert_eq!(
            text,
            "Atenção, agá bê vinte, placa á, bê, cê, 1, quê, 2, 3, cor prata. \
             Por favor, dirija-se ao balcão para retirar o seu veículo."
        );
    }
}
