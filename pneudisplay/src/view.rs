//! Vue locale de la file : fiches ouvertes, de la plus récente à la plus
//! ancienne, et indice de la fiche affichée.

use pneuqueue::ServiceRecord;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueueView {
    records: Vec<ServiceRecord>,
    /// `None` si et seulement si la vue est vide
    displayed: Option<usize>,
}

impl QueueView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[ServiceRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn displayed_index(&self) -> Option<usize> {
        self.displayed
    }

    pub fn displayed(&self) -> Option<&ServiceRecord> {
        self.displayed.and_then(|i| self.records.get(i))
    }

    pub fn ids(&self) -> Vec<i64> {
        self.records.iter().map(|r| r.id).collect()
    }

    /// Remplace toute la vue par le résultat d'un rechargement
    ///
    /// Les fiches clôturées sont écartées et l'ordre est stable par entrée
    /// décroissante. La fiche affichée reste à l'écran si elle est toujours
    /// présente. Retourne `true` si la suite des identifiants a changé.
    pub fn replace(&mut self, records: Vec<ServiceRecord>) -> bool {
        let current = self.displayed().map(|r| r.id);
        let before = self.ids();

        let mut records: Vec<ServiceRecord> = records.into_iter().filter(|r| r.is_open()).collect();
        records.sort_by(|a, b| b.entered_at.cmp(&a.entered_at));
        self.records = records;

        self.displayed = if self.records.is_empty() {
            None
        } else {
            Some(
                current
                    .and_then(|id| self.records.iter().position(|r| r.id == id))
                    .unwrap_or(0),
            )
        };

        self.ids() != before
    }

    /// Retire une fiche clôturée
    ///
    /// Si c'était la fiche affichée, l'affichage revient au premier élément ;
    /// si elle précédait la fiche affichée, l'indice suit la même fiche.
    /// Un identifiant inconnu laisse la vue inchangée.
    pub fn remove(&mut self, id: i64) -> Option<ServiceRecord> {
        let index = self.records.iter().position(|r| r.id == id)?;
        let removed = self.records.remove(index);

        self.displayed = match self.displayed {
            _ if self.records.is_empty() => None,
            Some(current) if current == index => Some(0),
            Some(current) if current > index => Some(current - 1),
            other => other,
        };

        Some(removed)
    }

    /// Passe cycliquement à la fiche suivante
    pub fn advance(&mut self) {
        if let Some(current) = self.displayed {
            self.displayed = Some((current + 1) % self.records.len());
        }
    }
}
