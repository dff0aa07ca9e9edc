//! Gestion de la persistance SQLite de la playlist média

use crate::model::{MediaKind, NewPlaylistItem, PlaylistItem};
use crate::{Error, Result};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str =
    "SELECT id, kind, source, min_interval_minutes, duration_secs, position FROM playlist_items";

/// Magasin des éléments de playlist
#[derive(Clone)]
pub struct PlaylistStore {
    conn: Arc<Mutex<Connection>>,
}

impl PlaylistStore {
    /// Ouvre (ou crée) la base au chemin donné
    pub fn open(db_path: &Path) -> Result<Self> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                Error::PersistenceError(format!("Failed to create directory: {}", e))
            })?;
        }

        let conn = Connection::open(db_path)
            .map_err(|e| Error::PersistenceError(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::PersistenceError(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS playlist_items (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                kind TEXT NOT NULL,
                source TEXT NOT NULL,
                min_interval_minutes INTEGER NOT NULL DEFAULT 0,
                duration_secs INTEGER,
                position INTEGER NOT NULL
            )",
            [],
        )
        .map_err(|e| {
            Error::PersistenceError(format!("Failed to create playlist_items table: {}", e))
        })?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::PersistenceError("Database lock poisoned".into()))
    }

    /// Playlist complète, dans l'ordre de diffusion
    pub fn list(&self) -> Result<Vec<PlaylistItem>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare(&format!("{} ORDER BY position ASC, id ASC", SELECT_COLUMNS))
            .map_err(|e| Error::PersistenceError(format!("Failed to prepare statement: {}", e)))?;

        let rows = stmt
            .query_map([], row_to_item)
            .map_err(|e| Error::PersistenceError(format!("Failed to query playlist: {}", e)))?;

        let mut items = Vec::new();
        for row in rows {
            items.push(
                row.map_err(|e| Error::PersistenceError(format!("Failed to read item: {}", e)))?,
            );
        }
        Ok(items)
    }

    pub fn get(&self, id: i64) -> Result<PlaylistItem> {
        let conn = self.lock()?;
        fetch_one(&conn, id)
    }

    /// Ajoute un élément (en fin de playlist si aucune position n'est donnée)
    pub fn add(&self, item: &NewPlaylistItem) -> Result<PlaylistItem> {
        item.validate()?;
        let conn = self.lock()?;

        let position = match item.position {
            Some(position) => position,
            None => next_position(&conn)?,
        };

        conn.execute(
            "INSERT INTO playlist_items (kind, source, min_interval_minutes, duration_secs, position)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                item.kind.as_str(),
                item.source.trim(),
                item.min_interval_minutes,
                item.duration_secs,
                position
            ],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to insert item: {}", e)))?;

        fetch_one(&conn, conn.last_insert_rowid())
    }

    /// Remplace un élément (la position est conservée si absente)
    pub fn update(&self, id: i64, item: &NewPlaylistItem) -> Result<PlaylistItem> {
        item.validate()?;
        let conn = self.lock()?;
        let current = fetch_one(&conn, id)?;

        conn.execute(
            "UPDATE playlist_items
             SET kind = ?1, source = ?2, min_interval_minutes = ?3, duration_secs = ?4, position = ?5
             WHERE id = ?6",
            params![
                item.kind.as_str(),
                item.source.trim(),
                item.min_interval_minutes,
                item.duration_secs,
                item.position.unwrap_or(current.position),
                id
            ],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to update item: {}", e)))?;

        fetch_one(&conn, id)
    }

    pub fn remove(&self, id: i64) -> Result<()> {
        let conn = self.lock()?;
        let deleted = conn
            .execute("DELETE FROM playlist_items WHERE id = ?1", params![id])
            .map_err(|e| Error::PersistenceError(format!("Failed to delete item: {}", e)))?;

        if deleted == 0 {
            return Err(Error::NotFound(id));
        }
        Ok(())
    }
}

fn next_position(conn: &Connection) -> Result<i64> {
    conn.query_row(
        "SELECT COALESCE(MAX(position) + 1, 0) FROM playlist_items",
        [],
        |row| row.get(0),
    )
    .map_err(|e| Error::PersistenceError(format!("Failed to compute position: {}", e)))
}

fn fetch_one(conn: &Connection, id: i64) -> Result<PlaylistItem> {
    conn.query_row(
        &format!("{} WHERE id = ?1", SELECT_COLUMNS),
        params![id],
        row_to_item,
    )
    .optional()
    .map_err(|e| Error::PersistenceError(format!("Failed to load item: {}", e)))?
    .ok_or(Error::NotFound(id))
}

fn row_to_item(row: &Row<'_>) -> rusqlite::Result<PlaylistItem> {
    let kind: String = row.get(1)?;
    let kind = MediaKind::parse(&kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            1,
            Type::Text,
            format!("unknown media kind: {}", kind).into(),
        )
    })?;

    Ok(PlaylistItem {
        id: row.get(0)?,
        kind,
        source: row.get(2)?,
        min_interval_minutes: row.get(3)?,
        duration_secs: row.get(4)?,
        position: row.get(5)?,
    })
}
