//! Gestion de la persistance SQLite des fiches de service

use crate::model::{HistoryFilter, NewServiceRecord, ServiceRecord};
use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

const SELECT_COLUMNS: &str =
    "SELECT id, plate, model, color, services, entered_at, exited_at FROM service_records";

/// Magasin des fiches de service (une seule table, jamais de suppression)
#[derive(Clone)]
pub struct QueueStore {
    conn: Arc<Mutex<Connection>>,
}

impl QueueStore {
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

    /// Base en mémoire, utilisée par les tests
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| Error::PersistenceError(format!("Failed to open database: {}", e)))?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute(
            "CREATE TABLE IF NOT EXISTS service_records (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                plate TEXT NOT NULL,
                model TEXT NOT NULL,
                color TEXT NOT NULL,
                services TEXT NOT NULL,
                entered_at INTEGER NOT NULL,
                exited_at INTEGER
            )",
            [],
        )
        .map_err(|e| {
            Error::PersistenceError(format!("Failed to create service_records table: {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_open ON service_records(exited_at, entered_at)",
            [],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to create index: {}", e)))?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_records_plate ON service_records(plate)",
            [],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to create index: {}", e)))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::PersistenceError("Database lock poisoned".into()))
    }

    /// Enregistre une fiche déjà normalisée et retourne la fiche complète
    pub fn insert(&self, new: &NewServiceRecord, entered_at: DateTime<Utc>) -> Result<ServiceRecord> {
        let services = serde_json::to_string(&new.services)
            .map_err(|e| Error::PersistenceError(format!("Failed to encode services: {}", e)))?;

        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO service_records (plate, model, color, services, entered_at, exited_at)
             VALUES (?1, ?2, ?3, ?4, ?5, NULL)",
            params![
                &new.plate,
                &new.model,
                &new.color,
                services,
                entered_at.timestamp_millis()
            ],
        )
        .map_err(|e| Error::PersistenceError(format!("Failed to insert record: {}", e)))?;

        let id = conn.last_insert_rowid();
        fetch_one(&conn, id)
    }

    /// Récupère une fiche par identifiant
    pub fn get(&self, id: i64) -> Result<ServiceRecord> {
        let conn = self.lock()?;
        fetch_one(&conn, id)
    }

    /// Fiches ouvertes, de la plus récente à la plus ancienne
    pub fn list_open(&self) -> Result<Vec<ServiceRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "{} WHERE exited_at IS NULL ORDER BY entered_at DESC, id DESC",
            SELECT_COLUMNS
        );
        query_records(&conn, &sql, params![])
    }

    /// Clôture une fiche ouverte
    ///
    /// L'heure de sortie enregistrée vaut `max(now, entered_at)`.
    pub fn finalize(&self, id: i64, now: DateTime<Utc>) -> Result<ServiceRecord> {
        let conn = self.lock()?;
        let record = fetch_one(&conn, id)?;
        if !record.is_open() {
            return Err(Error::AlreadyFinalized(id));
        }

        let exited_at = now.max(record.entered_at);
        let updated = conn
            .execute(
                "UPDATE service_records SET exited_at = ?1 WHERE id = ?2 AND exited_at IS NULL",
                params![exited_at.timestamp_millis(), id],
            )
            .map_err(|e| Error::PersistenceError(format!("Failed to finalize record: {}", e)))?;

        if updated == 0 {
            return Err(Error::AlreadyFinalized(id));
        }

        fetch_one(&conn, id)
    }

    /// Rapport : fiches entrées dans l'intervalle, ouvertes ou clôturées
    pub fn history(&self, filter: &HistoryFilter) -> Result<Vec<ServiceRecord>> {
        let conn = self.lock()?;
        let sql = format!(
            "{} WHERE (?1 IS NULL OR entered_at >= ?1)
                AND (?2 IS NULL OR entered_at <= ?2)
                AND (?3 IS NULL OR instr(plate, ?3) > 0)
             ORDER BY entered_at DESC, id DESC",
            SELECT_COLUMNS
        );
        query_records(
            &conn,
            &sql,
            params![
                filter.from.map(|d| d.timestamp_millis()),
                filter.to.map(|d| d.timestamp_millis()),
                filter.plate_fragment(),
            ],
        )
    }
}

fn fetch_one(conn: &Connection, id: i64) -> Result<ServiceRecord> {
    let sql = format!("{} WHERE id = ?1", SELECT_COLUMNS);
    conn.query_row(&sql, params![id], row_to_record)
        .optional()
        .map_err(|e| Error::PersistenceError(format!("Failed to load record: {}", e)))?
        .ok_or(Error::NotFound(id))
}

fn query_records(
    conn: &Connection,
    sql: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<ServiceRecord>> {
    let mut stmt = conn
        .prepare(sql)
        .map_err(|e| Error::PersistenceError(format!("Failed to prepare statement: {}", e)))?;

    let rows = stmt
        .query_map(params, row_to_record)
        .map_err(|e| Error::PersistenceError(format!("Failed to query records: {}", e)))?;

    let mut records = Vec::new();
    for row in rows {
        records.push(
            row.map_err(|e| Error::PersistenceError(format!("Failed to read record: {}", e)))?,
        );
    }
    Ok(records)
}

fn row_to_record(row: &Row<'_>) -> rusqlite::Result<ServiceRecord> {
    let services: String = row.get(4)?;
    let services: Vec<String> = serde_json::from_str(&services)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(4, Type::Text, Box::new(e)))?;
    let entered_at: i64 = row.get(5)?;
    let exited_at: Option<i64> = row.get(6)?;

    Ok(ServiceRecord {
        id: row.get(0)?,
        plate: row.get(1)?,
        model: row.get(2)?,
        color: row.get(3)?,
        services,
        entered_at: from_millis(entered_at),
        exited_at: exited_at.map(from_millis),
    })
}

fn from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}
