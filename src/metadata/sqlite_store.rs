//! SQLite implementation of MetadataStorage trait

use crate::binary::PayloadRef;
use crate::config::MetadataConfig;
use crate::error::StoreError;
use crate::metadata::model::TIMESTAMP_FORMAT;
use crate::metadata::{
    search_index_matches, Artefact, ArtefactId, LocationId, MetadataStorage, NaturalKey, SearchIndex,
};
use chrono::NaiveDateTime;
use log::{debug, info};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SCHEMA: &str = "
    CREATE TABLE IF NOT EXISTS artefact (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        source_artefact_id TEXT,
        provenance TEXT NOT NULL,
        location_id TEXT NOT NULL,
        content_date TEXT NOT NULL,
        language TEXT NOT NULL,
        list_type TEXT NOT NULL,
        artefact_type TEXT NOT NULL,
        sensitivity TEXT NOT NULL,
        display_from TEXT NOT NULL,
        display_to TEXT,
        last_received TEXT NOT NULL,
        payload TEXT NOT NULL,
        payload_size INTEGER NOT NULL,
        search_index TEXT NOT NULL,
        superseded_count INTEGER NOT NULL,
        is_flat_file INTEGER NOT NULL,
        archived INTEGER NOT NULL DEFAULT 0
    );
    CREATE UNIQUE INDEX IF NOT EXISTS artefact_live_natural_key
        ON artefact (location_id, content_date, language, list_type, provenance)
        WHERE archived = 0;
    CREATE INDEX IF NOT EXISTS artefact_location ON artefact (location_id);
    CREATE INDEX IF NOT EXISTS artefact_display_to ON artefact (display_to);
";

const SELECT_COLUMNS: &str = "SELECT id, source_artefact_id, provenance, location_id, content_date, language, \
     list_type, artefact_type, sensitivity, display_from, display_to, last_received, payload, \
     payload_size, search_index, superseded_count, is_flat_file, archived FROM artefact";

const INSERT_COLUMNS: &str = "source_artefact_id, provenance, location_id, content_date, language, \
     list_type, artefact_type, sensitivity, display_from, display_to, last_received, payload, \
     payload_size, search_index, superseded_count, is_flat_file, archived";

fn format_timestamp(value: &NaiveDateTime) -> String {
    value.format(TIMESTAMP_FORMAT).to_string()
}

fn conversion_error(idx: usize, err: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, err.into())
}

fn timestamp_column(row: &Row<'_>, idx: usize) -> rusqlite::Result<NaiveDateTime> {
    let text: String = row.get(idx)?;
    NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| conversion_error(idx, e))
}

fn parsed_column<T: FromStr<Err = String>>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
    let text: String = row.get(idx)?;
    text.parse::<T>().map_err(|e| conversion_error(idx, e))
}

fn row_to_artefact(row: &Row<'_>) -> rusqlite::Result<Artefact> {
    let display_to: Option<String> = row.get(10)?;
    let display_to = display_to
        .map(|text| NaiveDateTime::parse_from_str(&text, TIMESTAMP_FORMAT).map_err(|e| conversion_error(10, e)))
        .transpose()?;
    let search_json: String = row.get(14)?;
    let search: SearchIndex = serde_json::from_str(&search_json).map_err(|e| conversion_error(14, e))?;
    let payload_size: i64 = row.get(13)?;
    let superseded_count: i64 = row.get(15)?;

    Ok(Artefact {
        id: Some(ArtefactId(row.get(0)?)),
        source_artefact_id: row.get(1)?,
        provenance: row.get(2)?,
        location_id: LocationId::from(row.get::<_, String>(3)?),
        content_date: timestamp_column(row, 4)?,
        language: parsed_column(row, 5)?,
        list_type: parsed_column(row, 6)?,
        artefact_type: parsed_column(row, 7)?,
        sensitivity: parsed_column(row, 8)?,
        display_from: timestamp_column(row, 9)?,
        display_to,
        last_received: timestamp_column(row, 11)?,
        payload: PayloadRef(row.get(12)?),
        payload_size: u64::try_from(payload_size).map_err(|e| conversion_error(13, e))?,
        search,
        superseded_count: u32::try_from(superseded_count).map_err(|e| conversion_error(15, e))?,
        is_flat_file: row.get(16)?,
        archived: row.get(17)?,
    })
}

/// SQLite implementation of MetadataStorage
pub struct SQLiteMetadataStore {
    conn: Mutex<Connection>,
}

impl SQLiteMetadataStore {
    /// Open (or create) the database described by the configuration
    pub fn new(config: &MetadataConfig) -> Result<Self, StoreError> {
        let path = Path::new(&config.db_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        info!("Using SQLite metadata database at {}", path.display());
        let conn = Connection::open(path)?;
        Self::initialise(conn, config)
    }

    /// In-memory database, used by tests
    pub fn in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::initialise(conn, &MetadataConfig::default())
    }

    fn initialise(conn: Connection, config: &MetadataConfig) -> Result<Self, StoreError> {
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        if config.wal_mode {
            // journal_mode returns the resulting mode as a row
            let mode: String = conn.query_row("PRAGMA journal_mode = WAL", [], |row| row.get(0))?;
            debug!("SQLite journal mode: {}", mode);
        }
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn
            .lock()
            .map_err(|_| StoreError::Backend("metadata connection lock poisoned".to_string()))
    }

    fn query_many(&self, sql: &str, params: &[&dyn rusqlite::ToSql]) -> Result<Vec<Artefact>, StoreError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt.query_map(params, row_to_artefact)?;
        let mut artefacts = Vec::new();
        for row in rows {
            artefacts.push(row?);
        }
        Ok(artefacts)
    }
}

impl MetadataStorage for SQLiteMetadataStore {
    fn find_by_natural_key(&self, key: &NaturalKey) -> Result<Option<Artefact>, StoreError> {
        let conn = self.lock()?;
        let sql = format!(
            "{} WHERE location_id = ?1 AND content_date = ?2 AND language = ?3 \
             AND list_type = ?4 AND provenance = ?5 AND archived = 0",
            SELECT_COLUMNS
        );
        let found = conn
            .query_row(
                &sql,
                params![
                    key.location_id.as_stored(),
                    format_timestamp(&key.content_date),
                    key.language.to_string(),
                    key.list_type.to_string(),
                    key.provenance,
                ],
                row_to_artefact,
            )
            .optional()?;
        Ok(found)
    }

    fn find_by_id(&self, id: ArtefactId) -> Result<Option<Artefact>, StoreError> {
        let conn = self.lock()?;
        let sql = format!("{} WHERE id = ?1 AND archived = 0", SELECT_COLUMNS);
        let found = conn.query_row(&sql, params![id.0], row_to_artefact).optional()?;
        Ok(found)
    }

    fn save(&self, artefact: &Artefact) -> Result<Artefact, StoreError> {
        let search_json =
            serde_json::to_string(&artefact.search).map_err(|e| StoreError::Backend(e.to_string()))?;
        let payload_size =
            i64::try_from(artefact.payload_size).map_err(|e| StoreError::Backend(e.to_string()))?;
        let location = artefact.location_id.as_stored();
        let content_date = format_timestamp(&artefact.content_date);
        let language = artefact.language.to_string();
        let list_type = artefact.list_type.to_string();
        let artefact_type = artefact.artefact_type.to_string();
        let sensitivity = artefact.sensitivity.to_string();
        let display_from = format_timestamp(&artefact.display_from);
        let display_to = artefact.display_to.as_ref().map(format_timestamp);
        let last_received = format_timestamp(&artefact.last_received);
        let values: [&dyn rusqlite::ToSql; 17] = [
            &artefact.source_artefact_id,
            &artefact.provenance,
            &location,
            &content_date,
            &language,
            &list_type,
            &artefact_type,
            &sensitivity,
            &display_from,
            &display_to,
            &last_received,
            &artefact.payload.0,
            &payload_size,
            &search_json,
            &artefact.superseded_count,
            &artefact.is_flat_file,
            &false,
        ];

        let conn = self.lock()?;
        let id = match artefact.id {
            None => {
                let sql = format!(
                    "INSERT INTO artefact ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                    INSERT_COLUMNS
                );
                conn.execute(&sql, &values[..])?;
                ArtefactId(conn.last_insert_rowid())
            }
            Some(id) => {
                let read_count = artefact.superseded_count.checked_sub(1).ok_or_else(|| {
                    StoreError::Backend(format!("replacement for artefact {} has a zero superseded count", id))
                })?;
                let assignments = INSERT_COLUMNS
                    .split(',')
                    .enumerate()
                    .map(|(i, col)| format!("{} = ?{}", col.trim(), i + 1))
                    .collect::<Vec<_>>()
                    .join(", ");
                let mut with_id: Vec<&dyn rusqlite::ToSql> = values.to_vec();
                with_id.push(&id.0);
                with_id.push(&read_count);
                let update = format!(
                    "UPDATE artefact SET {} WHERE id = ?18 AND archived = 0 AND superseded_count = ?19",
                    assignments
                );
                if conn.execute(&update, with_id.as_slice())? == 0 {
                    let stored: Option<(bool, u32)> = conn
                        .query_row(
                            "SELECT archived, superseded_count FROM artefact WHERE id = ?1",
                            params![id.0],
                            |row| Ok((row.get(0)?, row.get(1)?)),
                        )
                        .optional()?;
                    if let Some((archived, stored_count)) = stored {
                        return Err(StoreError::ConstraintViolation(format!(
                            "artefact {} changed since it was read (archived: {}, superseded count {} not {})",
                            id, archived, stored_count, read_count
                        )));
                    }
                    // the row was deleted since it was read; write it back under the same id
                    let insert = format!(
                        "INSERT INTO artefact (id, {}) VALUES (?18, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
                        INSERT_COLUMNS
                    );
                    conn.execute(&insert, &with_id[..18])?;
                }
                id
            }
        };

        debug!("Saved artefact {} (superseded count {})", id, artefact.superseded_count);
        let mut saved = artefact.clone();
        saved.id = Some(id);
        saved.archived = false;
        Ok(saved)
    }

    fn delete(&self, artefact: &Artefact) -> Result<(), StoreError> {
        let id = artefact
            .id
            .ok_or_else(|| StoreError::NotFound("artefact has no id".to_string()))?;
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM artefact WHERE id = ?1", params![id.0])?;
        if removed == 0 {
            return Err(StoreError::NotFound(format!("No artefact row with id {}", id)));
        }
        Ok(())
    }

    fn archive(&self, artefact: &Artefact) -> Result<bool, StoreError> {
        let id = artefact
            .id
            .ok_or_else(|| StoreError::NotFound("artefact has no id".to_string()))?;
        let conn = self.lock()?;
        let updated = conn.execute(
            "UPDATE artefact SET archived = 1 WHERE id = ?1 AND archived = 0 AND payload = ?2",
            params![id.0, artefact.payload.0],
        )?;
        Ok(updated > 0)
    }

    fn find_expired(&self, now: NaiveDateTime) -> Result<Vec<Artefact>, StoreError> {
        let sql = format!(
            "{} WHERE archived = 0 AND display_to IS NOT NULL AND display_to < ?1 ORDER BY id",
            SELECT_COLUMNS
        );
        self.query_many(&sql, params![format_timestamp(&now)])
    }

    fn find_by_location(&self, location: &LocationId) -> Result<Vec<Artefact>, StoreError> {
        let sql = format!("{} WHERE archived = 0 AND location_id = ?1 ORDER BY id", SELECT_COLUMNS);
        self.query_many(&sql, params![location.as_stored()])
    }

    fn search(&self, term: &str, value: &str) -> Result<Vec<Artefact>, StoreError> {
        // LIKE narrows the candidates; the exact per-term match happens in Rust
        let sql = format!(
            "{} WHERE archived = 0 AND search_index LIKE ?1 ORDER BY id",
            SELECT_COLUMNS
        );
        let pattern = format!("%{}%", value.replace('%', "").replace('_', ""));
        let candidates = self.query_many(&sql, params![pattern])?;
        Ok(candidates
            .into_iter()
            .filter(|artefact| search_index_matches(artefact, term, value))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::test_support::{artefact, exercise_store};
    use crate::metadata::ListType;
    use tempfile::TempDir;

    #[test]
    fn test_sqlite_metadata_store_contract() {
        let store = SQLiteMetadataStore::in_memory().unwrap();
        exercise_store(&store);
    }

    #[test]
    fn test_sqlite_store_persists_across_connections() {
        let dir = TempDir::new().unwrap();
        let config = MetadataConfig {
            db_path: dir.path().join("metadata").join("artefacts.sqlite").display().to_string(),
            ..MetadataConfig::default()
        };

        let mut row = artefact("9", ListType::SjpPublicList);
        row.search.insert("caseUrn".to_string(), vec!["URN123".to_string()]);
        let id = {
            let store = SQLiteMetadataStore::new(&config).unwrap();
            store.save(&row).unwrap().id.unwrap()
        };

        let reopened = SQLiteMetadataStore::new(&config).unwrap();
        let found = reopened.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.list_type, ListType::SjpPublicList);
        assert_eq!(found.display_to, row.display_to);
        assert_eq!(found.search.get("caseUrn"), Some(&vec!["URN123".to_string()]));
    }

    #[test]
    fn test_sqlite_store_unresolved_location_round_trip() {
        let store = SQLiteMetadataStore::in_memory().unwrap();
        let mut row = artefact("1", ListType::CrownFirmList);
        row.location_id = LocationId::Unresolved { provenance_id: "777".to_string() };
        let id = store.save(&row).unwrap().id.unwrap();

        let found = store.find_by_id(id).unwrap().unwrap();
        assert_eq!(found.location_id, row.location_id);
        assert_eq!(store.find_by_location(&LocationId::from("NoMatch777")).unwrap().len(), 1);
    }
}
