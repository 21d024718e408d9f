use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::{Connection, params};
use serde::Serialize;
use serde::de::DeserializeOwned;

use hush_core::{Archive, ArchiveError, KnowledgeEntry, SourceEndpoint, Timestamp, Vector};

use crate::error::{Result, StoreError};
use crate::schema;

pub struct Store {
    conn: Connection,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::initialize(&conn)?;
        Ok(Self { conn })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    // --- Metadata ---

    pub fn get_metadata(&self, key: &str) -> Result<Option<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT value FROM metadata WHERE key = ?1")?;
        let result = stmt.query_row([key], |row| row.get(0)).ok();
        Ok(result)
    }

    pub fn set_metadata(&self, key: &str, value: &str) -> Result<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO metadata (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
        Ok(())
    }

    /// Store any serializable state under a metadata key as JSON.
    pub fn set_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_metadata(key, &serde_json::to_string(value)?)
    }

    pub fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_metadata(key)? {
            Some(raw) => Ok(Some(serde_json::from_str(&raw)?)),
            None => Ok(None),
        }
    }

    // --- Knowledge entries ---

    /// Replace all persisted entries with the given list, preserving its
    /// order via the position column.
    pub fn save_entries(&self, entries: &[KnowledgeEntry]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM entries", [])?;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO entries (hash, magnitude, entropy_rate, observed_at, meta, registered_at, position)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for (position, entry) in entries.iter().enumerate() {
                stmt.execute(params![
                    entry.hash,
                    entry.vector.magnitude,
                    entry.vector.entropy_rate,
                    entry.vector.observed_at.0 as i64,
                    serde_json::to_string(&entry.meta)?,
                    entry.registered_at.0 as i64,
                    position as i64,
                ])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Load entries in their original insertion order.
    pub fn load_entries(&self) -> Result<Vec<KnowledgeEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT hash, magnitude, entropy_rate, observed_at, meta, registered_at
             FROM entries ORDER BY position",
        )?;

        let rows: Vec<(String, f64, f64, i64, String, i64)> = stmt
            .query_map([], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                ))
            })?
            .collect::<std::result::Result<_, _>>()?;

        rows.into_iter()
            .map(|(hash, magnitude, entropy_rate, observed_at, meta, registered_at)| {
                let meta = serde_json::from_str(&meta)
                    .map_err(|e| StoreError::InvalidData(format!("entry '{hash}' meta: {e}")))?;
                Ok(KnowledgeEntry {
                    hash,
                    vector: Vector::new(magnitude, entropy_rate, Timestamp(observed_at as u64)),
                    meta,
                    registered_at: Timestamp(registered_at as u64),
                })
            })
            .collect()
    }

    /// Targeted upsert of a single entry (no full rewrite). A new hash
    /// takes the next position; a known hash keeps its slot.
    pub fn upsert_entry(&self, hash: &str, value: &serde_json::Value) -> Result<()> {
        let magnitude = value["magnitude"]
            .as_f64()
            .ok_or_else(|| StoreError::InvalidData("entry missing magnitude".to_string()))?;
        let entropy_rate = value["entropy_rate"]
            .as_f64()
            .ok_or_else(|| StoreError::InvalidData("entry missing entropy_rate".to_string()))?;
        let observed_at = value["observed_at"].as_u64().unwrap_or(0);
        let meta = value.get("meta").cloned().unwrap_or(serde_json::json!({}));

        self.conn.execute(
            "INSERT INTO entries (hash, magnitude, entropy_rate, observed_at, meta, registered_at, position)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6,
                     (SELECT COALESCE(MAX(position) + 1, 0) FROM entries))
             ON CONFLICT(hash) DO UPDATE SET
                 magnitude = excluded.magnitude,
                 entropy_rate = excluded.entropy_rate,
                 observed_at = excluded.observed_at,
                 meta = excluded.meta,
                 registered_at = excluded.registered_at",
            params![
                hash,
                magnitude,
                entropy_rate,
                observed_at as i64,
                serde_json::to_string(&meta)?,
                Timestamp::now().0 as i64,
            ],
        )?;
        Ok(())
    }

    pub fn fetch_entry(&self, hash: &str) -> Result<Option<serde_json::Value>> {
        let mut stmt = self.conn.prepare(
            "SELECT magnitude, entropy_rate, observed_at, meta FROM entries WHERE hash = ?1",
        )?;
        let row: Option<(f64, f64, i64, String)> = stmt
            .query_row([hash], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .ok();

        match row {
            Some((magnitude, entropy_rate, observed_at, meta)) => {
                let meta: serde_json::Value = serde_json::from_str(&meta)?;
                Ok(Some(serde_json::json!({
                    "magnitude": magnitude,
                    "entropy_rate": entropy_rate,
                    "observed_at": observed_at,
                    "meta": meta,
                })))
            }
            None => Ok(None),
        }
    }

    pub fn entry_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT count(*) FROM entries", [], |row| row.get(0))?;
        Ok(count)
    }

    // --- Event log ---

    pub fn log_event(&self, kind: &str, payload: &serde_json::Value) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (kind, payload) VALUES (?1, ?2)",
            params![kind, serde_json::to_string(payload)?],
        )?;
        Ok(())
    }

    pub fn event_count(&self, kind: &str) -> Result<i64> {
        let count = self.conn.query_row(
            "SELECT count(*) FROM events WHERE kind = ?1",
            [kind],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // --- Sources ---

    /// Replace the persisted source list, preserving registration order.
    pub fn save_sources(&self, sources: &[SourceEndpoint]) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute("DELETE FROM sources", [])?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO sources (name, url, position) VALUES (?1, ?2, ?3)")?;
            for (position, source) in sources.iter().enumerate() {
                stmt.execute(params![source.name, source.url, position as i64])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn load_sources(&self) -> Result<Vec<SourceEndpoint>> {
        let mut stmt = self
            .conn
            .prepare("SELECT name, url FROM sources ORDER BY position")?;
        let sources = stmt
            .query_map([], |row| {
                Ok(SourceEndpoint {
                    name: row.get(0)?,
                    url: row.get(1)?,
                })
            })?
            .collect::<std::result::Result<_, _>>()?;
        Ok(sources)
    }
}

/// Shared handle implementing the engine's storage-collaborator seam.
///
/// All `Archive` calls are best-effort by contract: errors are stringified
/// for the caller to log, and the engine carries on regardless.
#[derive(Clone)]
pub struct SharedStore(Arc<Mutex<Store>>);

impl SharedStore {
    pub fn new(store: Store) -> Self {
        Self(Arc::new(Mutex::new(store)))
    }

    pub fn lock(&self) -> MutexGuard<'_, Store> {
        self.0.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Archive for SharedStore {
    fn record(&self, key: &str, value: &serde_json::Value) -> std::result::Result<(), ArchiveError> {
        self.lock()
            .upsert_entry(key, value)
            .map_err(|e| ArchiveError::new(e.to_string()))
    }

    fn fetch(&self, key: &str) -> std::result::Result<Option<serde_json::Value>, ArchiveError> {
        self.lock()
            .fetch_entry(key)
            .map_err(|e| ArchiveError::new(e.to_string()))
    }

    fn log_event(
        &self,
        kind: &str,
        payload: &serde_json::Value,
    ) -> std::result::Result<(), ArchiveError> {
        self.lock()
            .log_event(kind, payload)
            .map_err(|e| ArchiveError::new(e.to_string()))
    }
}
