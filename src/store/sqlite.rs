use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

use super::backend::ParameterStore;
use super::error::{StoreError, StoreResult};
use super::models::Parameter;
use super::schema;

/// Number of versions a key retains before further writes are rejected.
pub const DEFAULT_MAX_VERSIONS: u64 = 100;

/// SQLite-backed parameter store for local and single-host deployments.
pub struct SqliteParameterStore {
    conn: Mutex<Connection>,
    max_versions: u64,
}

impl SqliteParameterStore {
    /// Open or create the parameter database.
    pub fn open(db_path: &str) -> StoreResult<Self> {
        let parent = Path::new(db_path).parent();
        if let Some(dir) = parent {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    StoreError::Backend(format!("failed to create {}: {}", dir.display(), e))
                })?;
            }
        }
        let conn = Connection::open(db_path).map_err(|e| {
            StoreError::Backend(format!("failed to open parameter store at {}: {}", db_path, e))
        })?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")
            .map_err(|e| backend_error(db_path, e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_versions: DEFAULT_MAX_VERSIONS,
        })
    }

    /// Open an in-memory store (for testing).
    pub fn open_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|e| backend_error(":memory:", e))?;
        conn.execute_batch("PRAGMA foreign_keys=ON;")
            .map_err(|e| backend_error(":memory:", e))?;
        Ok(Self {
            conn: Mutex::new(conn),
            max_versions: DEFAULT_MAX_VERSIONS,
        })
    }

    pub fn with_max_versions(mut self, max_versions: u64) -> Self {
        self.max_versions = max_versions.max(1);
        self
    }

    /// Create tables if they don't exist.
    pub fn initialize(&self) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute_batch(schema::CREATE_TABLES_SQL)
            .map_err(|e| backend_error("schema", e))?;
        conn.execute_batch(schema::CREATE_INDEXES_SQL)
            .map_err(|e| backend_error("schema", e))?;
        conn.execute(
            "INSERT OR IGNORE INTO schema_version (version, applied_at, description) VALUES (?1, ?2, ?3)",
            params![schema::SCHEMA_VERSION, Self::now(), "Initial schema"],
        )
        .map_err(|e| backend_error("schema", e))?;
        Ok(())
    }

    /// Fetch a parameter with its metadata.
    pub fn get_parameter(&self, key: &str) -> StoreResult<Parameter> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT name, value, secure, version, updated_at FROM parameters WHERE name = ?1",
            params![key],
            parameter_from_row,
        )
        .optional()
        .map_err(|e| map_sqlite_error(key, e))?
        .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    /// List parameters whose name starts with `prefix`, ordered by name.
    pub fn list(&self, prefix: &str) -> StoreResult<Vec<Parameter>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn
            .prepare(
                "SELECT name, value, secure, version, updated_at FROM parameters
                 WHERE substr(name, 1, length(?1)) = ?1 ORDER BY name",
            )
            .map_err(|e| backend_error(prefix, e))?;
        let rows = stmt
            .query_map(params![prefix], parameter_from_row)
            .map_err(|e| backend_error(prefix, e))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| backend_error(prefix, e))?;
        Ok(rows)
    }

    /// Number of versions currently retained for a key.
    pub fn retained_versions(&self, key: &str) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM parameter_history WHERE name = ?1",
                params![key],
                |row| row.get(0),
            )
            .map_err(|e| map_sqlite_error(key, e))?;
        Ok(count as u64)
    }

    fn now() -> String {
        chrono::Utc::now().to_rfc3339()
    }
}

#[async_trait]
impl ParameterStore for SqliteParameterStore {
    async fn get(&self, key: &str) -> StoreResult<String> {
        let conn = self.conn.lock().unwrap();
        conn.query_row(
            "SELECT value FROM parameters WHERE name = ?1",
            params![key],
            |row| row.get(0),
        )
        .optional()
        .map_err(|e| map_sqlite_error(key, e))?
        .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, value: &str, encrypted: bool) -> StoreResult<u64> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(|e| map_sqlite_error(key, e))?;

        let current: Option<i64> = tx
            .query_row(
                "SELECT version FROM parameters WHERE name = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| map_sqlite_error(key, e))?;
        let retained: i64 = tx
            .query_row(
                "SELECT COUNT(*) FROM parameter_history WHERE name = ?1",
                params![key],
                |row| row.get(0),
            )
            .map_err(|e| map_sqlite_error(key, e))?;

        if retained as u64 >= self.max_versions {
            return Err(StoreError::VersionLimitExceeded(key.to_string()));
        }

        let version = current.map(|v| v + 1).unwrap_or(1);
        let now = Self::now();
        tx.execute(
            "INSERT INTO parameters (name, value, secure, version, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(name) DO UPDATE SET
                value = excluded.value,
                secure = excluded.secure,
                version = excluded.version,
                updated_at = excluded.updated_at",
            params![key, value, encrypted, version, now],
        )
        .map_err(|e| map_sqlite_error(key, e))?;
        tx.execute(
            "INSERT INTO parameter_history (name, version, value, secure, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![key, version, value, encrypted, now],
        )
        .map_err(|e| map_sqlite_error(key, e))?;
        tx.commit().map_err(|e| map_sqlite_error(key, e))?;

        Ok(version as u64)
    }

    async fn delete(&self, key: &str) -> StoreResult<()> {
        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction().map_err(|e| map_sqlite_error(key, e))?;
        tx.execute("DELETE FROM parameter_history WHERE name = ?1", params![key])
            .map_err(|e| map_sqlite_error(key, e))?;
        let removed = tx
            .execute("DELETE FROM parameters WHERE name = ?1", params![key])
            .map_err(|e| map_sqlite_error(key, e))?;
        if removed == 0 {
            return Err(StoreError::NotFound(key.to_string()));
        }
        tx.commit().map_err(|e| map_sqlite_error(key, e))?;
        Ok(())
    }
}

fn parameter_from_row(row: &rusqlite::Row) -> rusqlite::Result<Parameter> {
    Ok(Parameter {
        name: row.get(0)?,
        value: row.get(1)?,
        secure: row.get(2)?,
        version: row.get::<_, i64>(3)? as u64,
        updated_at: row.get(4)?,
    })
}

/// Busy or locked databases mean another writer got there first.
fn map_sqlite_error(key: &str, err: rusqlite::Error) -> StoreError {
    match err.sqlite_error_code() {
        Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
            StoreError::TooManyUpdates(key.to_string())
        }
        _ => backend_error(key, err),
    }
}

fn backend_error(context: &str, err: rusqlite::Error) -> StoreError {
    StoreError::Backend(format!("{}: {}", context, err))
}
