//! SQLite-backed persistent preferences.

use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Arc, Mutex};

use crate::error::{Error, Result};

const KEY_API_KEY: &str = "api_key";
const KEY_SELECTED_MODEL: &str = "selected_model";

/// Key-value store for settings that survive restarts.
pub struct Preferences {
    conn: Arc<Mutex<Connection>>,
}

impl Preferences {
    /// Open or create a preferences store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path).map_err(|e| Error::Storage(e.to_string()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| Error::Storage(e.to_string()))?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> rusqlite::Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| Error::Storage(format!("failed to lock connection: {e}")))?;
        f(&conn).map_err(|e| Error::Storage(e.to_string()))
    }

    /// Fetch a raw value.
    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()
        })
    }

    /// Store a raw value, replacing any previous one.
    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
    }

    /// Remove a value.
    pub fn delete(&self, key: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("DELETE FROM preferences WHERE key = ?1", params![key])?;
            Ok(())
        })
    }

    /// The stored OpenRouter API key, empty string when unset.
    pub fn api_key(&self) -> Result<String> {
        Ok(self.get(KEY_API_KEY)?.unwrap_or_default())
    }

    pub fn set_api_key(&self, api_key: &str) -> Result<()> {
        self.set(KEY_API_KEY, api_key)
    }

    /// The last selected model id, if any.
    pub fn selected_model(&self) -> Result<Option<String>> {
        self.get(KEY_SELECTED_MODEL)
    }

    pub fn set_selected_model(&self, model_id: &str) -> Result<()> {
        self.set(KEY_SELECTED_MODEL, model_id)
    }
}

fn initialize_schema(conn: &Connection) -> Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS preferences (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        [],
    )
    .map_err(|e| Error::Storage(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_get_missing_key() {
        let prefs = Preferences::in_memory().unwrap();
        assert_eq!(prefs.get("nope").unwrap(), None);
        assert_eq!(prefs.api_key().unwrap(), "");
        assert_eq!(prefs.selected_model().unwrap(), None);
    }

    #[test]
    fn test_set_and_get() {
        let prefs = Preferences::in_memory().unwrap();
        prefs.set_api_key("sk-or-123").unwrap();
        prefs.set_selected_model("openai/gpt-4o-mini").unwrap();

        assert_eq!(prefs.api_key().unwrap(), "sk-or-123");
        assert_eq!(
            prefs.selected_model().unwrap().as_deref(),
            Some("openai/gpt-4o-mini")
        );
    }

    #[test]
    fn test_set_replaces() {
        let prefs = Preferences::in_memory().unwrap();
        prefs.set_api_key("old").unwrap();
        prefs.set_api_key("new").unwrap();
        assert_eq!(prefs.api_key().unwrap(), "new");
    }

    #[test]
    fn test_delete() {
        let prefs = Preferences::in_memory().unwrap();
        prefs.set("k", "v").unwrap();
        prefs.delete("k").unwrap();
        assert_eq!(prefs.get("k").unwrap(), None);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("prefs.db");

        {
            let prefs = Preferences::open(&path).unwrap();
            prefs.set_api_key("sk-persisted").unwrap();
        }

        let prefs = Preferences::open(&path).unwrap();
        assert_eq!(prefs.api_key().unwrap(), "sk-persisted");
    }
}
