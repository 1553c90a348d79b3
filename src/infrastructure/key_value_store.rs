use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, params};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Durable, process-wide key-value storage. Values are opaque strings,
/// typically JSON-encoded records.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError>;
    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError>;
    async fn remove(&self, key: &str) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteKeyValueStore {
    db_path: PathBuf,
}

impl SqliteKeyValueStore {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

#[async_trait]
impl KeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let connection = self.connect()?;
        let value: Option<String> = connection
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;
        Ok(value)
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(key) DO UPDATE SET
               value = excluded.value,
               updated_at = excluded.updated_at",
            params![key, value, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM kv_store WHERE key = ?1", params![key])?;
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: Mutex<HashMap<String, String>>,
}

#[async_trait]
impl KeyValueStore for InMemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>, InfraError> {
        let entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::Storage(format!("key-value lock poisoned: {error}")))?;
        Ok(entries.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), InfraError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::Storage(format!("key-value lock poisoned: {error}")))?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), InfraError> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|error| InfraError::Storage(format!("key-value lock poisoned: {error}")))?;
        entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::initialize_database;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_DB: AtomicUsize = AtomicUsize::new(0);

    struct TempDatabase {
        path: PathBuf,
    }

    impl TempDatabase {
        fn new() -> Self {
            let sequence = NEXT_TEMP_DB.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "daymark-kv-tests-{}-{}.sqlite",
                std::process::id(),
                sequence
            ));
            initialize_database(&path).expect("initialize database");
            Self { path }
        }
    }

    impl Drop for TempDatabase {
        fn drop(&mut self) {
            let _ = std::fs::remove_file(&self.path);
        }
    }

    #[tokio::test]
    async fn in_memory_store_roundtrip() {
        let store = InMemoryKeyValueStore::default();
        assert_eq!(store.get("missing").await.expect("get"), None);

        store.set("timer", "{\"startDate\":\"x\"}").await.expect("set");
        assert_eq!(
            store.get("timer").await.expect("get"),
            Some("{\"startDate\":\"x\"}".to_string())
        );

        store.remove("timer").await.expect("remove");
        assert_eq!(store.get("timer").await.expect("get"), None);
    }

    #[tokio::test]
    async fn sqlite_store_roundtrip_and_overwrite() {
        let database = TempDatabase::new();
        let store = SqliteKeyValueStore::new(&database.path);

        assert_eq!(store.get("key").await.expect("get"), None);

        store.set("key", "first").await.expect("set");
        store.set("key", "second").await.expect("overwrite");
        assert_eq!(store.get("key").await.expect("get"), Some("second".to_string()));

        store.remove("key").await.expect("remove");
        assert_eq!(store.get("key").await.expect("get"), None);
    }

    #[tokio::test]
    async fn sqlite_store_persists_across_connections() {
        let database = TempDatabase::new();
        {
            let store = SqliteKeyValueStore::new(&database.path);
            store.set("durable", "value").await.expect("set");
        }

        let reopened = SqliteKeyValueStore::new(&database.path);
        assert_eq!(
            reopened.get("durable").await.expect("get"),
            Some("value".to_string())
        );
    }
}
