//! Session storage backing the conversation identity.

use std::future::Future;
use std::path::Path;
use std::pin::Pin;

use dashmap::DashMap;
use rusqlite::OptionalExtension;
use thiserror::Error;
use tokio_rusqlite::Connection;

use super::ids::ConversationId;

/// Storage key of the conversation id.
pub const CONVERSATION_ID_KEY: &str = "agent_conversation_id";

/// Boxed future type for store operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Error type for session store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` storage error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),
}

/// Result type for session store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Key/value storage scoped to one browser profile.
pub trait SessionStore: Send + Sync {
    /// Read a value.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn load(&self, key: &str) -> StoreFuture<'_, StoreResult<Option<String>>>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn save(&self, key: &str, value: &str) -> StoreFuture<'_, StoreResult<()>>;

    /// Remove a value.
    ///
    /// # Errors
    /// Returns an error if storage access fails.
    fn remove(&self, key: &str) -> StoreFuture<'_, StoreResult<()>>;
}

/// Return the stored conversation id, creating and persisting one on first use.
///
/// Never fails: when storage is unavailable a fresh volatile id is returned,
/// which only costs cross-reload context.
pub async fn get_or_create_session_id(store: &dyn SessionStore) -> ConversationId {
    match store.load(CONVERSATION_ID_KEY).await {
        Ok(Some(raw)) => match ConversationId::parse(&raw) {
            Ok(id) => return id,
            Err(e) => tracing::warn!("Discarding malformed stored conversation id: {e}"),
        },
        Ok(None) => {}
        Err(e) => {
            tracing::warn!("Session storage unavailable, using a volatile conversation id: {e}");
            return ConversationId::generate();
        }
    }

    let id = ConversationId::generate();
    if let Err(e) = store.save(CONVERSATION_ID_KEY, id.as_str()).await {
        tracing::warn!("Failed to persist conversation id {id}: {e}");
    } else {
        tracing::debug!("Created conversation id {id}");
    }
    id
}

/// Volatile in-process store.
#[derive(Debug, Default)]
pub struct InMemorySessionStore {
    entries: DashMap<String, String>,
}

impl InMemorySessionStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for InMemorySessionStore {
    fn load(&self, key: &str) -> StoreFuture<'_, StoreResult<Option<String>>> {
        let value = self.entries.get(key).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(value) })
    }

    fn save(&self, key: &str, value: &str) -> StoreFuture<'_, StoreResult<()>> {
        self.entries.insert(key.to_string(), value.to_string());
        Box::pin(async { Ok(()) })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, StoreResult<()>> {
        self.entries.remove(key);
        Box::pin(async { Ok(()) })
    }
}

/// `SQLite` implementation of the session store.
pub struct SqliteSessionStore {
    conn: Connection,
    table: String,
}

impl SqliteSessionStore {
    /// Table name for session entries.
    pub const DEFAULT_TABLE: &'static str = "session_storage";

    /// Open (or create) the store at `path`.
    ///
    /// # Errors
    /// Returns an error if the database cannot be opened.
    pub async fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let conn = Connection::open(path.as_ref()).await?;
        Self::with_connection(conn).await
    }

    /// Open a store living only as long as this value.
    ///
    /// # Errors
    /// Returns an error if the database cannot be created.
    pub async fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().await?;
        Self::with_connection(conn).await
    }

    async fn with_connection(conn: Connection) -> StoreResult<Self> {
        let table = Self::DEFAULT_TABLE.to_string();
        let table_name = table.clone();

        conn.call(move |conn| {
            conn.execute_batch(&format!(
                "CREATE TABLE IF NOT EXISTS {table_name} (
                    key TEXT PRIMARY KEY,
                    value TEXT NOT NULL,
                    updated_at INTEGER NOT NULL
                )"
            ))?;
            Ok(())
        })
        .await?;

        Ok(Self { conn, table })
    }
}

impl SessionStore for SqliteSessionStore {
    fn load(&self, key: &str) -> StoreFuture<'_, StoreResult<Option<String>>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let value = self
                .conn
                .call(move |conn| {
                    let value = conn
                        .query_row(
                            &format!("SELECT value FROM {table} WHERE key = ?1"),
                            rusqlite::params![key],
                            |row| row.get::<_, String>(0),
                        )
                        .optional()?;
                    Ok(value)
                })
                .await?;
            Ok(value)
        })
    }

    fn save(&self, key: &str, value: &str) -> StoreFuture<'_, StoreResult<()>> {
        let key = key.to_string();
        let value = value.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            let now_ms = chrono::Utc::now().timestamp_millis();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!(
                            "INSERT OR REPLACE INTO {table} (key, value, updated_at)
                             VALUES (?1, ?2, ?3)"
                        ),
                        rusqlite::params![key, value, now_ms],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> StoreFuture<'_, StoreResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            let table = self.table.clone();
            self.conn
                .call(move |conn| {
                    conn.execute(
                        &format!("DELETE FROM {table} WHERE key = ?1"),
                        rusqlite::params![key],
                    )?;
                    Ok(())
                })
                .await?;
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Store whose every call fails, like a browser with storage disabled.
    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn load(&self, _key: &str) -> StoreFuture<'_, StoreResult<Option<String>>> {
            Box::pin(async {
                Err(StoreError::Sqlite(tokio_rusqlite::Error::ConnectionClosed))
            })
        }

        fn save(&self, _key: &str, _value: &str) -> StoreFuture<'_, StoreResult<()>> {
            Box::pin(async {
                Err(StoreError::Sqlite(tokio_rusqlite::Error::ConnectionClosed))
            })
        }

        fn remove(&self, _key: &str) -> StoreFuture<'_, StoreResult<()>> {
            Box::pin(async { Ok(()) })
        }
    }

    #[tokio::test]
    async fn test_id_is_stable_for_a_store() {
        let store = InMemorySessionStore::new();
        let first = get_or_create_session_id(&store).await;
        let second = get_or_create_session_id(&store).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_separate_stores_get_separate_ids() {
        let a = get_or_create_session_id(&InMemorySessionStore::new()).await;
        let b = get_or_create_session_id(&InMemorySessionStore::new()).await;
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn test_unavailable_storage_degrades_to_volatile_id() {
        let first = get_or_create_session_id(&BrokenStore).await;
        let second = get_or_create_session_id(&BrokenStore).await;
        assert_ne!(first, second);
    }

    #[tokio::test]
    async fn test_malformed_stored_id_is_replaced() {
        let store = InMemorySessionStore::new();
        store.save(CONVERSATION_ID_KEY, "not valid!").await.unwrap();
        let id = get_or_create_session_id(&store).await;
        assert_eq!(
            store.load(CONVERSATION_ID_KEY).await.unwrap().as_deref(),
            Some(id.as_str())
        );
    }

    #[tokio::test]
    async fn test_sqlite_store_roundtrip() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), None);
        store.save("k", "v1").await.unwrap();
        store.save("k", "v2").await.unwrap();
        assert_eq!(store.load("k").await.unwrap().as_deref(), Some("v2"));
        store.remove("k").await.unwrap();
        assert_eq!(store.load("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_sqlite_store_keeps_id() {
        let store = SqliteSessionStore::open_in_memory().await.unwrap();
        let first = get_or_create_session_id(&store).await;
        assert_eq!(get_or_create_session_id(&store).await, first);
    }
}
