use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use sqlx::{postgres::PgPoolOptions, PgPool, Row};
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Flat key-value storage behind the whole application. Keys are namespaced
/// by string prefixes (`user:`, `session:`, `attendance:<user>:<date>`, ...),
/// values are JSON documents. Atomic per key, last write wins.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()>;
    async fn delete(&self, key: &str) -> anyhow::Result<()>;
    /// All values whose key starts with `prefix`, ordered by key.
    async fn scan_prefix(&self, prefix: &str) -> anyhow::Result<Vec<Value>>;
}

/// Typed convenience layer over the raw JSON store.
#[async_trait]
pub trait KvStoreExt: KvStore {
    async fn get_as<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.get(key).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    async fn put_as<T>(&self, key: &str, value: &T) -> anyhow::Result<()>
    where
        T: Serialize + Sync,
    {
        self.set(key, serde_json::to_value(value)?).await
    }

    async fn scan_as<T>(&self, prefix: &str) -> anyhow::Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        let values = self.scan_prefix(prefix).await?;
        let mut out = Vec::with_capacity(values.len());
        for v in values {
            out.push(serde_json::from_value(v)?);
        }
        Ok(out)
    }
}

impl<S: KvStore + ?Sized> KvStoreExt for S {}

/// Postgres-backed store: one `kv_store(key TEXT PRIMARY KEY, value JSONB)`
/// table, prefix scans via LIKE.
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS kv_store (
                key TEXT PRIMARY KEY,
                value JSONB NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await?;
        Ok(Self { pool })
    }
}

// LIKE pattern metacharacters that must not act as wildcards in key prefixes.
fn escape_like(prefix: &str) -> String {
    prefix
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[async_trait]
impl KvStore for PgStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let row = sqlx::query("SELECT value FROM kv_store WHERE key = $1")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get::<Value, _>(0)))
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO kv_store (key, value)
            VALUES ($1, $2)
            ON CONFLICT (key) DO UPDATE SET value = EXCLUDED.value
            "#,
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM kv_store WHERE key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> anyhow::Result<Vec<Value>> {
        let pattern = format!("{}%", escape_like(prefix));
        let rows = sqlx::query("SELECT value FROM kv_store WHERE key LIKE $1 ORDER BY key")
            .bind(pattern)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|r| r.get::<Value, _>(0)).collect())
    }
}

/// In-memory store used by `AppState::fake()` and the test suite.
#[derive(Default)]
pub struct MemoryStore {
    map: RwLock<BTreeMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<Value>> {
        let map = self.map.read().expect("store lock poisoned");
        Ok(map.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> anyhow::Result<()> {
        let mut map = self.map.write().expect("store lock poisoned");
        map.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        let mut map = self.map.write().expect("store lock poisoned");
        map.remove(key);
        Ok(())
    }

    async fn scan_prefix(&self, prefix: &str) -> anyhow::Result<Vec<Value>> {
        let map = self.map.read().expect("store lock poisoned");
        Ok(map
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(_, v)| v.clone())
            .collect())
    }
}
