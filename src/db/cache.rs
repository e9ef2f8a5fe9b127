//! Key/value cache with TTL
//!
//! Two backends share the [`CacheStore`] interface:
//! - [`MongoCacheStore`] keeps one document per key and lets a TTL index on
//!   `expires_at` purge stale entries
//! - [`MemoryCacheStore`] keeps entries in process, for local runs and tests
//!
//! Neither backend ever reports an error to its caller. A failed read is a
//! miss and a failed write is dropped; the pipeline can always refetch.

use async_trait::async_trait;
use bson::{doc, DateTime};
use log::{debug, warn};
use mongodb::{options::IndexOptions, Client, Collection, IndexModel};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::db::mongo::DATABASE;

const COLLECTION: &str = "Cache";

#[async_trait]
pub trait CacheStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<Value>;
    async fn set(&self, key: &str, value: Value, ttl: Duration);

    /// Short backend name for health output
    fn backend(&self) -> &'static str;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CacheDocument {
    #[serde(rename = "_id")]
    key: String,
    payload: String,
    cached_at: DateTime,
    expires_at: DateTime,
}

pub struct MongoCacheStore {
    client: Arc<Client>,
}

impl MongoCacheStore {
    pub fn new(client: Arc<Client>) -> Self {
        Self { client }
    }

    fn collection(&self) -> Collection<CacheDocument> {
        self.client.database(DATABASE).collection(COLLECTION)
    }

    /// Create the TTL index that expires documents at `expires_at`.
    pub async fn ensure_ttl_index(&self) -> mongodb::error::Result<()> {
        let options = IndexOptions::builder()
            .expire_after(Duration::from_secs(0))
            .build();
        let index = IndexModel::builder()
            .keys(doc! { "expires_at": 1 })
            .options(options)
            .build();
        self.collection().create_index(index).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for MongoCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        // The TTL monitor runs about once a minute, so stale documents are
        // filtered here as well.
        let filter = doc! {
            "_id": key,
            "expires_at": { "$gt": DateTime::now() }
        };

        let document = match self.collection().find_one(filter).await {
            Ok(document) => document?,
            Err(e) => {
                warn!("Cache read failed for '{}': {}", key, e);
                return None;
            }
        };

        match serde_json::from_str(&document.payload) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!("Discarding unreadable cache payload for '{}': {}", key, e);
                None
            }
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let now = DateTime::now();
        let expires_at =
            DateTime::from_millis(now.timestamp_millis() + ttl.as_millis() as i64);

        let document = CacheDocument {
            key: key.to_string(),
            payload: value.to_string(),
            cached_at: now,
            expires_at,
        };

        if let Err(e) = self
            .collection()
            .replace_one(doc! { "_id": key }, document)
            .upsert(true)
            .await
        {
            warn!("Cache write failed for '{}': {}", key, e);
        }
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

#[derive(Default)]
pub struct MemoryCacheStore {
    entries: RwLock<HashMap<String, (Value, Instant)>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn get(&self, key: &str) -> Option<Value> {
        let entries = self.entries.read().await;
        match entries.get(key) {
            Some((value, deadline)) if Instant::now() < *deadline => Some(value.clone()),
            Some(_) => {
                debug!("Cache entry '{}' expired", key);
                None
            }
            None => None,
        }
    }

    async fn set(&self, key: &str, value: Value, ttl: Duration) {
        let deadline = Instant::now() + ttl;
        let mut entries = self.entries.write().await;
        entries.retain(|_, (_, d)| Instant::now() < *d);
        entries.insert(key.to_string(), (value, deadline));
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
