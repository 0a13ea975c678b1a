use crate::error::Result;
use redis::AsyncCommands;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

const MEMORY_CACHE_CAPACITY: usize = 1000;
const DEFAULT_TTL_SECONDS: u64 = 3600;

struct MemoryEntry {
    value: serde_json::Value,
    expires_at: Instant,
    inserted_at: Instant,
}

/// Deployment-namespaced key/value cache with TTL.
///
/// Backed by a remote redis store with an in-process fallback. Remote errors
/// are never surfaced: reads fall through to the in-process store, writes
/// always land there. With no redis URL configured the service degrades to
/// in-process-only without error.
pub struct CacheService {
    redis: Option<redis::Client>,
    prefix: String,
    memory: RwLock<HashMap<String, MemoryEntry>>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct CacheStats {
    pub remote_keys: usize,
    pub memory_keys: usize,
}

impl CacheService {
    pub fn new(redis_url: Option<&str>) -> Self {
        Self::with_prefix(redis_url, "curator")
    }

    pub fn with_prefix(redis_url: Option<&str>, prefix: &str) -> Self {
        let redis = match redis_url {
            Some(url) => match redis::Client::open(url) {
                Ok(client) => {
                    info!("Redis client initialized");
                    Some(client)
                }
                Err(e) => {
                    warn!("Failed to initialize redis client ({}), caching will be in-process only", e);
                    None
                }
            },
            None => {
                warn!("Redis not configured, caching will be in-process only");
                None
            }
        };

        Self {
            redis,
            prefix: prefix.to_string(),
            memory: RwLock::new(HashMap::new()),
        }
    }

    fn full_key(&self, key: &str, deployment_id: Option<&str>) -> String {
        match deployment_id {
            Some(id) => format!("{}:{}:{}", self.prefix, id, key),
            None => format!("{}:{}", self.prefix, key),
        }
    }

    async fn connection(&self) -> Option<redis::aio::MultiplexedConnection> {
        let client = self.redis.as_ref()?;
        match client.get_multiplexed_async_connection().await {
            Ok(conn) => Some(conn),
            Err(e) => {
                warn!("Redis connection failed: {}", e);
                None
            }
        }
    }

    /// Get a value from the cache. Never errors; a remote failure falls
    /// through to the in-process store, and anything undecodable is a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str, deployment_id: Option<&str>) -> Option<T> {
        let full_key = self.full_key(key, deployment_id);

        if let Some(mut conn) = self.connection().await {
            match conn.get::<_, Option<String>>(&full_key).await {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(value) => {
                        debug!(key = %full_key, "Cache hit");
                        return Some(value);
                    }
                    Err(e) => {
                        warn!(key = %full_key, "Discarding undecodable cache entry: {}", e);
                        return None;
                    }
                },
                Ok(None) => {
                    debug!(key = %full_key, "Cache miss");
                    return None;
                }
                Err(e) => {
                    warn!(key = %full_key, "Cache get error, falling back to memory: {}", e);
                }
            }
        }

        let mut memory = self.memory.write().await;
        if let Some(entry) = memory.get(&full_key) {
            if entry.expires_at > Instant::now() {
                debug!(key = %full_key, "Cache hit (memory)");
                return serde_json::from_value(entry.value.clone()).ok();
            }
            memory.remove(&full_key);
        }

        debug!(key = %full_key, "Cache miss");
        None
    }

    /// Store a value with a TTL. Best-effort on the remote store; a remote
    /// failure never prevents the value from landing in the in-process store.
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl_seconds: u64,
        deployment_id: Option<&str>,
    ) {
        let full_key = self.full_key(key, deployment_id);

        let json = match serde_json::to_value(value) {
            Ok(json) => json,
            Err(e) => {
                warn!(key = %full_key, "Refusing to cache unserializable value: {}", e);
                return;
            }
        };

        if let Some(mut conn) = self.connection().await {
            let raw = json.to_string();
            match conn.set_ex::<_, _, ()>(&full_key, raw, ttl_seconds).await {
                Ok(()) => debug!(key = %full_key, ttl_seconds, "Cache set"),
                Err(e) => warn!(key = %full_key, "Cache set error: {}", e),
            }
        }

        let now = Instant::now();
        let mut memory = self.memory.write().await;
        memory.insert(
            full_key,
            MemoryEntry {
                value: json,
                expires_at: now + Duration::from_secs(ttl_seconds),
                inserted_at: now,
            },
        );

        // Approximate oldest-inserted eviction once over capacity.
        if memory.len() > MEMORY_CACHE_CAPACITY {
            if let Some(oldest) = memory
                .iter()
                .min_by_key(|(_, entry)| entry.inserted_at)
                .map(|(key, _)| key.clone())
            {
                memory.remove(&oldest);
            }
        }
    }

    pub async fn delete(&self, key: &str, deployment_id: Option<&str>) {
        let full_key = self.full_key(key, deployment_id);

        if let Some(mut conn) = self.connection().await {
            if let Err(e) = conn.del::<_, ()>(&full_key).await {
                warn!(key = %full_key, "Cache delete error: {}", e);
            }
        }

        self.memory.write().await.remove(&full_key);
    }

    /// Delete all keys matching a glob pattern. Supports the single-wildcard
    /// semantics needed for `prefix:*` invalidation.
    pub async fn delete_pattern(&self, pattern: &str, deployment_id: Option<&str>) {
        let full_pattern = self.full_key(pattern, deployment_id);

        if let Some(mut conn) = self.connection().await {
            let keys: std::result::Result<Vec<String>, _> = redis::cmd("KEYS")
                .arg(&full_pattern)
                .query_async(&mut conn)
                .await;
            match keys {
                Ok(keys) if !keys.is_empty() => {
                    let count = keys.len();
                    if let Err(e) = conn.del::<_, ()>(keys).await {
                        warn!(pattern = %full_pattern, "Cache pattern delete error: {}", e);
                    } else {
                        debug!(pattern = %full_pattern, count, "Cache pattern delete");
                    }
                }
                Ok(_) => {}
                Err(e) => warn!(pattern = %full_pattern, "Cache pattern scan error: {}", e),
            }
        }

        let glob = format!("^{}$", regex::escape(&full_pattern).replace("\\*", ".*"));
        if let Ok(re) = regex::Regex::new(&glob) {
            let mut memory = self.memory.write().await;
            memory.retain(|key, _| !re.is_match(key));
        }
    }

    pub async fn exists(&self, key: &str, deployment_id: Option<&str>) -> bool {
        let full_key = self.full_key(key, deployment_id);

        if let Some(mut conn) = self.connection().await {
            match conn.exists::<_, bool>(&full_key).await {
                Ok(found) => return found,
                Err(e) => warn!(key = %full_key, "Cache exists error: {}", e),
            }
        }

        let memory = self.memory.read().await;
        memory
            .get(&full_key)
            .map(|entry| entry.expires_at > Instant::now())
            .unwrap_or(false)
    }

    /// Cache-aside: on a miss, invoke the fetcher, store the result, return
    /// it. Concurrent callers for the same key may each invoke the fetcher;
    /// no single-flight is attempted since recomputation is idempotent.
    pub async fn get_or_set<T, F, Fut>(
        &self,
        key: &str,
        fetcher: F,
        ttl_seconds: u64,
        deployment_id: Option<&str>,
    ) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        if let Some(cached) = self.get(key, deployment_id).await {
            return Ok(cached);
        }

        let value = fetcher().await?;
        self.set(key, &value, ttl_seconds, deployment_id).await;
        Ok(value)
    }

    pub async fn increment(&self, key: &str, deployment_id: Option<&str>) -> i64 {
        let full_key = self.full_key(key, deployment_id);

        if let Some(mut conn) = self.connection().await {
            match conn.incr::<_, _, i64>(&full_key, 1).await {
                Ok(value) => return value,
                Err(e) => warn!(key = %full_key, "Cache increment error: {}", e),
            }
        }

        let now = Instant::now();
        let mut memory = self.memory.write().await;
        let current = memory
            .get(&full_key)
            .filter(|entry| entry.expires_at > now)
            .and_then(|entry| entry.value.as_i64())
            .unwrap_or(0);
        let next = current + 1;
        memory.insert(
            full_key,
            MemoryEntry {
                value: serde_json::Value::from(next),
                expires_at: now + Duration::from_secs(DEFAULT_TTL_SECONDS),
                inserted_at: now,
            },
        );
        next
    }

    pub async fn stats(&self) -> CacheStats {
        let mut remote_keys = 0;
        if let Some(mut conn) = self.connection().await {
            let keys: std::result::Result<Vec<String>, _> = redis::cmd("KEYS")
                .arg(format!("{}:*", self.prefix))
                .query_async(&mut conn)
                .await;
            match keys {
                Ok(keys) => remote_keys = keys.len(),
                Err(e) => warn!("Failed to get cache stats: {}", e),
            }
        }

        CacheStats {
            remote_keys,
            memory_keys: self.memory.read().await.len(),
        }
    }
}
