//! Redis Store Adapter
//!
//! Implements the `KeyValueStore` port on top of a multiplexed Redis
//! `ConnectionManager`.
//!
//! The manager is `Clone` and pipelines concurrent commands over a single
//! connection, so `fetch`/`ping` calls run concurrently without any lock
//! held across the network round-trip. The only shared mutable state is the
//! `Option<ConnectionManager>` slot, guarded by a short `RwLock` that is
//! released before awaiting.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::ports::{CacheKey, KeyValueStore};

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the Redis store adapter
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Redis connection URL
    pub url: String,

    /// Upper bound on establishing a connection
    pub connect_timeout: Duration,

    /// Upper bound on a single command round-trip
    pub operation_timeout: Duration,

    /// Minimum spacing between reconnection attempts while disconnected
    pub reconnect_interval: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "redis://localhost:6379".to_string(),
            connect_timeout: Duration::from_secs(5),
            operation_timeout: Duration::from_secs(5),
            reconnect_interval: Duration::from_secs(5),
        }
    }
}

// =============================================================================
// Redis Store
// =============================================================================

/// Redis-backed store client that degrades to "disconnected" instead of
/// failing.
pub struct RedisStore {
    config: StoreConfig,
    client: Option<redis::Client>,
    connection: RwLock<Option<ConnectionManager>>,
    last_attempt: Mutex<Option<Instant>>,
    attempts: AtomicU64,
}

impl RedisStore {
    /// Create the adapter and try to connect once.
    ///
    /// Never fails: an unparsable URL or an unreachable server leaves the
    /// adapter disconnected, and the process keeps starting.
    pub async fn connect(config: StoreConfig) -> Self {
        let client = match redis::Client::open(config.url.as_str()) {
            Ok(client) => Some(client),
            Err(e) => {
                error!(url = %config.url, "Invalid Redis URL, store disabled: {}", e);
                None
            }
        };

        let store = Self {
            config,
            client,
            connection: RwLock::new(None),
            last_attempt: Mutex::new(None),
            attempts: AtomicU64::new(0),
        };

        if store.client.is_some() {
            *store.last_attempt.lock() = Some(Instant::now());
            if store.establish().await.is_some() {
                info!(url = %store.config.url, "Connected to Redis");
            }
        }

        store
    }

    /// Whether a live connection handle is currently held.
    pub fn is_connected(&self) -> bool {
        self.connection.read().is_some()
    }

    /// Number of connection attempts made so far.
    pub fn connection_attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// The configuration this adapter was built with.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Open a connection manager and verify it with a PING, both bounded by
    /// the connect timeout.
    async fn establish(&self) -> Option<ConnectionManager> {
        let client = self.client.as_ref()?;
        self.attempts.fetch_add(1, Ordering::Relaxed);

        let connecting = async {
            let mut manager = client.get_connection_manager().await?;
            let _: String = redis::cmd("PING").query_async(&mut manager).await?;
            Ok::<_, redis::RedisError>(manager)
        };

        match tokio::time::timeout(self.config.connect_timeout, connecting).await {
            Ok(Ok(manager)) => {
                *self.connection.write() = Some(manager.clone());
                Some(manager)
            }
            Ok(Err(e)) => {
                error!(url = %self.config.url, "Failed to connect to Redis: {}", e);
                None
            }
            Err(_) => {
                error!(
                    url = %self.config.url,
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "Timed out connecting to Redis"
                );
                None
            }
        }
    }

    /// Claim the next reconnection slot if the interval has elapsed.
    fn reconnect_due(&self) -> bool {
        let mut last = self.last_attempt.lock();
        let due = last.map_or(true, |at| at.elapsed() >= self.config.reconnect_interval);
        if due {
            *last = Some(Instant::now());
        }
        due
    }

    /// Current connection handle, reconnecting first if one is due.
    async fn connection(&self) -> Option<ConnectionManager> {
        let current = self.connection.read().clone();
        if current.is_some() {
            return current;
        }

        if self.client.is_none() || !self.reconnect_due() {
            return None;
        }

        debug!(url = %self.config.url, "Attempting Redis reconnection");
        let manager = self.establish().await;
        if manager.is_some() {
            info!(url = %self.config.url, "Reconnected to Redis");
        }
        manager
    }
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("url", &self.config.url)
            .field("connected", &self.is_connected())
            .finish()
    }
}

#[async_trait]
impl KeyValueStore for RedisStore {
    #[instrument(skip(self), fields(key = %key))]
    async fn fetch(&self, key: &CacheKey) -> Option<String> {
        let mut conn = self.connection().await?;

        let result = tokio::time::timeout(
            self.config.operation_timeout,
            conn.get::<_, Option<String>>(key.as_str()),
        )
        .await;

        match result {
            Ok(Ok(Some(value))) if !value.is_empty() => {
                debug!("Fetched value from Redis for key '{}': {}", key, value);
                Some(value)
            }
            Ok(Ok(_)) => {
                warn!("Key '{}' not found in Redis", key);
                None
            }
            Ok(Err(e)) => {
                error!("Error fetching key '{}' from Redis: {}", key, e);
                None
            }
            Err(_) => {
                error!(
                    timeout_ms = self.config.operation_timeout.as_millis() as u64,
                    "Timed out fetching key '{}' from Redis", key
                );
                None
            }
        }
    }

    #[instrument(skip(self))]
    async fn ping(&self) -> bool {
        let Some(mut conn) = self.connection().await else {
            return false;
        };

        let probe = async {
            let pong: String = redis::cmd("PING").query_async(&mut conn).await?;
            Ok::<_, redis::RedisError>(pong)
        };

        match tokio::time::timeout(self.config.operation_timeout, probe).await {
            Ok(Ok(_)) => true,
            Ok(Err(e)) => {
                debug!("Redis ping failed: {}", e);
                false
            }
            Err(_) => {
                debug!("Redis ping timed out");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unreachable_config() -> StoreConfig {
        StoreConfig {
            // Nothing listens on port 1
            url: "redis://127.0.0.1:1".to_string(),
            connect_timeout: Duration::from_secs(1),
            operation_timeout: Duration::from_secs(1),
            reconnect_interval: Duration::from_secs(3600),
        }
    }

    #[test]
    fn test_store_config_default() {
        let config = StoreConfig::default();

        assert_eq!(config.url, "redis://localhost:6379");
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.operation_timeout, Duration::from_secs(5));
        assert_eq!(config.reconnect_interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_invalid_url_starts_disconnected() {
        let config = StoreConfig {
            url: "not a redis url".to_string(),
            ..unreachable_config()
        };

        let store = RedisStore::connect(config).await;

        assert!(!store.is_connected());
        assert_eq!(store.connection_attempts(), 0);
        assert_eq!(store.fetch(&"open".into()).await, None);
        assert!(!store.ping().await);
        // No client, so nothing is ever attempted
        assert_eq!(store.connection_attempts(), 0);
    }

    #[tokio::test]
    async fn test_connection_refused_degrades_instead_of_failing() {
        let store = RedisStore::connect(unreachable_config()).await;

        assert!(!store.is_connected());
        assert_eq!(store.connection_attempts(), 1);

        assert_eq!(store.fetch(&"b3:trading:hours:open".into()).await, None);
        assert!(!store.ping().await);
    }

    #[tokio::test]
    async fn test_reconnect_is_rate_limited() {
        let store = RedisStore::connect(unreachable_config()).await;
        assert_eq!(store.connection_attempts(), 1);

        // Interval of an hour: calls return immediately without dialing
        store.fetch(&"open".into()).await;
        store.ping().await;
        assert_eq!(store.connection_attempts(), 1);
    }

    #[tokio::test]
    async fn test_reconnect_attempted_when_due() {
        let config = StoreConfig {
            reconnect_interval: Duration::ZERO,
            ..unreachable_config()
        };
        let store = RedisStore::connect(config).await;
        assert_eq!(store.connection_attempts(), 1);

        store.fetch(&"open".into()).await;
        assert_eq!(store.connection_attempts(), 2);

        store.ping().await;
        assert_eq!(store.connection_attempts(), 3);
        assert!(!store.is_connected());
    }

    #[tokio::test]
    async fn test_connect_timeout_bounds_startup() {
        let config = StoreConfig {
            // Non-routable address (RFC 5737)
            url: "redis://192.0.2.1:6379".to_string(),
            connect_timeout: Duration::from_millis(200),
            ..unreachable_config()
        };

        let started = Instant::now();
        let store = RedisStore::connect(config).await;

        assert!(!store.is_connected());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_debug_hides_internals() {
        let store = RedisStore::connect(unreachable_config()).await;
        let rendered = format!("{:?}", store);

        assert!(rendered.contains("RedisStore"));
        assert!(rendered.contains("redis://127.0.0.1:1"));
        assert!(rendered.contains("connected: false"));
    }
}
