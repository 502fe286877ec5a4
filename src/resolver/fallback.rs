//! Fallback Resolver
//!
//! Decides, per lookup, whether to serve the live value from the remote
//! store, a bounded-staleness copy from the local cache, or nothing.
//!
//! # Policy
//!
//! 1. Ask the store. A value refreshes the cache and is returned.
//! 2. No value (store down, timed out, or key missing upstream; these are
//!    indistinguishable here): read the cache.
//!    - no entry → [`Unavailable::NoCachedValue`]
//!    - `age > ttl` → [`Unavailable::CacheExpired`]
//!    - otherwise the cached value is served and a warning is logged.
//!
//! An age exactly equal to the TTL is still served. The cache is only ever
//! written from step 1.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::cache::LocalCache;
use crate::domain::ports::{CacheKey, KeyValueStore};
use crate::metrics::ServiceMetrics;

/// Reference maximum staleness for cached values.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

// =============================================================================
// Configuration
// =============================================================================

/// Configuration for the fallback resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Maximum age of a cached value that may still be served
    pub ttl: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_CACHE_TTL,
        }
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// How a single resolution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Served from the remote store
    Live,
    /// Served from the local cache within the TTL
    Cached,
    /// Store gave nothing and the cache never held the key
    NoCachedValue,
    /// Store gave nothing and the cached value is older than the TTL
    CacheExpired,
}

impl Outcome {
    /// Stable label used in logs and metrics.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Live => "live",
            Outcome::Cached => "cached",
            Outcome::NoCachedValue => "no_cached_value",
            Outcome::CacheExpired => "cache_expired",
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Where a successfully resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    /// Fresh from the remote store
    Live,
    /// From the local cache, `age` old
    Cached { age: Duration },
}

/// A successfully resolved value with its provenance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub value: String,
    pub source: Source,
}

/// Why a key could not be resolved.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    /// Nothing was ever fetched for this key
    #[error("Store unavailable and no cached value for key '{key}'")]
    NoCachedValue { key: CacheKey },

    /// The last fetched value is older than the TTL
    #[error(
        "Store unavailable for more than {}s (cached value for key '{key}' is {}s old)",
        ttl.as_secs(),
        age.as_secs()
    )]
    CacheExpired {
        key: CacheKey,
        age: Duration,
        ttl: Duration,
    },
}

impl Unavailable {
    /// Key that failed to resolve.
    pub fn key(&self) -> &CacheKey {
        match self {
            Unavailable::NoCachedValue { key } | Unavailable::CacheExpired { key, .. } => key,
        }
    }

    /// Age of the rejected cache entry, when one existed.
    pub fn cache_age(&self) -> Option<Duration> {
        match self {
            Unavailable::NoCachedValue { .. } => None,
            Unavailable::CacheExpired { age, .. } => Some(*age),
        }
    }

    /// Short machine-readable reason.
    pub fn reason(&self) -> &'static str {
        match self {
            Unavailable::NoCachedValue { .. } => "no cached value",
            Unavailable::CacheExpired { .. } => "cache expired",
        }
    }

    /// Outcome label for this failure.
    pub fn outcome(&self) -> Outcome {
        match self {
            Unavailable::NoCachedValue { .. } => Outcome::NoCachedValue,
            Unavailable::CacheExpired { .. } => Outcome::CacheExpired,
        }
    }
}

// =============================================================================
// Fallback Resolver
// =============================================================================

/// Store-first, cache-second value resolver.
pub struct FallbackResolver {
    store: Arc<dyn KeyValueStore>,
    cache: Arc<LocalCache>,
    config: ResolverConfig,
    metrics: Option<ServiceMetrics>,
}

impl FallbackResolver {
    /// Create a resolver over `store` and `cache`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        cache: Arc<LocalCache>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
            metrics: None,
        }
    }

    /// Count every resolution outcome in `metrics`.
    pub fn with_metrics(mut self, metrics: ServiceMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Resolve `key` to a value, or explain why it cannot be served.
    pub async fn resolve(&self, key: &CacheKey) -> Result<String, Unavailable> {
        self.resolve_detailed(key).await.map(|resolved| resolved.value)
    }

    /// Like [`resolve`](Self::resolve), also reporting where the value came from.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn resolve_detailed(&self, key: &CacheKey) -> Result<Resolved, Unavailable> {
        let result = self.resolve_inner(key).await;

        let outcome = match &result {
            Ok(Resolved {
                source: Source::Live,
                ..
            }) => Outcome::Live,
            Ok(Resolved {
                source: Source::Cached { .. },
                ..
            }) => Outcome::Cached,
            Err(unavailable) => unavailable.outcome(),
        };
        if let Some(metrics) = &self.metrics {
            metrics.record_resolution(key, outcome);
        }

        result
    }

    async fn resolve_inner(&self, key: &CacheKey) -> Result<Resolved, Unavailable> {
        if let Some(value) = self.store.fetch(key).await {
            self.cache.put(key.clone(), value.clone());
            debug!("Resolved key '{}' from store", key);
            return Ok(Resolved {
                value,
                source: Source::Live,
            });
        }

        let Some(entry) = self.cache.get(key) else {
            return Err(Unavailable::NoCachedValue { key: key.clone() });
        };

        let age = entry.age_at(self.cache.clock().now());
        if age > self.config.ttl {
            return Err(Unavailable::CacheExpired {
                key: key.clone(),
                age,
                ttl: self.config.ttl,
            });
        }

        warn!(
            age_seconds = age.as_secs(),
            "Using local cache for key '{}' (age: {}s)",
            key,
            age.as_secs()
        );
        Ok(Resolved {
            value: entry.value,
            source: Source::Cached { age },
        })
    }

    /// Configured maximum staleness.
    pub fn ttl(&self) -> Duration {
        self.config.ttl
    }

    /// The cache this resolver writes to.
    pub fn cache(&self) -> &Arc<LocalCache> {
        &self.cache
    }

    /// The store this resolver reads from.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }
}

impl std::fmt::Debug for FallbackResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackResolver")
            .field("ttl", &self.config.ttl)
            .field("cache", &self.cache)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::{InMemoryStore, ManualClock};
    use assert_matches::assert_matches;

    const OPEN: &str = "b3:trading:hours:open";
    const CLOSE: &str = "b3:trading:hours:close";

    struct Fixture {
        store: Arc<InMemoryStore>,
        clock: Arc<ManualClock>,
        resolver: FallbackResolver,
    }

    fn fixture(ttl_secs: u64) -> Fixture {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let cache = Arc::new(LocalCache::new(clock.clone()));
        let resolver = FallbackResolver::new(
            store.clone(),
            cache,
            ResolverConfig {
                ttl: Duration::from_secs(ttl_secs),
            },
        );
        Fixture {
            store,
            clock,
            resolver,
        }
    }

    #[test]
    fn test_resolver_config_default() {
        assert_eq!(ResolverConfig::default().ttl, Duration::from_secs(3600));
    }

    #[tokio::test]
    async fn test_live_value_warms_cache() {
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");

        let resolved = f.resolver.resolve_detailed(&OPEN.into()).await.unwrap();

        assert_eq!(resolved.value, "10:00");
        assert_eq!(resolved.source, Source::Live);
        assert_eq!(f.resolver.cache().get(&OPEN.into()).unwrap().value, "10:00");
        assert_eq!(f.resolver.cache().age(&OPEN.into()), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_outage_within_ttl_serves_cache() {
        // Scenario A
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");
        assert_eq!(f.resolver.resolve(&OPEN.into()).await.unwrap(), "10:00");

        f.store.set_online(false);
        f.clock.advance(Duration::from_secs(1800));

        let resolved = f.resolver.resolve_detailed(&OPEN.into()).await.unwrap();
        assert_eq!(resolved.value, "10:00");
        assert_eq!(
            resolved.source,
            Source::Cached {
                age: Duration::from_secs(1800)
            }
        );
    }

    #[tokio::test]
    async fn test_never_fetched_key_has_no_cached_value() {
        // Scenario B
        let f = fixture(3600);
        f.store.set_online(false);

        let err = f.resolver.resolve(&CLOSE.into()).await.unwrap_err();

        assert_matches!(&err, Unavailable::NoCachedValue { key } if key.as_str() == CLOSE);
        assert_eq!(err.reason(), "no cached value");
        assert_eq!(err.cache_age(), None);
        assert!(f.resolver.cache().is_empty());
    }

    #[tokio::test]
    async fn test_no_cached_value_even_when_store_is_up() {
        let f = fixture(3600);

        let err = f.resolver.resolve(&CLOSE.into()).await.unwrap_err();
        assert_eq!(err.outcome(), Outcome::NoCachedValue);
    }

    #[tokio::test]
    async fn test_expired_cache_is_refused() {
        // Scenario C
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");
        f.resolver.resolve(&OPEN.into()).await.unwrap();

        f.store.set_online(false);
        f.clock.advance(Duration::from_secs(3601));

        let err = f.resolver.resolve(&OPEN.into()).await.unwrap_err();
        assert_matches!(
            err,
            Unavailable::CacheExpired { age, ttl, .. }
                if age == Duration::from_secs(3601) && ttl == Duration::from_secs(3600)
        );
        assert_eq!(err.reason(), "cache expired");
        assert_eq!(err.cache_age(), Some(Duration::from_secs(3601)));
        assert!(err.to_string().contains("more than 3600s"));
    }

    #[tokio::test]
    async fn test_age_equal_to_ttl_is_still_served() {
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");
        f.resolver.resolve(&OPEN.into()).await.unwrap();

        f.store.set_online(false);
        f.clock.advance(Duration::from_secs(3600));

        assert_eq!(f.resolver.resolve(&OPEN.into()).await.unwrap(), "10:00");

        f.clock.advance(Duration::from_millis(1));
        assert_matches!(
            f.resolver.resolve(&OPEN.into()).await,
            Err(Unavailable::CacheExpired { .. })
        );
    }

    #[tokio::test]
    async fn test_missing_upstream_key_falls_back_to_cache() {
        // Store reachable but key deleted: treated exactly like an outage
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");
        f.resolver.resolve(&OPEN.into()).await.unwrap();

        f.store.remove(&OPEN.into());
        f.clock.advance(Duration::from_secs(10));

        let resolved = f.resolver.resolve_detailed(&OPEN.into()).await.unwrap();
        assert_eq!(resolved.value, "10:00");
        assert_matches!(resolved.source, Source::Cached { .. });
    }

    #[tokio::test]
    async fn test_fallback_does_not_refresh_cache() {
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");
        f.resolver.resolve(&OPEN.into()).await.unwrap();
        let stored_at = f.resolver.cache().get(&OPEN.into()).unwrap().stored_at;

        f.store.set_online(false);
        f.clock.advance(Duration::from_secs(100));
        f.resolver.resolve(&OPEN.into()).await.unwrap();

        assert_eq!(
            f.resolver.cache().get(&OPEN.into()).unwrap().stored_at,
            stored_at
        );
        assert_eq!(
            f.resolver.cache().age(&OPEN.into()),
            Some(Duration::from_secs(100))
        );
    }

    #[tokio::test]
    async fn test_recovery_refreshes_cache_and_value() {
        let f = fixture(3600);
        f.store.insert(OPEN, "10:00");
        f.resolver.resolve(&OPEN.into()).await.unwrap();

        f.store.set_online(false);
        f.clock.advance(Duration::from_secs(4000));
        assert!(f.resolver.resolve(&OPEN.into()).await.is_err());

        f.store.insert(OPEN, "09:30");
        f.store.set_online(true);
        assert_eq!(f.resolver.resolve(&OPEN.into()).await.unwrap(), "09:30");
        assert_eq!(f.resolver.cache().age(&OPEN.into()), Some(Duration::ZERO));
    }

    #[tokio::test]
    async fn test_metrics_record_each_outcome() {
        let store = Arc::new(InMemoryStore::new());
        let clock = Arc::new(ManualClock::starting_now());
        let cache = Arc::new(LocalCache::new(clock.clone()));
        let metrics = ServiceMetrics::new().unwrap();
        let resolver = FallbackResolver::new(store.clone(), cache, ResolverConfig::default())
            .with_metrics(metrics.clone());
        let key = CacheKey::from(OPEN);

        let _ = resolver.resolve(&key).await;
        store.insert(OPEN, "10:00");
        let _ = resolver.resolve(&key).await;
        store.set_online(false);
        let _ = resolver.resolve(&key).await;
        clock.advance(Duration::from_secs(7200));
        let _ = resolver.resolve(&key).await;

        assert_eq!(metrics.resolution_count(&key, Outcome::NoCachedValue), 1);
        assert_eq!(metrics.resolution_count(&key, Outcome::Live), 1);
        assert_eq!(metrics.resolution_count(&key, Outcome::Cached), 1);
        assert_eq!(metrics.resolution_count(&key, Outcome::CacheExpired), 1);
    }

    #[test]
    fn test_unavailable_display_and_accessors() {
        let err = Unavailable::NoCachedValue { key: CLOSE.into() };
        assert_eq!(
            err.to_string(),
            "Store unavailable and no cached value for key 'b3:trading:hours:close'"
        );
        assert_eq!(err.key().as_str(), CLOSE);

        let err = Unavailable::CacheExpired {
            key: OPEN.into(),
            age: Duration::from_secs(3700),
            ttl: Duration::from_secs(3600),
        };
        assert_eq!(err.key().as_str(), OPEN);
        assert_eq!(err.outcome(), Outcome::CacheExpired);
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(Outcome::Live.to_string(), "live");
        assert_eq!(Outcome::Cached.as_str(), "cached");
        assert_eq!(Outcome::NoCachedValue.as_str(), "no_cached_value");
        assert_eq!(Outcome::CacheExpired.as_str(), "cache_expired");
    }
}
