//! CNAME flattening resolver module.
//!
//! A [`HostResolver`] maps a request host to `(resolved, flattened)` host
//! names for host matching. [`CachingResolver`] builds one on top of a
//! single-hop [`CnameLookup`], following the CNAME chain and caching results.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;

use crate::error::{Result, RuleError};

/// Default number of hosts kept by [`CachingResolver`]
pub const DEFAULT_RESOLVER_CACHE_SIZE: usize = 1024;

/// Default maximum number of CNAME hops followed
pub const DEFAULT_RESOLVE_DEPTH: usize = 5;

/// Default TTL for hosts without a CNAME record
pub const DEFAULT_NEGATIVE_TTL: Duration = Duration::from_secs(30);

/// Host flattening interface consumed by the host matcher.
pub trait HostResolver: Send + Sync {
    /// Return `(resolved, flattened)` for `host`: the name the chain starts
    /// from and its final CNAME target. Both equal `host` when there is no
    /// CNAME record or the lookup fails.
    fn cname_flatten(&self, host: &str) -> (String, String);
}

/// A single CNAME record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CnameRecord {
    /// Target host name
    pub target: String,
    /// Record TTL
    pub ttl: Duration,
}

/// Single-hop CNAME lookup interface.
pub trait CnameLookup: Send + Sync {
    /// Look up the CNAME record of `host`, `None` if it has none.
    fn lookup_cname(&self, host: &str) -> Result<Option<CnameRecord>>;
}

/// Nil resolver: no host has a CNAME record.
pub struct NilResolver;

impl NilResolver {
    /// Create a new nil resolver.
    pub fn new() -> Self {
        Self
    }
}

impl Default for NilResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CnameLookup for NilResolver {
    fn lookup_cname(&self, _host: &str) -> Result<Option<CnameRecord>> {
        Ok(None)
    }
}

impl HostResolver for NilResolver {
    fn cname_flatten(&self, host: &str) -> (String, String) {
        (host.to_string(), host.to_string())
    }
}

/// Static resolver with predefined CNAME records.
pub struct StaticResolver {
    records: HashMap<String, CnameRecord>,
    failing: Vec<String>,
}

impl StaticResolver {
    /// Create a new empty static resolver.
    pub fn new() -> Self {
        Self {
            records: HashMap::new(),
            failing: Vec::new(),
        }
    }

    /// Add a CNAME record with a one-minute TTL.
    pub fn add(&mut self, host: impl Into<String>, target: impl Into<String>) {
        self.add_with_ttl(host, target, Duration::from_secs(60));
    }

    /// Add a CNAME record with an explicit TTL.
    pub fn add_with_ttl(
        &mut self,
        host: impl Into<String>,
        target: impl Into<String>,
        ttl: Duration,
    ) {
        self.records.insert(
            host.into().to_lowercase(),
            CnameRecord {
                target: target.into().to_lowercase(),
                ttl,
            },
        );
    }

    /// Add a CNAME record and return self for chaining.
    pub fn with_cname(mut self, host: impl Into<String>, target: impl Into<String>) -> Self {
        self.add(host, target);
        self
    }

    /// Make lookups of `host` fail, and return self for chaining.
    pub fn with_failure(mut self, host: impl Into<String>) -> Self {
        self.failing.push(host.into().to_lowercase());
        self
    }
}

impl Default for StaticResolver {
    fn default() -> Self {
        Self::new()
    }
}

impl CnameLookup for StaticResolver {
    fn lookup_cname(&self, host: &str) -> Result<Option<CnameRecord>> {
        let host = host.to_lowercase();
        if self.failing.contains(&host) {
            return Err(RuleError::Resolve(format!("lookup failed for {}", host)));
        }
        Ok(self.records.get(&host).cloned())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    chain: Vec<String>,
    expires_at: Instant,
}

/// CNAME flattening resolver with an LRU cache.
///
/// Follows up to `depth` CNAME hops from the requested host. Results are
/// cached for the TTL of the first hop, or for the negative TTL when the host
/// has no CNAME record.
pub struct CachingResolver<L> {
    lookup: L,
    depth: usize,
    negative_ttl: Duration,
    cache: Mutex<LruCache<String, CacheEntry>>,
}

impl<L: CnameLookup> CachingResolver<L> {
    /// Create a caching resolver with default depth, size and negative TTL.
    pub fn new(lookup: L) -> Self {
        Self::with_options(
            lookup,
            DEFAULT_RESOLVE_DEPTH,
            DEFAULT_RESOLVER_CACHE_SIZE,
            DEFAULT_NEGATIVE_TTL,
        )
    }

    /// Create a caching resolver with explicit options.
    pub fn with_options(
        lookup: L,
        depth: usize,
        cache_size: usize,
        negative_ttl: Duration,
    ) -> Self {
        let cache_size = NonZeroUsize::new(cache_size).unwrap_or(NonZeroUsize::MIN);
        Self {
            lookup,
            depth,
            negative_ttl,
            cache: Mutex::new(LruCache::new(cache_size)),
        }
    }

    /// Clear the cache
    pub fn clear_cache(&self) {
        self.cache.lock().clear();
    }

    /// Number of cached hosts
    pub fn cached_len(&self) -> usize {
        self.cache.lock().len()
    }

    fn resolve_chain(&self, host: &str) -> (Vec<String>, Duration) {
        let mut chain = vec![host.to_string()];
        let mut ttl = self.negative_ttl;
        let mut request = host.to_string();

        for depth in 0..self.depth {
            match self.lookup.lookup_cname(&request) {
                Ok(Some(record)) => {
                    if depth == 0 {
                        ttl = record.ttl;
                    }
                    if chain.contains(&record.target) {
                        tracing::warn!(host, target = %record.target, "CNAME loop detected");
                        break;
                    }
                    request = record.target.clone();
                    chain.push(record.target);
                }
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(host, error = %e, "CNAME lookup failed");
                    break;
                }
            }
        }

        (chain, ttl)
    }
}

impl<L: CnameLookup> HostResolver for CachingResolver<L> {
    fn cname_flatten(&self, host: &str) -> (String, String) {
        let key = host.to_lowercase();
        let now = Instant::now();

        {
            let mut cache = self.cache.lock();
            if let Some(entry) = cache.get(&key) {
                if entry.expires_at > now {
                    return flatten_result(&entry.chain, host);
                }
                cache.pop(&key);
            }
        }

        // Lookups may block on the network; keep them outside the lock.
        let (chain, ttl) = self.resolve_chain(&key);
        let result = flatten_result(&chain, host);

        if !ttl.is_zero() {
            self.cache.lock().put(
                key,
                CacheEntry {
                    chain,
                    expires_at: now + ttl,
                },
            );
        }

        result
    }
}

fn flatten_result(chain: &[String], host: &str) -> (String, String) {
    let first = chain.first().map(String::as_str).unwrap_or(host);
    let last = chain.last().map(String::as_str).unwrap_or(host);
    (first.to_string(), last.to_string())
}
