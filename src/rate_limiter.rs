//! Per-client token bucket rate limiting.
//!
//! Each client identifier gets its own bucket, created on first sight. The
//! registry map is guarded by one mutex; each bucket has its own lock so a busy
//! client never holds up the lookup of another.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use tracing::{debug, warn};

use crate::constants::{RATE_LIMIT_BURST, RATE_LIMIT_PER_SECOND};

/// Token bucket for a single client.
#[derive(Debug)]
struct TokenBucket {
    /// Current number of available tokens.
    tokens: f64,
    /// Last time the bucket was refilled.
    last_refill: Instant,
    /// Token refill rate (tokens per second).
    rate: f64,
    /// Maximum bucket capacity.
    capacity: f64,
}

impl TokenBucket {
    fn new(rate: f64, capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
            rate,
            capacity,
        }
    }

    /// Refill tokens based on elapsed time.
    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();

        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_refill = now;
    }

    /// Take one token if available. Never waits.
    fn try_acquire(&mut self) -> bool {
        self.refill();

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Limiter owned by one client; safe to share once created.
#[derive(Debug)]
struct ClientLimiter {
    bucket: Mutex<TokenBucket>,
}

impl ClientLimiter {
    fn new(config: &RateLimitConfig) -> Self {
        Self {
            bucket: Mutex::new(TokenBucket::new(
                config.refill_per_second,
                config.burst_capacity,
            )),
        }
    }

    fn lock(&self) -> MutexGuard<'_, TokenBucket> {
        self.bucket.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter bucket mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

#[derive(Debug)]
struct Entry {
    limiter: Arc<ClientLimiter>,
    last_seen: Instant,
}

/// Rate limiter configuration shared by every client bucket.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    /// Tokens added per second.
    pub refill_per_second: f64,
    /// Maximum burst capacity.
    pub burst_capacity: f64,
    /// Upper bound on tracked clients; the least recently seen is evicted
    /// when a new client would exceed it. `None` never evicts.
    pub max_clients: Option<usize>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            refill_per_second: RATE_LIMIT_PER_SECOND,
            burst_capacity: RATE_LIMIT_BURST,
            max_clients: None,
        }
    }
}

/// Registry mapping client identifiers to their token buckets.
///
/// Built once at startup and shared through the application state.
#[derive(Debug)]
pub struct RateLimiterRegistry {
    config: RateLimitConfig,
    entries: Mutex<HashMap<String, Entry>>,
}

impl RateLimiterRegistry {
    /// Create a registry with the default 1 token/s, burst 10 limits.
    pub fn new() -> Self {
        Self::with_config(RateLimitConfig::default())
    }

    pub fn with_config(config: RateLimitConfig) -> Self {
        Self {
            config,
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock the registry map, recovering from poison if necessary.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter registry mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Look up the client's limiter, creating it on first sight.
    fn limiter_for(&self, client_id: &str) -> Arc<ClientLimiter> {
        let mut entries = self.lock_entries();
        let now = Instant::now();

        if let Some(entry) = entries.get_mut(client_id) {
            entry.last_seen = now;
            return entry.limiter.clone();
        }

        if let Some(max) = self.config.max_clients {
            while entries.len() >= max.max(1) {
                let Some(oldest) = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.last_seen)
                    .map(|(id, _)| id.clone())
                else {
                    break;
                };
                debug!(client = %oldest, "Rate limiter: evicting least recently seen client");
                entries.remove(&oldest);
            }
        }

        let limiter = Arc::new(ClientLimiter::new(&self.config));
        entries.insert(
            client_id.to_string(),
            Entry {
                limiter: limiter.clone(),
                last_seen: now,
            },
        );
        limiter
    }

    /// Try to spend one token for `client_id` without waiting.
    ///
    /// Returns false exactly when the client's bucket is empty.
    pub fn allow(&self, client_id: &str) -> bool {
        let limiter = self.limiter_for(client_id);
        let allowed = limiter.lock().try_acquire();
        if !allowed {
            debug!(client = %client_id, "Rate limiter: bucket empty");
        }
        allowed
    }

    /// Tokens currently available to a client (full capacity if unseen).
    pub fn remaining_tokens(&self, client_id: &str) -> f64 {
        let limiter = {
            let entries = self.lock_entries();
            match entries.get(client_id) {
                Some(entry) => entry.limiter.clone(),
                None => return self.config.burst_capacity,
            }
        };
        let mut bucket = limiter.lock();
        bucket.refill();
        bucket.tokens
    }

    /// Number of tracked clients.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RateLimiterRegistry {
    fn default() -> Self {
        Self::new()
    }
}
