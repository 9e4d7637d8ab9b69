//! Per-client rate limiting
//!
//! A registry of token-bucket limiters keyed by client IP. Buckets are
//! created lazily on a client's first request and refilled lazily from
//! elapsed wall-clock time on each check; there are no background timers
//! or sweeper tasks. The registry is an explicit instance injected into
//! the server state, so separate servers (and tests) never share limiter
//! state.
//!
//! The map is bounded: when it reaches `max_clients` and a new IP arrives,
//! entries idle longer than `idle_timeout` are swept, and if the map is
//! still full the longest-idle bucket is evicted.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Configuration for the rate limiter registry
#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    /// Token refill rate per second
    pub per_second: f64,

    /// Burst capacity (maximum tokens a bucket can hold)
    pub burst: u32,

    /// Maximum number of tracked client IPs
    pub max_clients: usize,

    /// How long a bucket may sit unused before it is eligible for eviction
    pub idle_timeout: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: 10.0,
            burst: 20,
            max_clients: 10_000,
            idle_timeout: Duration::from_secs(600),
        }
    }
}

/// Token bucket state for a single client
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(burst: u32, now: Instant) -> Self {
        Self {
            tokens: burst as f64,
            last_refill: now,
        }
    }

    /// Refill from elapsed time, then consume one token if available
    fn allow_at(&mut self, now: Instant, per_second: f64, burst: u32) -> bool {
        let elapsed = now.saturating_duration_since(self.last_refill);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * per_second).min(burst as f64);
        self.last_refill = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Registry of per-client-IP token buckets
///
/// Thread-safe: lookup-or-insert, refill, and consume all happen under one
/// mutex, so concurrent checks for the same IP can never double-spend a
/// token.
pub struct RateLimiterRegistry {
    config: RateLimitConfig,
    buckets: Mutex<HashMap<String, TokenBucket>>,
}

impl RateLimiterRegistry {
    /// Create a new registry with the given configuration
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Mutex::new(HashMap::new()),
        }
    }

    /// Create a new registry with default configuration (10/sec, burst 20)
    pub fn with_defaults() -> Self {
        Self::new(RateLimitConfig::default())
    }

    /// Check whether a request from `ip` may proceed, consuming one token
    pub fn allow(&self, ip: &str) -> bool {
        self.allow_at(ip, Instant::now())
    }

    /// Number of currently tracked client IPs
    pub fn tracked_clients(&self) -> usize {
        self.buckets.lock().unwrap().len()
    }

    fn allow_at(&self, ip: &str, now: Instant) -> bool {
        let mut buckets = self.buckets.lock().unwrap();

        if !buckets.contains_key(ip) && buckets.len() >= self.config.max_clients {
            self.evict(&mut buckets, now);
        }

        let bucket = buckets
            .entry(ip.to_string())
            .or_insert_with(|| TokenBucket::new(self.config.burst, now));

        bucket.allow_at(now, self.config.per_second, self.config.burst)
    }

    /// Make room for a new client: drop idle buckets, then the stalest one
    fn evict(&self, buckets: &mut HashMap<String, TokenBucket>, now: Instant) {
        let idle_timeout = self.config.idle_timeout;
        buckets.retain(|_, b| now.saturating_duration_since(b.last_refill) < idle_timeout);

        if buckets.len() >= self.config.max_clients {
            if let Some(stalest) = buckets
                .iter()
                .min_by_key(|(_, b)| b.last_refill)
                .map(|(ip, _)| ip.clone())
            {
                buckets.remove(&stalest);
            }
        }
    }
}
