//! Per-IP rate limiting middleware using a token bucket.
//!
//! # Memory Safety
//!
//! Tracked client IPs are bounded:
//! - Configurable maximum entries (default: 100,000)
//! - Stale entries evicted after a TTL
//! - Background cleanup task that runs periodically
//!
//! # Security Note
//!
//! X-Forwarded-For and X-Real-IP are NOT trusted by default. Configure
//! `trusted_proxies` to read them:
//!
//! - Empty list (default): only the direct connection IP is used
//! - List of IPs/CIDRs: headers trusted only when the connection comes from one of them
//! - ["*"]: headers trusted from every source (NOT recommended for production)

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::{DashMap, mapref::entry::Entry};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, middleware::NoOpMiddleware, state::InMemoryState,
};
use ipnet::IpNet;
use revalidator_core::config::RateLimitConfig;
use std::{
    net::{IpAddr, SocketAddr},
    num::NonZeroU32,
    sync::{
        Arc, RwLock,
        atomic::{AtomicBool, Ordering},
    },
    time::{Duration, Instant},
};

/// Keyed limiter over client IP strings.
type KeyedLimiter =
    RateLimiter<String, DashMap<String, InMemoryState>, DefaultClock, NoOpMiddleware>;

/// Evictions needed, as a fraction of tracked entries, before the limiter is rebuilt.
const REBUILD_EVICTION_THRESHOLD_FRACTION: f64 = 0.10;

/// Evictions that always trigger a rebuild.
const REBUILD_EVICTION_MIN_COUNT: usize = 100;

/// Rebuild at least this often once anything was evicted.
const REBUILD_MIN_INTERVAL: Duration = Duration::from_secs(300);

/// Rate limiter state shared across requests.
#[derive(Clone)]
pub struct RateLimitState {
    inner: Option<Arc<RateLimitStateInner>>,
}

/// Only allocated when rate limiting is enabled.
struct RateLimitStateInner {
    /// Governor's map never shrinks, so the limiter is swapped out after large evictions.
    limiter: RwLock<KeyedLimiter>,
    /// Last access per client IP, used for eviction.
    last_access: DashMap<String, Instant>,
    trusted_proxies: TrustedProxies,
    max_entries: u32,
    entry_ttl: Duration,
    quota: Quota,
    last_rebuild: RwLock<Instant>,
    /// Warn-once flags.
    connect_info_warned: AtomicBool,
    at_capacity_warned: AtomicBool,
}

/// A parsed trusted proxy entry (either an IP or CIDR range).
#[derive(Clone, Debug)]
enum TrustedEntry {
    Ip(IpAddr),
    Cidr(IpNet),
}

/// Trusted proxy configuration for IP extraction.
#[derive(Clone, Debug)]
enum TrustedProxies {
    /// Never trust forwarded headers.
    None,
    /// Trust headers from all sources.
    All,
    /// Trust headers only from specific IPs/CIDRs.
    List(Vec<TrustedEntry>),
}

impl TrustedProxies {
    fn from_config(proxies: &[String]) -> Self {
        if proxies.is_empty() {
            return Self::None;
        }
        if proxies.len() == 1 && proxies[0] == "*" {
            return Self::All;
        }

        let entries = proxies
            .iter()
            .filter_map(|p| {
                let parsed = if p.contains('/') {
                    p.parse::<IpNet>().map(TrustedEntry::Cidr).map_err(|e| e.to_string())
                } else {
                    p.parse::<IpAddr>().map(TrustedEntry::Ip).map_err(|e| e.to_string())
                };
                match parsed {
                    Ok(entry) => Some(entry),
                    Err(e) => {
                        tracing::warn!(entry = %p, error = %e, "Ignoring invalid trusted_proxies entry");
                        None
                    }
                }
            })
            .collect();
        Self::List(entries)
    }

    /// Check if the given connection IP is a trusted proxy.
    fn is_trusted(&self, connection_ip: &str) -> bool {
        match self {
            Self::None => false,
            Self::All => true,
            Self::List(entries) => {
                let Ok(ip) = connection_ip.parse::<IpAddr>() else {
                    return false;
                };
                entries.iter().any(|entry| match entry {
                    TrustedEntry::Ip(trusted) => *trusted == ip,
                    TrustedEntry::Cidr(network) => network.contains(&ip),
                })
            }
        }
    }
}

impl RateLimitState {
    /// Create a new rate limit state from configuration.
    pub fn new(config: &RateLimitConfig) -> Self {
        if !config.enabled {
            return Self { inner: None };
        }

        let quota = Quota::per_minute(
            NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN),
        )
        .allow_burst(NonZeroU32::new(config.burst_size).unwrap_or(NonZeroU32::MIN));

        Self {
            inner: Some(Arc::new(RateLimitStateInner {
                limiter: RwLock::new(RateLimiter::dashmap(quota)),
                last_access: DashMap::new(),
                trusted_proxies: TrustedProxies::from_config(&config.trusted_proxies),
                max_entries: config.max_entries,
                entry_ttl: Duration::from_secs(config.entry_ttl_secs),
                quota,
                last_rebuild: RwLock::new(Instant::now()),
                connect_info_warned: AtomicBool::new(false),
                at_capacity_warned: AtomicBool::new(false),
            })),
        }
    }

    /// Check if rate limiting is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Check if a request from the given IP is allowed.
    pub fn check_ip(&self, ip: &str) -> Result<(), RateLimitError> {
        let Some(inner) = &self.inner else {
            return Ok(());
        };

        let now = Instant::now();
        let key = ip.to_string();

        // Read len() before taking the entry lock; DashMap can deadlock otherwise.
        let current_len = inner.last_access.len();
        let at_capacity = current_len >= inner.max_entries as usize;

        match inner.last_access.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                entry.insert(now);
            }
            Entry::Vacant(entry) => {
                if at_capacity {
                    if !inner.at_capacity_warned.swap(true, Ordering::Relaxed) {
                        tracing::warn!(
                            current_entries = current_len,
                            max_entries = inner.max_entries,
                            "Rate limiter at capacity, rejecting new clients"
                        );
                    }
                    return Err(RateLimitError {
                        retry_after_secs: 60,
                        reason: RateLimitReason::AtCapacity,
                    });
                }
                entry.insert(now);
            }
        }

        let limiter = inner.limiter.read().unwrap_or_else(|poisoned| {
            tracing::warn!("rate limiter RwLock was poisoned, recovering with into_inner()");
            poisoned.into_inner()
        });
        limiter.check_key(&key).map_err(|not_until| {
            let wait_time =
                not_until.wait_time_from(governor::clock::Clock::now(&DefaultClock::default()));
            RateLimitError {
                retry_after_secs: wait_time.as_secs() + 1,
                reason: RateLimitReason::RateLimited,
            }
        })
    }

    /// Evict entries idle longer than the TTL. Returns the number evicted.
    ///
    /// Uses `remove_if` so an entry touched between scan and removal survives.
    pub fn cleanup(&self) -> usize {
        let Some(inner) = &self.inner else {
            return 0;
        };

        let now = Instant::now();
        let ttl = inner.entry_ttl;
        let stale: Vec<String> = inner
            .last_access
            .iter()
            .filter(|entry| now.duration_since(*entry.value()) > ttl)
            .map(|entry| entry.key().clone())
            .collect();

        let mut evicted = 0;
        for key in stale {
            if inner
                .last_access
                .remove_if(&key, |_, last| now.duration_since(*last) > ttl)
                .is_some()
            {
                evicted += 1;
            }
        }

        if evicted == 0 {
            return 0;
        }

        let entries_before = inner.last_access.len() + evicted;
        if Self::should_rebuild(inner, evicted, entries_before, now) {
            Self::rebuild(inner);
            tracing::debug!(
                evicted,
                remaining = inner.last_access.len(),
                "Rebuilt rate limiter after cleanup"
            );
        }
        inner.at_capacity_warned.store(false, Ordering::Relaxed);

        evicted
    }

    fn should_rebuild(
        inner: &RateLimitStateInner,
        evicted: usize,
        entries_before: usize,
        now: Instant,
    ) -> bool {
        let threshold = ((entries_before as f64 * REBUILD_EVICTION_THRESHOLD_FRACTION) as usize)
            .max(REBUILD_EVICTION_MIN_COUNT);
        if evicted >= threshold {
            return true;
        }

        let last = inner.last_rebuild.read().unwrap_or_else(|poisoned| {
            tracing::warn!("last_rebuild RwLock was poisoned, recovering");
            poisoned.into_inner()
        });
        now.duration_since(*last) >= REBUILD_MIN_INTERVAL
    }

    /// Replace the limiter to reclaim governor's memory. Active clients get a fresh bucket.
    fn rebuild(inner: &RateLimitStateInner) {
        let mut limiter = inner.limiter.write().unwrap_or_else(|poisoned| {
            tracing::warn!("rate limiter RwLock was poisoned during rebuild, recovering");
            poisoned.into_inner()
        });
        *limiter = RateLimiter::dashmap(inner.quota);

        let mut last = inner.last_rebuild.write().unwrap_or_else(|poisoned| {
            tracing::warn!("last_rebuild RwLock was poisoned, recovering");
            poisoned.into_inner()
        });
        *last = Instant::now();
    }

    /// Current number of tracked client IPs.
    pub fn entry_count(&self) -> usize {
        self.inner.as_ref().map_or(0, |inner| inner.last_access.len())
    }

    fn warn_connect_info_missing(&self) {
        if let Some(inner) = &self.inner
            && !inner.connect_info_warned.swap(true, Ordering::Relaxed)
        {
            tracing::warn!(
                "ConnectInfo not available for rate limiting. All requests will share a single \
                 'unknown' bucket. Serve with into_make_service_with_connect_info::<SocketAddr>() \
                 to enable per-IP limits."
            );
        }
    }
}

/// Reason for rate limit rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitReason {
    /// Request exceeded rate limit.
    RateLimited,
    /// Rate limiter at capacity, cannot track new entries.
    AtCapacity,
}

/// Error returned when rate limit is exceeded.
#[derive(Debug)]
pub struct RateLimitError {
    /// Number of seconds to wait before retrying.
    pub retry_after_secs: u64,
    pub reason: RateLimitReason,
}

impl IntoResponse for RateLimitError {
    fn into_response(self) -> Response {
        let (code, message) = match self.reason {
            RateLimitReason::RateLimited => (
                "rate_limit_exceeded",
                format!(
                    "Rate limit exceeded. Retry after {} seconds.",
                    self.retry_after_secs
                ),
            ),
            RateLimitReason::AtCapacity => (
                "rate_limiter_at_capacity",
                "Server is experiencing high load. Please retry later.".to_string(),
            ),
        };

        let body = serde_json::json!({
            "success": false,
            "code": code,
            "message": message,
            "retry_after": self.retry_after_secs,
        });

        (
            StatusCode::TOO_MANY_REQUESTS,
            [("Retry-After", self.retry_after_secs.to_string())],
            axum::Json(body),
        )
            .into_response()
    }
}

/// Client IP from forwarding headers. Only consulted for trusted connections.
fn extract_forwarded_ip(req: &Request<Body>) -> Option<String> {
    if let Some(forwarded) = req.headers().get("x-forwarded-for")
        && let Ok(s) = forwarded.to_str()
        && let Some(ip) = s.split(',').next()
    {
        return Some(ip.trim().to_string());
    }

    req.headers()
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
}

fn extract_connection_ip(req: &Request<Body>) -> Option<String> {
    req.extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ci| ci.0.ip().to_string())
}

/// Resolve the client IP, honouring `trusted_proxies`.
fn extract_ip(req: &Request<Body>, state: &RateLimitState) -> String {
    let Some(inner) = &state.inner else {
        return "unknown".to_string();
    };

    let connection_ip = extract_connection_ip(req);
    let trust_headers = match (&connection_ip, &inner.trusted_proxies) {
        (None, TrustedProxies::All) => true,
        // Without a connection IP a listed proxy cannot be verified.
        (None, _) => false,
        (Some(conn_ip), trusted) => trusted.is_trusted(conn_ip),
    };

    if trust_headers && let Some(forwarded_ip) = extract_forwarded_ip(req) {
        return forwarded_ip;
    }

    connection_ip.unwrap_or_else(|| {
        state.warn_connect_info_missing();
        "unknown".to_string()
    })
}

/// Per-IP rate limiting middleware.
pub async fn ip_rate_limit_middleware(
    State(rate_limit): State<RateLimitState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    if !rate_limit.is_enabled() {
        return next.run(req).await;
    }

    let ip = extract_ip(&req, &rate_limit);
    match rate_limit.check_ip(&ip) {
        Ok(()) => next.run(req).await,
        Err(e) => {
            tracing::debug!(client_ip = %ip, reason = ?e.reason, "Request rate limited");
            e.into_response()
        }
    }
}

/// Spawn a background task that periodically evicts stale entries.
pub fn spawn_cleanup_task(
    state: RateLimitState,
    interval: Duration,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;
            let evicted = state.cleanup();
            if evicted > 0 {
                tracing::info!(evicted, "Rate limiter cleanup task evicted stale entries");
            }
        }
    })
}
