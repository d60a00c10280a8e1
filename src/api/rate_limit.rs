//! Per-client request rate limiting.
//!
//! Each (client IP, tier) pair gets a bucket of requests per window that
//! refills gradually. Login sits on the stricter `Auth` tier to slow down
//! password guessing.

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{HeaderValue, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use dashmap::DashMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;
use std::time::{Duration, Instant};

use super::error::ApiError;
use crate::config::RateLimitConfig;
use crate::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RateLimitTier {
    /// Authenticated API endpoints
    Api,
    /// Login
    Auth,
}

#[derive(Debug, Clone)]
struct RateLimitEntry {
    /// Tokens remaining in the current window
    tokens: u32,
    window_start: Instant,
    last_request: Instant,
}

impl RateLimitEntry {
    fn new(max_tokens: u32) -> Self {
        let now = Instant::now();
        Self {
            tokens: max_tokens,
            window_start: now,
            last_request: now,
        }
    }
}

#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<(IpAddr, RateLimitTier), RateLimitEntry>,
    config: RateLimitConfig,
    window_duration: Duration,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            entries: DashMap::new(),
            window_duration: Duration::from_secs(config.window_seconds),
            config,
        }
    }

    /// Check if a request should be allowed and consume a token if so.
    /// Returns Err(retry_after_seconds) when the client is over its limit.
    pub fn check_rate_limit(&self, ip: IpAddr, tier: RateLimitTier) -> Result<RateLimitInfo, u64> {
        if !self.config.enabled {
            return Ok(RateLimitInfo {
                remaining: u32::MAX,
                limit: u32::MAX,
                reset_after: 0,
            });
        }

        let max_tokens = self.max_tokens(tier);
        let now = Instant::now();

        let mut entry = self
            .entries
            .entry((ip, tier))
            .or_insert_with(|| RateLimitEntry::new(max_tokens));

        let elapsed = now.duration_since(entry.window_start);
        if elapsed >= self.window_duration {
            entry.tokens = max_tokens;
            entry.window_start = now;
        } else {
            // Replenish in proportion to the time since the last request
            let since_last = now.duration_since(entry.last_request);
            let replenish_rate = max_tokens as f64 / self.window_duration.as_secs_f64();
            let replenished = (since_last.as_secs_f64() * replenish_rate) as u32;
            entry.tokens = entry.tokens.saturating_add(replenished).min(max_tokens);
        }

        entry.last_request = now;

        if entry.tokens > 0 {
            entry.tokens -= 1;
            Ok(RateLimitInfo {
                remaining: entry.tokens,
                limit: max_tokens,
                reset_after: self.window_duration.saturating_sub(elapsed).as_secs(),
            })
        } else {
            Err(self.window_duration.saturating_sub(elapsed).as_secs().max(1))
        }
    }

    fn max_tokens(&self, tier: RateLimitTier) -> u32 {
        match tier {
            RateLimitTier::Api => self.config.api_requests_per_window,
            RateLimitTier::Auth => self.config.auth_requests_per_window,
        }
    }

    /// Drop entries idle for more than two windows
    pub fn cleanup_expired(&self) {
        let now = Instant::now();
        let expiry = self.window_duration * 2;

        self.entries
            .retain(|_, entry| now.duration_since(entry.last_request) < expiry);
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }
}

#[derive(Debug, Clone)]
pub struct RateLimitInfo {
    pub remaining: u32,
    pub limit: u32,
    /// Seconds until the window resets
    pub reset_after: u64,
}

/// Client IP: the socket peer address, or the proxy headers when the
/// deployment says they can be trusted
fn extract_client_ip(request: &Request<Body>, trust_proxy_headers: bool) -> IpAddr {
    if trust_proxy_headers {
        if let Some(ip) = forwarded_ip(request) {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::LOCALHOST))
}

fn forwarded_ip(request: &Request<Body>) -> Option<IpAddr> {
    let headers = request.headers();

    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .and_then(|v| v.trim().parse::<IpAddr>().ok())
        .or_else(|| {
            headers
                .get("x-real-ip")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse::<IpAddr>().ok())
        })
}

pub async fn rate_limit_api(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_tier(state, request, next, RateLimitTier::Api).await
}

pub async fn rate_limit_auth(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    rate_limit_with_tier(state, request, next, RateLimitTier::Auth).await
}

async fn rate_limit_with_tier(
    state: Arc<AppState>,
    request: Request<Body>,
    next: Next,
    tier: RateLimitTier,
) -> Response {
    let ip = extract_client_ip(&request, state.config.rate_limit.trust_proxy_headers);

    match state.rate_limiter.check_rate_limit(ip, tier) {
        Ok(info) => {
            let mut response = next.run(request).await;
            let headers = response.headers_mut();
            headers.insert("X-RateLimit-Limit", HeaderValue::from(info.limit));
            headers.insert("X-RateLimit-Remaining", HeaderValue::from(info.remaining));
            headers.insert("X-RateLimit-Reset", HeaderValue::from(info.reset_after));
            response
        }
        Err(retry_after) => {
            tracing::warn!(client_ip = %ip, tier = ?tier, "Rate limit exceeded");
            let mut response = ApiError::rate_limited(format!(
                "Too many requests. Try again in {} seconds.",
                retry_after
            ))
            .into_response();
            response
                .headers_mut()
                .insert("Retry-After", HeaderValue::from(retry_after));
            response
        }
    }
}

/// Periodically purge idle limiter entries
pub fn spawn_cleanup_task(rate_limiter: Arc<RateLimiter>, cleanup_interval_secs: u64) {
    if cleanup_interval_secs == 0 {
        return;
    }

    tokio::spawn(async move {
        let interval = Duration::from_secs(cleanup_interval_secs);
        loop {
            tokio::time::sleep(interval).await;
            rate_limiter.cleanup_expired();
            tracing::debug!(
                "Rate limiter cleanup complete, {} entries remaining",
                rate_limiter.entry_count()
            );
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_config() -> RateLimitConfig {
        RateLimitConfig {
            enabled: true,
            api_requests_per_window: 10,
            auth_requests_per_window: 5,
            window_seconds: 60,
            cleanup_interval: 300,
            trust_proxy_headers: false,
        }
    }

    #[test]
    fn test_rate_limiter_blocks_after_limit() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for i in 0..10 {
            assert!(
                limiter.check_rate_limit(ip, RateLimitTier::Api).is_ok(),
                "Request {} should be allowed",
                i
            );
        }

        let retry_after = limiter.check_rate_limit(ip, RateLimitTier::Api).unwrap_err();
        assert!(retry_after >= 1);
    }

    #[test]
    fn test_different_ips_have_separate_limits() {
        let limiter = RateLimiter::new(test_config());
        let ip1: IpAddr = "192.168.1.1".parse().unwrap();
        let ip2: IpAddr = "192.168.1.2".parse().unwrap();

        for _ in 0..10 {
            let _ = limiter.check_rate_limit(ip1, RateLimitTier::Api);
        }

        assert!(limiter.check_rate_limit(ip2, RateLimitTier::Api).is_ok());
    }

    #[test]
    fn test_auth_tier_is_independent_and_stricter() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "10.0.0.7".parse().unwrap();

        for _ in 0..5 {
            assert!(limiter.check_rate_limit(ip, RateLimitTier::Auth).is_ok());
        }
        assert!(limiter.check_rate_limit(ip, RateLimitTier::Auth).is_err());
        assert!(limiter.check_rate_limit(ip, RateLimitTier::Api).is_ok());
    }

    #[test]
    fn test_disabled_rate_limiting() {
        let mut config = test_config();
        config.enabled = false;
        let limiter = RateLimiter::new(config);
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        for _ in 0..100 {
            assert!(limiter.check_rate_limit(ip, RateLimitTier::Auth).is_ok());
        }
        assert_eq!(limiter.entry_count(), 0);
    }

    #[test]
    fn test_cleanup_keeps_recent_entries() {
        let limiter = RateLimiter::new(test_config());
        let ip: IpAddr = "192.168.1.1".parse().unwrap();

        let _ = limiter.check_rate_limit(ip, RateLimitTier::Api);
        limiter.cleanup_expired();
        assert_eq!(limiter.entry_count(), 1);
    }

    #[test]
    fn test_proxy_headers_ignored_unless_trusted() {
        let peer: SocketAddr = "198.51.100.4:50000".parse().unwrap();
        let mut request = Request::builder()
            .header("x-forwarded-for", "203.0.113.9, 10.0.0.1")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));

        assert_eq!(extract_client_ip(&request, false), peer.ip());
        assert_eq!(
            extract_client_ip(&request, true),
            "203.0.113.9".parse::<IpAddr>().unwrap()
        );

        let request = Request::builder()
            .header("x-real-ip", "203.0.113.10")
            .body(Body::empty())
            .unwrap();
        assert_eq!(
            extract_client_ip(&request, true),
            "203.0.113.10".parse::<IpAddr>().unwrap()
        );
        assert_eq!(
            extract_client_ip(&request, false),
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        );
    }
}
